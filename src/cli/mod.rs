//! The command-line engine.
//!
//! A finished input line goes through four stages:
//!
//! ```text
//! "os reboot 10 -f" ─▶ tokenizer ─▶ registry ─▶ args ─▶ handler(&mut Io)
//!                      [os, reboot,  reboot      10u64,
//!                       10, -f]      "%?u%?s"    "-f"
//! ```
//!
//! - [`tokenizer`] splits the line on whitespace.
//! - [`registry`] resolves `<library> <command>` to a [`Command`](registry::Command).
//! - [`args`] converts the remaining tokens against the command's parameter
//!   specification, borrowing string storage from a [`StringPool`](pool::StringPool).
//! - [`io`] hands the arguments and the terminal to the handler.
//!
//! [`terminal`] turns raw keystrokes into lines and [`session`] drives the
//! whole pipeline for one user.

pub mod args;
pub mod builtins;
pub mod config;
pub mod error;
pub mod format;
pub mod io;
pub mod pool;
pub mod registry;
pub mod session;
pub mod terminal;
pub mod tokenizer;

pub use error::{Error, ParseError};
