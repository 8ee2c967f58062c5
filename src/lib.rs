//! # jelcli - embedded command line engine
//!
//! An interactive command line for firmware, talking to a VT100-style terminal
//! over any byte transport (UART, USB CDC, telnet socket). Everything is
//! fixed-capacity; the crate does not allocate and supports `no_std`.
//!
//! ## Features
//!
//! ### Line Editing
//! - Cursor movement, Home/End, insert and overwrite modes
//! - Shift-arrow selection drawn in reverse video
//! - Bounded history with Up/Down recall
//!
//! ### Commands
//! - Commands grouped into static libraries with help text
//! - Typed arguments declared as compact specifications (`"%u%?s"`)
//! - Restricted commands visible only to authenticated sessions
//! - Built-in `cli help`, `tty history` and `tty clear`
//!
//! ### Output
//! - Per-invocation colors and attributes, restored when the command returns
//! - One shared output channel with an explicit lock for atomic sequences
//!
//! ## Usage
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! jelcli = "0.1.0"
//! ```
//!
//! ### Defining Commands
//!
//! ```rust
//! use jelcli::cli::io::Io;
//! use jelcli::cli::registry::{Command, Library, Registry};
//! use jelcli::cli::Error;
//!
//! fn reboot(io: &mut Io<'_>) -> Result<(), Error> {
//!     let delay = io.args().unsigned(0).unwrap_or(0);
//!     let forced = io.args().string(1) == Some("-f");
//!     io.print(format_args!("rebooting in {} s (forced: {})", delay, forced))
//! }
//!
//! static POWER: Library = Library::new(
//!     "power",
//!     "Power management",
//!     &[Command::new("reboot", "%?u%?s", "Reboot [delay] [-f]", reboot).restricted()],
//! );
//!
//! let mut registry = Registry::new();
//! jelcli::cli::builtins::register(&mut registry).unwrap();
//! registry.register(&POWER).unwrap();
//! ```
//!
//! ### Running a Session
//!
//! Implement [`Transport`](transport::Transport) for the link to the user and
//! poll a [`Session`](cli::session::Session) from the console task:
//!
//! ```rust,no_run
//! use jelcli::cli::config::Config;
//! use jelcli::cli::pool::StringPool;
//! use jelcli::cli::registry::Registry;
//! use jelcli::cli::session::Session;
//! use jelcli::transport::{OutputChannel, SpinMutex, Timeout, Transport};
//!
//! # struct Uart;
//! # impl Transport for Uart {
//! #     type Error = ();
//! #     fn read(&self, _buf: &mut [u8], _timeout: Timeout) -> Result<usize, ()> { Ok(0) }
//! #     fn write(&self, buf: &[u8]) -> Result<usize, ()> { Ok(buf.len()) }
//! #     fn flush(&self) -> Result<(), ()> { Ok(()) }
//! # }
//! static POOL: StringPool = StringPool::new();
//!
//! let registry = Registry::new();
//! let channel = OutputChannel::new(Uart, SpinMutex::new());
//! let config = Config::from_json(r#"{"prompt":"dev> ","banner":"firmware 1.2"}"#).unwrap();
//! let mut session = Session::new(&registry, &channel, &POOL, config);
//!
//! session.start().unwrap();
//! loop {
//!     session.poll(Timeout::Millis(20)).unwrap();
//! }
//! ```
//!
//! ## Platform Support
//!
//! This library is designed to work on:
//! - Embedded microcontrollers (ARM Cortex-M, RISC-V, etc.)
//! - Hosted targets, for tests and simulators
//! - Any platform supporting Rust's `core` library
//!
//! ## Optional Features
//!
//! - `std`: Enable standard library support (default: disabled)
//! - `defmt`: Log through defmt instead of the `log` facade

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

/// Command-line engine: tokenizer, registry, argument parser, line editor and
/// the per-command I/O façade.
pub mod cli;

/// Byte transports and the shared output channel.
///
/// Implementations are supplied by the platform: a UART driver, a USB CDC
/// class, a socket. The engine only needs blocking reads with a timeout.
pub mod transport;

mod logging;
