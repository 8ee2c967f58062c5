//! Capacities and runtime configuration.
//!
//! Capacities are compile-time constants because every buffer in the engine is
//! sized from them. Behaviour that may differ between products lives in
//! [`Config`], which can be built in code or loaded from JSON.

use heapless::String;
use serde::Deserialize;

use super::Error;
use crate::transport::Timeout;

/// Maximum length of one input line.
pub const MAX_LINE_LENGTH: usize = 128;

/// Capacity of one string-pool item, and the bounded length of a formatted `print`.
pub const MAX_STRING_LENGTH: usize = 64;

/// Number of arguments one parse can produce.
pub const MAX_GLOBAL_ARGS: usize = 12;

/// Number of string arguments that may be alive at once across all invocations.
pub const STRING_POOL_SIZE: usize = 16;

/// Upper bound for [`Config::history_depth`].
pub const MAX_HISTORY_DEPTH: usize = 8;

/// Number of tokens kept from one line: library, command and the arguments.
pub const MAX_TOKENS: usize = MAX_GLOBAL_ARGS + 2;

/// Number of libraries a registry can hold, built-ins included.
pub const MAX_LIBRARIES: usize = 16;

/// Maximum prompt length.
pub const MAX_PROMPT_LENGTH: usize = 16;

/// Maximum banner length.
pub const MAX_BANNER_LENGTH: usize = 64;

/// Library names the engine keeps for itself.
pub const RESERVED_LIBRARY_NAMES: [&str; 5] = ["tty", "cli", "os", "hw", "jel"];

/// Runtime options for a [`Session`](super::session::Session).
///
/// # Examples
///
/// ```rust
/// use jelcli::cli::config::Config;
///
/// let config = Config::from_json(r#"{"prompt":"dev> ","history_depth":4}"#).unwrap();
/// assert_eq!(config.prompt.as_str(), "dev> ");
/// assert_eq!(config.history_depth, 4);
/// assert!(config.echo);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Text printed in front of the line being edited.
    pub prompt: String<MAX_PROMPT_LENGTH>,
    /// Echo keystrokes and redraw the line after edits.
    pub echo: bool,
    /// Number of committed lines kept for Up/Down recall.
    pub history_depth: usize,
    /// Text printed when the session starts. Empty prints nothing.
    pub banner: String<MAX_BANNER_LENGTH>,
    /// Default timeout of interactive prompts, in milliseconds. `0` waits forever.
    pub read_timeout_ms: u32,
}

impl Default for Config {
    fn default() -> Self {
        let mut prompt = String::new();
        let _ = prompt.push_str("> ");
        Self {
            prompt,
            echo: true,
            history_depth: MAX_HISTORY_DEPTH,
            banner: String::new(),
            read_timeout_ms: 0,
        }
    }
}

impl Config {
    /// Parse a configuration from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let (mut config, _): (Config, _) =
            serde_json_core::from_str(json).map_err(|_| Error::InvalidConfig)?;
        config.history_depth = config.history_depth.min(MAX_HISTORY_DEPTH);
        Ok(config)
    }

    /// History depth actually used, never above [`MAX_HISTORY_DEPTH`].
    pub fn effective_history_depth(&self) -> usize {
        self.history_depth.min(MAX_HISTORY_DEPTH)
    }

    /// Default timeout for prompts and confirmations.
    pub fn read_timeout(&self) -> Timeout {
        Timeout::from_millis_or_forever(self.read_timeout_ms)
    }
}
