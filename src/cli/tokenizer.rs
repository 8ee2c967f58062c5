//! Whitespace tokenizer for finalized lines.
//!
//! There is no quoting or escaping: a token is a maximal run of non-whitespace
//! bytes.

use core::ops::Deref;
use heapless::Vec;

use super::config::MAX_TOKENS;

/// Tokens of one line, borrowed from it.
///
/// Holds at most [`MAX_TOKENS`]; a line with more tokens than that can never
/// resolve to a valid invocation, so the excess is only recorded as
/// [`overflowed`](Self::overflowed).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tokens<'a> {
    tokens: Vec<&'a str, MAX_TOKENS>,
    overflowed: bool,
}

impl<'a> Tokens<'a> {
    /// The tokens as a slice.
    pub fn as_slice(&self) -> &[&'a str] {
        &self.tokens
    }

    /// `true` if the line had more than [`MAX_TOKENS`] tokens.
    pub fn overflowed(&self) -> bool {
        self.overflowed
    }
}

impl<'a> Deref for Tokens<'a> {
    type Target = [&'a str];

    fn deref(&self) -> &Self::Target {
        &self.tokens
    }
}

/// Split a line on runs of whitespace.
///
/// # Examples
///
/// ```rust
/// use jelcli::cli::tokenizer::tokenize;
///
/// let tokens = tokenize("  os   reboot 10 -f ");
/// assert_eq!(tokens.as_slice(), &["os", "reboot", "10", "-f"]);
/// assert!(tokenize(" \t ").is_empty());
/// ```
pub fn tokenize(line: &str) -> Tokens<'_> {
    let mut out = Tokens::default();
    for token in line.split_ascii_whitespace() {
        if out.tokens.push(token).is_err() {
            out.overflowed = true;
            break;
        }
    }
    out
}
