//! Parameter specifications and the typed argument parser.
//!
//! Every command declares the arguments it takes as a compact specification
//! string. Each descriptor is `%`, an optional `?` marking it optional, and a
//! kind letter:
//!
//! | Descriptor | Kind                     |
//! |------------|--------------------------|
//! | `%d`       | signed 64-bit integer    |
//! | `%u`       | unsigned 64-bit integer  |
//! | `%f`       | double                   |
//! | `%s`       | bounded string           |
//!
//! `"%u%?s"` takes a required unsigned integer followed by an optional string.
//! Once a descriptor is optional, all following ones must be optional too.
//!
//! Optional descriptors are matched by kind: a token that does not convert to
//! an optional descriptor's kind leaves that slot absent and is offered to the
//! next descriptor instead.

use core::str::FromStr;

use heapless::Vec;

use super::config::MAX_GLOBAL_ARGS;
use super::error::{Error, ParseError};
use super::pool::{StringLease, StringPool};

/// The value kind a descriptor asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// `d`: signed 64-bit integer
    Signed,
    /// `u`: unsigned 64-bit integer
    Unsigned,
    /// `f`: double
    Float,
    /// `s`: string
    String,
}

impl Kind {
    fn from_letter(letter: u8) -> Option<Self> {
        match letter {
            b'd' => Some(Kind::Signed),
            b'u' => Some(Kind::Unsigned),
            b'f' => Some(Kind::Float),
            b's' => Some(Kind::String),
            _ => None,
        }
    }

    /// Name used in help output.
    pub fn name(self) -> &'static str {
        match self {
            Kind::Signed => "int",
            Kind::Unsigned => "uint",
            Kind::Float => "float",
            Kind::String => "string",
        }
    }
}

/// One parsed unit of a parameter specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    /// Expected kind.
    pub kind: Kind,
    /// Whether the argument may be left out.
    pub optional: bool,
}

/// A validated parameter specification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamSpec {
    descriptors: Vec<Descriptor, MAX_GLOBAL_ARGS>,
}

impl ParamSpec {
    /// Validate a specification string.
    ///
    /// # Errors
    ///
    /// * [`Error::MaxGlobalArgsExceeded`] - more descriptors than an argument list holds
    /// * [`Error::InvalidSpecification`] - malformed descriptor, or a required
    ///   descriptor after an optional one
    ///
    /// # Examples
    ///
    /// ```rust
    /// use jelcli::cli::args::{Kind, ParamSpec};
    /// use jelcli::cli::Error;
    ///
    /// let spec = ParamSpec::parse("%u%?s").unwrap();
    /// assert_eq!(spec.len(), 2);
    /// assert_eq!(spec.descriptors()[1].kind, Kind::String);
    ///
    /// assert_eq!(ParamSpec::parse("%?u%s"), Err(Error::InvalidSpecification));
    /// ```
    pub fn parse(spec: &str) -> Result<Self, Error> {
        let bytes = spec.as_bytes();
        if bytes.iter().filter(|&&b| b == b'%').count() > MAX_GLOBAL_ARGS {
            return Err(Error::MaxGlobalArgsExceeded);
        }

        let mut descriptors = Vec::new();
        let mut seen_optional = false;
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] != b'%' {
                return Err(Error::InvalidSpecification);
            }
            i += 1;
            let optional = bytes.get(i) == Some(&b'?');
            if optional {
                i += 1;
            }
            let kind = bytes
                .get(i)
                .and_then(|&b| Kind::from_letter(b))
                .ok_or(Error::InvalidSpecification)?;
            i += 1;

            if seen_optional && !optional {
                return Err(Error::InvalidSpecification);
            }
            seen_optional |= optional;
            descriptors
                .push(Descriptor { kind, optional })
                .map_err(|_| Error::MaxGlobalArgsExceeded)?;
        }

        Ok(Self { descriptors })
    }

    /// The descriptors in order.
    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    /// Number of descriptors.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// `true` for a command that takes no arguments.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Number of descriptors that must be present.
    pub fn required(&self) -> usize {
        self.descriptors.iter().filter(|d| !d.optional).count()
    }
}

/// One typed argument.
#[derive(Debug)]
pub enum Argument<'p> {
    /// Signed integer
    Signed(i64),
    /// Unsigned integer
    Unsigned(u64),
    /// Double
    Float(f64),
    /// String, holding a string-pool slot until dropped
    Str(StringLease<'p>),
}

impl<'p> Argument<'p> {
    /// Convert `token` to `kind`.
    fn convert(kind: Kind, token: &str, pool: &'p StringPool) -> Result<Self, Error> {
        match kind {
            Kind::Signed => i64::from_str(token)
                .map(Argument::Signed)
                .map_err(|_| Error::ArgumentTypeMismatch),
            Kind::Unsigned => u64::from_str(token)
                .map(Argument::Unsigned)
                .map_err(|_| Error::ArgumentTypeMismatch),
            Kind::Float => parse_decimal(token)
                .map(Argument::Float)
                .ok_or(Error::ArgumentTypeMismatch),
            Kind::String => pool.acquire(token).map(Argument::Str),
        }
    }

    /// The kind of this value.
    pub fn kind(&self) -> Kind {
        match self {
            Argument::Signed(_) => Kind::Signed,
            Argument::Unsigned(_) => Kind::Unsigned,
            Argument::Float(_) => Kind::Float,
            Argument::Str(_) => Kind::String,
        }
    }

    /// The value if it is a signed integer.
    pub fn as_signed(&self) -> Option<i64> {
        match self {
            Argument::Signed(v) => Some(*v),
            _ => None,
        }
    }

    /// The value if it is an unsigned integer.
    pub fn as_unsigned(&self) -> Option<u64> {
        match self {
            Argument::Unsigned(v) => Some(*v),
            _ => None,
        }
    }

    /// The value if it is a double.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Argument::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// The value if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Argument::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// Plain decimal notation only: no `inf`, `nan` or hex.
pub(crate) fn parse_decimal(token: &str) -> Option<f64> {
    let digits = token.strip_prefix(['+', '-']).unwrap_or(token);
    let first = digits.bytes().next()?;
    if !(first.is_ascii_digit() || first == b'.') {
        return None;
    }
    if !digits
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'))
    {
        return None;
    }
    f64::from_str(token).ok()
}

/// The arguments of one invocation, one slot per descriptor.
///
/// A slot is `None` when its optional descriptor was not matched.
#[derive(Debug, Default)]
pub struct ArgumentList<'p> {
    slots: Vec<Option<Argument<'p>>, MAX_GLOBAL_ARGS>,
}

impl<'p> ArgumentList<'p> {
    /// An empty list, for commands without parameters.
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Number of slots (descriptors), present or not.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// `true` if there are no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of slots holding a value.
    pub fn present(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// The argument in slot `index`, if it was given.
    pub fn get(&self, index: usize) -> Option<&Argument<'p>> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Whether slot `index` holds a value.
    pub fn is_present(&self, index: usize) -> bool {
        self.get(index).is_some()
    }

    /// Slot `index` as a signed integer.
    pub fn signed(&self, index: usize) -> Option<i64> {
        self.get(index).and_then(Argument::as_signed)
    }

    /// Slot `index` as an unsigned integer.
    pub fn unsigned(&self, index: usize) -> Option<u64> {
        self.get(index).and_then(Argument::as_unsigned)
    }

    /// Slot `index` as a double.
    pub fn float(&self, index: usize) -> Option<f64> {
        self.get(index).and_then(Argument::as_float)
    }

    /// Slot `index` as a string.
    pub fn string(&self, index: usize) -> Option<&str> {
        self.get(index).and_then(Argument::as_str)
    }

    /// Iterate over all slots.
    pub fn iter(&self) -> impl Iterator<Item = Option<&Argument<'p>>> {
        self.slots.iter().map(Option::as_ref)
    }
}

/// Parse argument tokens against a specification string.
///
/// Required descriptors must match the token under the cursor; optional ones
/// take it only if it converts to their kind. Leftover tokens are an error.
/// On failure every string lease taken so far is released before returning.
///
/// # Examples
///
/// ```rust
/// use jelcli::cli::args::parse;
/// use jelcli::cli::pool::StringPool;
///
/// let pool = StringPool::new();
/// let args = parse("%?u%?s", &["-f"], &pool).unwrap();
/// assert!(!args.is_present(0));
/// assert_eq!(args.string(1), Some("-f"));
/// ```
pub fn parse<'p>(
    spec: &str,
    tokens: &[&str],
    pool: &'p StringPool,
) -> Result<ArgumentList<'p>, ParseError> {
    let spec = ParamSpec::parse(spec).map_err(ParseError::new)?;
    parse_with(&spec, tokens, pool)
}

/// [`parse`] for an already validated specification.
pub fn parse_with<'p>(
    spec: &ParamSpec,
    tokens: &[&str],
    pool: &'p StringPool,
) -> Result<ArgumentList<'p>, ParseError> {
    let mut list = ArgumentList::new();
    let mut cursor = 0;

    for descriptor in spec.descriptors() {
        let slot = match tokens.get(cursor) {
            None if descriptor.optional => None,
            None => return Err(ParseError::new(Error::InsufficientArguments)),
            Some(token) => match Argument::convert(descriptor.kind, token, pool) {
                Ok(arg) => {
                    cursor += 1;
                    Some(arg)
                }
                Err(Error::NoFreeStringsAvailable) => {
                    return Err(ParseError::at(Error::NoFreeStringsAvailable, cursor));
                }
                Err(_) if descriptor.optional => None,
                Err(e) => return Err(ParseError::at(e, cursor)),
            },
        };
        // Cannot overflow: a ParamSpec holds at most MAX_GLOBAL_ARGS descriptors.
        let _ = list.slots.push(slot);
    }

    if cursor < tokens.len() {
        return Err(ParseError::at(Error::TooManyArguments, cursor));
    }
    Ok(list)
}
