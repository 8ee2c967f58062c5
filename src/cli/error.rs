//! Error types for the command-line engine

/// Everything that can go wrong between a finished input line and a command's result.
///
/// All variants are recoverable: the session prints the [`Display`](core::fmt::Display)
/// text as one line and keeps running.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// The line did not name both a library and a command.
    InsufficientTokens,
    /// No visible command matches the line.
    NotFound,
    /// Tokens were left over after every descriptor was consumed.
    TooManyArguments,
    /// A required argument was missing.
    InsufficientArguments,
    /// A required argument did not convert to its declared kind.
    ArgumentTypeMismatch,
    /// The parameter specification has more descriptors than an argument list holds.
    MaxGlobalArgsExceeded,
    /// Every string-pool slot is leased.
    NoFreeStringsAvailable,
    /// An interactive prompt got no answer in time.
    ArgumentReadTimeout,
    /// A library with this name is already registered, or an application
    /// library tried to take a reserved name.
    DuplicateLibraryName,
    /// A library or command name is empty, non-printable, contains whitespace,
    /// or starts with a reserved prefix character.
    InvalidName,
    /// A parameter specification is malformed or puts a required descriptor
    /// after an optional one.
    InvalidSpecification,
    /// A configuration document could not be parsed.
    InvalidConfig,
    /// The registry has no room for another library.
    RegistryFull,
    /// Formatted output or a string argument exceeds its fixed capacity.
    StringTooLong,
    /// The output lock could not be taken in time.
    OutputLockTimeout,
    /// The underlying transport failed.
    Transport,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            Error::InsufficientTokens | Error::NotFound => "unknown command",
            Error::TooManyArguments => "too many arguments",
            Error::InsufficientArguments => "missing argument",
            Error::ArgumentTypeMismatch => "argument type mismatch",
            Error::MaxGlobalArgsExceeded => "command takes more arguments than supported",
            Error::NoFreeStringsAvailable => "out of string buffers, try again",
            Error::ArgumentReadTimeout => "timed out waiting for input",
            Error::DuplicateLibraryName => "library already registered",
            Error::InvalidName => "invalid name",
            Error::InvalidSpecification => "invalid parameter specification",
            Error::InvalidConfig => "invalid configuration",
            Error::RegistryFull => "too many libraries",
            Error::StringTooLong => "string too long",
            Error::OutputLockTimeout => "output busy",
            Error::Transport => "transport error",
        };
        f.write_str(msg)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::InsufficientTokens => defmt::write!(f, "InsufficientTokens"),
            Error::NotFound => defmt::write!(f, "NotFound"),
            Error::TooManyArguments => defmt::write!(f, "TooManyArguments"),
            Error::InsufficientArguments => defmt::write!(f, "InsufficientArguments"),
            Error::ArgumentTypeMismatch => defmt::write!(f, "ArgumentTypeMismatch"),
            Error::MaxGlobalArgsExceeded => defmt::write!(f, "MaxGlobalArgsExceeded"),
            Error::NoFreeStringsAvailable => defmt::write!(f, "NoFreeStringsAvailable"),
            Error::ArgumentReadTimeout => defmt::write!(f, "ArgumentReadTimeout"),
            Error::DuplicateLibraryName => defmt::write!(f, "DuplicateLibraryName"),
            Error::InvalidName => defmt::write!(f, "InvalidName"),
            Error::InvalidSpecification => defmt::write!(f, "InvalidSpecification"),
            Error::InvalidConfig => defmt::write!(f, "InvalidConfig"),
            Error::RegistryFull => defmt::write!(f, "RegistryFull"),
            Error::StringTooLong => defmt::write!(f, "StringTooLong"),
            Error::OutputLockTimeout => defmt::write!(f, "OutputLockTimeout"),
            Error::Transport => defmt::write!(f, "Transport"),
        }
    }
}

/// A failed argument parse, with the position of the token that caused it.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct ParseError {
    /// What went wrong.
    pub error: Error,
    /// Index into the argument tokens of the offending token, if there is one.
    pub token: Option<usize>,
}

impl ParseError {
    pub(crate) fn new(error: Error) -> Self {
        Self { error, token: None }
    }

    pub(crate) fn at(error: Error, token: usize) -> Self {
        Self {
            error,
            token: Some(token),
        }
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        e.error
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ParseError {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "ParseError({}, token {})", self.error, self.token)
    }
}
