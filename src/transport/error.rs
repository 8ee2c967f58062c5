//! Common error type for transports

/// A common error type for serial-style transports.
///
/// Transport implementations are free to use their own error type; this one
/// is provided for drivers that have nothing more specific to report.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// The driver failed while receiving.
    ReadError,
    /// The driver failed while transmitting.
    WriteError,
    /// The driver gave up waiting on the hardware.
    Timeout,
    /// The link is gone (cable unplugged, USB host detached).
    Closed,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            Error::ReadError => "read error",
            Error::WriteError => "write error",
            Error::Timeout => "transport timeout",
            Error::Closed => "transport closed",
        };
        f.write_str(msg)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::ReadError => defmt::write!(f, "ReadError"),
            Error::WriteError => defmt::write!(f, "WriteError"),
            Error::Timeout => defmt::write!(f, "Timeout"),
            Error::Closed => defmt::write!(f, "Closed"),
        }
    }
}
