//! The invocation façade handed to command handlers.
//!
//! An [`Io`] exists for exactly one command invocation. It owns the parsed
//! [`ArgumentList`] (and with it every string-pool lease), exposes bounded
//! formatted output, unbounded raw output, line input with timeouts, and the
//! session's [`Format`]. The format in effect when the invocation started is
//! restored when the `Io` is dropped, however the handler returned.
//!
//! ```rust
//! use jelcli::cli::io::Io;
//! use jelcli::cli::format::Color;
//! use jelcli::cli::Error;
//! use jelcli::transport::Timeout;
//!
//! fn status(io: &mut Io<'_>) -> Result<(), Error> {
//!     io.fmt().color = Some(Color::Green);
//!     io.print(format_args!("uptime: {} s", 42))?;
//!
//!     // keep the table together even if the logger is writing
//!     let mut out = io.lock_output(Timeout::Millis(100))?;
//!     out.const_print("row 1\r\n")?;
//!     out.const_print("row 2\r\n")?;
//!     Ok(())
//! }
//! ```

use core::any::Any;
use core::fmt::{self, Write as _};
use core::ops::{Deref, DerefMut};
use core::str::FromStr;

use heapless::String;

use super::Error;
use super::args::{ArgumentList, parse_decimal};
use super::config::MAX_STRING_LENGTH;
use super::format::Format;
use super::registry::{Command, Library, Registry};
use super::terminal::{History, Line};
use crate::transport::Timeout;

/// The terminal as seen by a running command.
///
/// Implemented by the session; tests and host tools may provide their own.
pub trait Console {
    /// Write text. Atomic on its own; part of a larger atomic sequence while
    /// the console is locked.
    fn write_str(&mut self, text: &str) -> Result<(), Error>;

    /// Read one line, showing `prompt`. `Ok(None)` means the timeout elapsed.
    fn read_line(&mut self, prompt: &str, timeout: Timeout) -> Result<Option<Line>, Error>;

    /// Take exclusive use of the output for a sequence of writes.
    fn lock(&mut self, timeout: Timeout) -> bool;

    /// Release the output lock.
    fn unlock(&mut self);

    /// Whether this console currently holds the output lock.
    fn is_locked(&self) -> bool;

    /// Committed lines, if the console keeps a history.
    fn history(&self) -> Option<&History> {
        None
    }
}

/// Static facts about the running invocation.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    /// Library of the command.
    pub library: &'static Library,
    /// The command itself.
    pub command: &'static Command,
    /// The registry the command was resolved from.
    pub registry: Option<&'a Registry>,
    /// Whether the session is authenticated.
    pub authenticated: bool,
    /// Default timeout for prompts.
    pub read_timeout: Timeout,
}

impl<'a> Invocation<'a> {
    /// Facts for `command` of `library`, without a registry.
    pub fn new(library: &'static Library, command: &'static Command) -> Self {
        Self {
            library,
            command,
            registry: None,
            authenticated: false,
            read_timeout: Timeout::Forever,
        }
    }
}

/// Per-invocation façade.
pub struct Io<'a> {
    args: ArgumentList<'a>,
    fmt: &'a mut Format,
    prior: Format,
    console: &'a mut dyn Console,
    invocation: Invocation<'a>,
}

impl<'a> Io<'a> {
    /// Build the façade. `fmt` is captured now and restored on drop.
    pub fn new(
        console: &'a mut dyn Console,
        fmt: &'a mut Format,
        args: ArgumentList<'a>,
        invocation: Invocation<'a>,
    ) -> Self {
        let prior = *fmt;
        Self {
            args,
            fmt,
            prior,
            console,
            invocation,
        }
    }

    /// Parsed arguments.
    pub fn args(&self) -> &ArgumentList<'a> {
        &self.args
    }

    /// Formatting state in effect for this invocation.
    pub fn fmt(&mut self) -> &mut Format {
        self.fmt
    }

    /// Facts about this invocation.
    pub fn invocation(&self) -> &Invocation<'a> {
        &self.invocation
    }

    /// The command's extension data, if it is a `T`.
    pub fn extension<T: Any>(&self) -> Option<&'static T> {
        let ext: &'static dyn Any = self.invocation.command.extension?;
        ext.downcast_ref::<T>()
    }

    /// Console history, if kept.
    pub fn history(&self) -> Option<&History> {
        self.console.history()
    }

    /// Formatted output of at most [`MAX_STRING_LENGTH`] bytes.
    ///
    /// Nothing is written if the expansion does not fit.
    pub fn print(&mut self, args: fmt::Arguments<'_>) -> Result<(), Error> {
        let mut text: String<MAX_STRING_LENGTH> = String::new();
        text.write_fmt(args).map_err(|_| Error::StringTooLong)?;
        let newline = self.fmt.auto_newline;
        self.emit(&text, newline)
    }

    /// Unformatted output of any length. Decoration still applies, the
    /// automatic newline does not.
    pub fn const_print(&mut self, text: &str) -> Result<(), Error> {
        self.emit(text, false)
    }

    fn emit(&mut self, text: &str, newline: bool) -> Result<(), Error> {
        let mut head: String<MAX_STRING_LENGTH> = String::new();
        let mut tail: String<8> = String::new();
        let source = self.invocation.library.name;
        self.fmt
            .write_head(source, &mut head)
            .map_err(|_| Error::StringTooLong)?;
        self.fmt
            .write_tail(newline, &mut tail)
            .map_err(|_| Error::StringTooLong)?;

        if head.is_empty() && tail.is_empty() {
            return self.console.write_str(text);
        }
        let take = !self.console.is_locked();
        if take && !self.console.lock(Timeout::Forever) {
            return Err(Error::OutputLockTimeout);
        }
        let result = self
            .console
            .write_str(&head)
            .and_then(|_| self.console.write_str(text))
            .and_then(|_| self.console.write_str(&tail));
        if take {
            self.console.unlock();
        }
        result
    }

    /// Take exclusive use of the output until the guard is dropped.
    ///
    /// Nested calls return a guard that does not release the outer lock.
    pub fn lock_output(&mut self, timeout: Timeout) -> Result<OutputGuard<'_, 'a>, Error> {
        let owns = !self.console.is_locked();
        if owns && !self.console.lock(timeout) {
            return Err(Error::OutputLockTimeout);
        }
        Ok(OutputGuard { io: self, owns })
    }

    /// Read one line with the default timeout.
    ///
    /// A timeout is reported as [`Error::ArgumentReadTimeout`].
    pub fn read_line(&mut self, prompt: &str) -> Result<Line, Error> {
        let timeout = self.invocation.read_timeout;
        self.read_line_timeout(prompt, timeout)
    }

    /// Read one line, waiting at most `timeout` for input.
    pub fn read_line_timeout(&mut self, prompt: &str, timeout: Timeout) -> Result<Line, Error> {
        self.console
            .read_line(prompt, timeout)?
            .ok_or(Error::ArgumentReadTimeout)
    }

    /// Prompt until the answer converts with `convert` or the timeout elapses.
    pub fn scan<T>(
        &mut self,
        prompt: &str,
        timeout: Timeout,
        convert: impl Fn(&str) -> Option<T>,
    ) -> Result<T, Error> {
        loop {
            let line = self.read_line_timeout(prompt, timeout)?;
            if let Some(value) = convert(line.trim()) {
                return Ok(value);
            }
            self.console.write_str("invalid value, try again\r\n")?;
        }
    }

    /// Prompt for a signed integer.
    pub fn read_signed(&mut self, prompt: &str, timeout: Timeout) -> Result<i64, Error> {
        self.scan(prompt, timeout, |s| i64::from_str(s).ok())
    }

    /// Prompt for an unsigned integer.
    pub fn read_unsigned(&mut self, prompt: &str, timeout: Timeout) -> Result<u64, Error> {
        self.scan(prompt, timeout, |s| u64::from_str(s).ok())
    }

    /// Prompt for a decimal number.
    pub fn read_double(&mut self, prompt: &str, timeout: Timeout) -> Result<f64, Error> {
        self.scan(prompt, timeout, parse_decimal)
    }

    /// Ask a yes/no question. Only `y` or `yes` (any case) is a yes; a
    /// timeout or failure is a no.
    pub fn get_confirmation(&mut self, prompt: &str, timeout: Timeout) -> bool {
        match self.console.read_line(prompt, timeout) {
            Ok(Some(line)) => {
                let answer = line.trim();
                answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
            }
            _ => false,
        }
    }

    /// [`get_confirmation`](Self::get_confirmation) with a stock prompt.
    pub fn wait_for_continue(&mut self, timeout: Timeout) -> bool {
        self.get_confirmation("continue? [y/N] ", timeout)
    }
}

impl Drop for Io<'_> {
    fn drop(&mut self) {
        *self.fmt = self.prior;
    }
}

impl fmt::Debug for Io<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Io")
            .field("library", &self.invocation.library.name)
            .field("command", &self.invocation.command.name)
            .field("args", &self.args)
            .field("fmt", &self.fmt)
            .finish_non_exhaustive()
    }
}

/// Exclusive use of the output channel; released on drop.
///
/// Dereferences to the [`Io`] it was taken from.
#[derive(Debug)]
pub struct OutputGuard<'g, 'a> {
    io: &'g mut Io<'a>,
    owns: bool,
}

impl<'a> Deref for OutputGuard<'_, 'a> {
    type Target = Io<'a>;

    fn deref(&self) -> &Io<'a> {
        self.io
    }
}

impl<'a> DerefMut for OutputGuard<'_, 'a> {
    fn deref_mut(&mut self) -> &mut Io<'a> {
        self.io
    }
}

impl Drop for OutputGuard<'_, '_> {
    fn drop(&mut self) {
        if self.owns {
            self.io.console.unlock();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::format::Color;
    use crate::cli::pool::StringPool;
    use std::collections::VecDeque;
    use std::string::String as StdString;
    use std::vec::Vec as StdVec;

    #[derive(Default)]
    struct ScriptedConsole {
        input: VecDeque<Option<&'static str>>,
        output: StdString,
        prompts: StdVec<StdString>,
        locked: bool,
        lock_calls: usize,
        refuse_lock: bool,
    }

    impl Console for ScriptedConsole {
        fn write_str(&mut self, text: &str) -> Result<(), Error> {
            self.output.push_str(text);
            Ok(())
        }

        fn read_line(&mut self, prompt: &str, _timeout: Timeout) -> Result<Option<Line>, Error> {
            self.prompts.push(prompt.into());
            Ok(self
                .input
                .pop_front()
                .flatten()
                .map(|s| Line::try_from(s).unwrap()))
        }

        fn lock(&mut self, _timeout: Timeout) -> bool {
            if self.refuse_lock || self.locked {
                return false;
            }
            self.locked = true;
            self.lock_calls += 1;
            true
        }

        fn unlock(&mut self) {
            self.locked = false;
        }

        fn is_locked(&self) -> bool {
            self.locked
        }
    }

    fn nop(_: &mut Io<'_>) -> Result<(), Error> {
        Ok(())
    }

    static THRESHOLD: u32 = 7;
    static LIB: Library = Library::new(
        "os",
        "",
        &[Command::new("test", "", "", nop).with_extension(&THRESHOLD)],
    );

    fn io<'a>(console: &'a mut ScriptedConsole, fmt: &'a mut Format) -> Io<'a> {
        Io::new(
            console,
            fmt,
            ArgumentList::new(),
            Invocation::new(&LIB, &LIB.commands[0]),
        )
    }

    #[test]
    fn print_is_bounded() {
        let mut console = ScriptedConsole::default();
        let mut fmt = Format::default();
        {
            let mut io = io(&mut console, &mut fmt);
            io.print(format_args!("value={}", 5)).unwrap();
            let long = "x".repeat(MAX_STRING_LENGTH + 1);
            assert_eq!(
                io.print(format_args!("{}", long)),
                Err(Error::StringTooLong)
            );
            io.const_print(&long).unwrap();
        }
        assert_eq!(
            console.output,
            format!("value=5\r\n{}", "x".repeat(MAX_STRING_LENGTH + 1))
        );
    }

    #[test]
    fn format_is_restored_on_drop() {
        let mut console = ScriptedConsole::default();
        let mut fmt = Format::default();
        let result = {
            let mut io = io(&mut console, &mut fmt);
            io.fmt().color = Some(Color::Red);
            io.fmt().prefix = true;
            io.print(format_args!("boom")).unwrap();
            Err::<(), _>(Error::ArgumentTypeMismatch)
        };
        assert!(result.is_err());
        assert_eq!(fmt, Format::default());
        assert_eq!(console.output, "\x1b[31m[os] boom\x1b[0m\r\n");
        assert!(!console.locked);
    }

    #[test]
    fn string_leases_are_released_with_the_io() {
        let pool = StringPool::new();
        let mut console = ScriptedConsole::default();
        let mut fmt = Format::default();
        {
            let args = crate::cli::args::parse("%s%s", &["a", "b"], &pool).unwrap();
            let io = Io::new(
                &mut console,
                &mut fmt,
                args,
                Invocation::new(&LIB, &LIB.commands[0]),
            );
            assert_eq!(io.args().string(1), Some("b"));
            assert_eq!(pool.free_count(), pool.capacity() - 2);
        }
        assert_eq!(pool.free_count(), pool.capacity());
    }

    #[test]
    fn lock_output_is_scoped_and_nests() {
        let mut console = ScriptedConsole::default();
        let mut fmt = Format::default();
        {
            let mut io = io(&mut console, &mut fmt);
            {
                let mut guard = io.lock_output(Timeout::Forever).unwrap();
                guard.fmt().bold = true;
                guard.print(format_args!("a")).unwrap();
                {
                    let mut inner = guard.lock_output(Timeout::Immediate).unwrap();
                    inner.const_print("b").unwrap();
                }
                assert!(guard.console.is_locked());
            }
            assert!(!io.console.is_locked());
        }
        assert_eq!(console.lock_calls, 1);
        assert_eq!(console.output, "\x1b[1ma\x1b[0m\r\n\x1b[1mb\x1b[0m");
    }

    #[test]
    fn lock_timeout_is_reported() {
        let mut console = ScriptedConsole {
            refuse_lock: true,
            ..Default::default()
        };
        let mut fmt = Format::default();
        let mut io = io(&mut console, &mut fmt);
        assert_eq!(
            io.lock_output(Timeout::Millis(1)).unwrap_err(),
            Error::OutputLockTimeout
        );
    }

    #[test]
    fn typed_prompts_retry_until_valid() {
        let mut console = ScriptedConsole {
            input: VecDeque::from([Some("abc"), Some(" -12 ")]),
            ..Default::default()
        };
        let mut fmt = Format::default();
        {
            let mut io = io(&mut console, &mut fmt);
            assert_eq!(io.read_signed("n? ", Timeout::Forever), Ok(-12));
        }
        assert_eq!(console.prompts, ["n? ", "n? "]);
        assert!(console.output.contains("invalid value"));
    }

    #[test]
    fn prompt_timeout_is_distinct_from_zero() {
        let mut console = ScriptedConsole {
            input: VecDeque::from([None, Some("2.5"), Some("-1"), Some("0")]),
            ..Default::default()
        };
        let mut fmt = Format::default();
        let mut io = io(&mut console, &mut fmt);
        assert_eq!(
            io.read_unsigned("", Timeout::Millis(10)),
            Err(Error::ArgumentReadTimeout)
        );
        assert_eq!(io.read_double("", Timeout::Forever), Ok(2.5));
        assert_eq!(io.read_unsigned("", Timeout::Forever), Ok(0));
    }

    #[test]
    fn confirmation() {
        let mut console = ScriptedConsole {
            input: VecDeque::from([Some("YES"), Some("y"), Some("nope"), None, Some("")]),
            ..Default::default()
        };
        let mut fmt = Format::default();
        let mut io = io(&mut console, &mut fmt);
        assert!(io.get_confirmation("sure? ", Timeout::Forever));
        assert!(io.wait_for_continue(Timeout::Forever));
        assert!(!io.get_confirmation("sure? ", Timeout::Forever));
        assert!(!io.get_confirmation("sure? ", Timeout::Millis(1)));
        assert!(!io.wait_for_continue(Timeout::Forever));
    }

    #[test]
    fn extension_downcasts() {
        let mut console = ScriptedConsole::default();
        let mut fmt = Format::default();
        let io = io(&mut console, &mut fmt);
        assert_eq!(io.extension::<u32>(), Some(&7));
        assert_eq!(io.extension::<i8>(), None);
    }
}
