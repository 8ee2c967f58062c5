//! One interactive CLI session on one transport.
//!
//! A [`Session`] owns the line editor and borrows everything shared: the
//! registry, the string pool and the output channel. The platform drives it by
//! calling [`poll`](Session::poll) from its console task:
//!
//! ```text
//!  transport ──bytes──▶ Terminal ──Submit(line)──▶ tokenize ─▶ resolve ─▶ parse
//!      ▲                   │ Changed / Bell                                  │
//!      │                   ▼                                                 ▼
//!      └──── OutputChannel ◀─────────────── Io ◀────────────── command handler
//! ```
//!
//! A line naming only a library (`os`) scopes the session to it, after which
//! `memuse` means `os memuse`; `..` leaves the scope.

use core::fmt::Write as _;

use heapless::String;

use super::args::{ParamSpec, parse_with};
use super::config::{Config, MAX_LINE_LENGTH, MAX_PROMPT_LENGTH};
use super::format::Format;
use super::io::{Console, Invocation, Io};
use super::pool::StringPool;
use super::registry::{Library, Registry, Resolved};
use super::terminal::{ASCII_BELL, Event, History, Line, Terminal};
use super::tokenizer::{Tokens, tokenize};
use super::{Error, ParseError};
use crate::logging::{debug, warn};
use crate::transport::{OutputChannel, RawMutex, Timeout, Transport};

/// Bytes requested from the transport per read.
const INPUT_CHUNK: usize = 32;

/// Room for a scope name in front of the configured prompt.
const PROMPT_CAPACITY: usize = MAX_PROMPT_LENGTH + 24;

/// Worst case of one redraw: prompt, line, selection and cursor escapes.
const REDRAW_CAPACITY: usize = PROMPT_CAPACITY + MAX_LINE_LENGTH + 32;

/// Room for an error report: the message plus a token of up to a full line.
const REPORT_CAPACITY: usize = MAX_LINE_LENGTH + 64;

/// Leaves the current library scope.
const LEAVE_SCOPE: &str = "..";

type Prompt = String<PROMPT_CAPACITY>;

/// What one call to [`Session::poll`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    /// The timeout elapsed; a partly edited line is kept.
    Idle,
    /// Page Up was pressed.
    PageUp,
    /// Page Down was pressed.
    PageDown,
    /// A line was dispatched, with its result. Failures were already printed.
    Executed(Result<(), Error>),
}

/// Bytes read from the transport but not fed to the editor yet.
#[derive(Debug)]
struct Input {
    buf: [u8; INPUT_CHUNK],
    pos: usize,
    len: usize,
}

impl Input {
    const fn new() -> Self {
        Self {
            buf: [0; INPUT_CHUNK],
            pos: 0,
            len: 0,
        }
    }
}

/// The editor and the channel, as seen by the session and by running commands.
struct Link<'s, T, M> {
    terminal: &'s mut Terminal,
    channel: &'s OutputChannel<T, M>,
    input: &'s mut Input,
    echo: bool,
    locked: bool,
}

impl<T: Transport, M: RawMutex> Link<'_, T, M> {
    fn write(&self, text: &str) -> Result<(), Error> {
        if self.locked {
            self.channel.write_locked(text)
        } else {
            self.channel.write_str(text)
        }
    }

    fn redraw(&self, prompt: &str) -> Result<(), Error> {
        let mut out: String<REDRAW_CAPACITY> = String::new();
        self.terminal
            .render(prompt, &mut out)
            .map_err(|_| Error::StringTooLong)?;
        self.write(&out)
    }

    fn bell(&self) -> Result<(), Error> {
        let mut buf = [0; 4];
        self.write(char::from(ASCII_BELL).encode_utf8(&mut buf))
    }

    /// Feed input to the editor until something the caller must handle
    /// happens. `None` means the transport stayed silent for `timeout`.
    fn next_event(&mut self, prompt: &str, timeout: Timeout) -> Result<Option<Event>, Error> {
        loop {
            if self.input.pos >= self.input.len {
                let n = self.channel.read(&mut self.input.buf, timeout)?;
                if n == 0 {
                    return Ok(None);
                }
                self.input.pos = 0;
                self.input.len = n.min(INPUT_CHUNK);
            }
            let byte = self.input.buf[self.input.pos];
            self.input.pos += 1;

            match self.terminal.feed(byte) {
                Event::None => {}
                Event::Changed if self.echo => self.redraw(prompt)?,
                Event::Changed => {}
                Event::Bell if self.echo => self.bell()?,
                Event::Bell => {}
                Event::Submit(line) => {
                    if self.echo {
                        self.write("\r\n")?;
                    }
                    return Ok(Some(Event::Submit(line)));
                }
                page => return Ok(Some(page)),
            }
        }
    }

    fn prompted_line(&mut self, prompt: &str, timeout: Timeout) -> Result<Option<Line>, Error> {
        if self.echo {
            self.redraw(prompt)?;
        } else {
            self.write(prompt)?;
        }
        loop {
            match self.next_event(prompt, timeout)? {
                Some(Event::Submit(line)) => return Ok(Some(line)),
                Some(_) => {}
                None => {
                    // Abandoned answers must not leak into the next command line.
                    self.terminal.reset();
                    self.write("\r\n")?;
                    return Ok(None);
                }
            }
        }
    }
}

impl<T: Transport, M: RawMutex> Console for Link<'_, T, M> {
    fn write_str(&mut self, text: &str) -> Result<(), Error> {
        self.write(text)
    }

    fn read_line(&mut self, prompt: &str, timeout: Timeout) -> Result<Option<Line>, Error> {
        let recording = self.terminal.set_recording(false);
        let result = self.prompted_line(prompt, timeout);
        self.terminal.set_recording(recording);
        result
    }

    fn lock(&mut self, timeout: Timeout) -> bool {
        if !self.locked {
            self.locked = self.channel.lock(timeout);
        }
        self.locked
    }

    fn unlock(&mut self) {
        if self.locked {
            self.channel.unlock();
            self.locked = false;
        }
    }

    fn is_locked(&self) -> bool {
        self.locked
    }

    fn history(&self) -> Option<&History> {
        Some(self.terminal.history())
    }
}

/// An interactive session: editor state, formatting state, authentication and
/// library scope for one user.
///
/// # Examples
///
/// ```rust,no_run
/// use jelcli::cli::config::Config;
/// use jelcli::cli::pool::StringPool;
/// use jelcli::cli::registry::Registry;
/// use jelcli::cli::session::Session;
/// use jelcli::transport::{OutputChannel, SpinMutex, Timeout, Transport};
///
/// fn run<T: Transport>(uart: T) -> ! {
///     static POOL: StringPool = StringPool::new();
///     let mut registry = Registry::new();
///     jelcli::cli::builtins::register(&mut registry).unwrap();
///
///     let channel = OutputChannel::new(uart, SpinMutex::new());
///     let mut session = Session::new(&registry, &channel, &POOL, Config::default());
///     session.start().ok();
///     loop {
///         let _ = session.poll(Timeout::Millis(50));
///     }
/// }
/// ```
#[derive(Debug)]
pub struct Session<'r, T, M> {
    terminal: Terminal,
    input: Input,
    registry: &'r Registry,
    channel: &'r OutputChannel<T, M>,
    pool: &'r StringPool,
    format: Format,
    config: Config,
    authenticated: bool,
    scope: Option<&'static Library>,
}

impl<'r, T: Transport, M: RawMutex> Session<'r, T, M> {
    /// A session that has not printed anything yet.
    pub fn new(
        registry: &'r Registry,
        channel: &'r OutputChannel<T, M>,
        pool: &'r StringPool,
        config: Config,
    ) -> Self {
        Self {
            terminal: Terminal::new(config.effective_history_depth()),
            input: Input::new(),
            registry,
            channel,
            pool,
            format: Format::default(),
            config,
            authenticated: false,
            scope: None,
        }
    }

    /// Runtime options.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The line editor.
    pub fn terminal(&self) -> &Terminal {
        &self.terminal
    }

    /// Formatting state commands start from.
    pub fn format(&self) -> &Format {
        &self.format
    }

    /// Change the formatting state commands start from.
    pub fn format_mut(&mut self) -> &mut Format {
        &mut self.format
    }

    /// Grant or revoke access to restricted commands.
    pub fn set_authenticated(&mut self, authenticated: bool) {
        debug!("session authenticated: {}", authenticated);
        self.authenticated = authenticated;
    }

    /// Whether restricted commands are visible.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// The library bare command names resolve in, if any.
    pub fn scope(&self) -> Option<&'static Library> {
        self.scope
    }

    fn link(&mut self) -> Link<'_, T, M> {
        Link {
            terminal: &mut self.terminal,
            channel: self.channel,
            input: &mut self.input,
            echo: self.config.echo,
            locked: false,
        }
    }

    fn prompt(&self) -> Prompt {
        let mut prompt = Prompt::new();
        if let Some(scope) = self.scope {
            if write!(prompt, "{}{}", scope.name, self.config.prompt).is_ok() {
                return prompt;
            }
            prompt.clear();
        }
        let _ = prompt.push_str(&self.config.prompt);
        prompt
    }

    /// Print the banner, if configured, and the first prompt.
    pub fn start(&mut self) -> Result<(), Error> {
        if !self.config.banner.is_empty() {
            self.channel.write_str(&self.config.banner)?;
            self.channel.write_str("\r\n")?;
        }
        self.show_prompt()
    }

    fn show_prompt(&mut self) -> Result<(), Error> {
        let prompt = self.prompt();
        let link = self.link();
        if link.echo {
            link.redraw(&prompt)
        } else {
            link.write(&prompt)
        }
    }

    /// Read until a line is finalized or the transport stays silent for
    /// `timeout`.
    ///
    /// A timeout returns `Ok(None)` and keeps the partly edited line, so the
    /// next call resumes exactly where editing stopped.
    pub fn read_line(&mut self, timeout: Timeout) -> Result<Option<Line>, Error> {
        let prompt = self.prompt();
        let mut link = self.link();
        loop {
            match link.next_event(&prompt, timeout)? {
                Some(Event::Submit(line)) => return Ok(Some(line)),
                Some(_) => {}
                None => return Ok(None),
            }
        }
    }

    /// Process input for at most `timeout` of silence, dispatching a finished
    /// line and printing the next prompt.
    ///
    /// Only transport failures are returned as `Err`; command failures are
    /// printed and reported through [`Activity::Executed`].
    pub fn poll(&mut self, timeout: Timeout) -> Result<Activity, Error> {
        let prompt = self.prompt();
        let event = self.link().next_event(&prompt, timeout)?;
        match event {
            None => Ok(Activity::Idle),
            Some(Event::PageUp) => Ok(Activity::PageUp),
            Some(Event::PageDown) => Ok(Activity::PageDown),
            Some(Event::Submit(line)) => {
                let result = self.dispatch(&line);
                if result == Err(Error::Transport) {
                    return Err(Error::Transport);
                }
                self.show_prompt()?;
                Ok(Activity::Executed(result))
            }
            Some(_) => Ok(Activity::Idle),
        }
    }

    /// Run one finalized line and print a one-line message if it fails.
    ///
    /// Blank lines do nothing.
    pub fn dispatch(&mut self, line: &str) -> Result<(), Error> {
        let tokens = tokenize(line);
        match self.execute(&tokens) {
            Ok(()) => Ok(()),
            Err(failure) => {
                debug!("'{}' failed: {}", line, failure.error);
                let token = failure.token.and_then(|i| tokens.get(i).copied());
                self.report(failure.error, token)?;
                Err(failure.error)
            }
        }
    }

    fn report(&self, error: Error, token: Option<&str>) -> Result<(), Error> {
        let mut message: String<REPORT_CAPACITY> = String::new();
        match token {
            Some(token) => write!(message, "error: {} '{}'", error, token),
            None => write!(message, "error: {}", error),
        }
        .map_err(|_| Error::StringTooLong)?;
        self.channel.write_str(&message)?;
        self.channel.write_str("\r\n")
    }

    /// Token indexes in the returned error refer to the whole line.
    fn execute(&mut self, tokens: &Tokens<'_>) -> Result<(), ParseError> {
        if tokens.is_empty() {
            return Ok(());
        }
        if tokens.overflowed() {
            return Err(ParseError::new(Error::TooManyArguments));
        }
        if self.change_scope(tokens) {
            return Ok(());
        }

        let found = self.resolve(tokens).map_err(ParseError::new)?;
        let offset = tokens.len() - found.args.len();
        let spec = ParamSpec::parse(found.command.spec).map_err(ParseError::new)?;
        let pool = self.pool;
        let args = parse_with(&spec, found.args, pool).map_err(|e| ParseError {
            error: e.error,
            token: e.token.map(|i| i + offset),
        })?;

        debug!("running '{} {}'", found.library.name, found.command.name);
        let invocation = Invocation {
            library: found.library,
            command: found.command,
            registry: Some(self.registry),
            authenticated: self.authenticated,
            read_timeout: self.config.read_timeout(),
        };
        let handler = found.command.handler;
        let mut link = Link {
            terminal: &mut self.terminal,
            channel: self.channel,
            input: &mut self.input,
            echo: self.config.echo,
            locked: false,
        };
        let result = {
            let mut io = Io::new(&mut link, &mut self.format, args, invocation);
            handler(&mut io)
        };
        if link.locked {
            warn!("'{}' left the output locked", found.command.name);
            link.unlock();
        }
        result.map_err(ParseError::new)
    }

    /// `..` leaves the scope; a lone library name enters it, unless the
    /// current scope has a visible command of that name.
    fn change_scope(&mut self, tokens: &[&str]) -> bool {
        let [token] = tokens else {
            return false;
        };
        if *token == LEAVE_SCOPE {
            self.scope = None;
            return true;
        }
        if let Some(scope) = self.scope {
            if scope
                .command(token)
                .is_some_and(|c| c.permits(self.authenticated))
            {
                return false;
            }
        }
        match self.registry.library(token) {
            Some(library) => {
                debug!("entering library '{}'", library.name);
                self.scope = Some(library);
                true
            }
            None => false,
        }
    }

    fn resolve<'t>(&self, tokens: &'t [&'t str]) -> Result<Resolved<'t>, Error> {
        if let Some(scope) = self.scope {
            if let Ok(found) = Registry::resolve_in(scope, tokens) {
                if found.command.permits(self.authenticated) {
                    return Ok(found);
                }
            }
        }
        self.registry.resolve_visible(tokens, self.authenticated)
    }
}
