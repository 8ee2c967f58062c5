//! Libraries of commands and their lookup.
//!
//! Commands are grouped into named [`Library`] values, usually defined as
//! `static` items so they live in flash. A [`Registry`] holds references to the
//! libraries known to one CLI and resolves `<library> <command>` lines.
//!
//! ```rust
//! use jelcli::cli::io::Io;
//! use jelcli::cli::registry::{Command, Library, Registry};
//! use jelcli::cli::Error;
//!
//! fn blink(io: &mut Io<'_>) -> Result<(), Error> {
//!     let times = io.args().unsigned(0).unwrap_or(1);
//!     io.print(format_args!("blinking {} times", times))
//! }
//!
//! static LED: Library = Library::new(
//!     "led",
//!     "Status LED control",
//!     &[Command::new("blink", "%?u", "Blink the LED [times]", blink)],
//! );
//!
//! let mut registry = Registry::new();
//! registry.register(&LED).unwrap();
//! let found = registry.resolve(&["led", "blink", "3"]).unwrap();
//! assert_eq!(found.command.name, "blink");
//! assert_eq!(found.args, &["3"]);
//! ```

use core::any::Any;

use heapless::Vec;

use super::Error;
use super::args::ParamSpec;
use super::config::{MAX_LIBRARIES, RESERVED_LIBRARY_NAMES};
use super::io::Io;
use crate::logging::{info, warn};

/// Function signature for command handlers.
///
/// The handler reads its parsed arguments from the [`Io`] façade and writes
/// its output through it. Returning an error prints it as a one-line message.
pub type CommandFn = fn(io: &mut Io<'_>) -> Result<(), Error>;

/// Who may see and run a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Visible to every session.
    Unrestricted,
    /// Visible only to authenticated sessions.
    Restricted,
}

/// One command of a [`Library`].
#[derive(Clone, Copy)]
pub struct Command {
    /// Name typed after the library name. Printable ASCII, no whitespace.
    pub name: &'static str,
    /// Parameter specification, see [`args`](super::args).
    pub spec: &'static str,
    /// One-line help text.
    pub help: &'static str,
    /// The function run for this command.
    pub handler: CommandFn,
    /// Access level.
    pub permission: Permission,
    /// Opaque data for the handler, reachable through [`Io::extension`].
    pub extension: Option<&'static (dyn Any + Sync)>,
}

impl Command {
    /// An unrestricted command without extension data.
    pub const fn new(
        name: &'static str,
        spec: &'static str,
        help: &'static str,
        handler: CommandFn,
    ) -> Self {
        Self {
            name,
            spec,
            help,
            handler,
            permission: Permission::Unrestricted,
            extension: None,
        }
    }

    /// The same command, visible only to authenticated sessions.
    pub const fn restricted(mut self) -> Self {
        self.permission = Permission::Restricted;
        self
    }

    /// The same command, carrying `extension` for its handler.
    pub const fn with_extension(mut self, extension: &'static (dyn Any + Sync)) -> Self {
        self.extension = Some(extension);
        self
    }

    /// Whether a session with the given authentication state may see this command.
    pub fn permits(&self, authenticated: bool) -> bool {
        authenticated || self.permission == Permission::Unrestricted
    }
}

impl core::fmt::Debug for Command {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("spec", &self.spec)
            .field("permission", &self.permission)
            .finish_non_exhaustive()
    }
}

/// A named, immutable group of commands.
#[derive(Debug)]
pub struct Library {
    /// Name typed first on a command line.
    pub name: &'static str,
    /// One-line help text.
    pub help: &'static str,
    /// Commands in lookup order.
    pub commands: &'static [Command],
}

impl Library {
    /// Define a library.
    pub const fn new(name: &'static str, help: &'static str, commands: &'static [Command]) -> Self {
        Self {
            name,
            help,
            commands,
        }
    }

    /// First command called `name`, regardless of permission.
    pub fn command(&self, name: &str) -> Option<&'static Command> {
        self.commands.iter().find(|c| c.name == name)
    }
}

/// A resolved command line.
#[derive(Debug, Clone, Copy)]
pub struct Resolved<'t> {
    /// Library the command belongs to.
    pub library: &'static Library,
    /// The matched command.
    pub command: &'static Command,
    /// Tokens after the command name: the candidate arguments.
    pub args: &'t [&'t str],
}

/// Printable ASCII without spaces.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_graphic())
}

/// Library names also may not start with a special character; those prefixes are reserved.
fn is_valid_library_name(name: &str) -> bool {
    is_valid_name(name) && name.as_bytes()[0].is_ascii_alphanumeric()
}

/// The libraries known to one CLI.
#[derive(Debug, Default)]
pub struct Registry {
    libraries: Vec<&'static Library, MAX_LIBRARIES>,
}

impl Registry {
    /// An empty registry.
    pub const fn new() -> Self {
        Self {
            libraries: Vec::new(),
        }
    }

    /// Register an application library.
    ///
    /// # Errors
    ///
    /// * [`Error::DuplicateLibraryName`] - the name is taken or reserved
    /// * [`Error::InvalidName`] - the library or one of its commands is badly named
    /// * [`Error::InvalidSpecification`] / [`Error::MaxGlobalArgsExceeded`] -
    ///   a command's parameter specification is unusable
    /// * [`Error::RegistryFull`] - no room for another library
    pub fn register(&mut self, library: &'static Library) -> Result<(), Error> {
        if RESERVED_LIBRARY_NAMES.contains(&library.name) {
            warn!("library name '{}' is reserved", library.name);
            return Err(Error::DuplicateLibraryName);
        }
        self.add(library)
    }

    /// Register a runtime library (`tty`, `cli`, `os`, `hw`, `jel`).
    ///
    /// Same checks as [`register`](Self::register) except that reserved names
    /// are allowed. Application code should use `register`.
    pub fn register_system(&mut self, library: &'static Library) -> Result<(), Error> {
        self.add(library)
    }

    fn add(&mut self, library: &'static Library) -> Result<(), Error> {
        if !is_valid_library_name(library.name) {
            warn!("invalid library name '{}'", library.name);
            return Err(Error::InvalidName);
        }
        if self.library(library.name).is_some() {
            warn!("library '{}' already registered", library.name);
            return Err(Error::DuplicateLibraryName);
        }
        for (i, command) in library.commands.iter().enumerate() {
            if !is_valid_name(command.name) {
                warn!("invalid command name in library '{}'", library.name);
                return Err(Error::InvalidName);
            }
            if let Err(e) = ParamSpec::parse(command.spec) {
                warn!("bad specification for '{} {}'", library.name, command.name);
                return Err(e);
            }
            if library.commands[..i].iter().any(|c| c.name == command.name) {
                warn!(
                    "'{} {}' is shadowed by an earlier command",
                    library.name, command.name
                );
            }
        }
        self.libraries
            .push(library)
            .map_err(|_| Error::RegistryFull)?;
        info!(
            "registered library '{}' ({} commands)",
            library.name,
            library.commands.len()
        );
        Ok(())
    }

    /// Registered libraries in registration order.
    pub fn libraries(&self) -> impl Iterator<Item = &'static Library> + '_ {
        self.libraries.iter().copied()
    }

    /// The library called `name`.
    pub fn library(&self, name: &str) -> Option<&'static Library> {
        self.libraries.iter().copied().find(|l| l.name == name)
    }

    /// Resolve `<library> <command> [args...]`, ignoring permissions.
    ///
    /// # Errors
    ///
    /// * [`Error::InsufficientTokens`] - fewer than two tokens
    /// * [`Error::NotFound`] - no such library or command
    pub fn resolve<'t>(&self, tokens: &'t [&'t str]) -> Result<Resolved<'t>, Error> {
        if tokens.len() < 2 {
            return Err(Error::InsufficientTokens);
        }
        let library = self.library(tokens[0]).ok_or(Error::NotFound)?;
        Self::resolve_in(library, &tokens[1..])
    }

    /// Resolve `<command> [args...]` inside one library.
    pub fn resolve_in<'t>(
        library: &'static Library,
        tokens: &'t [&'t str],
    ) -> Result<Resolved<'t>, Error> {
        let (name, args) = tokens.split_first().ok_or(Error::InsufficientTokens)?;
        let command = library.command(name).ok_or(Error::NotFound)?;
        Ok(Resolved {
            library,
            command,
            args,
        })
    }

    /// Restricted commands are invisible to unauthenticated sessions.
    pub fn permission_check(command: &Command, authenticated: bool) -> bool {
        command.permits(authenticated)
    }

    /// [`resolve`](Self::resolve) followed by the permission check; a hidden
    /// command reports [`Error::NotFound`].
    pub fn resolve_visible<'t>(
        &self,
        tokens: &'t [&'t str],
        authenticated: bool,
    ) -> Result<Resolved<'t>, Error> {
        let found = self.resolve(tokens)?;
        if Self::permission_check(found.command, authenticated) {
            Ok(found)
        } else {
            Err(Error::NotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nop(_: &mut Io<'_>) -> Result<(), Error> {
        Ok(())
    }

    fn other(_: &mut Io<'_>) -> Result<(), Error> {
        Err(Error::NotFound)
    }

    static SENSORS: Library = Library::new(
        "sensors",
        "Sensor access",
        &[
            Command::new("read", "%u", "Read a channel", nop),
            Command::new("calibrate", "%?f", "Calibrate", nop).restricted(),
            Command::new("read", "", "Shadowed", other),
        ],
    );

    static RESERVED: Library = Library::new("os", "Not allowed", &[]);
    static BAD_NAME: Library = Library::new("-x", "Not allowed", &[]);
    static BAD_COMMAND: Library =
        Library::new("bad", "", &[Command::new("two words", "", "", nop)]);
    static BAD_SPEC: Library = Library::new("spec", "", &[Command::new("c", "%?u%u", "", nop)]);
    static THRESHOLD: u32 = 42;
    static WITH_EXT: Library = Library::new(
        "ext",
        "",
        &[Command::new("c", "", "", nop).with_extension(&THRESHOLD)],
    );

    #[test]
    fn register_and_resolve() {
        let mut registry = Registry::new();
        registry.register(&SENSORS).unwrap();

        let found = registry.resolve(&["sensors", "read", "4"]).unwrap();
        assert_eq!(found.library.name, "sensors");
        assert_eq!(found.command.help, "Read a channel");
        assert_eq!(found.args, &["4"]);

        assert_eq!(
            registry.resolve(&["sensors"]).unwrap_err(),
            Error::InsufficientTokens
        );
        assert_eq!(
            registry.resolve(&["sensors", "write"]).unwrap_err(),
            Error::NotFound
        );
        assert_eq!(
            registry.resolve(&["Sensors", "read"]).unwrap_err(),
            Error::NotFound
        );
    }

    #[test]
    fn first_match_wins() {
        let mut registry = Registry::new();
        registry.register(&SENSORS).unwrap();
        let found = registry.resolve(&["sensors", "read"]).unwrap();
        assert_eq!(found.command.spec, "%u");
    }

    #[test]
    fn restricted_commands_are_invisible() {
        let mut registry = Registry::new();
        registry.register(&SENSORS).unwrap();

        assert_eq!(
            registry
                .resolve_visible(&["sensors", "calibrate"], false)
                .unwrap_err(),
            Error::NotFound
        );
        assert!(registry.resolve_visible(&["sensors", "calibrate"], true).is_ok());
        assert!(registry.resolve_visible(&["sensors", "read"], false).is_ok());
    }

    #[test]
    fn registration_rejects_bad_libraries() {
        let mut registry = Registry::new();
        registry.register(&SENSORS).unwrap();
        assert_eq!(registry.register(&SENSORS), Err(Error::DuplicateLibraryName));
        assert_eq!(registry.register(&RESERVED), Err(Error::DuplicateLibraryName));
        assert_eq!(registry.register(&BAD_NAME), Err(Error::InvalidName));
        assert_eq!(registry.register(&BAD_COMMAND), Err(Error::InvalidName));
        assert_eq!(registry.register(&BAD_SPEC), Err(Error::InvalidSpecification));
        assert_eq!(registry.libraries().count(), 1);

        registry.register_system(&RESERVED).unwrap();
        assert!(registry.library("os").is_some());
    }

    #[test]
    fn extension_data_is_kept() {
        let mut registry = Registry::new();
        registry.register(&WITH_EXT).unwrap();
        let found = registry.resolve(&["ext", "c"]).unwrap();
        let ext: &dyn Any = found.command.extension.unwrap();
        assert_eq!(ext.downcast_ref::<u32>(), Some(&42));
    }
}
