//! Libraries every CLI carries: `cli` for discovery and `tty` for the terminal.
//!
//! | Line                         | Effect                                        |
//! |------------------------------|-----------------------------------------------|
//! | `cli help`                   | list the registered libraries                 |
//! | `cli help <library>`         | list the commands of a library                |
//! | `cli help <library> <cmd>`   | show a command's usage and help text          |
//! | `tty history`                | print the history, oldest first               |
//! | `tty clear`                  | clear the screen                              |

use super::Error;
use super::args::ParamSpec;
use super::io::Io;
use super::registry::{Command, Library, Registry};
use super::terminal::Line;
use crate::transport::Timeout;

/// Column the help text starts in.
const HELP_COLUMN: &str = "              ";

static CLI: Library = Library::new(
    "cli",
    "Command line engine",
    &[Command::new(
        "help",
        "%?s%?s",
        "List libraries and commands [library [command]]",
        help,
    )],
);

static TTY: Library = Library::new(
    "tty",
    "Terminal",
    &[
        Command::new("history", "", "Print recent lines", history),
        Command::new("clear", "", "Clear the screen", clear),
    ],
);

/// Register the `cli` and `tty` libraries.
pub fn register(registry: &mut Registry) -> Result<(), Error> {
    registry.register_system(&CLI)?;
    registry.register_system(&TTY)
}

fn entry(io: &mut Io<'_>, name: &str, help: &str) -> Result<(), Error> {
    io.const_print("  ")?;
    io.const_print(name)?;
    let pad = HELP_COLUMN.len().saturating_sub(name.len()).max(1);
    io.const_print(&HELP_COLUMN[..pad])?;
    io.const_print(help)?;
    io.const_print("\r\n")
}

fn help(io: &mut Io<'_>) -> Result<(), Error> {
    let invocation = *io.invocation();
    let registry = invocation.registry.ok_or(Error::NotFound)?;
    let library = match io.args().string(0) {
        Some(name) => Some(registry.library(name).ok_or(Error::NotFound)?),
        None => None,
    };
    let command = match (library, io.args().string(1)) {
        (Some(library), Some(name)) => Some(
            library
                .command(name)
                .filter(|c| c.permits(invocation.authenticated))
                .ok_or(Error::NotFound)?,
        ),
        _ => None,
    };

    let mut out = io.lock_output(Timeout::Forever)?;
    match (library, command) {
        (None, _) => {
            for library in registry.libraries() {
                entry(&mut out, library.name, library.help)?;
            }
        }
        (Some(library), None) => {
            out.const_print(library.help)?;
            out.const_print("\r\n")?;
            for command in library
                .commands
                .iter()
                .filter(|c| c.permits(invocation.authenticated))
            {
                entry(&mut out, command.name, command.help)?;
            }
        }
        (Some(library), Some(command)) => {
            out.const_print("usage: ")?;
            out.const_print(library.name)?;
            out.const_print(" ")?;
            out.const_print(command.name)?;
            let spec = ParamSpec::parse(command.spec)?;
            for descriptor in spec.descriptors() {
                let (open, close) = if descriptor.optional {
                    (" [", "]")
                } else {
                    (" <", ">")
                };
                out.const_print(open)?;
                out.const_print(descriptor.kind.name())?;
                out.const_print(close)?;
            }
            out.const_print("\r\n  ")?;
            out.const_print(command.help)?;
            out.const_print("\r\n")?;
        }
    }
    Ok(())
}

fn history(io: &mut Io<'_>) -> Result<(), Error> {
    let count = io.history().map_or(0, |h| h.len());
    for age in (0..count).rev() {
        let line: Option<Line> = io.history().and_then(|h| h.newest(age)).cloned();
        if let Some(line) = line {
            io.print(format_args!("{:>3}  {}", count - age, line))?;
        }
    }
    Ok(())
}

fn clear(io: &mut Io<'_>) -> Result<(), Error> {
    io.const_print("\x1b[2J\x1b[H")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::args;
    use crate::cli::format::Format;
    use crate::cli::io::{Console, Invocation};
    use crate::cli::pool::StringPool;
    use crate::cli::terminal::History;
    use std::string::String as StdString;

    struct Capture {
        output: StdString,
        history: History,
        locked: bool,
    }

    impl Capture {
        fn new() -> Self {
            Self {
                output: StdString::new(),
                history: History::new(4),
                locked: false,
            }
        }
    }

    impl Console for Capture {
        fn write_str(&mut self, text: &str) -> Result<(), Error> {
            self.output.push_str(text);
            Ok(())
        }

        fn read_line(&mut self, _: &str, _: Timeout) -> Result<Option<Line>, Error> {
            Ok(None)
        }

        fn lock(&mut self, _: Timeout) -> bool {
            self.locked = true;
            true
        }

        fn unlock(&mut self) {
            self.locked = false;
        }

        fn is_locked(&self) -> bool {
            self.locked
        }

        fn history(&self) -> Option<&History> {
            Some(&self.history)
        }
    }

    fn nop(_: &mut Io<'_>) -> Result<(), Error> {
        Ok(())
    }

    static OS: Library = Library::new(
        "os",
        "Operating system",
        &[
            Command::new("reboot", "%?u%?s", "Restart after [delay] seconds", nop),
            Command::new("erase", "%u", "Erase a sector", nop).restricted(),
        ],
    );

    fn run(
        console: &mut Capture,
        registry: &Registry,
        library: &'static Library,
        command: &str,
        tokens: &[&str],
        authenticated: bool,
    ) -> Result<(), Error> {
        let pool = StringPool::new();
        let command = library.command(command).unwrap();
        let args = args::parse(command.spec, tokens, &pool).unwrap();
        let mut fmt = Format::default();
        let invocation = Invocation {
            registry: Some(registry),
            authenticated,
            ..Invocation::new(library, command)
        };
        let mut io = Io::new(console, &mut fmt, args, invocation);
        (command.handler)(&mut io)
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        register(&mut registry).unwrap();
        registry.register_system(&OS).unwrap();
        registry
    }

    #[test]
    fn help_lists_libraries() {
        let registry = registry();
        let mut console = Capture::new();
        run(&mut console, &registry, &CLI, "help", &[], false).unwrap();
        assert!(console.output.contains("  cli           Command line engine\r\n"));
        assert!(console.output.contains("  os            Operating system\r\n"));
        assert!(!console.locked);
    }

    #[test]
    fn help_hides_restricted_commands() {
        let registry = registry();
        let mut console = Capture::new();
        run(&mut console, &registry, &CLI, "help", &["os"], false).unwrap();
        assert!(console.output.contains("reboot"));
        assert!(!console.output.contains("erase"));

        let mut console = Capture::new();
        run(&mut console, &registry, &CLI, "help", &["os"], true).unwrap();
        assert!(console.output.contains("erase"));

        let mut console = Capture::new();
        assert_eq!(
            run(&mut console, &registry, &CLI, "help", &["os", "erase"], false),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn help_shows_usage() {
        let registry = registry();
        let mut console = Capture::new();
        run(&mut console, &registry, &CLI, "help", &["os", "reboot"], false).unwrap();
        assert_eq!(
            console.output,
            "usage: os reboot [uint] [string]\r\n  Restart after [delay] seconds\r\n"
        );
    }

    #[test]
    fn history_oldest_first() {
        let registry = registry();
        let mut console = Capture::new();
        console.history.push(Line::try_from("os reboot").unwrap());
        console.history.push(Line::try_from("tty history").unwrap());
        run(&mut console, &registry, &TTY, "history", &[], false).unwrap();
        assert_eq!(console.output, "  1  os reboot\r\n  2  tty history\r\n");
    }

    #[test]
    fn clear_screen() {
        let registry = registry();
        let mut console = Capture::new();
        run(&mut console, &registry, &TTY, "clear", &[], false).unwrap();
        assert_eq!(console.output, "\x1b[2J\x1b[H");
    }
}
