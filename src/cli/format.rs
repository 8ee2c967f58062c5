//! Output formatting state.
//!
//! A [`Format`] describes how command output is decorated. Only the mapping
//! onto ANSI SGR sequences lives here.

use core::fmt::{self, Write};

/// The sixteen ANSI foreground colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Color {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    BrightBlack,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
    BrightWhite,
}

impl Color {
    /// SGR foreground code.
    pub fn sgr(self) -> u8 {
        match self {
            Color::Black => 30,
            Color::Red => 31,
            Color::Green => 32,
            Color::Yellow => 33,
            Color::Blue => 34,
            Color::Magenta => 35,
            Color::Cyan => 36,
            Color::White => 37,
            Color::BrightBlack => 90,
            Color::BrightRed => 91,
            Color::BrightGreen => 92,
            Color::BrightYellow => 93,
            Color::BrightBlue => 94,
            Color::BrightMagenta => 95,
            Color::BrightCyan => 96,
            Color::BrightWhite => 97,
        }
    }
}

/// How output of a command is decorated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Format {
    /// Foreground color; `None` keeps the terminal default.
    pub color: Option<Color>,
    /// Bold text.
    pub bold: bool,
    /// Underlined text.
    pub underline: bool,
    /// End every `print` with a newline.
    pub auto_newline: bool,
    /// Start every `print` with `[<library>] `.
    pub prefix: bool,
    /// Emit no escape codes at all.
    pub plain: bool,
}

impl Default for Format {
    fn default() -> Self {
        Self {
            color: None,
            bold: false,
            underline: false,
            auto_newline: true,
            prefix: false,
            plain: false,
        }
    }
}

impl Format {
    fn styled(&self) -> bool {
        !self.plain && (self.color.is_some() || self.bold || self.underline)
    }

    /// Write what goes before the text: the SGR sequence and the source prefix.
    pub fn write_head<W: Write>(&self, source: &str, out: &mut W) -> fmt::Result {
        if self.styled() {
            out.write_str("\x1b[")?;
            let mut sep = "";
            if self.bold {
                out.write_str("1")?;
                sep = ";";
            }
            if self.underline {
                write!(out, "{}4", sep)?;
                sep = ";";
            }
            if let Some(color) = self.color {
                write!(out, "{}{}", sep, color.sgr())?;
            }
            out.write_char('m')?;
        }
        if self.prefix && !source.is_empty() {
            write!(out, "[{}] ", source)?;
        }
        Ok(())
    }

    /// Write what goes after the text: the SGR reset and the newline.
    pub fn write_tail<W: Write>(&self, newline: bool, out: &mut W) -> fmt::Result {
        if self.styled() {
            out.write_str("\x1b[0m")?;
        }
        if newline {
            out.write_str("\r\n")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decorate(format: &Format, text: &str) -> std::string::String {
        let mut out = std::string::String::new();
        format.write_head("os", &mut out).unwrap();
        out.push_str(text);
        format.write_tail(format.auto_newline, &mut out).unwrap();
        out
    }

    #[test]
    fn default_is_undecorated_line() {
        assert_eq!(decorate(&Format::default(), "hi"), "hi\r\n");
    }

    #[test]
    fn attributes_map_to_sgr() {
        let format = Format {
            color: Some(Color::BrightRed),
            bold: true,
            underline: true,
            prefix: true,
            auto_newline: false,
            ..Format::default()
        };
        assert_eq!(decorate(&format, "hi"), "\x1b[1;4;91m[os] hi\x1b[0m");

        let color_only = Format {
            color: Some(Color::Green),
            ..Format::default()
        };
        assert_eq!(decorate(&color_only, "ok"), "\x1b[32mok\x1b[0m\r\n");
    }

    #[test]
    fn plain_strips_codes_but_keeps_prefix() {
        let format = Format {
            color: Some(Color::Blue),
            bold: true,
            prefix: true,
            plain: true,
            ..Format::default()
        };
        assert_eq!(decorate(&format, "x"), "[os] x\r\n");
    }
}
