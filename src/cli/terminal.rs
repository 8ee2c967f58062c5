//! Line-editing state machine.
//!
//! [`Terminal`] consumes raw bytes from a VT100-style terminal, one at a time,
//! and maintains the line being edited: cursor, selection, insert/overwrite
//! mode and a bounded history. It performs no I/O; every call to
//! [`feed`](Terminal::feed) returns an [`Event`] telling the caller whether to
//! redraw, ring the bell, or dispatch a finished line.
//!
//! # Escape decoding
//!
//! ```text
//!            ESC                 '[' / 'O'
//!   Idle ───────────▶ EscapeSeen ──────────▶ EscapeSequence
//!    ▲                    │ other byte          │ digits, ';' accumulate
//!    │                    ▼                     │
//!    └──────────────── (discard) ◀──────────────┘ final byte: act, back to Idle
//! ```
//!
//! | Input               | Key                         |
//! |---------------------|-----------------------------|
//! | `CSI A` / `CSI B`   | history older / newer       |
//! | `CSI C` / `CSI D`   | cursor right / left         |
//! | `ESC O A/B/C/D`     | shifted arrows (selection)  |
//! | `CSI 1;2 A/B/C/D`   | shifted arrows (xterm form) |
//! | `CSI 1~` `CSI H`    | Home                        |
//! | `CSI 2~`            | Insert (toggle mode)        |
//! | `CSI 3~`            | Delete                      |
//! | `CSI 4~` `CSI F`    | End                         |
//! | `CSI 5~` / `CSI 6~` | Page Up / Page Down         |
//! | `\r`, `\n`          | finalize line               |
//! | `0x7F`, `0x08`      | Backspace                   |

use core::fmt;
use core::ops::Range;

use heapless::{Deque, String, Vec};

use super::config::{MAX_HISTORY_DEPTH, MAX_LINE_LENGTH};
use crate::logging::trace;

/// A finalized (or recalled) line.
pub type Line = String<MAX_LINE_LENGTH>;

/// ASCII backspace character (0x08).
pub const ASCII_BACKSPACE: u8 = 0x08;
/// ASCII bell character (0x07).
pub const ASCII_BELL: u8 = 0x07;
/// ASCII line feed character (0x0A).
pub const ASCII_LF: u8 = 0x0A;
/// ASCII carriage return character (0x0D).
pub const ASCII_CR: u8 = 0x0D;
/// ASCII escape character (0x1B).
pub const ASCII_ESC: u8 = 0x1B;
/// ASCII delete character (0x7F).
pub const ASCII_DEL: u8 = 0x7F;

/// Longest CSI parameter string kept while decoding.
const MAX_ESCAPE_PARAMS: usize = 8;

/// Escape-decoder state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// No escape sequence in progress.
    Idle,
    /// `ESC` consumed, waiting for `[` or `O`.
    EscapeSeen,
    /// Accumulating the body of a CSI or SS3 sequence.
    EscapeSequence,
}

/// Insert or overwrite typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Typed characters are inserted at the cursor.
    Insert,
    /// Typed characters replace the character under the cursor.
    Overwrite,
}

/// A decoded key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Printable ASCII character.
    Char(u8),
    /// Carriage return or line feed.
    Enter,
    /// Delete before the cursor.
    Backspace,
    /// Delete under the cursor.
    Delete,
    /// Cursor left.
    Left,
    /// Cursor right.
    Right,
    /// Extend the selection one character left.
    ShiftLeft,
    /// Extend the selection one character right.
    ShiftRight,
    /// Extend the selection to the start of the line.
    ShiftUp,
    /// Extend the selection to the end of the line.
    ShiftDown,
    /// Recall an older history entry.
    Up,
    /// Recall a newer history entry.
    Down,
    /// Cursor to start of line.
    Home,
    /// Cursor to end of line.
    End,
    /// Toggle insert/overwrite.
    Insert,
    /// Page Up, left to the caller.
    PageUp,
    /// Page Down, left to the caller.
    PageDown,
}

/// What the caller should do after feeding a byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Nothing changed.
    None,
    /// The line, cursor, selection or mode changed; redraw.
    Changed,
    /// The input was refused (line full, nothing to recall).
    Bell,
    /// A line was finalized.
    Submit(Line),
    /// Page Up was pressed.
    PageUp,
    /// Page Down was pressed.
    PageDown,
}

/// Bounded ring of committed lines, oldest evicted first.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Deque<Line, MAX_HISTORY_DEPTH>,
    depth: usize,
}

impl History {
    /// A history keeping `depth` lines, at most [`MAX_HISTORY_DEPTH`].
    pub fn new(depth: usize) -> Self {
        Self {
            entries: Deque::new(),
            depth: depth.min(MAX_HISTORY_DEPTH),
        }
    }

    /// Number of stored lines.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configured depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Add a line, evicting the oldest one if the ring is full.
    pub fn push(&mut self, line: Line) {
        if self.depth == 0 {
            return;
        }
        while self.entries.len() >= self.depth {
            self.entries.pop_front();
            trace!("history: evicted oldest entry");
        }
        let _ = self.entries.push_back(line);
    }

    /// The `n`-th newest line, `0` being the most recent.
    pub fn newest(&self, n: usize) -> Option<&Line> {
        self.entries.iter().rev().nth(n)
    }

    /// Lines from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Line> {
        self.entries.iter()
    }

    /// Drop every stored line.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Per-session line editor.
#[derive(Debug, Clone)]
pub struct Terminal {
    buffer: Vec<u8, MAX_LINE_LENGTH>,
    cursor: usize,
    anchor: Option<usize>,
    mode: Mode,
    history: History,
    /// Index of the recalled entry (0 = newest); `None` while editing the present line.
    recall: Option<usize>,
    /// The in-progress line, saved when recall starts.
    present: Vec<u8, MAX_LINE_LENGTH>,
    state: State,
    ss3: bool,
    params: Vec<u8, MAX_ESCAPE_PARAMS>,
    last_was_cr: bool,
    /// Whether submitted lines go into the history.
    recording: bool,
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new(MAX_HISTORY_DEPTH)
    }
}

impl Terminal {
    /// A fresh editor keeping `history_depth` lines of history.
    pub fn new(history_depth: usize) -> Self {
        Self {
            buffer: Vec::new(),
            cursor: 0,
            anchor: None,
            mode: Mode::Insert,
            history: History::new(history_depth),
            recall: None,
            present: Vec::new(),
            state: State::Idle,
            ss3: false,
            params: Vec::new(),
            last_was_cr: false,
            recording: true,
        }
    }

    /// The line being edited.
    pub fn line(&self) -> &str {
        // Only printable ASCII is ever stored.
        core::str::from_utf8(&self.buffer).unwrap_or_default()
    }

    /// Cursor offset into the line.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Selected range of the line, if a non-empty selection is active.
    pub fn selection(&self) -> Option<Range<usize>> {
        let anchor = self.anchor?;
        let range = anchor.min(self.cursor)..anchor.max(self.cursor);
        if range.is_empty() { None } else { Some(range) }
    }

    /// Current typing mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Escape-decoder state.
    pub fn state(&self) -> State {
        self.state
    }

    /// Committed lines.
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Stop (or resume) storing submitted lines in the history.
    ///
    /// Answers to interactive prompts are not worth recalling.
    pub fn set_recording(&mut self, recording: bool) -> bool {
        core::mem::replace(&mut self.recording, recording)
    }

    /// Feed one raw byte.
    pub fn feed(&mut self, byte: u8) -> Event {
        let after_cr = core::mem::replace(&mut self.last_was_cr, byte == ASCII_CR);
        match self.state {
            State::Idle => match byte {
                ASCII_ESC => {
                    self.state = State::EscapeSeen;
                    Event::None
                }
                ASCII_LF if after_cr => Event::None,
                ASCII_CR | ASCII_LF => self.apply(Key::Enter),
                ASCII_DEL | ASCII_BACKSPACE => self.apply(Key::Backspace),
                0x20..=0x7E => self.apply(Key::Char(byte)),
                _ => Event::None,
            },
            State::EscapeSeen => {
                match byte {
                    b'[' | b'O' => {
                        self.state = State::EscapeSequence;
                        self.ss3 = byte == b'O';
                        self.params.clear();
                    }
                    _ => {
                        trace!("dropped malformed escape");
                        self.state = State::Idle;
                    }
                }
                Event::None
            }
            State::EscapeSequence => match byte {
                b'0'..=b'9' | b';' => {
                    if self.params.push(byte).is_err() {
                        trace!("dropped oversized escape");
                        self.state = State::Idle;
                    }
                    Event::None
                }
                0x40..=0x7E => {
                    self.state = State::Idle;
                    match self.decode(byte) {
                        Some(key) => self.apply(key),
                        None => {
                            trace!("dropped unknown escape terminator {}", byte);
                            Event::None
                        }
                    }
                }
                _ => {
                    trace!("dropped malformed escape");
                    self.state = State::Idle;
                    Event::None
                }
            },
        }
    }

    /// Feed a run of bytes, stopping at the first submitted line.
    ///
    /// Returns the number of bytes consumed and the last event.
    pub fn feed_all(&mut self, bytes: &[u8]) -> (usize, Event) {
        let mut last = Event::None;
        for (i, &byte) in bytes.iter().enumerate() {
            match self.feed(byte) {
                Event::None => {}
                submit @ Event::Submit(_) => return (i + 1, submit),
                event => last = event,
            }
        }
        (bytes.len(), last)
    }

    fn decode(&self, terminator: u8) -> Option<Key> {
        let params = core::str::from_utf8(&self.params).unwrap_or_default();
        if self.ss3 {
            return match terminator {
                b'A' => Some(Key::ShiftUp),
                b'B' => Some(Key::ShiftDown),
                b'C' => Some(Key::ShiftRight),
                b'D' => Some(Key::ShiftLeft),
                b'H' => Some(Key::Home),
                b'F' => Some(Key::End),
                _ => None,
            };
        }
        let shifted = params.split(';').nth(1) == Some("2");
        match (terminator, shifted) {
            (b'A', false) => Some(Key::Up),
            (b'B', false) => Some(Key::Down),
            (b'C', false) => Some(Key::Right),
            (b'D', false) => Some(Key::Left),
            (b'A', true) => Some(Key::ShiftUp),
            (b'B', true) => Some(Key::ShiftDown),
            (b'C', true) => Some(Key::ShiftRight),
            (b'D', true) => Some(Key::ShiftLeft),
            (b'H', _) => Some(Key::Home),
            (b'F', _) => Some(Key::End),
            (b'~', _) => match params {
                "1" | "7" => Some(Key::Home),
                "2" => Some(Key::Insert),
                "3" => Some(Key::Delete),
                "4" | "8" => Some(Key::End),
                "5" => Some(Key::PageUp),
                "6" => Some(Key::PageDown),
                _ => None,
            },
            _ => None,
        }
    }

    /// Apply a decoded key to the line.
    pub fn apply(&mut self, key: Key) -> Event {
        match key {
            Key::Char(c) => self.type_char(c),
            Key::Enter => Event::Submit(self.commit()),
            Key::Backspace => {
                if self.delete_selection() {
                    Event::Changed
                } else if self.cursor > 0 {
                    self.cursor -= 1;
                    self.remove(self.cursor..self.cursor + 1);
                    Event::Changed
                } else {
                    Event::None
                }
            }
            Key::Delete => {
                if self.delete_selection() {
                    Event::Changed
                } else if self.cursor < self.buffer.len() {
                    self.remove(self.cursor..self.cursor + 1);
                    Event::Changed
                } else {
                    Event::None
                }
            }
            Key::Left => self.move_to(self.cursor.saturating_sub(1), false),
            Key::Right => self.move_to((self.cursor + 1).min(self.buffer.len()), false),
            Key::Home => self.move_to(0, false),
            Key::End => self.move_to(self.buffer.len(), false),
            Key::ShiftLeft => self.move_to(self.cursor.saturating_sub(1), true),
            Key::ShiftRight => self.move_to((self.cursor + 1).min(self.buffer.len()), true),
            Key::ShiftUp => self.move_to(0, true),
            Key::ShiftDown => self.move_to(self.buffer.len(), true),
            Key::Insert => {
                self.mode = match self.mode {
                    Mode::Insert => Mode::Overwrite,
                    Mode::Overwrite => Mode::Insert,
                };
                Event::Changed
            }
            Key::Up => self.recall_older(),
            Key::Down => self.recall_newer(),
            Key::PageUp => Event::PageUp,
            Key::PageDown => Event::PageDown,
        }
    }

    fn type_char(&mut self, c: u8) -> Event {
        self.anchor = None;
        if self.mode == Mode::Overwrite && self.cursor < self.buffer.len() {
            self.buffer[self.cursor] = c;
        } else {
            if self.buffer.push(c).is_err() {
                return Event::Bell;
            }
            self.buffer[self.cursor..].rotate_right(1);
        }
        self.cursor += 1;
        Event::Changed
    }

    fn move_to(&mut self, target: usize, select: bool) -> Event {
        let had_selection = self.selection().is_some();
        if select {
            self.anchor.get_or_insert(self.cursor);
        } else {
            self.anchor = None;
        }
        let moved = target != self.cursor;
        self.cursor = target;
        if moved || had_selection != self.selection().is_some() {
            Event::Changed
        } else {
            Event::None
        }
    }

    fn delete_selection(&mut self) -> bool {
        match self.selection() {
            Some(range) => {
                self.cursor = range.start;
                self.remove(range);
                self.anchor = None;
                true
            }
            None => {
                self.anchor = None;
                false
            }
        }
    }

    fn remove(&mut self, range: Range<usize>) {
        let len = self.buffer.len();
        self.buffer.copy_within(range.end..len, range.start);
        self.buffer.truncate(len - range.len());
    }

    fn load(&mut self, text: &[u8]) {
        self.buffer.clear();
        // Both sides share MAX_LINE_LENGTH.
        let _ = self.buffer.extend_from_slice(text);
        self.cursor = self.buffer.len();
        self.anchor = None;
    }

    fn recall_older(&mut self) -> Event {
        let next = self.recall.map_or(0, |i| i + 1);
        let Some(entry) = self.history.newest(next) else {
            return Event::Bell;
        };
        let entry = entry.clone();
        if self.recall.is_none() {
            self.present = self.buffer.clone();
        }
        self.recall = Some(next);
        self.load(entry.as_bytes());
        Event::Changed
    }

    fn recall_newer(&mut self) -> Event {
        match self.recall {
            None => Event::Bell,
            Some(0) => {
                self.recall = None;
                let present = core::mem::take(&mut self.present);
                self.load(&present);
                Event::Changed
            }
            Some(i) => {
                self.recall = Some(i - 1);
                if let Some(entry) = self.history.newest(i - 1).cloned() {
                    self.load(entry.as_bytes());
                }
                Event::Changed
            }
        }
    }

    fn commit(&mut self) -> Line {
        let mut line = Line::new();
        let _ = line.push_str(self.line());
        if self.recording && !line.trim().is_empty() {
            self.history.push(line.clone());
        }
        self.reset();
        line
    }

    /// Clear the line and selection and return to the present history entry.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
        self.anchor = None;
        self.recall = None;
        self.present.clear();
        self.state = State::Idle;
        self.params.clear();
    }

    /// Draw the line for an ANSI terminal: return to column 0, prompt, text with
    /// the selection in reverse video, erase the rest, and put the cursor back.
    pub fn render<W: fmt::Write>(&self, prompt: &str, out: &mut W) -> fmt::Result {
        let line = self.line();
        out.write_char('\r')?;
        out.write_str(prompt)?;
        match self.selection() {
            Some(sel) => {
                out.write_str(&line[..sel.start])?;
                out.write_str("\x1b[7m")?;
                out.write_str(&line[sel.clone()])?;
                out.write_str("\x1b[27m")?;
                out.write_str(&line[sel.end..])?;
            }
            None => out.write_str(line)?,
        }
        out.write_str("\x1b[K")?;
        let back = line.len() - self.cursor;
        if back > 0 {
            write!(out, "\x1b[{}D", back)?;
        }
        Ok(())
    }
}
