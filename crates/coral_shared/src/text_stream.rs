//! Bounded UTF-8 character stream with lookahead and location tracking.
//!
//! The stream normalizes newlines on ingestion (CRLF and lone CR become
//! LF, as does FF), so consumers only ever see `\n` line endings. All
//! offsets are byte offsets into the normalized buffer.

use std::cell::RefCell;
use std::fmt::{self, Debug, Formatter};
use std::io::Read;

use crate::cancel::CancelToken;
use crate::errors::{Error, Result};

pub const CHAR_LF: char = '\u{000A}';
pub const CHAR_CR: char = '\u{000D}';
pub const CHAR_FF: char = '\u{000C}';

/// Defines a single character/element in the stream.
///
/// `StreamEnd` is denoted as a separate element, so is `StreamEmpty` to
/// indicate that the buffer is empty but not yet closed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Character {
    /// Standard UTF-8 character
    Ch(char),
    /// Stream buffer empty and closed
    StreamEnd,
    /// Stream buffer empty (but not closed)
    StreamEmpty,
}

use Character::*;

/// Converts the given character to a char. End-of-stream markers are
/// converted to 0x0000.
impl From<Character> for char {
    fn from(c: Character) -> Self {
        match c {
            Ch(c) => c,
            StreamEmpty | StreamEnd => 0x0000 as char,
        }
    }
}

impl From<&Character> for char {
    fn from(c: &Character) -> Self {
        (*c).into()
    }
}

impl fmt::Display for Character {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Ch(ch) => write!(f, "{ch}"),
            StreamEnd => write!(f, "StreamEnd"),
            StreamEmpty => write!(f, "StreamEmpty"),
        }
    }
}

impl Character {
    /// Returns true when the character is a whitespace
    pub fn is_whitespace(&self) -> bool {
        matches!(self, Ch(c) if c.is_whitespace())
    }

    /// Returns true when the character is a numerical
    pub fn is_numeric(&self) -> bool {
        matches!(self, Ch(c) if c.is_numeric())
    }
}

/// Location holds the start position of the given element in the data source
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Location {
    /// Line number, starting with 1
    pub line: usize,
    /// Column number, starting with 1
    pub column: usize,
    /// Byte offset, starting with 0
    pub offset: usize,
}

impl Default for Location {
    /// Default to line 1, column 1
    fn default() -> Self {
        Self::new(1, 1, 0)
    }
}

impl Location {
    /// Create a new Location
    #[must_use]
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self { line, column, offset }
    }
}

impl Debug for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "({}:{})", self.line, self.column)
    }
}

/// LocationHandler is a wrapper that will deal with line/column locations in the stream
pub struct LocationHandler {
    /// The start offset of the location. Normally this is 1:1, but can be
    /// different in case of inline streams
    pub start_location: Location,
    /// The current location of the stream
    pub cur_location: Location,
}

impl LocationHandler {
    /// Create a new LocationHandler. `start_location` can be set in case
    /// the stream is not starting at 1:1
    #[must_use]
    pub fn new(start_location: Location) -> Self {
        Self {
            start_location,
            cur_location: Location::default(),
        }
    }

    /// Sets the current location to the given location. This is useful when
    /// we want to return back into the stream to a certain location.
    pub fn set(&mut self, loc: Location) {
        self.cur_location = loc;
    }

    /// Will increase the current location based on the given character
    pub fn inc(&mut self, ch: Character) {
        match ch {
            Ch(CHAR_LF) => {
                self.cur_location.line += 1;
                self.cur_location.column = 1;
                self.cur_location.offset += 1;
            }
            Ch(c) => {
                self.cur_location.column += 1;
                self.cur_location.offset += c.len_utf8();
            }
            StreamEnd | StreamEmpty => {}
        }
    }
}

/// Generic stream trait
pub trait Stream {
    /// Read current character without advancing
    fn read(&self) -> Character;
    /// Read current character and advance to the next
    fn read_and_next(&self) -> Character;
    /// Look ahead in the stream
    fn look_ahead(&self, offset: usize) -> Character;
    /// Advance with 1 character
    fn next(&self);
    /// Advance with offset characters
    fn next_n(&self, offset: usize);
    /// Seek to a specific position in bytes
    fn seek_bytes(&self, offset: usize);
    /// Tell the current position in bytes
    fn tell_bytes(&self) -> usize;
    /// Closes the stream (no more data can be added)
    fn close(&mut self);
    /// Returns true when the stream is closed
    fn closed(&self) -> bool;
    /// Returns true when the stream is empty (but still open)
    fn exhausted(&self) -> bool;
    /// Returns true when the stream is closed and empty
    fn eof(&self) -> bool;
}

/// UTF-8 text stream over a normalized in-memory buffer, optionally
/// backed by a reader that is drained by [`TextStream::prefetch_all`].
pub struct TextStream {
    /// Actual buffer stream in u8 bytes (valid UTF-8, normalized newlines)
    buffer: Vec<u8>,
    /// Current position in the stream
    buffer_pos: RefCell<usize>,
    /// True when no more data can be added
    closed: bool,
    /// Reader that still has to be drained before parsing starts
    pending: Option<Box<dyn Read>>,
}

impl Default for TextStream {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for TextStream {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextStream")
            .field("len", &self.buffer.len())
            .field("pos", &self.buffer_pos.borrow())
            .field("closed", &self.closed)
            .finish()
    }
}

impl Stream for TextStream {
    fn read(&self) -> Character {
        let (ch, _) = self.read_with_length();
        ch
    }

    fn read_and_next(&self) -> Character {
        let (ch, len) = self.read_with_length();

        let mut pos = self.buffer_pos.borrow_mut();
        *pos += len;

        ch
    }

    /// Looks ahead in the stream, can use an optional index if we want to
    /// seek further in the stream.
    fn look_ahead(&self, offset: usize) -> Character {
        let original_pos = *self.buffer_pos.borrow();

        self.next_n(offset);
        let ch = self.read();

        let mut pos = self.buffer_pos.borrow_mut();
        *pos = original_pos;

        ch
    }

    fn next(&self) {
        self.next_n(1);
    }

    fn next_n(&self, offset: usize) {
        for _ in 0..offset {
            let (_, len) = self.read_with_length();
            if len == 0 {
                return;
            }

            let mut pos = self.buffer_pos.borrow_mut();
            *pos += len;
        }
    }

    fn seek_bytes(&self, offset: usize) {
        let mut pos = self.buffer_pos.borrow_mut();
        *pos = offset.min(self.buffer.len());
    }

    fn tell_bytes(&self) -> usize {
        *self.buffer_pos.borrow()
    }

    fn close(&mut self) {
        self.closed = true;
    }

    fn closed(&self) -> bool {
        self.closed
    }

    fn exhausted(&self) -> bool {
        *self.buffer_pos.borrow() >= self.buffer.len()
    }

    fn eof(&self) -> bool {
        self.closed() && self.exhausted()
    }
}

impl TextStream {
    /// Create a new, empty, open stream
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            buffer_pos: RefCell::new(0),
            closed: false,
            pending: None,
        }
    }

    /// Create a closed stream over the given string
    #[must_use]
    pub fn from_str(data: &str) -> Self {
        let mut stream = Self::new();
        stream.read_from_str(data);
        stream.close();
        stream
    }

    /// Create an open stream backed by a reader. The reader is drained by
    /// [`TextStream::prefetch_all`] before parsing starts.
    #[must_use]
    pub fn from_reader(reader: Box<dyn Read>) -> Self {
        let mut stream = Self::new();
        stream.pending = Some(reader);
        stream
    }

    /// Appends the given string to the buffer, normalizing newlines
    pub fn read_from_str(&mut self, data: &str) {
        let mut chars = data.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                CHAR_CR => {
                    if chars.peek() == Some(&CHAR_LF) {
                        chars.next();
                    }
                    self.buffer.push(CHAR_LF as u8);
                }
                CHAR_FF => {
                    self.buffer.push(CHAR_LF as u8);
                }
                _ => {
                    let mut utf8 = [0u8; 4];
                    self.buffer.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
                }
            }
        }
    }

    /// Returns the string between the given byte offsets
    #[must_use]
    pub fn slice(&self, start: usize, end: usize) -> String {
        let start = start.min(self.buffer.len());
        let end = end.clamp(start, self.buffer.len());

        String::from_utf8_lossy(&self.buffer[start..end]).into_owned()
    }

    /// Drains the pending reader, if any, into the buffer and closes the
    /// stream. This is the single suspension point of a parse: the
    /// cancellation token is only observed before this operation
    /// completes.
    pub async fn prefetch_all(&mut self, cancel: &CancelToken) -> Result<()> {
        if cancel.is_canceled() {
            return Err(Error::Canceled.into());
        }

        if let Some(mut reader) = self.pending.take() {
            let mut raw = Vec::new();
            reader.read_to_end(&mut raw).map_err(Error::Io)?;

            let text = String::from_utf8(raw).map_err(Error::Utf8)?;

            if cancel.is_canceled() {
                return Err(Error::Canceled.into());
            }

            self.read_from_str(&text);
        }

        self.close();
        Ok(())
    }

    // Read the character and return it together with the number of bytes
    // the character took
    fn read_with_length(&self) -> (Character, usize) {
        let pos = *self.buffer_pos.borrow();
        if pos >= self.buffer.len() {
            if self.closed {
                return (StreamEnd, 0);
            }
            return (StreamEmpty, 0);
        }

        let len = utf8_char_width(self.buffer[pos]).min(self.buffer.len() - pos);
        match std::str::from_utf8(&self.buffer[pos..pos + len]) {
            Ok(s) => match s.chars().next() {
                Some(c) => (Ch(c), len),
                None => (Ch(char::REPLACEMENT_CHARACTER), len),
            },
            Err(_) => (Ch(char::REPLACEMENT_CHARACTER), len),
        }
    }
}

/// Number of bytes a UTF-8 sequence takes based on its leading byte
fn utf8_char_width(b: u8) -> usize {
    match b {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        _ => 4,
    }
}
