//! Character input with cheap mark/rewind over unbounded lookahead.
//!
//! Longest-match lexing scans arbitrarily far past the last confirmed token
//! boundary before rolling back, so the reader buffers every character read
//! since the mark (with its 1-based source position) in a growable buffer.
//! The buffer is trimmed whenever the mark advances.

/// A pull-based character source supporting rewind to a mark.
#[derive(Debug)]
pub struct CharReader<I> {
    source: I,
    /// Characters read since the mark, with their line/column.
    buffer: Vec<(char, u32, u32)>,
    /// Read position within `buffer`; `buffer.len()` means "at the frontier".
    cursor: usize,
    /// Position of the next character the underlying source will yield.
    line: u32,
    column: u32,
}

impl<I: Iterator<Item = char>> CharReader<I> {
    #[must_use]
    pub fn new(source: I) -> Self {
        Self {
            source,
            buffer: Vec::new(),
            cursor: 0,
            line: 1,
            column: 1,
        }
    }

    /// Reads the next character, from the buffer when rewound.
    pub fn read(&mut self) -> Option<char> {
        if self.cursor < self.buffer.len() {
            let (c, _, _) = self.buffer[self.cursor];
            self.cursor += 1;
            return Some(c);
        }
        let c = self.source.next()?;
        self.buffer.push((c, self.line, self.column));
        self.cursor += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Confirms everything read so far and moves the mark here.
    pub fn mark(&mut self) {
        self.buffer.drain(..self.cursor);
        self.cursor = 0;
    }

    /// Rewinds the read position to the mark.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Characters read since the mark.
    #[must_use]
    pub fn offset_from_mark(&self) -> usize {
        self.cursor
    }

    /// Position of the most recently read character; the frontier position
    /// when nothing has been read since the mark (used for the EOF token).
    #[must_use]
    pub fn position(&self) -> (u32, u32) {
        if self.cursor > 0 {
            let (_, line, column) = self.buffer[self.cursor - 1];
            (line, column)
        } else {
            (self.line, self.column)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewind_replays_from_mark() {
        let mut reader = CharReader::new("abcd".chars());
        assert_eq!(reader.read(), Some('a'));
        reader.mark();
        assert_eq!(reader.read(), Some('b'));
        assert_eq!(reader.read(), Some('c'));
        assert_eq!(reader.offset_from_mark(), 2);

        reader.rewind();
        assert_eq!(reader.read(), Some('b'));
        assert_eq!(reader.read(), Some('c'));
        assert_eq!(reader.read(), Some('d'));
        assert_eq!(reader.read(), None);
    }

    #[test]
    fn positions_are_one_based_and_track_newlines() {
        let mut reader = CharReader::new("a\nb".chars());
        reader.read();
        assert_eq!(reader.position(), (1, 1));
        reader.read();
        assert_eq!(reader.position(), (1, 2));
        reader.read();
        assert_eq!(reader.position(), (2, 1));
        reader.mark();
        // nothing read since the mark: frontier position
        assert_eq!(reader.read(), None);
        assert_eq!(reader.position(), (2, 2));
    }
}
