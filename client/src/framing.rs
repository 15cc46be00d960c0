//! Newline framing over a byte stream
//!
//! Bytes are appended at the back and complete lines are handed out from a
//! read cursor at the front. Everything after the last newline is the pending
//! fragment and stays in the buffer until its terminator arrives.

/// Consumed prefix size that makes it worth moving the pending bytes down.
const COMPACT_THRESHOLD: usize = 8 * 1024;

#[derive(Debug, Default)]
pub struct LineBuffer {
    data: Vec<u8>,
    /// First byte that has not been handed out yet.
    cursor: usize,
    /// `cursor..scanned` is known to hold no newline.
    scanned: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            cursor: 0,
            scanned: 0,
        }
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.compact();
        self.data.extend_from_slice(bytes);
    }

    /// Bytes received but not yet handed out, including any complete lines
    /// still waiting to be drained.
    pub fn pending(&self) -> &[u8] {
        &self.data[self.cursor..]
    }

    pub fn pending_len(&self) -> usize {
        self.data.len() - self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.pending_len() == 0
    }

    pub fn has_complete_line(&mut self) -> bool {
        self.find_newline().is_some()
    }

    /// Takes the next complete line, without its terminator.
    pub fn next_line(&mut self) -> Option<&[u8]> {
        let newline = self.find_newline()?;
        let start = self.cursor;
        self.consume_through(newline);
        Some(&self.data[start..newline])
    }

    /// Hands every complete, non-blank line to `dispatch` in arrival order.
    ///
    /// A line leaves the buffer only once `dispatch` has returned for it. The
    /// trailing fragment is left untouched. Returns the number of lines
    /// dispatched.
    pub fn drain_lines<F>(&mut self, mut dispatch: F) -> usize
    where
        F: FnMut(&[u8]),
    {
        let mut dispatched = 0;
        while let Some(newline) = self.find_newline() {
            let line = &self.data[self.cursor..newline];
            if !line.iter().all(u8::is_ascii_whitespace) {
                dispatch(line);
                dispatched += 1;
            }
            self.consume_through(newline);
        }
        dispatched
    }

    fn find_newline(&mut self) -> Option<usize> {
        let start = self.scanned.max(self.cursor);
        match self.data[start..].iter().position(|&b| b == b'\n') {
            Some(offset) => Some(start + offset),
            None => {
                self.scanned = self.data.len();
                None
            }
        }
    }

    fn consume_through(&mut self, newline: usize) {
        self.cursor = newline + 1;
        self.scanned = self.cursor;
    }

    fn compact(&mut self) {
        if self.cursor == 0 {
            return;
        }

        if self.cursor == self.data.len() {
            self.data.clear();
            self.cursor = 0;
            self.scanned = 0;
        } else if self.cursor >= COMPACT_THRESHOLD && self.cursor * 2 >= self.data.len() {
            self.data.drain(..self.cursor);
            self.scanned -= self.cursor;
            self.cursor = 0;
        }
    }
}
