//! Bounded line reading shared by the channel backends

use std::io::{self, BufRead, BufReader, Read};

/// Reads `\n`-terminated lines, splitting runs longer than `max` bytes
///
/// `\r\n` and `\n` terminators are stripped and invalid UTF-8 is replaced.
pub(crate) struct LineReader<R> {
    inner: BufReader<R>,
    max: usize,
    buf: Vec<u8>,
    split_pending: bool,
}

impl<R: Read> LineReader<R> {
    pub(crate) fn new(reader: R, max: usize) -> Self {
        Self {
            inner: BufReader::new(reader),
            max: max.max(1),
            buf: Vec::new(),
            split_pending: false,
        }
    }

    /// Next line, or `None` at end of stream
    pub(crate) fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            self.buf.clear();
            let n = (&mut self.inner)
                .take(self.max as u64)
                .read_until(b'\n', &mut self.buf)?;
            if n == 0 {
                return Ok(None);
            }

            let terminated = self.buf.last() == Some(&b'\n');

            // The newline that closes a line split at exactly `max` bytes
            if self.split_pending && terminated && self.buf.len() == 1 {
                self.split_pending = false;
                continue;
            }
            self.split_pending = !terminated && n == self.max;

            if terminated {
                self.buf.pop();
                if self.buf.last() == Some(&b'\r') {
                    self.buf.pop();
                }
            }
            return Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()));
        }
    }
}
