//! Line splitting for encoder output.
//!
//! Besides `\n` (with an optional `\r` before it), a bare `\r` also ends a
//! line. Encoders use it to overwrite their status line in place.

use std::io::{self, Read};

const READ_CHUNK: usize = 4096;

/// Find the next token in `data`.
///
/// Returns the number of bytes consumed and the token without its
/// terminator, or `None` when more input is needed. Precedence: a
/// `\n`-terminated line, then the remainder at end of input, then a line
/// ended by a bare `\r`. A status line ending in `\r` is emitted as soon
/// as it is buffered.
pub fn split_line(data: &[u8], at_eof: bool) -> Option<(usize, &[u8])> {
    if at_eof && data.is_empty() {
        return None;
    }
    if let Some(i) = data.iter().position(|&b| b == b'\n') {
        return Some((i + 1, drop_cr(&data[..i])));
    }
    if at_eof {
        return Some((data.len(), drop_cr(data)));
    }
    data.iter()
        .position(|&b| b == b'\r')
        .map(|i| (i + 1, &data[..i]))
}

fn drop_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Lazily yields lines from a reader. Invalid UTF-8 is replaced.
pub struct LineTokenizer<R> {
    reader: R,
    buf: Vec<u8>,
    eof: bool,
}

impl<R: Read> LineTokenizer<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(READ_CHUNK),
            eof: false,
        }
    }

    fn fill(&mut self) -> io::Result<()> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match self.reader.read(&mut chunk) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(());
                }
                Ok(n) => {
                    self.buf.extend_from_slice(&chunk[..n]);
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl<R: Read> Iterator for LineTokenizer<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((advance, token)) = split_line(&self.buf, self.eof) {
                let line = String::from_utf8_lossy(token).into_owned();
                self.buf.drain(..advance);
                return Some(Ok(line));
            }
            if self.eof {
                return None;
            }
            if let Err(e) = self.fill() {
                // A broken pipe ends the stream; whatever is buffered is
                // flushed on the next call.
                self.eof = true;
                return Some(Err(e));
            }
        }
    }
}
