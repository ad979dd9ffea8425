//! Console writer that keeps in-place progress lines and log lines apart.

use std::io::{self, Write};

/// Wraps a console and terminates each chunk written through it.
///
/// A chunk whose last `\r` comes after its last `\n` is an in-place
/// progress update and is written as is. Any other chunk gets a trailing
/// newline, and a leading one when the previous chunk was a progress update.
#[derive(Debug)]
pub struct RedrawWriter<W> {
    inner: W,
    last_was_progress: bool,
}

impl<W: Write> RedrawWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            last_was_progress: false,
        }
    }

    /// Write one complete chunk.
    pub fn write_chunk(&mut self, chunk: &str) -> io::Result<()> {
        let progress = is_progress(chunk);
        if progress {
            self.inner.write_all(chunk.as_bytes())?;
        } else {
            if self.last_was_progress {
                self.inner.write_all(b"\n")?;
            }
            self.inner.write_all(chunk.as_bytes())?;
            if !chunk.ends_with('\n') {
                self.inner.write_all(b"\n")?;
            }
        }
        self.last_was_progress = progress;
        self.inner.flush()
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

fn is_progress(chunk: &str) -> bool {
    match (chunk.rfind('\r'), chunk.rfind('\n')) {
        (Some(cr), Some(lf)) => cr > lf,
        (Some(_), None) => true,
        _ => false,
    }
}

impl<W: Write> Write for RedrawWriter<W> {
    /// Each call is treated as one chunk; callers that format in pieces
    /// should build the chunk first and use [`RedrawWriter::write_chunk`].
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_chunk(&String::from_utf8_lossy(buf))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written(chunks: &[&str]) -> String {
        let mut writer = RedrawWriter::new(Vec::new());
        for chunk in chunks {
            writer.write_chunk(chunk).unwrap();
        }
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn test_log_after_progress_starts_on_new_line() {
        assert_eq!(
            written(&["frame=10\r", "done"]),
            "frame=10\r\ndone\n"
        );
    }

    #[test]
    fn test_plain_chunks_gain_one_newline() {
        assert_eq!(written(&["one", "two"]), "one\ntwo\n");
        assert_eq!(written(&["already\n"]), "already\n");
    }

    #[test]
    fn test_consecutive_progress_overwrites() {
        assert_eq!(
            written(&["frame=1\r", "frame=2\r", "end"]),
            "frame=1\rframe=2\r\nend\n"
        );
    }

    #[test]
    fn test_is_progress() {
        assert!(is_progress("a\r"));
        assert!(is_progress("a\nb\r"));
        assert!(!is_progress("a\rb\n"));
        assert!(!is_progress("plain"));
    }

    #[test]
    fn test_write_trait_delegates_to_chunks() {
        let mut writer = RedrawWriter::new(Vec::new());
        writer.write_all(b"frame=3\r").unwrap();
        writer.write_all(b"log").unwrap();
        assert_eq!(writer.get_ref().as_slice(), b"frame=3\r\nlog\n");
    }
}
