//! Bounded line splitting for the CLI's stdout

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// One unit read from the stream
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum LineEvent {
    /// A complete, non-empty line without its terminator
    Line(Vec<u8>),
    /// A line longer than the limit; it has been (or is being) discarded
    TooLong(usize),
}

/// Splits a byte stream on `\n`, never buffering more than `max_len` bytes
///
/// An over-long line is reported once and skipped up to its newline; reading
/// then resumes with the next line.
pub(crate) struct LineReader<R> {
    inner: BufReader<R>,
    max_len: usize,
    buf: Vec<u8>,
    discarding: bool,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub(crate) fn new(reader: R, max_len: usize) -> Self {
        Self {
            inner: BufReader::new(reader),
            max_len,
            buf: Vec::new(),
            discarding: false,
        }
    }

    /// Read the next event; `None` at end of stream
    pub(crate) async fn next_event(&mut self) -> std::io::Result<Option<LineEvent>> {
        loop {
            let available = self.inner.fill_buf().await?;
            if available.is_empty() {
                if self.discarding || self.buf.is_empty() {
                    self.discarding = false;
                    self.buf.clear();
                    return Ok(None);
                }
                let line = std::mem::take(&mut self.buf);
                if let Some(line) = finish_line(line) {
                    return Ok(Some(LineEvent::Line(line)));
                }
                return Ok(None);
            }

            match available.iter().position(|&b| b == b'\n') {
                Some(pos) => {
                    if self.discarding {
                        self.inner.consume(pos + 1);
                        self.discarding = false;
                        continue;
                    }
                    let length = self.buf.len() + pos;
                    if length > self.max_len {
                        self.inner.consume(pos + 1);
                        self.buf.clear();
                        return Ok(Some(LineEvent::TooLong(length)));
                    }
                    self.buf.extend_from_slice(&available[..pos]);
                    self.inner.consume(pos + 1);
                    let line = std::mem::take(&mut self.buf);
                    if let Some(line) = finish_line(line) {
                        return Ok(Some(LineEvent::Line(line)));
                    }
                }
                None => {
                    let n = available.len();
                    if self.discarding {
                        self.inner.consume(n);
                        continue;
                    }
                    let length = self.buf.len() + n;
                    if length > self.max_len {
                        self.inner.consume(n);
                        self.buf.clear();
                        self.discarding = true;
                        return Ok(Some(LineEvent::TooLong(length)));
                    }
                    self.buf.extend_from_slice(available);
                    self.inner.consume(n);
                }
            }
        }
    }
}

/// Strip a trailing `\r`; empty lines are dropped
fn finish_line(mut line: Vec<u8>) -> Option<Vec<u8>> {
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    if line.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        Some(line)
    }
}
