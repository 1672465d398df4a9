//! Server-push log stream decoding.
//!
//! The backend pushes one JSON record per line, either bare (NDJSON) or
//! wrapped in SSE `data:` fields, interleaved with keep-alive lines. This
//! module turns the raw byte stream into [`LogFrame`]s. Record payloads are
//! passed through as text; parsing them is the consumer's job so a single
//! malformed record never tears down the stream.

use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures_core::Stream;
use futures_util::StreamExt;

use crate::error::Error;

/// A decoded unit from the log stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFrame {
    /// Raw JSON text of one log record.
    Record(String),
    /// Keep-alive line, carries no data.
    Heartbeat,
    /// A line longer than the decoder's limit. Its bytes were discarded;
    /// the value is how many.
    Oversized(usize),
}

/// Longest line the decoder buffers before discarding it.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Boxed stream of decoded frames, as returned by
/// [`ApiClient::open_log_stream`](crate::ApiClient::open_log_stream).
pub type LogFrameStream = Pin<Box<dyn Stream<Item = Result<LogFrame, Error>> + Send>>;

/// Incremental line splitter. Bytes are buffered until a newline arrives,
/// so records split across network chunks (including inside a multi-byte
/// UTF-8 sequence) are reassembled before decoding.
///
/// At most `max_line` bytes are held. A longer line is discarded as it
/// arrives and reported as one [`LogFrame::Oversized`] once it ends.
#[derive(Debug)]
pub struct LineDecoder {
    buf: BytesMut,
    /// Leading bytes of `buf` already searched for a newline.
    scanned: usize,
    /// Bytes thrown away from the current oversized line.
    skipped: usize,
    max_line: usize,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            scanned: 0,
            skipped: 0,
            max_line,
        }
    }

    /// Feed a chunk and return every frame completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<LogFrame> {
        self.buf.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(offset) = self.buf[self.scanned..].iter().position(|b| *b == b'\n') {
            let pos = self.scanned + offset;
            let line = self.buf.split_to(pos + 1);
            self.scanned = 0;

            if self.skipped > 0 || pos > self.max_line {
                frames.push(LogFrame::Oversized(std::mem::take(&mut self.skipped) + pos));
            } else if let Some(frame) = classify(&line[..pos]) {
                frames.push(frame);
            }
        }

        if self.buf.len() > self.max_line {
            self.skipped += self.buf.len();
            self.buf.clear();
        }
        self.scanned = self.buf.len();
        frames
    }

    /// Flush a final unterminated line once the stream has ended.
    pub fn finish(&mut self) -> Option<LogFrame> {
        self.scanned = 0;
        if self.skipped > 0 {
            let rest = self.buf.split();
            return Some(LogFrame::Oversized(std::mem::take(&mut self.skipped) + rest.len()));
        }
        if self.buf.is_empty() {
            return None;
        }
        let rest = self.buf.split();
        classify(&rest)
    }

    /// Number of buffered bytes not yet terminated by a newline.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

/// Classify one line. Blank lines and SSE metadata fields yield nothing.
fn classify(raw: &[u8]) -> Option<LogFrame> {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    let text = String::from_utf8_lossy(raw);
    let line = text.trim();

    if line.is_empty() {
        return None;
    }
    if line.starts_with(':') || line.eq_ignore_ascii_case("heartbeat") {
        return Some(LogFrame::Heartbeat);
    }
    if let Some(data) = line.strip_prefix("data:") {
        let data = data.trim_start();
        return (!data.is_empty()).then(|| LogFrame::Record(data.to_owned()));
    }
    if ["event:", "id:", "retry:"].iter().any(|p| line.starts_with(p)) {
        return None;
    }
    Some(LogFrame::Record(line.to_owned()))
}

/// Decode a byte stream into log frames.
///
/// A chunk error ends the decoded stream with [`Error::Stream`].
pub fn decode_frames<S, E>(bytes: S) -> LogFrameStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    Box::pin(async_stream::try_stream! {
        let mut decoder = LineDecoder::new();
        let mut bytes = Box::pin(bytes);

        while let Some(chunk) = bytes.next().await {
            let chunk = chunk.map_err(|e| Error::Stream(e.to_string()))?;
            for frame in decoder.feed(&chunk) {
                yield frame;
            }
        }

        if let Some(frame) = decoder.finish() {
            yield frame;
        }
    })
}
