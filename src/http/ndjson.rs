//! Newline-delimited JSON decoding over an arbitrary byte stream.
//!
//! [`NdjsonStream`] does not care how the bytes were obtained (GET or
//! POST-initiated response, or an in-memory stream in tests). Chunk boundaries
//! never influence the decoded sequence.

use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use futures_util::Stream;
use pin_project_lite::pin_project;
use serde::de::DeserializeOwned;

use crate::error::HttpError;
use crate::http::classify::excerpt;

/// Accumulates bytes and hands out complete lines.
///
/// Consumed lines only advance a read offset; the buffer is compacted once
/// per [`LineBuffer::extend`]. Only bytes after the last scanned position are
/// searched for a line feed, so a long line arriving in many small chunks is
/// scanned once.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
    /// Start of the first unconsumed byte.
    start: usize,
    /// Everything in `start..scanned` is known to contain no `\n`.
    scanned: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, chunk: &[u8]) {
        if self.start > 0 {
            self.buf.drain(..self.start);
            self.scanned -= self.start;
            self.start = 0;
        }
        self.buf.extend_from_slice(chunk);
    }

    /// Next complete line without its terminator (`\n` or `\r\n`).
    pub fn next_line(&mut self) -> Option<Vec<u8>> {
        let from = self.scanned.max(self.start);
        match self.buf[from..].iter().position(|b| *b == b'\n') {
            Some(offset) => {
                let end = from + offset;
                let line = strip_cr(&self.buf[self.start..end]).to_vec();
                self.start = end + 1;
                self.scanned = self.start;
                Some(line)
            }
            None => {
                self.scanned = self.buf.len();
                None
            }
        }
    }

    /// Whatever is left once the source is exhausted: an unterminated last line.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        let rest = strip_cr(&self.buf[self.start..]).to_vec();
        self.buf.clear();
        self.start = 0;
        self.scanned = 0;
        (!rest.is_empty()).then_some(rest)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.buf.len()
    }
}

fn strip_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}

fn decode_line<T: DeserializeOwned>(line: &[u8]) -> Result<T, HttpError> {
    serde_json::from_slice(line).map_err(|source| HttpError::Decode {
        excerpt: excerpt(&String::from_utf8_lossy(line)),
        source,
    })
}

pin_project! {
    /// Lazy stream of `T` decoded from newline-delimited JSON.
    ///
    /// Blank lines are skipped. The first malformed line or read error is
    /// yielded as an error and ends the stream.
    pub struct NdjsonStream<S, T> {
        #[pin]
        inner: S,
        buffer: LineBuffer,
        done: bool,
        _item: PhantomData<fn() -> T>,
    }
}

impl<S, T> NdjsonStream<S, T> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            buffer: LineBuffer::new(),
            done: false,
            _item: PhantomData,
        }
    }
}

impl<S, B, E, T> Stream for NdjsonStream<S, T>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<HttpError>,
    T: DeserializeOwned,
{
    type Item = Result<T, HttpError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if *this.done {
                return Poll::Ready(None);
            }

            if let Some(line) = this.buffer.next_line() {
                if is_blank(&line) {
                    continue;
                }
                let item = decode_line(&line);
                if item.is_err() {
                    *this.done = true;
                }
                return Poll::Ready(Some(item));
            }

            match ready!(this.inner.as_mut().poll_next(cx)) {
                Some(Ok(chunk)) => this.buffer.extend(chunk.as_ref()),
                Some(Err(e)) => {
                    *this.done = true;
                    return Poll::Ready(Some(Err(e.into())));
                }
                None => {
                    *this.done = true;
                    return match this.buffer.finish() {
                        Some(line) if !is_blank(&line) => Poll::Ready(Some(decode_line(&line))),
                        _ => Poll::Ready(None),
                    };
                }
            }
        }
    }
}
