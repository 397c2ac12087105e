//! Newline-delimited JSON decoding over an HTTP body.
//!
//! Both daemon streaming endpoints emit one JSON object per line with no
//! envelope and no in-band terminator; the stream is over when the body
//! closes. [`NdjsonDecoder`] turns a byte stream into a forward-only sequence
//! of typed values, suspending only while it waits for the next line.

use std::marker::PhantomData;

use futures_util::{Stream, StreamExt};
use memchr::memchr;
use serde::de::DeserializeOwned;

use crate::core::error::DaemonError;

/// Initial read buffer size. The buffer grows past this as needed.
const INITIAL_BUFFER_BYTES: usize = 64 * 1024;

/// Upper bound for a single line. Anything longer fails the call rather
/// than being truncated.
pub const MAX_LINE_BYTES: usize = 64 * 1024 * 1024;

pub struct NdjsonDecoder<S, T> {
    stream: S,
    buffer: Vec<u8>,
    /// Bytes before this offset are known to contain no newline.
    scan_from: usize,
    line_number: usize,
    max_line_bytes: usize,
    eof: bool,
    finished: bool,
    _item: PhantomData<fn() -> T>,
}

impl<S, B, E, T> NdjsonDecoder<S, T>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    DaemonError: From<E>,
    T: DeserializeOwned,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buffer: Vec::with_capacity(INITIAL_BUFFER_BYTES),
            scan_from: 0,
            line_number: 0,
            max_line_bytes: MAX_LINE_BYTES,
            eof: false,
            finished: false,
            _item: PhantomData,
        }
    }

    pub fn with_max_line_bytes(mut self, max_line_bytes: usize) -> Self {
        self.max_line_bytes = max_line_bytes;
        self
    }

    /// Number of non-blank lines decoded so far.
    pub fn lines_decoded(&self) -> usize {
        self.line_number
    }

    /// Returns the next decoded value, `None` once the body has closed, or an
    /// error that ends the sequence. Blank lines are skipped.
    pub async fn next(&mut self) -> Option<Result<T, DaemonError>> {
        if self.finished {
            return None;
        }

        loop {
            if let Some(offset) = memchr(b'\n', &self.buffer[self.scan_from..]) {
                let end = self.scan_from + offset;
                if end > self.max_line_bytes {
                    return Some(self.settle(Err(self.oversized_line())));
                }
                let line: Vec<u8> = self.buffer.drain(..=end).collect();
                self.scan_from = 0;
                if let Some(result) = self.decode_line(&line[..end]) {
                    return Some(self.settle(result));
                }
                continue;
            }

            self.scan_from = self.buffer.len();
            if self.buffer.len() > self.max_line_bytes {
                return Some(self.settle(Err(self.oversized_line())));
            }

            if self.eof {
                self.finished = true;
                if self.buffer.is_empty() {
                    return None;
                }
                // Final line without a trailing newline.
                let line = std::mem::take(&mut self.buffer);
                return self.decode_line(&line);
            }

            match self.stream.next().await {
                Some(Ok(chunk)) => self.buffer.extend_from_slice(chunk.as_ref()),
                Some(Err(err)) => return Some(self.settle(Err(DaemonError::from(err)))),
                None => self.eof = true,
            }
        }
    }

    fn decode_line(&mut self, raw: &[u8]) -> Option<Result<T, DaemonError>> {
        let line = raw.trim_ascii();
        if line.is_empty() {
            return None;
        }

        self.line_number += 1;
        Some(serde_json::from_slice(line).map_err(|err| {
            DaemonError::protocol(format!("line {}: {err}", self.line_number))
        }))
    }

    fn oversized_line(&self) -> DaemonError {
        DaemonError::protocol(format!(
            "line {} exceeds {} bytes",
            self.line_number + 1,
            self.max_line_bytes
        ))
    }

    fn settle(&mut self, result: Result<T, DaemonError>) -> Result<T, DaemonError> {
        if result.is_err() {
            self.finished = true;
        }
        result
    }
}
