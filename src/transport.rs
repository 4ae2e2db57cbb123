//! `Content-Length` framed message transport.
//!
//! Each frame is a header block terminated by `\r\n\r\n` followed by exactly
//! `Content-Length` bytes of JSON. The reader keeps bytes past the end of a
//! frame for the next call, so back-to-back frames delivered in one chunk are
//! not lost.

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::TransportError;

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Where a frame can start again after a framing error (compared ignoring case).
const LENGTH_HEADER: &[u8] = b"content-length:";

/// Maximum accepted body size (16 MiB).
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Maximum header block size before the input is declared garbage (8 KiB).
const MAX_HEADER_BYTES: usize = 8 * 1024;

const READ_CHUNK: usize = 4096;

/// Reads framed message bodies from a byte stream.
pub struct MessageReader<R> {
    inner: R,
    buf: Vec<u8>,
    /// Body bytes of a rejected frame still to be dropped.
    discard: usize,
    /// After a bad header, input is skipped up to the next `Content-Length`.
    resync: bool,
}

impl<R: AsyncRead + Unpin> MessageReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::new(),
            discard: 0,
            resync: false,
        }
    }

    /// Read the next message body.
    ///
    /// Returns `Ok(None)` when the stream ends before a complete frame is
    /// available. A malformed header block yields [`TransportError::Framing`];
    /// the next call skips whatever followed it (its unframed body) and starts
    /// at the next `Content-Length` header.
    pub async fn read_message(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        loop {
            if self.resync && !self.skip_to_length_header() {
                if !self.fill().await? {
                    return Ok(None);
                }
                continue;
            }

            if let Some(header_end) = find_subslice(&self.buf, HEADER_TERMINATOR) {
                let body_start = header_end + HEADER_TERMINATOR.len();
                let parsed = parse_content_length(&self.buf[..header_end]);
                self.buf.drain(..body_start);

                let len = match parsed {
                    Ok(len) => len,
                    Err(e) => {
                        self.resync = true;
                        return Err(e);
                    }
                };
                if len > MAX_BODY_BYTES {
                    self.discard = len;
                    self.skip_discarded();
                    return Err(TransportError::Framing(format!(
                        "message of {len} bytes exceeds limit of {MAX_BODY_BYTES}"
                    )));
                }

                while self.buf.len() < len {
                    if !self.fill().await? {
                        return Ok(None);
                    }
                }
                let body: Vec<u8> = self.buf.drain(..len).collect();
                return Ok(Some(body));
            }

            if self.buf.len() > MAX_HEADER_BYTES {
                self.buf.clear();
                self.resync = true;
                return Err(TransportError::Framing(
                    "header block exceeds 8 KiB without terminator".into(),
                ));
            }

            if !self.fill().await? {
                return Ok(None);
            }
        }
    }

    /// Pull one chunk from the stream. Returns `false` at end of stream.
    async fn fill(&mut self) -> Result<bool, TransportError> {
        let mut chunk = [0u8; READ_CHUNK];
        let n = self.inner.read(&mut chunk).await?;
        if n == 0 {
            return Ok(false);
        }
        self.buf.extend_from_slice(&chunk[..n]);
        self.skip_discarded();
        Ok(true)
    }

    /// Drop input up to the next `Content-Length` header. Returns `false`
    /// when none is buffered yet; a possible partial match is kept.
    fn skip_to_length_header(&mut self) -> bool {
        let found = self
            .buf
            .windows(LENGTH_HEADER.len())
            .position(|w| w.eq_ignore_ascii_case(LENGTH_HEADER));
        match found {
            Some(start) => {
                self.buf.drain(..start);
                self.resync = false;
                true
            }
            None => {
                let keep = LENGTH_HEADER.len() - 1;
                let cut = self.buf.len().saturating_sub(keep);
                self.buf.drain(..cut);
                false
            }
        }
    }

    fn skip_discarded(&mut self) {
        let n = self.discard.min(self.buf.len());
        self.buf.drain(..n);
        self.discard -= n;
    }
}

/// Writes framed messages to a byte stream.
pub struct MessageWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> MessageWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Serialize `message` and write header and body as one contiguous write.
    pub async fn write_message<T: Serialize>(&mut self, message: &T) -> Result<(), TransportError> {
        let frame = encode_message(message)?;
        self.inner.write_all(&frame).await?;
        self.inner.flush().await?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Encode a message as a complete frame. The header counts body bytes, not
/// characters.
pub fn encode_message<T: Serialize>(message: &T) -> Result<Vec<u8>, TransportError> {
    let body = serde_json::to_vec(message)?;
    let header = format!("Content-Length: {}\r\n\r\n", body.len());
    let mut frame = Vec::with_capacity(header.len() + body.len());
    frame.extend_from_slice(header.as_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

fn parse_content_length(header: &[u8]) -> Result<usize, TransportError> {
    let header = std::str::from_utf8(header)
        .map_err(|_| TransportError::Framing("header block is not valid UTF-8".into()))?;

    for line in header.split("\r\n") {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case("content-length") {
            return value.trim().parse::<usize>().map_err(|_| {
                TransportError::Framing(format!("invalid Content-Length: {}", value.trim()))
            });
        }
    }

    Err(TransportError::Framing("missing Content-Length header".into()))
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
