// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Message framing for NETCONF transports (RFC 6242).
//!
//! Two wire formats are supported, selected after the hello exchange:
//!
//! * **base:1.0** — end-of-message framing. A message is arbitrary octets
//!   terminated by the sentinel `]]>]]>`.
//! * **base:1.1** — chunked framing. A message is a sequence of
//!   `#<len>\n<len octets>` chunks terminated by `##\n`.
//!
//! The decoder keeps its own read buffer, so switching the variant after
//! the hello exchange never loses bytes that were read beyond the hello.

use bytes::{Bytes, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::cfg::config::FramingConfig;

/// End-of-message sentinel of base:1.0 framing.
pub const EOM_SENTINEL: &[u8] = b"]]>]]>";

/// Chunked-message terminator of base:1.1 framing.
pub const CHUNK_TERMINATOR: &[u8] = b"##\n";

const READ_CHUNK: usize = 8 * 1024;

/// Negotiated NETCONF base protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BaseVersion {
    /// base:1.0, end-of-message framing.
    V1_0,
    /// base:1.1, chunked framing.
    #[default]
    V1_1,
}

impl BaseVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            BaseVersion::V1_0 => "1.0",
            BaseVersion::V1_1 => "1.1",
        }
    }
}

/// Framing failures. All of them are fatal to the session.
#[derive(Debug, Error)]
pub enum FramingError {
    #[error("bad chunk header: {0}")]
    BadHeader(String),
    #[error("chunk of {size} bytes exceeds the per-chunk cap of {cap}")]
    ChunkOverflow { size: usize, cap: usize },
    #[error("message exceeds the cap of {cap} bytes")]
    MessageOverflow { cap: usize },
    #[error("chunk header line exceeds {cap} bytes")]
    HeaderOverflow { cap: usize },
    #[error("stream closed mid-frame")]
    ShortRead,
    #[error("payload contains the end-of-message sentinel")]
    ContainsSentinel,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Decoding half of the framing codec.
///
/// The internal buffer outlives [`FrameReader::set_version`], which is how
/// the codec is re-parameterised between the hello exchange (always
/// base:1.0 framed) and the rest of the session.
pub struct FrameReader<R> {
    inner: R,
    buf: BytesMut,
    version: BaseVersion,
    cfg: FramingConfig,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// The reader starts in base:1.0 mode, which is what both peers speak
    /// until their hellos have been exchanged.
    pub fn new(inner: R, cfg: FramingConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(READ_CHUNK),
            version: BaseVersion::V1_0,
            cfg,
        }
    }

    pub fn set_version(&mut self, version: BaseVersion) {
        self.version = version;
    }

    pub fn version(&self) -> BaseVersion {
        self.version
    }

    /// Reads one framed message. Returns `Ok(None)` on a clean EOF at a
    /// message boundary; EOF inside a frame is a [`FramingError::ShortRead`].
    pub async fn read_message(&mut self) -> Result<Option<Bytes>, FramingError> {
        match self.version {
            BaseVersion::V1_0 => self.read_eom().await,
            BaseVersion::V1_1 => self.read_chunked().await,
        }
    }

    /// Pulls more bytes from the stream into the buffer. Returns false on
    /// EOF.
    async fn fill(&mut self) -> Result<bool, FramingError> {
        let mut chunk = [0u8; READ_CHUNK];
        let n = self.inner.read(&mut chunk).await?;
        if n == 0 {
            return Ok(false);
        }
        self.buf.extend_from_slice(&chunk[..n]);
        Ok(true)
    }

    async fn read_eom(&mut self) -> Result<Option<Bytes>, FramingError> {
        // Resume the sentinel scan a little before the tail so a sentinel
        // split across reads is still found.
        let mut scanned = 0usize;
        loop {
            if let Some(pos) = find_subslice(&self.buf[scanned..], EOM_SENTINEL) {
                let msg_len = scanned + pos;
                let payload = self.buf.split_to(msg_len).freeze();
                let _ = self.buf.split_to(EOM_SENTINEL.len());
                return Ok(Some(payload));
            }
            if self.buf.len() > self.cfg.max_message_bytes {
                return Err(FramingError::MessageOverflow {
                    cap: self.cfg.max_message_bytes,
                });
            }
            scanned = self.buf.len().saturating_sub(EOM_SENTINEL.len() - 1);
            if !self.fill().await? {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return Err(FramingError::ShortRead);
            }
        }
    }

    async fn read_chunked(&mut self) -> Result<Option<Bytes>, FramingError> {
        let mut message = BytesMut::new();
        let mut first_header = true;
        loop {
            let line = match self.read_header_line(first_header).await? {
                Some(line) => line,
                None => return Ok(None),
            };
            first_header = false;
            if line == CHUNK_TERMINATOR {
                return Ok(Some(message.freeze()));
            }
            let size = parse_chunk_size(&line)?;
            if size > self.cfg.max_message_bytes {
                return Err(FramingError::ChunkOverflow {
                    size,
                    cap: self.cfg.max_message_bytes,
                });
            }
            if message.len() + size > self.cfg.max_message_bytes {
                return Err(FramingError::MessageOverflow {
                    cap: self.cfg.max_message_bytes,
                });
            }
            let chunk = self.read_exact_buffered(size).await?;
            message.extend_from_slice(&chunk);
        }
    }

    /// Reads one `#`-prefixed header line including the trailing `\n`.
    /// The line length is capped before any chunk buffer is allocated.
    /// Returns `None` on clean EOF before the first byte of the first
    /// header.
    async fn read_header_line(
        &mut self,
        allow_eof: bool,
    ) -> Result<Option<Vec<u8>>, FramingError> {
        loop {
            if let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
                if pos + 1 > self.cfg.max_header_line_bytes {
                    return Err(FramingError::HeaderOverflow {
                        cap: self.cfg.max_header_line_bytes,
                    });
                }
                let line = self.buf.split_to(pos + 1).to_vec();
                return Ok(Some(line));
            }
            if self.buf.len() >= self.cfg.max_header_line_bytes {
                return Err(FramingError::HeaderOverflow {
                    cap: self.cfg.max_header_line_bytes,
                });
            }
            if !self.fill().await? {
                if allow_eof && self.buf.is_empty() {
                    return Ok(None);
                }
                return Err(FramingError::ShortRead);
            }
        }
    }

    async fn read_exact_buffered(&mut self, n: usize) -> Result<Bytes, FramingError> {
        while self.buf.len() < n {
            if !self.fill().await? {
                return Err(FramingError::ShortRead);
            }
        }
        Ok(self.buf.split_to(n).freeze())
    }
}

/// Encoding half of the framing codec.
pub struct FrameWriter<W> {
    inner: W,
    version: BaseVersion,
    cfg: FramingConfig,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(inner: W, cfg: FramingConfig) -> Self {
        Self {
            inner,
            version: BaseVersion::V1_0,
            cfg,
        }
    }

    pub fn set_version(&mut self, version: BaseVersion) {
        self.version = version;
    }

    pub async fn write_message(&mut self, payload: &[u8]) -> Result<(), FramingError> {
        match self.version {
            BaseVersion::V1_0 => {
                if find_subslice(payload, EOM_SENTINEL).is_some() {
                    return Err(FramingError::ContainsSentinel);
                }
                self.inner.write_all(payload).await?;
                self.inner.write_all(EOM_SENTINEL).await?;
            },
            BaseVersion::V1_1 => {
                for chunk in payload.chunks(self.cfg.encode_chunk_bytes) {
                    let header = format!("#{}\n", chunk.len());
                    self.inner.write_all(header.as_bytes()).await?;
                    self.inner.write_all(chunk).await?;
                }
                self.inner.write_all(CHUNK_TERMINATOR).await?;
            },
        }
        self.inner.flush().await?;
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<(), FramingError> {
        self.inner.shutdown().await?;
        Ok(())
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Parses the digits of a `#<len>\n` chunk header. RFC 6242 allows
/// 1..=4294967295 with no sign and no leading zeros, so `0` itself is
/// rejected.
fn parse_chunk_size(line: &[u8]) -> Result<usize, FramingError> {
    let bad = |line: &[u8]| {
        FramingError::BadHeader(String::from_utf8_lossy(line).trim_end().to_string())
    };
    if line.len() < 3 || line[0] != b'#' || line[line.len() - 1] != b'\n' {
        return Err(bad(line));
    }
    let digits = &line[1..line.len() - 1];
    if digits.is_empty() || !digits.iter().all(|b| b.is_ascii_digit()) {
        return Err(bad(line));
    }
    if digits[0] == b'0' {
        return Err(bad(line));
    }
    let mut size: usize = 0;
    for &d in digits {
        size = size
            .checked_mul(10)
            .and_then(|s| s.checked_add((d - b'0') as usize))
            .ok_or_else(|| bad(line))?;
    }
    Ok(size)
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
