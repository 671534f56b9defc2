/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

//! Frame codec for byte streams.
//!
//! # Wire Format
//!
//! ```text
//! ┌──────────────────────────────────────────────┬──────┐
//! │ JSON payload (any length)                    │ 0x04 │
//! └──────────────────────────────────────────────┴──────┘
//! ```
//!
//! Frames are delimited by a single [`TERMINATOR`] byte. JSON escapes every
//! control character inside strings, so a well-formed payload never contains
//! it; encoding still checks and refuses to write a payload that does.
//!
//! A single socket read may yield no frame, several frames, or a frame and the
//! start of the next; [`FrameBuffer`] keeps the remainder between reads.

use serde_json::Value;
use tokio::io::{
    self, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf,
};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::trace;

use super::RemoteError;

/// End-of-frame marker (ASCII EOT).
pub const TERMINATOR: u8 = 0x04;

const READ_CHUNK: usize = 8 * 1024;

/// Encodes `value` as one frame, terminator included.
///
/// # Errors
///
/// [`RemoteError::Serialization`] if the value cannot be encoded and
/// [`RemoteError::TerminatorInPayload`] if the encoding contains the terminator.
pub fn encode_frame(value: &Value) -> Result<Vec<u8>, RemoteError> {
    seal_frame(serde_json::to_vec(value)?)
}

/// Appends the terminator to an encoded payload.
pub(crate) fn seal_frame(mut payload: Vec<u8>) -> Result<Vec<u8>, RemoteError> {
    if payload.contains(&TERMINATOR) {
        return Err(RemoteError::TerminatorInPayload);
    }
    payload.push(TERMINATOR);
    Ok(payload)
}

/// Accumulates raw bytes and splits complete frames off the front.
///
/// Popped frames only advance a read offset; consumed bytes are dropped in one
/// move on the next [`extend`](Self::extend).
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buffer: Vec<u8>,
    // First byte not yet returned as part of a frame.
    start: usize,
    // Bytes before this index have been searched for a terminator.
    scanned: usize,
    max_frame_size: Option<usize>,
}

impl FrameBuffer {
    /// An empty buffer. With a `max_frame_size`, frames larger than it are refused.
    pub fn new(max_frame_size: Option<usize>) -> Self {
        Self {
            max_frame_size,
            ..Self::default()
        }
    }

    /// Appends bytes read from the stream.
    pub fn extend(&mut self, bytes: &[u8]) {
        if self.start > 0 {
            self.buffer.drain(..self.start);
            self.scanned -= self.start;
            self.start = 0;
        }
        self.buffer.extend_from_slice(bytes);
    }

    /// Bytes held that do not yet form a complete frame (or have not been popped).
    pub fn buffered(&self) -> usize {
        self.buffer.len() - self.start
    }

    /// Pops the next complete frame, if any.
    ///
    /// # Errors
    ///
    /// [`RemoteError::Protocol`] for a frame that is not valid JSON; the frame is
    /// consumed and the next call continues with the one after it.
    /// [`RemoteError::FrameTooLarge`] when the limit is exceeded, which leaves the
    /// stream unusable.
    pub fn next_frame(&mut self) -> Result<Option<Value>, RemoteError> {
        let Some(offset) = self.buffer[self.scanned..]
            .iter()
            .position(|byte| *byte == TERMINATOR)
        else {
            self.scanned = self.buffer.len();
            return match self.max_frame_size {
                Some(limit) if self.buffered() > limit => Err(RemoteError::FrameTooLarge {
                    size: self.buffered(),
                    limit,
                }),
                _ => Ok(None),
            };
        };

        let end = self.scanned + offset;
        let begin = self.start;
        self.start = end + 1;
        self.scanned = self.start;
        let payload = &self.buffer[begin..end];
        if let Some(limit) = self.max_frame_size {
            if payload.len() > limit {
                return Err(RemoteError::FrameTooLarge {
                    size: payload.len(),
                    limit,
                });
            }
        }
        trace!(bytes = payload.len(), "frame complete");
        serde_json::from_slice(payload)
            .map(Some)
            .map_err(|e| RemoteError::Protocol(format!("undecodable frame: {e}")))
    }
}

/// Reads frames from the receiving half of a stream.
#[derive(Debug)]
pub struct FrameReader<R> {
    reader: R,
    buffer: FrameBuffer,
    chunk: Vec<u8>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Wraps `reader` with no frame size limit.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: FrameBuffer::default(),
            chunk: vec![0; READ_CHUNK],
        }
    }

    /// Refuses frames larger than `limit` bytes.
    #[must_use]
    pub fn with_max_frame_size(mut self, limit: Option<usize>) -> Self {
        self.buffer.max_frame_size = limit;
        self
    }

    /// Waits for the next complete frame.
    ///
    /// Cancel-safe: dropping the future loses no bytes, so callers may wrap it
    /// in a timeout and try again.
    ///
    /// # Errors
    ///
    /// [`RemoteError::DeadConnection`] when the peer has closed the stream or
    /// the socket failed, plus the errors of [`FrameBuffer::next_frame`].
    pub async fn read(&mut self) -> Result<Value, RemoteError> {
        loop {
            if let Some(value) = self.buffer.next_frame()? {
                return Ok(value);
            }
            let read = self.reader.read(&mut self.chunk).await?;
            if read == 0 {
                trace!(pending = self.buffer.buffered(), "peer closed the stream");
                return Err(RemoteError::DeadConnection);
            }
            self.buffer.extend(&self.chunk[..read]);
        }
    }
}

/// Writes frames to the sending half of a stream.
#[derive(Debug)]
pub struct FrameWriter<W> {
    writer: W,
    closed: bool,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    /// Wraps `writer`.
    pub const fn new(writer: W) -> Self {
        Self {
            writer,
            closed: false,
        }
    }

    /// Encodes and writes one frame, then flushes.
    ///
    /// # Errors
    ///
    /// [`RemoteError::TerminatorInPayload`] before anything is written,
    /// [`RemoteError::ConnectionClosed`] after [`close`](Self::close), or the
    /// I/O failure.
    pub async fn send(&mut self, value: &Value) -> Result<(), RemoteError> {
        if self.closed {
            return Err(RemoteError::ConnectionClosed);
        }
        let frame = encode_frame(value)?;
        self.writer.write_all(&frame).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Shuts down the write side. Calling it again does nothing.
    ///
    /// # Errors
    ///
    /// The I/O failure of the first shutdown, other than an already
    /// disconnected socket.
    pub async fn close(&mut self) -> Result<(), RemoteError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        match self.writer.shutdown().await {
            Err(e) if e.kind() != io::ErrorKind::NotConnected => Err(e.into()),
            _ => Ok(()),
        }
    }

    /// `true` once [`close`](Self::close) has run.
    pub const fn is_closed(&self) -> bool {
        self.closed
    }
}

/// A framed duplex stream.
#[derive(Debug)]
pub struct Connection<R, W> {
    reader: FrameReader<R>,
    writer: FrameWriter<W>,
}

impl<S: AsyncRead + AsyncWrite> Connection<ReadHalf<S>, WriteHalf<S>> {
    /// Frames any duplex stream.
    pub fn new(stream: S) -> Self {
        let (reader, writer) = io::split(stream);
        Self::from_parts(reader, writer)
    }
}

impl Connection<OwnedReadHalf, OwnedWriteHalf> {
    /// Frames a TCP stream without locking between its halves.
    pub fn from_tcp(stream: TcpStream) -> Self {
        let (reader, writer) = stream.into_split();
        Self::from_parts(reader, writer)
    }
}

impl<R: AsyncRead + Unpin, W: AsyncWrite + Unpin> Connection<R, W> {
    /// Frames separately owned halves.
    pub fn from_parts(reader: R, writer: W) -> Self {
        Self {
            reader: FrameReader::new(reader),
            writer: FrameWriter::new(writer),
        }
    }

    /// Refuses frames larger than `limit` bytes.
    #[must_use]
    pub fn with_max_frame_size(mut self, limit: Option<usize>) -> Self {
        self.reader = self.reader.with_max_frame_size(limit);
        self
    }

    /// See [`FrameWriter::send`].
    ///
    /// # Errors
    ///
    /// As for [`FrameWriter::send`].
    pub async fn send(&mut self, value: &Value) -> Result<(), RemoteError> {
        self.writer.send(value).await
    }

    /// See [`FrameReader::read`].
    ///
    /// # Errors
    ///
    /// As for [`FrameReader::read`].
    pub async fn read(&mut self) -> Result<Value, RemoteError> {
        self.reader.read().await
    }

    /// See [`FrameWriter::close`].
    ///
    /// # Errors
    ///
    /// As for [`FrameWriter::close`].
    pub async fn close(&mut self) -> Result<(), RemoteError> {
        self.writer.close().await
    }

    /// Separates the halves so they can be driven by different tasks.
    pub fn into_split(self) -> (FrameReader<R>, FrameWriter<W>) {
        (self.reader, self.writer)
    }
}
