//! Standard I/O adapters for the two sides of a [`FlushBuffer`].
//!
//! The write side implements [`std::io::Write`], so any producer that can
//! write to a stream can feed the buffer. The read side is exposed both as
//! a chunk iterator ([`Chunks`]) and as a [`std::io::Read`]
//! ([`ChunkReader`]) for composing with `io::copy` and friends.

use std::io::{self, IoSlice, Read, Write};

use crate::error::BufferError;
use crate::flush_buffer::FlushBuffer;

impl From<BufferError> for io::Error {
    fn from(err: BufferError) -> Self {
        let kind = match &err {
            BufferError::ChunkTooBig { .. } => io::ErrorKind::InvalidInput,
            BufferError::ShortCopy { .. } => io::ErrorKind::WriteZero,
            BufferError::Finished => io::ErrorKind::BrokenPipe,
        };
        io::Error::new(kind, err)
    }
}

/// The write side as a stream sink.
///
/// Each `write` call supplies its whole slice as a single chunk, so a
/// successful call always reports the full length. Chunks are never
/// split: a single `write` larger than the flush threshold fails with
/// `InvalidInput`. `flush` is a no-op; flushing is driven by the
/// threshold and by [`finish`](FlushBuffer::finish).
impl Write for FlushBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        FlushBuffer::write(self, buf)?;
        Ok(buf.len())
    }

    /// Applies the chunks in order, as separate writes.
    fn write_vectored(&mut self, bufs: &[IoSlice<'_>]) -> io::Result<usize> {
        let mut written = 0;
        for buf in bufs {
            FlushBuffer::write(self, buf)?;
            written += buf.len();
        }
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl FlushBuffer {
    /// Returns an iterator over the coalesced output chunks.
    ///
    /// Blocks inside `next` the same way
    /// [`next_chunk`](Self::next_chunk) does. Yields at most one error,
    /// then fuses; a normal end of stream simply ends the iteration.
    pub fn chunks(&self) -> Chunks {
        Chunks {
            buffer: self.clone(),
            done: false,
        }
    }

    /// Returns a reader serving the coalesced bytes.
    ///
    /// Reads drain the current output chunk and pull the next one on
    /// demand, so consumers that want a plain byte stream can use
    /// `io::copy` or `read_to_end` instead of iterating chunks.
    pub fn reader(&self) -> ChunkReader {
        ChunkReader {
            buffer: self.clone(),
            current: Vec::new(),
            pos: 0,
        }
    }
}

/// Iterator over the coalesced output chunks of a [`FlushBuffer`].
///
/// Created by [`FlushBuffer::chunks`].
pub struct Chunks {
    buffer: FlushBuffer,
    done: bool,
}

impl Iterator for Chunks {
    type Item = Result<Vec<u8>, BufferError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.buffer.next_chunk() {
            Ok(Some(chunk)) => Some(Ok(chunk)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// Byte-stream view of the read side of a [`FlushBuffer`].
///
/// Created by [`FlushBuffer::reader`].
pub struct ChunkReader {
    buffer: FlushBuffer,
    current: Vec<u8>,
    pos: usize,
}

impl Read for ChunkReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.pos == self.current.len() {
            match self.buffer.next_chunk()? {
                Some(chunk) => {
                    self.current = chunk;
                    self.pos = 0;
                }
                None => return Ok(0),
            }
        }
        let n = (self.current.len() - self.pos).min(buf.len());
        buf[..n].copy_from_slice(&self.current[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}
