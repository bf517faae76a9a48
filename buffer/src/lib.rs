//! Fixed-threshold coalescing buffer for streaming pipelines.
//!
//! This crate sits between an upstream byte producer and a downstream
//! byte consumer. Incoming chunks accumulate in a fixed-capacity buffer
//! and are released downstream as larger, consolidated chunks once the
//! buffer fills or the producer signals completion. Many small writes
//! become few large reads, which matters for consumers sensitive to chunk
//! count such as disk or network sinks.
//!
//! # How it works
//!
//! [`FlushBuffer`] owns one buffer of `flush_threshold` capacity at a
//! time. Writes append to it; a write that would overflow blocks instead,
//! and the accumulated bytes become the next output chunk. Taking that
//! chunk hands the buffer to the consumer whole and starts a fresh one,
//! which unblocks the writer. [`finish`](FlushBuffer::finish) marks end
//! of input; the remaining bytes come out as a final, possibly shorter,
//! chunk.
//!
//! A chunk is never split across two flushes. A single chunk larger than
//! the whole threshold can therefore never be accepted and fails with
//! [`BufferError::ChunkTooBig`], permanently disabling the buffer.
//!
//! ```
//! use coalesce_buffer::FlushBuffer;
//! use std::thread;
//!
//! let buf = FlushBuffer::with_threshold(5);
//! let writer = buf.clone();
//!
//! // Producer side: forty 1-byte writes.
//! let producer = thread::spawn(move || {
//!     for digit in 0..4 {
//!         for _ in 0..10 {
//!             writer.write(digit.to_string().as_bytes()).unwrap();
//!         }
//!     }
//!     writer.finish().unwrap();
//! });
//!
//! // Consumer side: eight 5-byte chunks.
//! let chunks: Vec<Vec<u8>> = buf.chunks().map(Result::unwrap).collect();
//! producer.join().unwrap();
//! assert_eq!(chunks.len(), 8);
//! assert_eq!(chunks[0], b"00000");
//! ```
//!
//! # I/O adapters
//!
//! The write side implements [`std::io::Write`] (each `write` call is one
//! chunk), and the read side is available as a chunk iterator
//! ([`FlushBuffer::chunks`]) or a [`std::io::Read`]
//! ([`FlushBuffer::reader`]):
//!
//! ```
//! use coalesce_buffer::FlushBuffer;
//! use std::io::Read;
//! use std::thread;
//!
//! let buf = FlushBuffer::with_threshold(4);
//! let writer = buf.clone();
//!
//! let producer = thread::spawn(move || {
//!     for piece in [&b"ab"[..], b"cd", b"ef"] {
//!         writer.write(piece).unwrap();
//!     }
//!     writer.finish().unwrap();
//! });
//!
//! let mut output = Vec::new();
//! buf.reader().read_to_end(&mut output).unwrap();
//! producer.join().unwrap();
//! assert_eq!(output, b"abcdef");
//! ```
//!
//! # Error handling
//!
//! Fatal errors ([`BufferError::ChunkTooBig`], and the defensive
//! [`BufferError::ShortCopy`]) are raised exactly once, to the writer
//! that triggered them. Afterwards the write side silently drops data.
//! What the read side observes is configurable through
//! [`ErrorPolicy`]: by default the error is reported to the consumer as
//! well; [`ErrorPolicy::Stall`] keeps the read side silent instead.
//!
//! # Thread safety
//!
//! [`FlushBuffer`] is `Send + Sync` and `Clone` (clones share the same
//! buffer), so the two sides can live on different threads. Coordination
//! is condvar-based; neither side spins.

mod error;
mod flush_buffer;
mod io;

pub use error::{BufferError, Result};
pub use flush_buffer::{
    DEFAULT_FLUSH_THRESHOLD, ErrorPolicy, FlushBuffer, FlushConfig,
};
pub use io::{ChunkReader, Chunks};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FlushBuffer>();
        assert_send_sync::<Chunks>();
        assert_send_sync::<ChunkReader>();
    }

    #[test]
    fn test_buffer_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<FlushBuffer>();
    }
}
