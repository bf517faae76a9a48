//! Fixed-threshold coalescing buffer implementation.

use std::mem;
use std::sync::{Arc, Condvar, Mutex};

use tracing::debug;

use crate::error::{BufferError, Result};

/// Default flush threshold: 10 MiB.
pub const DEFAULT_FLUSH_THRESHOLD: usize = 10 * 1024 * 1024;

/// What the read side observes after a fatal error.
///
/// The writer that triggers a fatal error always receives it, exactly
/// once, at the moment of detection. What a consumer that keeps asking
/// for chunks sees afterwards is configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// [`next_chunk`](FlushBuffer::next_chunk) returns the stored error.
    #[default]
    Report,
    /// [`next_chunk`](FlushBuffer::next_chunk) blocks indefinitely: no
    /// output, no end-of-stream signal. For pipelines that learn about the
    /// failure from the write side and tear the consumer down themselves.
    Stall,
}

/// Configuration for [`FlushBuffer`].
#[derive(Debug, Clone)]
pub struct FlushConfig {
    /// Buffer capacity in bytes. Also the upper bound on the size of every
    /// output chunk, and the exact size of every non-final chunk produced
    /// from a stream of fitting writes. Must be greater than zero.
    pub flush_threshold: usize,
    /// What the read side observes after a fatal error.
    pub error_policy: ErrorPolicy,
}

impl Default for FlushConfig {
    fn default() -> Self {
        FlushConfig {
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            error_policy: ErrorPolicy::Report,
        }
    }
}

/// Buffer lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    /// Accepting writes, not yet ready to flush.
    Buffering,
    /// The next pending chunk does not fit; writes are blocked until the
    /// read side consumes the buffer and resets it.
    WaitingForFlush,
    /// `finish` was called; whatever is buffered is the final chunk.
    Done,
    /// A fatal error occurred; both sides are permanently disabled.
    Error(BufferError),
}

/// A thread-safe fixed-threshold coalescing buffer.
///
/// `FlushBuffer` sits between a byte producer and a byte consumer. The
/// write side appends chunks to an internal buffer of `flush_threshold`
/// capacity; the read side receives the accumulated bytes as one
/// consolidated chunk once the next write would overflow, or once the
/// producer calls [`finish`](Self::finish). Many small writes become few
/// large reads.
///
/// # Semantics
///
/// - **Write**: blocks while the chunk does not fit in the remaining
///   space, until the read side flushes. A chunk larger than the whole
///   threshold is a fatal error: chunks are never split.
/// - **Read**: blocks while the buffer is still filling, returns the full
///   buffer once a write overflows it, the residue after `finish`, and
///   `None` once drained.
/// - **Finish**: marks end of input. It does not flush by itself; the
///   read side picks up the remaining bytes.
///
/// Bytes come out in exactly the order they went in, and each flushed
/// buffer is handed to the consumer whole, then replaced by a fresh
/// allocation. A producer that stalls without calling `finish` leaves the
/// read side blocked; there is no timeout.
///
/// # Example
///
/// ```
/// use coalesce_buffer::FlushBuffer;
/// use std::thread;
///
/// let buf = FlushBuffer::with_threshold(4);
/// let writer = buf.clone();
///
/// let producer = thread::spawn(move || {
///     for _ in 0..4 {
///         writer.write(b"ab").unwrap();
///     }
///     writer.finish().unwrap();
/// });
///
/// let chunks: Vec<Vec<u8>> = buf.chunks().map(Result::unwrap).collect();
/// producer.join().unwrap();
/// assert_eq!(chunks, vec![b"abab".to_vec(), b"abab".to_vec()]);
/// ```
pub struct FlushBuffer {
    inner: Arc<FlushBufferInner>,
}

struct FlushBufferInner {
    config: FlushConfig,
    shared: Mutex<Shared>,
    /// Signaled when the buffer becomes flushable: overflow, finish, error.
    flushable: Condvar,
    /// Signaled when the read side resets the buffer and frees space.
    writable: Condvar,
}

struct Shared {
    buf: Vec<u8>, // len() is the fill position, capacity the threshold
    state: State,
}

impl Clone for FlushBuffer {
    fn clone(&self) -> Self {
        FlushBuffer {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Default for FlushBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FlushBuffer {
    /// Creates a new FlushBuffer with the default configuration
    /// (10 MiB threshold).
    pub fn new() -> Self {
        Self::with_config(FlushConfig::default())
    }

    /// Creates a new FlushBuffer with the specified flush threshold.
    ///
    /// # Panics
    ///
    /// Panics if the threshold is zero.
    pub fn with_threshold(flush_threshold: usize) -> Self {
        Self::with_config(FlushConfig {
            flush_threshold,
            ..FlushConfig::default()
        })
    }

    /// Creates a new FlushBuffer with the specified configuration.
    ///
    /// # Panics
    ///
    /// Panics if `config.flush_threshold` is zero.
    pub fn with_config(config: FlushConfig) -> Self {
        assert!(
            config.flush_threshold > 0,
            "flush threshold must be greater than 0"
        );
        let buf = Vec::with_capacity(config.flush_threshold);

        FlushBuffer {
            inner: Arc::new(FlushBufferInner {
                config,
                shared: Mutex::new(Shared {
                    buf,
                    state: State::Buffering,
                }),
                flushable: Condvar::new(),
                writable: Condvar::new(),
            }),
        }
    }

    /// Returns the flush threshold.
    pub fn flush_threshold(&self) -> usize {
        self.inner.config.flush_threshold
    }

    /// Returns the number of bytes accumulated since the last flush.
    pub fn buffered(&self) -> usize {
        let shared = self.inner.shared.lock().unwrap();
        shared.buf.len()
    }

    /// Returns true if no bytes are currently buffered.
    pub fn is_empty(&self) -> bool {
        self.buffered() == 0
    }

    /// Returns the fatal error that disabled the buffer, if any.
    pub fn error(&self) -> Option<BufferError> {
        let shared = self.inner.shared.lock().unwrap();
        match shared.state {
            State::Error(ref err) => Some(err.clone()),
            _ => None,
        }
    }

    /// Writes one chunk to the buffer.
    ///
    /// Blocks while the chunk does not fit in the remaining space, until
    /// the read side flushes the accumulated bytes. The chunk is always
    /// copied whole; a chunk larger than the flush threshold returns
    /// [`BufferError::ChunkTooBig`] and permanently disables the buffer.
    ///
    /// After a fatal error this is a silent no-op: the chunk is dropped
    /// and `Ok(())` is returned. The error was already reported once.
    pub fn write(&self, chunk: &[u8]) -> Result<()> {
        let mut shared = self.inner.shared.lock().unwrap();

        match shared.state {
            State::Error(_) => return Ok(()),
            State::Done => return Err(BufferError::Finished),
            State::Buffering | State::WaitingForFlush => {}
        }

        if chunk.is_empty() {
            return Ok(());
        }

        let threshold = self.inner.config.flush_threshold;
        if chunk.len() > threshold {
            debug!("chunk too big: {} > {}", chunk.len(), threshold);
            let err = BufferError::ChunkTooBig {
                len: chunk.len(),
                threshold,
            };
            self.fail(&mut shared, err.clone());
            return Err(err);
        }

        // Wait until the chunk fits. The read side resets the buffer when
        // it picks up the flushed bytes, which is what frees space here.
        while shared.buf.len() + chunk.len() > threshold {
            debug!(
                "chunk of {} bytes does not fit, {} buffered, waiting for flush",
                chunk.len(),
                shared.buf.len()
            );
            self.set_state(&mut shared, State::WaitingForFlush);
            self.inner.flushable.notify_all();
            shared = self.inner.writable.wait(shared).unwrap();
            match shared.state {
                State::Error(_) => return Ok(()),
                State::Done => return Err(BufferError::Finished),
                State::Buffering | State::WaitingForFlush => {}
            }
        }

        let start = shared.buf.len();
        shared.buf.extend_from_slice(chunk);
        let copied = shared.buf.len() - start;
        if copied != chunk.len() {
            let err = BufferError::ShortCopy {
                copied,
                expected: chunk.len(),
            };
            self.fail(&mut shared, err.clone());
            return Err(err);
        }
        debug!("copied {} bytes, {} buffered", copied, shared.buf.len());

        Ok(())
    }

    /// Signals end of input.
    ///
    /// Any buffered bytes become the final chunk, picked up by the next
    /// [`next_chunk`](Self::next_chunk) call. Idempotent; a no-op after a
    /// fatal error.
    pub fn finish(&self) -> Result<()> {
        let mut shared = self.inner.shared.lock().unwrap();
        match shared.state {
            State::Error(_) | State::Done => Ok(()),
            State::Buffering | State::WaitingForFlush => {
                self.set_state(&mut shared, State::Done);
                self.inner.flushable.notify_all();
                self.inner.writable.notify_all();
                Ok(())
            }
        }
    }

    /// Returns the next coalesced chunk, or `None` at end of stream.
    ///
    /// Blocks while the buffer is still filling. Every returned chunk is
    /// at most `flush_threshold` bytes; the final chunk after
    /// [`finish`](Self::finish) may be shorter. Taking a chunk starts a
    /// fresh buffer and unblocks any writer waiting for space.
    ///
    /// After a fatal error the behavior follows the configured
    /// [`ErrorPolicy`]: `Report` returns the error, `Stall` never returns.
    pub fn next_chunk(&self) -> Result<Option<Vec<u8>>> {
        let mut shared = self.inner.shared.lock().unwrap();
        loop {
            match shared.state {
                State::Error(ref err) => match self.inner.config.error_policy {
                    ErrorPolicy::Report => return Err(err.clone()),
                    ErrorPolicy::Stall => {
                        shared = self.inner.flushable.wait(shared).unwrap();
                    }
                },
                State::Done => {
                    if shared.buf.is_empty() {
                        debug!("drained, end of stream");
                        return Ok(None);
                    }
                    let chunk = mem::take(&mut shared.buf);
                    debug!("flushing final chunk of {} bytes", chunk.len());
                    return Ok(Some(chunk));
                }
                State::WaitingForFlush => {
                    let threshold = self.inner.config.flush_threshold;
                    let chunk = mem::replace(&mut shared.buf, Vec::with_capacity(threshold));
                    self.set_state(&mut shared, State::Buffering);
                    self.inner.writable.notify_all();
                    debug!("flushing chunk of {} bytes", chunk.len());
                    return Ok(Some(chunk));
                }
                State::Buffering => {
                    shared = self.inner.flushable.wait(shared).unwrap();
                }
            }
        }
    }

    fn fail(&self, shared: &mut Shared, err: BufferError) {
        self.set_state(shared, State::Error(err));
        // Buffered bytes are abandoned, nothing will flush them.
        shared.buf = Vec::new();
        self.inner.flushable.notify_all();
        self.inner.writable.notify_all();
    }

    fn set_state(&self, shared: &mut Shared, next: State) {
        if shared.state != next {
            debug!("state {:?} -> {:?}", shared.state, next);
            shared.state = next;
        }
    }
}
