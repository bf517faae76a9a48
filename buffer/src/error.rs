//! Error types for the coalescing buffer.

/// Result type alias for buffer operations.
pub type Result<T> = std::result::Result<T, BufferError>;

/// Error type for [`FlushBuffer`](crate::FlushBuffer) operations.
///
/// `ChunkTooBig` and `ShortCopy` are fatal: they permanently disable the
/// buffer instance. Each is returned exactly once, to the writer that
/// triggered it; later writes are silently dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    /// A single chunk was larger than the flush threshold. Chunks are
    /// never split across flushes, so a chunk that cannot fit in an empty
    /// buffer can never be accepted.
    #[error(
        "chunk of {len} bytes exceeds the flush threshold of {threshold}: \
         chunks are never split, increase the flush threshold"
    )]
    ChunkTooBig {
        /// Length of the rejected chunk.
        len: usize,
        /// Flush threshold of the buffer that rejected it.
        threshold: usize,
    },

    /// Fewer bytes were appended to the buffer than the chunk contained.
    /// This check guards an internal invariant and indicates a bug if it
    /// ever fires.
    #[error("unexpected number of bytes copied: {copied} of {expected}")]
    ShortCopy {
        /// Bytes actually appended.
        copied: usize,
        /// Bytes requested.
        expected: usize,
    },

    /// A chunk was written after `finish`.
    #[error("write after finish")]
    Finished,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_too_big_display() {
        let err = BufferError::ChunkTooBig { len: 2, threshold: 1 };
        assert_eq!(
            format!("{}", err),
            "chunk of 2 bytes exceeds the flush threshold of 1: \
             chunks are never split, increase the flush threshold"
        );
    }

    #[test]
    fn test_short_copy_display() {
        let err = BufferError::ShortCopy { copied: 3, expected: 5 };
        assert_eq!(format!("{}", err), "unexpected number of bytes copied: 3 of 5");
    }

    #[test]
    fn test_finished_display() {
        assert_eq!(format!("{}", BufferError::Finished), "write after finish");
    }
}
