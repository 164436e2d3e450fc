use thiserror::Error;

/// Errors from buffer and engine operations.
///
/// Decode-side errors indicate a corrupted or misaligned buffer read and are
/// not locally recoverable; callers are expected to propagate them.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A five-byte varint whose final byte carries bits beyond a `u32`.
    #[error("invalid varint at offset {offset}: fifth byte has high bits set")]
    InvalidVarInt { offset: u32 },

    /// A varint that runs past the end of the written data.
    #[error("truncated varint at offset {offset}")]
    TruncatedVarInt { offset: u32 },

    /// A read addressed beyond the written portion of the buffer.
    #[error("offset {offset} beyond written data (length {written})")]
    OffsetOutOfBounds { offset: u32, written: u32 },

    /// Segment allocation failed (direct-mode mappings only).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
