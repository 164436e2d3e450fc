use thiserror::Error;

/// Errors surfaced while assembling a knot.
#[derive(Debug, Error)]
pub enum KnotError {
    /// Engine buffer allocation failed (direct-mode mappings only).
    #[error("engine allocation failed: {0}")]
    Allocation(#[from] braid_codec::CodecError),
}

/// Result alias for knot construction.
pub type KnotResult<T> = Result<T, KnotError>;
