//! Error types for decode operations.

use std::io;
use thiserror::Error;

/// Decode operation error.
///
/// Every recoverable failure in this crate is expressed through this
/// enum; nothing here panics or unwinds into the caller.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The source file could not be opened or read.
    #[error("cannot open source: {0}")]
    SourceUnavailable(#[from] io::Error),

    /// The container header is malformed or unrecognized.
    #[error("invalid header: {0}")]
    HeaderInvalid(String),

    /// The codec library reported an internal decode error.
    #[error("decode failed: {0}")]
    DecodeFailed(String),

    /// A buffer or codec object could not be allocated.
    #[error("allocation failed: {0}")]
    AllocationFailed(String),

    /// A null, empty, or otherwise unusable input argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type for decode operations.
pub type DecodeResult<T> = Result<T, DecodeError>;
