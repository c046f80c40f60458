//! Error types for signal encoding and decoding.

use thiserror::Error;

use crate::signal::{Dtype, Shape};

/// Result type alias for codec operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Codec error kinds.
///
/// Every variant is a local validation failure reported synchronously to the
/// caller. Nothing in the codec stack retries.
#[derive(Debug, Error)]
pub enum Error {
    /// A rank or length precondition was violated.
    #[error("invalid shape: {0}")]
    InvalidShape(String),

    /// Predictor order is not smaller than the series length.
    #[error("invalid predictor order {order} for a series of {length} time points")]
    InvalidOrder { order: usize, length: usize },

    /// Quantization step must be positive.
    #[error("invalid quantization step {step}: must be at least 1")]
    InvalidStep { step: u32 },

    /// Dtype code or name outside the supported set.
    #[error("unsupported dtype: {0}")]
    UnsupportedDtype(String),

    /// Header (or signal) dtype disagrees with the caller-supplied dtype.
    #[error("dtype mismatch: expected {expected}, found {found}")]
    DtypeMismatch { expected: Dtype, found: Dtype },

    /// Header shape disagrees with the caller-supplied shape.
    #[error("shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch { expected: Shape, found: Shape },

    /// Truncated buffer, inconsistent symbol table, or otherwise malformed frame.
    #[error("corrupt header: {0}")]
    CorruptHeader(String),

    /// A lossless algorithm failed to reproduce its input.
    #[error("lossless round-trip mismatch at flat index {index}")]
    LosslessMismatch { index: usize },

    /// Container payload checksum verification failed.
    #[error("checksum mismatch: expected 0x{expected:016x}, got 0x{actual:016x}")]
    ChecksumMismatch { expected: u64, actual: u64 },

    /// Stored artifact was produced by a different algorithm version.
    #[error("version mismatch for {algorithm}: stored {stored}, current {current}")]
    VersionMismatch {
        algorithm: String,
        stored: String,
        current: String,
    },

    /// No algorithm with this name is registered.
    #[error("unknown algorithm '{0}'")]
    UnknownAlgorithm(String),

    /// A byte backend (zstd, lz4, zlib) reported a failure.
    #[error("{codec} error: {message}")]
    Codec {
        codec: &'static str,
        message: String,
    },

    /// I/O error from the container reader or writer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a corrupt header error.
    pub fn corrupt(message: impl Into<String>) -> Self {
        Error::CorruptHeader(message.into())
    }

    /// Create a backend error.
    pub fn codec(codec: &'static str, message: impl ToString) -> Self {
        Error::Codec {
            codec,
            message: message.to_string(),
        }
    }
}
