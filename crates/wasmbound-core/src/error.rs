//! Error types reported by the module engine.

use thiserror::Error;

/// Failure to turn a byte buffer into a [`Module`](crate::Module).
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The binary reader rejected the encoding (bad magic, truncated
    /// section, unknown opcode, ...).
    #[error("malformed module: {0}")]
    Malformed(#[from] wasmparser::BinaryReaderError),

    /// The encoding is readable but not a shape this engine represents.
    #[error("unsupported module: {0}")]
    Unsupported(String),

    /// Sections decoded, but their contents are inconsistent.
    #[error("invalid module structure: {0}")]
    Structure(String),

    /// Strict decoding ran the validator and it rejected the module.
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// The validator's verdict on an encoded module.
#[derive(Debug, Clone, Error)]
#[error("validation failed at offset {offset:#x}: {message}")]
pub struct ValidationError {
    pub offset: usize,
    pub message: String,
}

impl From<wasmparser::BinaryReaderError> for ValidationError {
    fn from(err: wasmparser::BinaryReaderError) -> Self {
        ValidationError {
            offset: err.offset(),
            message: err.message().to_string(),
        }
    }
}
