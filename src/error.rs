//! Error types for hermes-facet

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Field not found: {0}")]
    FieldNotFound(String),

    #[error("Invalid field type: expected {expected}, got {got}")]
    InvalidFieldType { expected: String, got: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(
        "the reader state provided to this class does not match the reader being searched; \
         you must create a new reader state every time you open a new index reader"
    )]
    ReaderMismatch,

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Index corruption: {0}")]
    Corruption(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for an `InvalidArgument` with a formatted message.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }
}
