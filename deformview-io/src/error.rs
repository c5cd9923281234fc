//! Error types for I/O operations

use thiserror::Error;

/// Errors that can occur during I/O operations
#[derive(Error, Debug)]
pub enum IoError {
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid file format: {format}")]
    InvalidFormat { format: String },

    #[error("Parse error at byte {offset}: {message}")]
    ParseError { offset: usize, message: String },

    #[error("Unexpected end of file while reading {context}")]
    UnexpectedEof { context: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<IoError> for deformview_core::Error {
    fn from(e: IoError) -> Self {
        match e {
            IoError::Io(io) => deformview_core::Error::Io(io),
            IoError::InvalidFormat { format } => deformview_core::Error::UnsupportedFormat(format),
            other => deformview_core::Error::InvalidData(other.to_string()),
        }
    }
}
