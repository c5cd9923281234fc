//! Error types for deformview

use thiserror::Error;

/// Errors raised while loading, filtering and displaying meshes
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A filter that moves or decorates points along a vector field was
    /// given a mesh without one
    #[error("{0} requires a vector field on the mesh")]
    MissingVectors(&'static str),

    #[error("GPU error: {0}")]
    Gpu(String),

    #[error("Visualization error: {0}")]
    Visualization(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Result type alias for deformview operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(feature = "gpu")]
impl From<wgpu::BufferAsyncError> for Error {
    fn from(e: wgpu::BufferAsyncError) -> Self {
        Error::Gpu(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_vectors_names_the_filter() {
        assert_eq!(
            Error::MissingVectors("warp").to_string(),
            "warp requires a vector field on the mesh"
        );
    }

    #[test]
    fn test_io_error_converts() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "mesh.vtk").into();
        assert!(matches!(err, Error::Io(_)));
    }
}
