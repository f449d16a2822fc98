use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A specialized `Result` type for visual matching.
pub type VisionResult<T> = Result<T, VisionError>;

/// Which side of a match an image plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRole {
    Screenshot,
    Template,
}

impl fmt::Display for ImageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageRole::Screenshot => f.write_str("screenshot"),
            ImageRole::Template => f.write_str("template"),
        }
    }
}

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("{role} image has zero area ({width}x{height})")]
    EmptyImage {
        role: ImageRole,
        width: u32,
        height: u32,
    },

    #[error("Failed to load {role} image from {path:?}: {source}")]
    Load {
        role: ImageRole,
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Failed to decode {role} image: {source}")]
    Decode {
        role: ImageRole,
        source: image::ImageError,
    },

    #[error("Invalid match configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Matching task failed to complete: {source}")]
    JoinError {
        #[from]
        source: tokio::task::JoinError,
    },
}
