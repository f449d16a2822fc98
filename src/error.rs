use crate::adb::AdbError;
use crate::automation::CaptureError;
use crate::template_matching::VisionError;
use std::path::PathBuf;
use thiserror::Error;

/// A specialized `Result` type for the application layer.
pub type AppResult<T> = Result<T, AppError>;

/// Failures that stop a command or the daemon as a whole.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Failed to read config {path:?}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {source}")]
    ConfigParse {
        #[from]
        source: toml::de::Error,
    },

    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },

    #[error("Reference image {path:?} unavailable: {source}")]
    Reference { path: PathBuf, source: VisionError },

    #[error("Image matching failed: {source}")]
    Vision {
        #[from]
        source: VisionError,
    },

    #[error("Device access failed: {source}")]
    Adb {
        #[from]
        source: AdbError,
    },

    #[error("Screen capture failed: {source}")]
    Capture {
        #[from]
        source: CaptureError,
    },

    #[error("Invalid device size '{value}', expected WIDTHxHEIGHT")]
    InvalidDeviceSize { value: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
