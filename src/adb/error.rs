use thiserror::Error;

/// A specialized `Result` type for ADB operations.
pub type AdbResult<T> = Result<T, AdbError>;

/// The error type for all ADB-related operations.
#[derive(Debug, Error)]
pub enum AdbError {
    #[error(
        "'adb' binary not found in PATH. Install Android Platform Tools (https://developer.android.com/tools/adb) or run with --backend rust."
    )]
    AdbNotFound,

    #[error("Failed to run '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("'{command}' exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("Failed to enumerate devices: {source}")]
    DeviceEnumerationFailed {
        #[from]
        source: adb_client::RustADBError,
    },

    #[error("Failed to open device '{device}': {source}")]
    DeviceOpenFailed {
        device: String,
        source: adb_client::RustADBError,
    },

    #[error("Shell command '{command}' failed: {source}")]
    ShellCommandFailed {
        command: String,
        source: adb_client::RustADBError,
    },

    #[error("Could not parse screen size from 'wm size' output.")]
    ScreenSizeParseFailed,

    #[error("Tap coordinates are out of bounds: x={x}, y={y}")]
    TapOutOfBounds { x: u32, y: u32 },

    #[error("Operation timed out after {duration:?}: {description}")]
    Timeout {
        duration: std::time::Duration,
        description: String,
    },

    #[error("Task failed to complete: {source}")]
    JoinError {
        #[from]
        source: tokio::task::JoinError,
    },
}

impl AdbError {
    /// Whether the device probably went away (unplugged, adb server restarted)
    pub fn is_disconnect(&self) -> bool {
        match self {
            AdbError::Timeout { .. } => true,
            AdbError::CommandFailed { stderr, .. } => {
                let stderr = stderr.to_ascii_lowercase();
                stderr.contains("not found")
                    || stderr.contains("offline")
                    || stderr.contains("no devices")
            }
            AdbError::ShellCommandFailed { source, .. } => {
                let text = source.to_string().to_ascii_lowercase();
                text.contains("broken pipe") || text.contains("connection reset")
            }
            _ => false,
        }
    }
}
