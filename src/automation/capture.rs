// Screenshot acquisition through the device, via a per-device artifact file
use crate::adb::{AdbError, DeviceControl};
use crate::logging::device_log;
use crate::template_matching::{Screenshot, VisionError};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Screen capture failed: {source}")]
    Device {
        #[from]
        source: AdbError,
    },

    #[error("Failed to write screenshot {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Screenshot not found at {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Screenshot {path:?} is empty")]
    EmptyArtifact { path: PathBuf },

    #[error("Failed to read screenshot {path:?}: {source}")]
    Decode { path: PathBuf, source: VisionError },
}

/// Anything that can hand out a freshly taken screenshot
pub trait ScreenSource: Send + Sync {
    fn capture(&self) -> impl Future<Output = Result<Screenshot, CaptureError>> + Send;
}

/// `<dir>/screenshot_<id>.png`, with the id escaped into a file-name-safe form.
///
/// ASCII letters, digits, `.` and `-` are kept, `_` becomes `__` and every other
/// byte becomes `_XX` (upper-case hex). Distinct ids always give distinct paths.
pub fn artifact_path(dir: &Path, device_id: &str) -> PathBuf {
    let mut safe = String::with_capacity(device_id.len());
    for byte in device_id.bytes() {
        match byte {
            b'_' => safe.push_str("__"),
            b if b.is_ascii_alphanumeric() || b == b'.' || b == b'-' => safe.push(b as char),
            b => safe.push_str(&format!("_{b:02X}")),
        }
    }
    dir.join(format!("screenshot_{safe}.png"))
}

/// Captures one device's screen into its own artifact file and reads it back
pub struct DeviceScreen<'a, D: DeviceControl> {
    device: &'a D,
    path: PathBuf,
    settle: Duration,
}

impl<'a, D: DeviceControl> DeviceScreen<'a, D> {
    pub fn new(device: &'a D, artifact_dir: &Path, settle: Duration) -> Self {
        Self {
            path: artifact_path(artifact_dir, device.device_id()),
            device,
            settle,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the artifact; a missing file is fine
    pub async fn cleanup(&self) {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => device_log!(debug, self.device.device_id(), "Removed {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => device_log!(
                warn,
                self.device.device_id(),
                "Failed to remove {}: {e}",
                self.path.display()
            ),
        }
    }
}

impl<D: DeviceControl> ScreenSource for DeviceScreen<'_, D> {
    async fn capture(&self) -> Result<Screenshot, CaptureError> {
        let id = self.device.device_id();
        device_log!(debug, id, "Capturing screenshot on the device...");
        let png = self.device.capture_png().await?;
        // Let the capture fully flush before it is read
        tokio::time::sleep(self.settle).await;

        tokio::fs::write(&self.path, &png)
            .await
            .map_err(|source| CaptureError::Write {
                path: self.path.clone(),
                source,
            })?;

        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| CaptureError::Read {
                path: self.path.clone(),
                source,
            })?;
        if bytes.is_empty() {
            return Err(CaptureError::EmptyArtifact {
                path: self.path.clone(),
            });
        }
        let screenshot = Screenshot::from_bytes(&bytes).map_err(|source| CaptureError::Decode {
            path: self.path.clone(),
            source,
        })?;
        device_log!(
            debug,
            id,
            "Screenshot dimensions: {}",
            screenshot.dimensions()
        );
        Ok(screenshot)
    }
}
