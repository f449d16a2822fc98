use super::error::AdbResult;
use super::rust_impl::RustAdb;
use super::shell::AdbShell;
use super::types::{Device, DeviceControl, DeviceProvider};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which ADB implementation drives the devices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// The `adb` binary from Android Platform Tools
    #[default]
    Shell,
    /// Pure Rust client talking to the local ADB server
    Rust,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Shell => f.write_str("shell"),
            BackendKind::Rust => f.write_str("rust"),
        }
    }
}

pub enum AdbBackend {
    Shell(AdbShell),
    Rust(RustAdb),
}

impl AdbBackend {
    pub async fn list_devices(kind: BackendKind) -> AdbResult<Vec<Device>> {
        match kind {
            BackendKind::Shell => AdbShell::list_devices().await,
            BackendKind::Rust => RustAdb::list_devices().await,
        }
    }

    pub async fn new_with_device(name: &str, kind: BackendKind) -> AdbResult<Self> {
        match kind {
            BackendKind::Shell => Ok(AdbBackend::Shell(AdbShell::new_with_device(name).await?)),
            BackendKind::Rust => Ok(AdbBackend::Rust(RustAdb::new_with_device(name).await?)),
        }
    }

    /// Open the first listed device
    pub async fn connect_first(kind: BackendKind) -> AdbResult<Option<Self>> {
        let devices = Self::list_devices(kind).await?;
        match devices.into_iter().next() {
            Some(first) => Ok(Some(Self::new_with_device(&first.name, kind).await?)),
            None => Ok(None),
        }
    }
}

/// A backend kind opens real devices through that implementation
impl DeviceProvider for BackendKind {
    type Device = AdbBackend;

    async fn list_devices(&self) -> AdbResult<Vec<Device>> {
        AdbBackend::list_devices(*self).await
    }

    async fn open(&self, name: &str) -> AdbResult<AdbBackend> {
        AdbBackend::new_with_device(name, *self).await
    }
}

impl DeviceControl for AdbBackend {
    fn device_id(&self) -> &str {
        match self {
            AdbBackend::Shell(s) => s.device_id(),
            AdbBackend::Rust(r) => r.device_id(),
        }
    }

    fn screen_dimensions(&self) -> (u32, u32) {
        match self {
            AdbBackend::Shell(s) => s.screen_dimensions(),
            AdbBackend::Rust(r) => r.screen_dimensions(),
        }
    }

    async fn shell(&self, args: &[&str]) -> AdbResult<String> {
        match self {
            AdbBackend::Shell(s) => s.shell(args).await,
            AdbBackend::Rust(r) => r.shell(args).await,
        }
    }

    async fn capture_png(&self) -> AdbResult<Vec<u8>> {
        match self {
            AdbBackend::Shell(s) => s.capture_png().await,
            AdbBackend::Rust(r) => r.capture_png().await,
        }
    }

    async fn tap(&self, x: u32, y: u32) -> AdbResult<()> {
        match self {
            AdbBackend::Shell(s) => s.tap(x, y).await,
            AdbBackend::Rust(r) => r.tap(x, y).await,
        }
    }
}
