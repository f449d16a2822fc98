// https://crates.io/crates/adb_client
use super::error::{AdbError, AdbResult};
use super::types::{Device, DeviceControl, check_tap_bounds, parse_screen_size};
use adb_client::{ADBDeviceExt, ADBServer, ADBServerDevice, DeviceState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const SHELL_TIMEOUT: Duration = Duration::from_secs(10);
const CAPTURE_TIMEOUT: Duration = Duration::from_secs(15);

/// Only serials in `device` state accept commands; offline and unauthorized are skipped
pub(crate) fn is_ready(state: &DeviceState) -> bool {
    matches!(state, DeviceState::Device)
}

/// Backend that talks to the local ADB server through `adb_client`
pub struct RustAdb {
    device: Device,
    server_device: Arc<Mutex<ADBServerDevice>>,
    screen_x: u32,
    screen_y: u32,
}

impl RustAdb {
    pub async fn list_devices() -> AdbResult<Vec<Device>> {
        let mut server = ADBServer::default();
        let device_list = tokio::task::spawn_blocking(move || server.devices()).await??;
        Ok(device_list
            .into_iter()
            .filter(|d| {
                let ready = is_ready(&d.state);
                if !ready {
                    log::debug!("Skipping {} in state {:?}", d.identifier, d.state);
                }
                ready
            })
            .map(|d| Device {
                name: d.identifier,
                transport_id: None,
            })
            .collect())
    }

    pub async fn new_with_device(device_name: &str) -> AdbResult<Self> {
        let mut server = ADBServer::default();
        let name = device_name.to_string();
        let server_device = tokio::task::spawn_blocking(move || server.get_device_by_name(&name))
            .await?
            .map_err(|source| AdbError::DeviceOpenFailed {
                device: device_name.to_string(),
                source,
            })?;

        let mut adb = RustAdb {
            device: Device {
                name: device_name.to_string(),
                transport_id: None,
            },
            server_device: Arc::new(Mutex::new(server_device)),
            screen_x: 0,
            screen_y: 0,
        };
        let stdout = adb.shell(&["wm", "size"]).await?;
        let (screen_x, screen_y) = parse_screen_size(&stdout)?;
        adb.screen_x = screen_x;
        adb.screen_y = screen_y;
        log::debug!("[{device_name}] screen dimensions: {screen_x}x{screen_y}");
        Ok(adb)
    }

    /// Run a shell command on the blocking pool, bounded by `limit`
    async fn run_shell(&self, args: &[&str], limit: Duration) -> AdbResult<Vec<u8>> {
        let command = args.join(" ");
        let owned: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        let server_device = Arc::clone(&self.server_device);

        // Wrap the blocking shell_command in spawn_blocking so timeout can work
        let task = tokio::task::spawn_blocking(move || {
            let refs: Vec<&str> = owned.iter().map(String::as_str).collect();
            let mut out: Vec<u8> = Vec::new();
            let mut dev = server_device.blocking_lock();
            dev.shell_command(&refs, &mut out).map(|_| out)
        });

        match tokio::time::timeout(limit, task).await {
            Ok(joined) => joined?.map_err(|source| AdbError::ShellCommandFailed { command, source }),
            Err(_) => Err(AdbError::Timeout {
                duration: limit,
                description: format!(
                    "'{command}' on {} (device may be disconnected)",
                    self.device.name
                ),
            }),
        }
    }
}

impl DeviceControl for RustAdb {
    fn device_id(&self) -> &str {
        &self.device.name
    }

    fn screen_dimensions(&self) -> (u32, u32) {
        (self.screen_x, self.screen_y)
    }

    async fn shell(&self, args: &[&str]) -> AdbResult<String> {
        let out = self.run_shell(args, SHELL_TIMEOUT).await?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    async fn capture_png(&self) -> AdbResult<Vec<u8>> {
        self.run_shell(&["screencap", "-p"], CAPTURE_TIMEOUT).await
    }

    async fn tap(&self, x: u32, y: u32) -> AdbResult<()> {
        check_tap_bounds(x, y, self.screen_dimensions())?;
        let (xs, ys) = (x.to_string(), y.to_string());
        self.run_shell(&["input", "tap", &xs, &ys], SHELL_TIMEOUT)
            .await
            .map(|_| ())
    }
}
