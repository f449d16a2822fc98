use super::error::{AdbError, AdbResult};
use super::types::{Device, DeviceControl, check_tap_bounds, parse_devices, parse_screen_size};
use tokio::process::Command;

/// Backend that drives the `adb` binary from Android Platform Tools
pub struct AdbShell {
    device: Device,
    screen_x: u32,
    screen_y: u32,
}

impl AdbShell {
    async fn ensure_adb_available() -> AdbResult<()> {
        match Command::new("adb").arg("version").output().await {
            Ok(out) if out.status.success() => Ok(()),
            Ok(out) => Err(AdbError::CommandFailed {
                command: "adb version".to_string(),
                status: out.status.to_string(),
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AdbError::AdbNotFound),
            Err(e) => Err(AdbError::Spawn {
                command: "adb version".to_string(),
                source: e,
            }),
        }
    }

    /// Run `adb <args>` and return raw stdout, failing on a non-zero exit
    async fn adb(args: &[&str]) -> AdbResult<Vec<u8>> {
        let command = format!("adb {}", args.join(" "));
        let output = Command::new("adb")
            .args(args)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    AdbError::AdbNotFound
                } else {
                    AdbError::Spawn {
                        command: command.clone(),
                        source: e,
                    }
                }
            })?;
        if !output.status.success() {
            return Err(AdbError::CommandFailed {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }

    /// Run `adb -s <serial> <args>` against this device
    async fn adb_device(&self, args: &[&str]) -> AdbResult<Vec<u8>> {
        let mut full = Vec::with_capacity(args.len() + 2);
        full.extend_from_slice(&["-s", self.device.name.as_str()]);
        full.extend_from_slice(args);
        Self::adb(&full).await
    }

    pub async fn list_devices() -> AdbResult<Vec<Device>> {
        Self::ensure_adb_available().await?;
        let stdout = Self::adb(&["devices", "-l"]).await?;
        Ok(parse_devices(&String::from_utf8_lossy(&stdout)))
    }

    pub async fn new_with_device(device_name: &str) -> AdbResult<Self> {
        let devices = Self::list_devices().await?;
        let device = devices
            .into_iter()
            .find(|d| d.name == device_name)
            .unwrap_or_else(|| Device {
                name: device_name.to_string(),
                transport_id: None,
            });
        let mut shell = Self {
            device,
            screen_x: 0,
            screen_y: 0,
        };
        let stdout = shell.shell(&["wm", "size"]).await?;
        let (screen_x, screen_y) = parse_screen_size(&stdout)?;
        shell.screen_x = screen_x;
        shell.screen_y = screen_y;
        log::debug!(
            "[{device_name}] screen dimensions: {screen_x}x{screen_y}, transport {}",
            shell.device.transport_id.as_deref().unwrap_or("unknown")
        );
        Ok(shell)
    }
}

impl DeviceControl for AdbShell {
    fn device_id(&self) -> &str {
        &self.device.name
    }

    fn screen_dimensions(&self) -> (u32, u32) {
        (self.screen_x, self.screen_y)
    }

    async fn shell(&self, args: &[&str]) -> AdbResult<String> {
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push("shell");
        full.extend_from_slice(args);
        let stdout = self.adb_device(&full).await?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }

    async fn capture_png(&self) -> AdbResult<Vec<u8>> {
        // exec-out keeps the PNG bytes free of tty newline translation
        self.adb_device(&["exec-out", "screencap", "-p"]).await
    }

    async fn tap(&self, x: u32, y: u32) -> AdbResult<()> {
        check_tap_bounds(x, y, self.screen_dimensions())?;
        let (xs, ys) = (x.to_string(), y.to_string());
        self.shell(&["input", "tap", &xs, &ys]).await?;
        Ok(())
    }
}
