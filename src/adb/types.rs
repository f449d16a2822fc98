// Core ADB types and traits
use super::error::{AdbError, AdbResult};
use serde::Serialize;
use std::future::Future;

/// A device as listed by the ADB server
#[derive(Debug, PartialEq, Eq, Serialize, Clone)]
pub struct Device {
    pub name: String,
    pub transport_id: Option<String>,
}

// Operations a session needs from one device (shell or rust implementations).
// Futures are `Send` so sessions can run on spawned tasks.
pub trait DeviceControl: Send + Sync {
    /// Serial the device was opened with
    fn device_id(&self) -> &str;

    /// Physical display size as reported by `wm size`
    fn screen_dimensions(&self) -> (u32, u32);

    /// Run `adb shell <args>` and return stdout
    fn shell(&self, args: &[&str]) -> impl Future<Output = AdbResult<String>> + Send;

    /// Encoded PNG of the current screen
    fn capture_png(&self) -> impl Future<Output = AdbResult<Vec<u8>>> + Send;

    fn tap(&self, x: u32, y: u32) -> impl Future<Output = AdbResult<()>> + Send;
}

/// Lists and opens devices; the daemon's only way to reach hardware
pub trait DeviceProvider: Send + Sync + 'static {
    type Device: DeviceControl + 'static;

    /// Serials ready for commands
    fn list_devices(&self) -> impl Future<Output = AdbResult<Vec<Device>>> + Send;

    fn open(&self, name: &str) -> impl Future<Output = AdbResult<Self::Device>> + Send;
}

/// Reject taps outside the display (pixels `0..width`, `0..height`); an
/// unknown (zero) size accepts anything
pub fn check_tap_bounds(x: u32, y: u32, screen: (u32, u32)) -> AdbResult<()> {
    let (sx, sy) = screen;
    if sx == 0 || sy == 0 || (x < sx && y < sy) {
        Ok(())
    } else {
        Err(AdbError::TapOutOfBounds { x, y })
    }
}

/// Parse the `Physical size: WxH` line of `wm size` output.
///
/// An `Override size:` line is ignored: taps address the physical panel.
pub fn parse_screen_size(stdout: &str) -> AdbResult<(u32, u32)> {
    for line in stdout.lines() {
        if let Some(size_str) = line.trim().strip_prefix("Physical size: ") {
            let parts: Vec<&str> = size_str.trim().split('x').collect();
            if parts.len() == 2
                && let (Ok(x), Ok(y)) = (parts[0].parse::<u32>(), parts[1].parse::<u32>())
            {
                return Ok((x, y));
            }
        }
    }
    Err(AdbError::ScreenSizeParseFailed)
}

/// Parse `adb devices [-l]` output, keeping entries in state `device`
pub fn parse_devices(output: &str) -> Vec<Device> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() >= 2 && parts[1] == "device" {
                let transport_id = parts
                    .iter()
                    .find_map(|part| part.strip_prefix("transport_id:"))
                    .map(str::to_string);
                Some(Device {
                    name: parts[0].to_string(),
                    transport_id,
                })
            } else {
                None
            }
        })
        .collect()
}
