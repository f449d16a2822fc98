// One device's connect routine: unlock, network, launch, find, tap, confirm
use super::capture::{CaptureError, DeviceScreen, ScreenSource};
use super::poller::VisibilityPoller;
use super::shutdown::Shutdown;
use super::types::{PollOutcome, SessionOutcome};
use crate::adb::{AdbError, DeviceControl};
use crate::config::AppConfig;
use crate::logging::device_log;
use crate::template_matching::{DeviceGeometry, Dimensions, MatchEngine, Template, VisionError};
use std::time::Duration;
use thiserror::Error;

/// A failure that ends one device's session; other devices carry on
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Device command failed: {source}")]
    Device {
        #[from]
        source: AdbError,
    },

    #[error("{source}")]
    Capture {
        #[from]
        source: CaptureError,
    },

    #[error("Image matching failed: {source}")]
    Vision {
        #[from]
        source: VisionError,
    },

    #[error("Unable to get screen dimensions.")]
    UnknownScreenSize,

    #[error("Screenshot capture failed while waiting for '{template}'")]
    PollCaptureFailed { template: String },
}

/// Reference images every session matches against, loaded once
#[derive(Debug, Clone)]
pub struct References {
    /// The button that starts the connection
    pub connect: Template,
    /// Only on screen once the app is connected
    pub connected: Template,
}

pub struct DeviceSession<'a, D: DeviceControl> {
    device: &'a D,
    config: &'a AppConfig,
    references: &'a References,
    engine: &'a MatchEngine,
    shutdown: Shutdown,
}

impl<'a, D: DeviceControl> DeviceSession<'a, D> {
    pub fn new(
        device: &'a D,
        config: &'a AppConfig,
        references: &'a References,
        engine: &'a MatchEngine,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            device,
            config,
            references,
            engine,
            shutdown,
        }
    }

    fn id(&self) -> &str {
        self.device.device_id()
    }

    /// Run the whole routine. The screenshot artifact is removed on every path.
    pub async fn run(&self) -> Result<SessionOutcome, SessionError> {
        device_log!(info, self.id(), "Starting processing of device.");
        let screen = DeviceScreen::new(
            self.device,
            &self.config.artifact_dir,
            self.config.timing.capture_settle(),
        );
        let result = self.run_steps(&screen).await;

        device_log!(info, self.id(), "Cleaning up...");
        screen.cleanup().await;

        match &result {
            Ok(outcome) => device_log!(info, self.id(), "Session finished: {outcome}"),
            Err(SessionError::Device { source }) if source.is_disconnect() => {
                device_log!(error, self.id(), "{source} (device may be disconnected)")
            }
            Err(e) => device_log!(error, self.id(), "{e}. Exiting."),
        }
        result
    }

    async fn run_steps<S: ScreenSource>(&self, screen: &S) -> Result<SessionOutcome, SessionError> {
        let timing = &self.config.timing;

        self.unlock().await;
        if !self.settle(timing.unlock_settle()).await {
            return Ok(SessionOutcome::Cancelled);
        }
        self.manage_network().await;
        if !self.settle(timing.network_settle()).await {
            return Ok(SessionOutcome::Cancelled);
        }
        self.open_app().await;
        if !self.settle(timing.app_launch() + timing.app_settle()).await {
            return Ok(SessionOutcome::Cancelled);
        }

        let screenshot = screen.capture().await?;
        let geometry = self.geometry(screenshot.dimensions())?;

        // Sentinel first: when both images match, already connected wins
        if self
            .engine
            .locate(&screenshot, &self.references.connected)
            .await?
            .is_some()
        {
            device_log!(info, self.id(), "Device is already connected. Skipping tap action.");
            self.press_home().await;
            return Ok(SessionOutcome::AlreadyConnected);
        }

        let Some(button) = self
            .engine
            .locate(&screenshot, &self.references.connect)
            .await?
        else {
            device_log!(error, self.id(), "Connect button not found on the screen.");
            return Ok(SessionOutcome::ConnectButtonNotFound);
        };
        device_log!(
            info,
            self.id(),
            "Connect button found at coordinates: x={}, y={}, width={}, height={}",
            button.x,
            button.y,
            button.width,
            button.height
        );

        let (x, y) = geometry.tap_point(&button);
        device_log!(debug, self.id(), "Adjusted tap coordinates: x={x}, y={y}");
        self.tap(x, y).await;

        let poller = VisibilityPoller::new(screen, self.engine, self.id(), self.shutdown.clone());
        let polling = &self.config.polling;

        let gone = poller.poll(&self.references.connect, polling.disappear()).await;
        match gone.outcome {
            PollOutcome::Disappeared => device_log!(
                info,
                self.id(),
                "Tap action confirmed. Connect button is no longer on the screen."
            ),
            PollOutcome::Cancelled => return Ok(SessionOutcome::Cancelled),
            _ => device_log!(
                warn,
                self.id(),
                "Connect button is still on the screen after tap action."
            ),
        }

        let shown = poller.poll(&self.references.connected, polling.appear()).await;
        match shown.outcome {
            PollOutcome::Appeared => {
                device_log!(info, self.id(), "Device successfully connected.");
                self.press_home().await;
                Ok(SessionOutcome::Connected)
            }
            PollOutcome::Cancelled => Ok(SessionOutcome::Cancelled),
            PollOutcome::CaptureFailed => Err(SessionError::PollCaptureFailed {
                template: self.references.connected.name().to_string(),
            }),
            _ => {
                device_log!(error, self.id(), "Failed to confirm connection on device.");
                Ok(SessionOutcome::ConnectionUnconfirmed)
            }
        }
    }

    fn geometry(&self, screenshot: Dimensions) -> Result<DeviceGeometry, SessionError> {
        let (width, height) = self.device.screen_dimensions();
        let device = Dimensions::new(width, height);
        if device.is_empty() {
            return Err(SessionError::UnknownScreenSize);
        }
        device_log!(
            debug,
            self.id(),
            "Screen dimensions: {device}, screenshot dimensions: {screenshot}"
        );
        Ok(DeviceGeometry::new(screenshot, device)?)
    }

    /// Wait out a settle delay; `false` if shutdown was requested
    async fn settle(&self, duration: Duration) -> bool {
        let finished = self.shutdown.sleep(duration).await;
        if !finished {
            device_log!(info, self.id(), "Shutdown requested, abandoning session");
        }
        finished
    }

    /// Run a shell step whose failure is logged but not fatal
    async fn best_effort(&self, args: &[&str]) -> Option<String> {
        match self.device.shell(args).await {
            Ok(stdout) => Some(stdout),
            Err(e) => {
                device_log!(warn, self.id(), "'{}' failed: {e}", args.join(" "));
                None
            }
        }
    }

    async fn unlock(&self) {
        device_log!(info, self.id(), "Unlocking the device...");
        let unlock = &self.config.unlock;
        let [x1, y1, x2, y2] = unlock.swipe.map(|v| v.to_string());
        let duration = unlock.swipe_duration_ms.to_string();
        self.best_effort(&["input", "keyevent", "KEYCODE_WAKEUP"]).await;
        self.best_effort(&["wm", "dismiss-keyguard"]).await;
        self.best_effort(&[
            "input",
            "swipe",
            x1.as_str(),
            y1.as_str(),
            x2.as_str(),
            y2.as_str(),
            duration.as_str(),
        ])
        .await;
    }

    async fn manage_network(&self) {
        device_log!(info, self.id(), "Managing network connections...");
        let network = &self.config.network;
        if network.disable_wifi {
            self.best_effort(&["svc", "wifi", "disable"]).await;
        }
        if network.enable_mobile_data {
            self.best_effort(&["svc", "data", "enable"]).await;
        }
        let Some(vpn) = self.best_effort(&["dumpsys", "vpn"]).await else {
            return;
        };
        if vpn_is_up(&vpn) {
            device_log!(info, self.id(), "VPN is active. Attempting to disconnect...");
            for package in &network.vpn_packages {
                self.best_effort(&["am", "force-stop", package.as_str()])
                    .await;
            }
        } else {
            device_log!(info, self.id(), "No active VPN detected.");
        }
    }

    async fn open_app(&self) {
        let package = self.config.app_package.as_str();
        device_log!(info, self.id(), "Opening the app '{package}'...");
        self.best_effort(&[
            "monkey",
            "-p",
            package,
            "-c",
            "android.intent.category.LAUNCHER",
            "1",
        ])
        .await;
    }

    async fn tap(&self, x: u32, y: u32) {
        device_log!(info, self.id(), "Tapping on the device at coordinates: x={x}, y={y}");
        match self.device.tap(x, y).await {
            Ok(()) => device_log!(info, self.id(), "Tap command executed successfully."),
            Err(e) => device_log!(error, self.id(), "Error executing tap command: {e}"),
        }
    }

    async fn press_home(&self) {
        device_log!(info, self.id(), "Pressing the home button to minimize the app.");
        match self.device.shell(&["input", "keyevent", "KEYCODE_HOME"]).await {
            Ok(_) => device_log!(info, self.id(), "Home button pressed successfully."),
            Err(e) => device_log!(error, self.id(), "Error pressing home button: {e}"),
        }
    }
}

/// Whether `dumpsys vpn` output reports an established VPN
pub fn vpn_is_up(dumpsys: &str) -> bool {
    dumpsys.contains("VPN is up")
}
