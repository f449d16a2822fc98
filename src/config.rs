use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::adb::BackendKind;
use crate::automation::PollSpec;
use crate::error::{AppError, AppResult};
use crate::template_matching::MatchConfig;

/// Process-wide settings, built once at startup and passed down explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Image of the button that starts the connection
    pub connect_template: PathBuf,
    /// Image only visible once the app reports it is connected
    pub connected_template: PathBuf,
    pub app_package: String,
    /// Where per-device screenshots are written
    pub artifact_dir: PathBuf,
    pub backend: BackendKind,
    /// Process devices in parallel rather than one by one
    pub concurrent: bool,
    pub sweep_interval_secs: u64,
    pub matching: MatchConfig,
    pub timing: TimingConfig,
    pub polling: PollingConfig,
    pub network: NetworkConfig,
    pub unlock: UnlockConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            connect_template: PathBuf::from("template.png"),
            connected_template: PathBuf::from("stop.png"),
            app_package: "com.wskel.grass".to_string(),
            artifact_dir: PathBuf::from("."),
            backend: BackendKind::default(),
            concurrent: true,
            sweep_interval_secs: 600,
            matching: MatchConfig::default(),
            timing: TimingConfig::default(),
            polling: PollingConfig::default(),
            network: NetworkConfig::default(),
            unlock: UnlockConfig::default(),
        }
    }
}

/// Fixed waits after device actions, in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub unlock_settle_ms: u64,
    pub network_settle_ms: u64,
    pub app_launch_ms: u64,
    pub app_settle_ms: u64,
    /// Wait between taking a screenshot and reading it
    pub capture_settle_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            unlock_settle_ms: 1000,
            network_settle_ms: 2000,
            app_launch_ms: 5000,
            app_settle_ms: 2000,
            capture_settle_ms: 1000,
        }
    }
}

impl TimingConfig {
    pub fn unlock_settle(&self) -> Duration {
        Duration::from_millis(self.unlock_settle_ms)
    }

    pub fn network_settle(&self) -> Duration {
        Duration::from_millis(self.network_settle_ms)
    }

    pub fn app_launch(&self) -> Duration {
        Duration::from_millis(self.app_launch_ms)
    }

    pub fn app_settle(&self) -> Duration {
        Duration::from_millis(self.app_settle_ms)
    }

    pub fn capture_settle(&self) -> Duration {
        Duration::from_millis(self.capture_settle_ms)
    }
}

/// Bounds of the two visibility polls a session runs after tapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub disappear_timeout_secs: u64,
    pub disappear_interval_secs: u64,
    pub appear_timeout_secs: u64,
    pub appear_interval_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            disappear_timeout_secs: 10,
            disappear_interval_secs: 2,
            appear_timeout_secs: 30,
            appear_interval_secs: 5,
        }
    }
}

impl PollingConfig {
    pub fn disappear(&self) -> PollSpec {
        PollSpec::disappear(
            Duration::from_secs(self.disappear_timeout_secs),
            Duration::from_secs(self.disappear_interval_secs),
        )
    }

    pub fn appear(&self) -> PollSpec {
        PollSpec::appear(
            Duration::from_secs(self.appear_timeout_secs),
            Duration::from_secs(self.appear_interval_secs),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub disable_wifi: bool,
    pub enable_mobile_data: bool,
    /// Packages force-stopped when `dumpsys vpn` reports an active VPN
    pub vpn_packages: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            disable_wifi: true,
            enable_mobile_data: true,
            vpn_packages: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnlockConfig {
    /// Swipe gesture `[x1, y1, x2, y2]` that dismisses the lock screen
    pub swipe: [u32; 4],
    pub swipe_duration_ms: u32,
}

impl Default for UnlockConfig {
    fn default() -> Self {
        Self {
            swipe: [300, 1000, 300, 500],
            swipe_duration_ms: 500,
        }
    }
}

impl AppConfig {
    /// Read and validate a TOML config file
    pub fn load(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| AppError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        log::info!("Config loaded from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        self.matching
            .validate()
            .map_err(|e| AppError::InvalidConfig {
                reason: e.to_string(),
            })?;
        if self.polling.disappear_interval_secs == 0 || self.polling.appear_interval_secs == 0 {
            return Err(AppError::InvalidConfig {
                reason: "poll intervals must be at least one second".to_string(),
            });
        }
        if self.app_package.trim().is_empty() {
            return Err(AppError::InvalidConfig {
                reason: "app_package must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}
