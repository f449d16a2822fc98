pub mod adb;
pub mod args;
pub mod automation;
pub mod config;
pub mod error;
pub mod logging;
pub mod template_matching;

pub use adb::AdbBackend;
pub use automation::Daemon;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use template_matching::MatchEngine;
