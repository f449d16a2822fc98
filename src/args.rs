use crate::adb::BackendKind;
use crate::template_matching::Dimensions;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Android ADB daemon that finds the connect button and taps it
#[derive(Debug, Parser)]
#[command(
    name = "android-adb-connect",
    version = env!("APP_VERSION_DISPLAY"),
    after_help = concat!("Copyright (c) ", env!("APP_BUILD_YEAR"), " Vigor Solutions")
)]
pub struct Cli {
    /// TOML configuration file; built-in defaults when omitted
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging for this crate (RUST_LOG still wins)
    #[arg(long, global = true)]
    pub debug: bool,

    /// ADB implementation, overriding the config file
    #[arg(long, value_enum, global = true)]
    pub backend: Option<BackendKind>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Sweep connected devices until interrupted (default)
    Run {
        /// Stop after a single sweep
        #[arg(long)]
        once: bool,
        /// Process devices one after another
        #[arg(long)]
        sequential: bool,
    },
    /// Match a template against a screenshot file, no device needed
    Match {
        screenshot: PathBuf,
        template: PathBuf,
        /// Physical display size, WIDTHxHEIGHT, to print the tap point
        #[arg(long, value_parser = parse_device_size)]
        device_size: Option<Dimensions>,
    },
    /// Capture one screenshot from a device
    Screenshot {
        /// Device serial; the first connected device when omitted
        #[arg(short, long)]
        device: Option<String>,
        #[arg(short, long, default_value = "cli-screenshot.png")]
        output: PathBuf,
    },
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run {
            once: false,
            sequential: false,
        })
    }
}

/// Parse `1080x2400` into dimensions
pub fn parse_device_size(value: &str) -> Result<Dimensions, String> {
    let invalid = || format!("invalid device size '{value}', expected WIDTHxHEIGHT");
    let (w, h) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(invalid)?;
    let width: u32 = w.trim().parse().map_err(|_| invalid())?;
    let height: u32 = h.trim().parse().map_err(|_| invalid())?;
    if width == 0 || height == 0 {
        return Err(invalid());
    }
    Ok(Dimensions::new(width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_default_command_is_run() {
        let cli = Cli::try_parse_from(["android-adb-connect"]).unwrap();
        assert_eq!(
            cli.command(),
            Command::Run {
                once: false,
                sequential: false
            }
        );
        assert!(!cli.debug);
        assert_eq!(cli.backend, None);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "android-adb-connect",
            "run",
            "--once",
            "--backend",
            "rust",
            "--debug",
            "--config",
            "connect.toml",
        ])
        .unwrap();
        assert_eq!(
            cli.command(),
            Command::Run {
                once: true,
                sequential: false
            }
        );
        assert_eq!(cli.backend, Some(BackendKind::Rust));
        assert!(cli.debug);
        assert_eq!(cli.config, Some(PathBuf::from("connect.toml")));
    }

    #[test]
    fn test_match_command() {
        let cli = Cli::try_parse_from([
            "android-adb-connect",
            "match",
            "screen.png",
            "template.png",
            "--device-size",
            "1080x2400",
        ])
        .unwrap();
        assert_eq!(
            cli.command(),
            Command::Match {
                screenshot: PathBuf::from("screen.png"),
                template: PathBuf::from("template.png"),
                device_size: Some(Dimensions::new(1080, 2400)),
            }
        );
    }

    #[test]
    fn test_screenshot_defaults() {
        let cli = Cli::try_parse_from(["android-adb-connect", "screenshot"]).unwrap();
        assert_eq!(
            cli.command(),
            Command::Screenshot {
                device: None,
                output: PathBuf::from("cli-screenshot.png"),
            }
        );
    }

    #[test]
    fn test_unknown_backend_rejected() {
        assert!(Cli::try_parse_from(["android-adb-connect", "--backend", "usb"]).is_err());
    }

    #[test]
    fn test_help_carries_build_year() {
        let help = <Cli as CommandFactory>::command().render_long_help().to_string();
        assert!(help.contains(env!("APP_BUILD_YEAR")));
        assert!(help.contains("Vigor Solutions"));
    }

    #[test]
    fn test_parse_device_size() {
        assert_eq!(parse_device_size("1080x2400"), Ok(Dimensions::new(1080, 2400)));
        assert_eq!(parse_device_size(" 720X1280 "), Ok(Dimensions::new(720, 1280)));
        assert!(parse_device_size("1080").is_err());
        assert!(parse_device_size("0x2400").is_err());
        assert!(parse_device_size("widexhigh").is_err());
        assert!(parse_device_size("-1x5").is_err());
    }
}
