use android_adb_connect::adb::{AdbBackend, BackendKind, DeviceControl};
use android_adb_connect::args::{Cli, Command};
use android_adb_connect::automation::{Daemon, ShutdownController, load_template};
use android_adb_connect::template_matching::{DeviceGeometry, Dimensions, MatchEngine, Screenshot};
use android_adb_connect::{AppConfig, AppResult, logging};
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.debug);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("Failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> AppResult<ExitCode> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }

    match cli.command() {
        Command::Run { once, sequential } => {
            if sequential {
                config.concurrent = false;
            }
            run_daemon(config, once).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Match {
            screenshot,
            template,
            device_size,
        } => match_files(&config, &screenshot, &template, device_size).await,
        Command::Screenshot { device, output } => {
            capture_to_file(config.backend, device.as_deref(), &output).await
        }
    }
}

async fn run_daemon(config: AppConfig, once: bool) -> AppResult<()> {
    log::info!(
        "android-adb-connect v{} starting ({} backend, {})",
        env!("APP_VERSION_DISPLAY"),
        config.backend,
        if config.concurrent { "parallel" } else { "sequential" }
    );

    let controller = Arc::new(ShutdownController::new());
    let daemon = Daemon::new(config, controller.subscribe())?;

    let signals = Arc::clone(&controller);
    tokio::spawn(async move {
        if let Err(e) = signals.wait_for_signal().await {
            log::warn!("Signal handling unavailable: {e}");
        }
    });

    daemon.run(once).await
}

/// Offline match of two image files; exit code 1 when nothing matches
async fn match_files(
    config: &AppConfig,
    screenshot: &Path,
    template: &Path,
    device_size: Option<Dimensions>,
) -> AppResult<ExitCode> {
    config.matching.validate()?;
    let screen = Screenshot::open(screenshot)?;
    let template = load_template(template)?;
    let engine = MatchEngine::new(config.matching.clone());

    let Some(found) = engine.locate(&screen, &template).await? else {
        println!(
            "No match for '{}' in {} (threshold {:.2})",
            template.name(),
            screenshot.display(),
            config.matching.threshold
        );
        return Ok(ExitCode::from(1));
    };

    println!("{found}");
    if let Some(device) = device_size {
        let (x, y) = DeviceGeometry::new(screen.dimensions(), device)?.tap_point(&found);
        println!("Tap point on {device} device: x={x}, y={y}");
    }
    Ok(ExitCode::SUCCESS)
}

async fn capture_to_file(kind: BackendKind, serial: Option<&str>, output: &Path) -> AppResult<ExitCode> {
    let device = match serial {
        Some(serial) => AdbBackend::new_with_device(serial, kind).await?,
        None => match AdbBackend::connect_first(kind).await? {
            Some(device) => device,
            None => {
                log::error!("No connected devices found.");
                return Ok(ExitCode::FAILURE);
            }
        },
    };

    let (width, height) = device.screen_dimensions();
    log::info!(
        "Device: {} size: {width}x{height} ({kind} backend)",
        device.device_id()
    );
    let started = std::time::Instant::now();
    let bytes = device.capture_png().await?;
    tokio::fs::write(output, &bytes).await?;
    log::info!(
        "Screenshot ({} bytes, {}ms) saved to {}",
        bytes.len(),
        started.elapsed().as_millis(),
        output.display()
    );
    Ok(ExitCode::SUCCESS)
}
