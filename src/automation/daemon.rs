// Sweep loop: enumerate devices, run one session per device, wait, repeat
use super::session::{DeviceSession, References, SessionError};
use super::shutdown::Shutdown;
use super::types::SessionOutcome;
use crate::adb::{BackendKind, Device, DeviceProvider};
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::logging::device_log;
use crate::template_matching::{MatchEngine, Template};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Load a reference image; missing or unreadable is fatal
pub fn load_template(path: &Path) -> AppResult<Template> {
    let template = Template::open(path).map_err(|source| AppError::Reference {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!(
        "Loaded reference '{}' ({}) from {}",
        template.name(),
        template.dimensions(),
        path.display()
    );
    Ok(template)
}

impl References {
    pub fn load(config: &AppConfig) -> AppResult<Self> {
        Ok(Self {
            connect: load_template(&config.connect_template)?,
            connected: load_template(&config.connected_template)?,
        })
    }
}

/// Per-outcome tally of one sweep
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepSummary {
    pub outcomes: BTreeMap<String, usize>,
    pub failed: usize,
}

impl SweepSummary {
    pub fn record(&mut self, result: &Result<SessionOutcome, SessionError>) {
        match result {
            Ok(outcome) => *self.outcomes.entry(outcome.to_string()).or_default() += 1,
            Err(_) => self.failed += 1,
        }
    }

    pub fn count(&self, outcome: SessionOutcome) -> usize {
        self.outcomes.get(&outcome.to_string()).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.outcomes.values().sum::<usize>() + self.failed
    }
}

impl fmt::Display for SweepSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} device(s)", self.total())?;
        for (outcome, count) in &self.outcomes {
            write!(f, ", {count} {outcome}")?;
        }
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        Ok(())
    }
}

pub struct Daemon<P: DeviceProvider = BackendKind> {
    config: Arc<AppConfig>,
    references: Arc<References>,
    provider: Arc<P>,
    engine: MatchEngine,
    shutdown: Shutdown,
}

impl Daemon {
    /// Drive the devices of the configured backend.
    ///
    /// Fails when either reference image cannot be loaded.
    pub fn new(config: AppConfig, shutdown: Shutdown) -> AppResult<Self> {
        config.validate()?;
        let references = References::load(&config)?;
        let backend = config.backend;
        Ok(Self::with_provider(config, references, backend, shutdown))
    }
}

impl<P: DeviceProvider> Daemon<P> {
    pub fn with_provider(config: AppConfig, references: References, provider: P, shutdown: Shutdown) -> Self {
        Self {
            engine: MatchEngine::new(config.matching.clone()),
            config: Arc::new(config),
            references: Arc::new(references),
            provider: Arc::new(provider),
            shutdown,
        }
    }

    /// Sweep until no devices are connected or shutdown is requested.
    ///
    /// With `once`, stop after the first sweep.
    pub async fn run(&self, once: bool) -> AppResult<()> {
        loop {
            if self.shutdown.is_triggered() {
                break;
            }
            log::info!("Retrieving list of connected devices...");
            let devices = self.provider.list_devices().await?;
            if devices.is_empty() {
                log::warn!("No connected devices found. Exiting.");
                return Ok(());
            }
            let names: Vec<&str> = devices.iter().map(|d| d.name.as_str()).collect();
            log::info!("Connected devices: {names:?}");

            log::info!("Starting routine...");
            let summary = self.sweep(devices).await;

            if once {
                log::info!("Routine completed: {summary}.");
                break;
            }
            log::info!(
                "Routine completed: {summary}. Waiting for {:?} before next run...",
                self.config.sweep_interval()
            );
            if !self.shutdown.sleep(self.config.sweep_interval()).await {
                break;
            }
        }
        log::info!("Daemon stopped");
        Ok(())
    }

    /// One session per device, in parallel unless configured otherwise.
    ///
    /// A device that fails or whose task panics is counted as failed; the
    /// others run to completion.
    pub async fn sweep(&self, devices: Vec<Device>) -> SweepSummary {
        let mut summary = SweepSummary::default();
        if !self.config.concurrent {
            for device in devices {
                let result = process_device(
                    self.provider.as_ref(),
                    &device.name,
                    &self.config,
                    &self.references,
                    &self.engine,
                    self.shutdown.clone(),
                )
                .await;
                summary.record(&result);
            }
            return summary;
        }

        let mut workers = JoinSet::new();
        for device in devices {
            let provider = Arc::clone(&self.provider);
            let config = Arc::clone(&self.config);
            let references = Arc::clone(&self.references);
            let engine = self.engine.clone();
            let shutdown = self.shutdown.clone();
            workers.spawn(async move {
                process_device(
                    provider.as_ref(),
                    &device.name,
                    &config,
                    &references,
                    &engine,
                    shutdown,
                )
                .await
            });
        }
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(result) => summary.record(&result),
                Err(e) => {
                    log::error!("Device worker stopped unexpectedly: {e}");
                    summary.failed += 1;
                }
            }
        }
        summary
    }
}

/// Open a device and run its session; every failure stays with this device
async fn process_device<P: DeviceProvider>(
    provider: &P,
    name: &str,
    config: &AppConfig,
    references: &References,
    engine: &MatchEngine,
    shutdown: Shutdown,
) -> Result<SessionOutcome, SessionError> {
    let device = match provider.open(name).await {
        Ok(device) => device,
        Err(e) => {
            device_log!(error, name, "Failed to open device: {e}");
            return Err(e.into());
        }
    };
    DeviceSession::new(&device, config, references, engine, shutdown)
        .run()
        .await
}
