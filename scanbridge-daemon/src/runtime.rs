use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use scanbridge_core::config::{LogFormat, LoggingConfig};
use scanbridge_core::{Config, ValidatedConfig};
use scanbridge_sync::{run_pass, EngineConfig, PassSummary, SyncEngine, SyncScope};

use crate::error::{io_err, DaemonError};
use crate::wiring::{Services, SinkMode};

/// Loop settings for [`Scheduler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub polling_interval: Duration,
    pub max_concurrency: usize,
    /// Refresh the enrichment snapshot before a pass once this much time has
    /// passed since the last fetch. `None` never refreshes.
    pub refresh_interval: Option<Duration>,
}

impl SchedulerConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            polling_interval: config.exporter.polling_interval(),
            max_concurrency: config.exporter.max_concurrency,
            refresh_interval: config.enrichment.refresh_interval(),
        }
    }
}

/// Runs one pass at a time, forever, until the engine's token is cancelled.
pub struct Scheduler {
    engine: SyncEngine,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(engine: SyncEngine, config: SchedulerConfig) -> Self {
        Self { engine, config }
    }

    /// Returns the number of passes run. A cancellation during a pass lets
    /// that pass finish; no new pass starts afterwards.
    pub async fn run(&self) -> u64 {
        let cancel = self.engine.cancellation().clone();
        let mut passes = 0u64;
        let mut last_refresh = Instant::now();

        loop {
            if cancel.is_cancelled() {
                break;
            }

            if let Some(every) = self.config.refresh_interval {
                if last_refresh.elapsed() >= every {
                    self.engine.enrichment().refresh().await;
                    last_refresh = Instant::now();
                }
            }

            match run_pass(&self.engine, SyncScope::All, self.config.max_concurrency).await {
                Ok(summary) => log_summary(passes, &summary),
                Err(err) => tracing::warn!(
                    pass = passes,
                    error = %err,
                    "resource listing failed, retrying next interval"
                ),
            }
            passes += 1;

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.polling_interval) => {}
            }
        }

        tracing::info!(passes, "scheduler stopped");
        passes
    }
}

fn log_summary(pass: u64, summary: &PassSummary) {
    for result in &summary.results {
        if result.is_failed() {
            tracing::warn!(
                pass,
                resource = %result.resource_name,
                outcome = ?result.outcome,
                elapsed_ms = result.elapsed.as_millis() as u64,
                "resource failed"
            );
        } else {
            tracing::info!(
                pass,
                resource = %result.resource_name,
                created = result.created_count,
                skipped = result.skipped_count,
                unchanged = result.is_noop(),
                elapsed_ms = result.elapsed.as_millis() as u64,
                "resource done"
            );
        }
    }
}

/// Start the scheduler and block the current thread until a shutdown signal.
pub fn start_blocking(validated: ValidatedConfig) -> Result<(), DaemonError> {
    init_tracing(&validated.config.logging);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio runtime", e))?;
    runtime.block_on(run(validated))
}

/// Connect services, run the scheduler until SIGINT / SIGTERM, then close
/// the sink.
pub async fn run(validated: ValidatedConfig) -> Result<(), DaemonError> {
    let ValidatedConfig { config, warnings } = validated;
    for warning in &warnings {
        tracing::warn!(%warning, "configuration warning");
    }

    let services = Services::connect(&config, SinkMode::Write).await?;
    let cancel = CancellationToken::new();
    let engine = services.engine(EngineConfig::from_config(&config), cancel.clone());
    let scheduler = Scheduler::new(engine, SchedulerConfig::from_config(&config));

    let signal_handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => Ok::<(), DaemonError>(()),
                signal = shutdown_signal() => {
                    let name = signal?;
                    tracing::info!(signal = name, "shutting down after in-flight work");
                    cancel.cancel();
                    Ok(())
                }
            }
        })
    };

    scheduler.run().await;
    cancel.cancel();
    let signal_result = signal_handle.await;
    services.close().await;
    handle_join("signal_handler", signal_result)
}

/// One pass outside the scheduler, used by `scanbridge once`.
pub async fn run_once(
    config: &Config,
    scope: SyncScope,
    mode: SinkMode,
) -> Result<PassSummary, DaemonError> {
    let services = Services::connect(config, mode).await?;
    let engine = services.engine(EngineConfig::from_config(config), CancellationToken::new());
    let outcome = run_pass(&engine, scope, config.exporter.max_concurrency).await;
    services.close().await;
    Ok(outcome?)
}

/// Resolves on SIGINT, or SIGTERM on unix.
pub async fn shutdown_signal() -> Result<&'static str, DaemonError> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut term =
            signal(SignalKind::terminate()).map_err(|e| io_err("SIGTERM handler", e))?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                res.map_err(|e| io_err("ctrl-c handler", e))?;
                Ok("SIGINT")
            }
            _ = term.recv() => Ok("SIGTERM"),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| io_err("ctrl-c handler", e))?;
        Ok("ctrl-c")
    }
}

fn handle_join(
    task: &'static str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Task {
            task,
            reason: err.to_string(),
        }),
    }
}

/// Install the global subscriber on stderr. `RUST_LOG` wins over the
/// configured level.
pub fn init_tracing(logging: &LoggingConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = match logging.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
}
