//! Watcher orchestration -- assembly, lifecycle management and shutdown.
//!
//! The [`Orchestrator`] is the central coordinator of the daemon.
//! It loads configuration and the rule catalog, builds one
//! [`Watcher`] per `[[watchers]]` entry, starts them, waits for a
//! shutdown signal and stops them in order.
//!
//! # Startup
//!
//! Watchers start in configuration order. If one fails to start,
//! the ones already running are stopped again before the error is returned.
//!
//! # Shutdown
//!
//! Every running watcher announces the received signal to its sinks,
//! then stops: the poller ends, an in-flight read cycle completes,
//! and the sinks are closed after the event channel drains.

use std::collections::HashSet;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use bisq_watcher_core::config::WatcherAppConfig;
use bisq_watcher_core::pipeline::Pipeline;
use bisq_watcher_log_pipeline::config::resolve_path;
use bisq_watcher_log_pipeline::{
    RuleCatalog, RuleLoader, RuleResolver, Watcher, WatcherBuilder, WatcherState,
};

use crate::health::{DaemonHealth, WatcherHealth, aggregate_status};

/// Interval between periodic health log lines.
const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(60);

/// The main daemon orchestrator.
pub struct Orchestrator {
    /// Loaded and validated configuration.
    config: WatcherAppConfig,
    /// Shared rule catalog (system rules included).
    catalog: Arc<RuleCatalog>,
    /// One watcher per configured log file, in configuration order.
    watchers: Vec<Watcher>,
    /// Daemon start time (for uptime reporting).
    start_time: Instant,
}

impl Orchestrator {
    /// Load configuration and build the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read or parsed
    /// - Configuration validation fails
    /// - The rule catalog cannot be loaded
    /// - Any watcher fails to build
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = WatcherAppConfig::load(config_path)
            .await
            .context("failed to load config")?;
        Self::build_from_config(config).await
    }

    /// Build from an already-loaded configuration.
    ///
    /// The rule catalog is loaded from `general.rules_path`.
    pub async fn build_from_config(config: WatcherAppConfig) -> Result<Self> {
        config.validate().context("config validation failed")?;
        let catalog = load_catalog(&config).await?;
        Self::build_with_catalog(config, Arc::new(catalog))
    }

    /// Build from a configuration and an already-loaded catalog.
    pub fn build_with_catalog(config: WatcherAppConfig, catalog: Arc<RuleCatalog>) -> Result<Self> {
        config.validate().context("config validation failed")?;

        // A bot token is long-polled by the first watcher that uses it.
        let mut polled_tokens = HashSet::new();
        let watchers = config
            .watchers
            .iter()
            .map(|watcher_config| {
                tracing::info!(watcher = %watcher_config.name, "initializing watcher");
                let watcher = WatcherBuilder::new()
                    .config(watcher_config.clone())
                    .catalog(Arc::clone(&catalog))
                    .skip_bot_tokens(polled_tokens.clone())
                    .build()
                    .with_context(|| format!("failed to build watcher '{}'", watcher_config.name))?;
                polled_tokens.extend(
                    watcher_config
                        .enabled_sinks()
                        .filter_map(|sink| sink.command_token())
                        .map(str::to_owned),
                );
                Ok(watcher)
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(
            watchers = watchers.len(),
            rules = catalog.len(),
            "orchestrator initialized"
        );

        Ok(Self {
            config,
            catalog,
            watchers,
            start_time: Instant::now(),
        })
    }

    /// Start all watchers and block until a shutdown signal arrives.
    ///
    /// # Shutdown Triggers
    ///
    /// - `SIGTERM` (from systemd, Docker, or `kill`)
    /// - `SIGINT` (Ctrl+C)
    pub async fn run(&mut self) -> Result<()> {
        self.start_all().await?;

        tracing::info!("entering main loop");
        let signal = {
            let shutdown = wait_for_shutdown_signal();
            tokio::pin!(shutdown);
            let mut health_tick = tokio::time::interval(HEALTH_LOG_INTERVAL);
            health_tick.tick().await;
            loop {
                tokio::select! {
                    signal = &mut shutdown => break signal?,
                    _ = health_tick.tick() => self.log_health().await,
                }
            }
        };
        tracing::info!(signal = signal, "shutdown signal received");

        self.shutdown(signal).await
    }

    /// Start every watcher in configuration order.
    ///
    /// On failure, watchers that already started are stopped again.
    pub async fn start_all(&mut self) -> Result<()> {
        tracing::info!("starting all watchers");
        for index in 0..self.watchers.len() {
            if let Err(e) = self.watchers[index].start().await {
                tracing::warn!(
                    watcher = %self.watchers[index].name(),
                    error = %e,
                    "startup failed, rolling back already-started watchers"
                );
                for started in &mut self.watchers[..index] {
                    if let Err(stop_err) = started.stop().await {
                        tracing::error!(
                            watcher = %started.name(),
                            error = %stop_err,
                            "rollback failed to stop watcher"
                        );
                    }
                }
                let name = self.watchers[index].name().to_owned();
                return Err(
                    anyhow::Error::new(e).context(format!("failed to start watcher '{name}'"))
                );
            }
        }
        Ok(())
    }

    /// Announce the signal to every running watcher and stop them all.
    ///
    /// All watchers are stopped even if one fails; the first error is returned.
    pub async fn shutdown(&mut self, signal: &str) -> Result<()> {
        tracing::info!("stopping all watchers");
        let mut first_error = None;
        for watcher in &mut self.watchers {
            if watcher.state() != WatcherState::Running {
                continue;
            }
            watcher.announce_shutdown(signal).await;
            if let Err(e) = watcher.stop().await {
                tracing::error!(watcher = %watcher.name(), error = %e, "failed to stop watcher");
                if first_error.is_none() {
                    first_error = Some(
                        anyhow::Error::new(e)
                            .context(format!("failed to stop watcher '{}'", watcher.name())),
                    );
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => {
                tracing::info!("all watchers stopped");
                Ok(())
            }
        }
    }

    /// Get the current aggregated health status.
    pub async fn health(&self) -> DaemonHealth {
        let mut watchers = Vec::with_capacity(self.watchers.len());
        for watcher in &self.watchers {
            watchers.push(WatcherHealth {
                name: watcher.name().to_owned(),
                log_file: watcher.log_path().display().to_string(),
                status: watcher.health_check().await,
            });
        }

        DaemonHealth {
            status: aggregate_status(&watchers),
            uptime_secs: self.start_time.elapsed().as_secs(),
            watchers,
        }
    }

    async fn log_health(&self) {
        let report = self.health().await;
        if report.status.is_healthy() {
            tracing::debug!(uptime_secs = report.uptime_secs, "daemon healthy");
        } else {
            let details = serde_json::to_string(&report.watchers).unwrap_or_default();
            tracing::warn!(status = %report.status, watchers = %details, "daemon not healthy");
        }
    }

    /// Write the effective rule map of every sink of every watcher.
    pub fn write_rule_report<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        use colored::Colorize;

        for watcher_config in &self.config.watchers {
            writeln!(
                w,
                "{} {} ({})",
                "Watcher".bold(),
                watcher_config.name.cyan(),
                watcher_config.log_file
            )?;
            let resolver = RuleResolver::new(&self.catalog, &watcher_config.overwrite_rules);
            for (index, sink) in watcher_config.sinks.iter().enumerate() {
                if sink.disabled {
                    writeln!(w, "  sink #{index} {} {}", sink.kind, "disabled".yellow())?;
                    continue;
                }
                let map = resolver.resolve(sink);
                writeln!(
                    w,
                    "  sink #{index} {} level>={} rules={}",
                    sink.kind.to_string().green(),
                    map.threshold(),
                    map.len()
                )?;
                for name in map.sorted_names() {
                    writeln!(w, "    {name}")?;
                }
            }
        }
        Ok(())
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &WatcherAppConfig {
        &self.config
    }

    /// Get the shared rule catalog.
    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    /// Get the watchers in configuration order.
    pub fn watchers(&self) -> &[Watcher] {
        &self.watchers
    }
}

/// Load the rule catalog referenced by `general.rules_path`.
///
/// # Errors
///
/// Returns an error if the path cannot be expanded or the catalog is invalid.
pub async fn load_catalog(config: &WatcherAppConfig) -> Result<RuleCatalog> {
    let path = resolve_path(&config.general.rules_path).context("failed to resolve rules_path")?;
    let catalog = RuleLoader::load_catalog(&path)
        .await
        .with_context(|| format!("failed to load rule catalog from {}", path.display()))?;
    tracing::info!(path = %path.display(), rules = catalog.len(), "rule catalog loaded");
    Ok(catalog)
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
///
/// # Errors
///
/// Returns an error if signal handlers cannot be installed.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for Ctrl+C.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("failed to install Ctrl+C handler: {}", e))?;
    Ok("SIGINT")
}
