use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use bisq_watcher_core::config::WatcherAppConfig;
use bisq_watcher_daemon::cli::{DaemonCli, exit_code};
use bisq_watcher_daemon::logging::init_tracing;
use bisq_watcher_daemon::orchestrator::{Orchestrator, load_catalog};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = DaemonCli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "bisq-watcher terminated");
            eprintln!("error: {e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}

async fn run(cli: DaemonCli) -> Result<()> {
    let mut config = WatcherAppConfig::from_file(&cli.config)
        .await
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;
    config.apply_env_overrides();
    cli.apply_overrides(&mut config);
    config.validate().context("config validation failed")?;

    if cli.validate {
        let catalog = load_catalog(&config).await?;
        println!(
            "configuration is valid: {} watcher(s), {} rule(s)",
            config.watchers.len(),
            catalog.len()
        );
        return Ok(());
    }

    init_tracing(&config.general)?;
    bisq_watcher_core::metrics::describe_all();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "bisq-watcher starting");

    let mut orchestrator = Orchestrator::build_from_config(config).await?;

    if cli.dump_rules {
        let mut stdout = std::io::stdout().lock();
        orchestrator.write_rule_report(&mut stdout)?;
        return Ok(());
    }

    orchestrator.run().await?;
    tracing::info!("bisq-watcher shut down");
    Ok(())
}
