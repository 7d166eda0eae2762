//! CLI argument definitions for the bisq-watcher daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

use bisq_watcher_core::config::WatcherAppConfig;
use bisq_watcher_core::error::{ConfigError, WatcherError};
use bisq_watcher_log_pipeline::LogPipelineError;

/// Exit code for a missing configuration file.
pub const EXIT_CONFIG_NOT_FOUND: u8 = 2;
/// Exit code for an unparsable or invalid configuration.
pub const EXIT_CONFIG_INVALID: u8 = 3;
/// Exit code for a rule catalog that cannot be loaded.
pub const EXIT_RULES_INVALID: u8 = 4;
/// Exit code for any other failure.
pub const EXIT_FAILURE: u8 = 1;

/// Bisq log watcher daemon.
///
/// Tails one or more Bisq log files, matches records against the rule
/// catalog and forwards notifications to console, file and Telegram sinks.
#[derive(Parser, Debug)]
#[command(name = "bisq-watcher")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to bisq-watcher.toml configuration file.
    #[arg(short, long, default_value = "bisq-watcher.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration and rule catalog, then exit.
    #[arg(long)]
    pub validate: bool,

    /// Print the effective rule map of every sink, then exit.
    #[arg(long)]
    pub dump_rules: bool,
}

impl DaemonCli {
    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply_overrides(&self, config: &mut WatcherAppConfig) {
        if let Some(level) = &self.log_level {
            config.general.log_level.clone_from(level);
        }
        if let Some(format) = &self.log_format {
            config.general.log_format.clone_from(format);
        }
    }
}

/// Map an error chain to the process exit code.
pub fn exit_code(error: &anyhow::Error) -> u8 {
    for cause in error.chain() {
        if let Some(WatcherError::Config(config_error)) = cause.downcast_ref::<WatcherError>() {
            return match config_error {
                ConfigError::FileNotFound { .. } => EXIT_CONFIG_NOT_FOUND,
                ConfigError::ParseFailed { .. } | ConfigError::InvalidValue { .. } => {
                    EXIT_CONFIG_INVALID
                }
            };
        }
        if let Some(pipeline_error) = cause.downcast_ref::<LogPipelineError>() {
            return match pipeline_error {
                LogPipelineError::RuleLoad { .. }
                | LogPipelineError::RuleValidation { .. }
                | LogPipelineError::Yaml(_) => EXIT_RULES_INVALID,
                LogPipelineError::Config { .. } => EXIT_CONFIG_INVALID,
                _ => EXIT_FAILURE,
            };
        }
    }
    EXIT_FAILURE
}
