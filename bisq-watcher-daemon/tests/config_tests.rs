//! Configuration loading and validation tests.
//!
//! Tests TOML parsing, environment variable overrides, CLI overrides and validation.

use std::env;
use std::io::Write;

use clap::Parser;
use serial_test::serial;

use bisq_watcher_core::config::{SinkKind, TimestampMode, WatcherAppConfig};
use bisq_watcher_core::types::Severity;
use bisq_watcher_daemon::cli::{DaemonCli, EXIT_CONFIG_INVALID, EXIT_CONFIG_NOT_FOUND, exit_code};

const FULL_CONFIG: &str = r#"
[general]
log_level = "debug"
log_format = "json"
rules_path = "/etc/bisq-watcher/rules"

[[watchers]]
name = "main"
log_file = "/var/lib/bisq/bisq.log"
poll_interval_ms = 500

[watchers.debug]
at_start_build_event_cache_only = false
overlapping_go_back_n_positions = 4096
use_hash = false
max_events = 5000

[[watchers.overwrite_rules]]
event_name = "BlockchainDownloadProgressTracker"
activation = "inactive"

[[watchers.sinks]]
type = "console"
timestamp = true
level = "info"

[[watchers.sinks]]
type = "file"
filename = "./logs/app.log"
timestamp = "%d.%m.%Y %H:%M:%S"

[[watchers.sinks]]
type = "telegram"
api_token = "123:abc"
chat_ids = ["42"]
level = "notice"

[[watchers.sinks.overwrite_rules]]
event_name = "BlockchainDownloadProgressTracker"
activation = "active"
"#;

#[test]
fn test_parse_full_config() {
    // Given: A complete TOML config
    // When: Parsing and validating
    let config = WatcherAppConfig::parse(FULL_CONFIG).expect("config should parse");
    config.validate().expect("config should be valid");

    // Then: Every section is populated
    assert_eq!(config.general.log_level, "debug");
    assert_eq!(config.general.log_format, "json");
    let watcher = &config.watchers[0];
    assert_eq!(watcher.poll_interval_ms, 500);
    assert_eq!(watcher.debug.max_events, Some(5000));
    assert!(!watcher.debug.use_hash);
    assert_eq!(watcher.sinks.len(), 3);
    assert_eq!(watcher.sinks[0].timestamp, TimestampMode::Iso);
    assert_eq!(
        watcher.sinks[1].timestamp,
        TimestampMode::Custom("%d.%m.%Y %H:%M:%S".to_owned())
    );
    assert_eq!(watcher.sinks[2].kind, SinkKind::Telegram);
    assert_eq!(watcher.sinks[2].level, Severity::Notice);
    assert_eq!(watcher.sinks[2].overwrite_rules.len(), 1);
}

#[test]
fn test_telegram_sink_without_token_is_invalid() {
    // Given: A telegram sink missing its api_token
    let toml_str = r#"
[[watchers]]
log_file = "/tmp/bisq.log"

[[watchers.sinks]]
type = "telegram"
chat_ids = ["1"]
"#;

    // When: Validating
    let err = WatcherAppConfig::parse(toml_str)
        .expect("should parse")
        .validate()
        .expect_err("should be invalid");

    // Then: The field is named and the exit code is the config one
    assert!(err.to_string().contains("api_token"));
    assert_eq!(exit_code(&anyhow::Error::new(err)), EXIT_CONFIG_INVALID);
}

#[tokio::test]
async fn test_missing_config_file_maps_to_exit_code() {
    // Given: A path that does not exist
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("missing.toml");

    // When: Loading
    let err = WatcherAppConfig::load(&path).await.expect_err("should fail");

    // Then: Exit code 2
    assert_eq!(exit_code(&anyhow::Error::new(err)), EXIT_CONFIG_NOT_FOUND);
}

#[tokio::test]
#[serial]
async fn test_cli_overrides_win_over_env_and_file() {
    // Given: A config file, an env override and a CLI override
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(FULL_CONFIG.as_bytes()).expect("write");
    // SAFETY: serialized test, no other thread reads the environment
    unsafe {
        env::set_var("BISQ_WATCHER_GENERAL_LOG_LEVEL", "warn");
        env::set_var("BISQ_WATCHER_GENERAL_LOG_FORMAT", "pretty");
    }
    let cli = DaemonCli::parse_from(["bisq-watcher", "--log-level", "trace"]);

    // When: Loading as the daemon does
    let mut config = WatcherAppConfig::from_file(file.path()).await.expect("load");
    config.apply_env_overrides();
    cli.apply_overrides(&mut config);

    // SAFETY: see above
    unsafe {
        env::remove_var("BISQ_WATCHER_GENERAL_LOG_LEVEL");
        env::remove_var("BISQ_WATCHER_GENERAL_LOG_FORMAT");
    }

    // Then: CLI beats env, env beats file
    assert_eq!(config.general.log_level, "trace");
    assert_eq!(config.general.log_format, "pretty");
}
