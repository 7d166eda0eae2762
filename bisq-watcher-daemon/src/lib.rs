//! bisq-watcher daemon library.
//!
//! This library exposes internal modules for integration testing.
//! In production, `bisq-watcher` is used as a binary (main.rs).

pub mod cli;
pub mod health;
pub mod logging;
pub mod orchestrator;
