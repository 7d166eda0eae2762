#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, PipelineError, WatcherError};

// 설정
pub use config::{
    Activation, DebugConfig, GeneralConfig, OverwriteRule, SinkConfig, SinkKind, TimestampMode,
    WatcherAppConfig, WatcherConfig,
};

// 파이프라인 trait
pub use pipeline::{BoxFuture, HealthStatus, Pipeline};

// 도메인 타입
pub use types::{EventData, Severity};
