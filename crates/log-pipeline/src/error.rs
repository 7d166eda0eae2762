//! 로그 파이프라인 에러 타입
//!
//! [`LogPipelineError`]는 테일러, 룰 카탈로그, 디스패처, 싱크에서 발생하는
//! 모든 에러를 표현합니다. `From<LogPipelineError> for WatcherError` 변환이
//! 구현되어 있어 상위 레이어에서 `?` 연산자로 전파할 수 있습니다.
//!
//! 실행 중 발생한 에러는 워처를 멈추지 않습니다. 테일러와 디스패처는
//! 이 에러를 시스템 이벤트로 바꿔 싱크에 알립니다.

use bisq_watcher_core::error::{ConfigError, PipelineError, WatcherError};

/// 로그 파이프라인 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum LogPipelineError {
    /// 패턴 템플릿 컴파일 실패
    #[error("pattern error: template '{template}': {reason}")]
    Pattern {
        /// 문제가 된 템플릿
        template: String,
        /// 실패 사유
        reason: String,
    },

    /// 룰 파일 로딩 실패
    #[error("rule load error: {path}: {reason}")]
    RuleLoad {
        /// 룰 파일 경로
        path: String,
        /// 로딩 실패 사유
        reason: String,
    },

    /// 룰 유효성 검증 실패
    #[error("rule validation error: rule '{event_name}': {reason}")]
    RuleValidation {
        /// 문제가 된 룰 이름
        event_name: String,
        /// 검증 실패 사유
        reason: String,
    },

    /// 테일러 에러 (stat, 읽기 등)
    #[error("tailer error: {path}: {reason}")]
    Tailer {
        /// 로그 파일 경로
        path: String,
        /// 에러 사유
        reason: String,
    },

    /// 싱크 전달 실패
    #[error("sink error: {sink}: {reason}")]
    Sink {
        /// 싱크 종류
        sink: String,
        /// 에러 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 채널 통신 에러
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 정규식 컴파일 에러
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),

    /// YAML 파싱 에러
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl From<LogPipelineError> for WatcherError {
    fn from(err: LogPipelineError) -> Self {
        match err {
            LogPipelineError::Config { field, reason } => {
                WatcherError::Config(ConfigError::InvalidValue { field, reason })
            }
            LogPipelineError::Io(e) => WatcherError::Io(e),
            other => WatcherError::Pipeline(PipelineError::InitFailed(other.to_string())),
        }
    }
}
