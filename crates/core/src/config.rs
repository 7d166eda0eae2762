//! 설정 관리 -- bisq-watcher.toml 파싱 및 런타임 설정
//!
//! [`WatcherAppConfig`]는 데몬 전체 설정과 워처 목록을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`BISQ_WATCHER_GENERAL_LOG_LEVEL=debug` 형식)
//! 3. 설정 파일 (`bisq-watcher.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), bisq_watcher_core::error::WatcherError> {
//! use bisq_watcher_core::config::WatcherAppConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드 + 검증
//! let config = WatcherAppConfig::load("bisq-watcher.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = WatcherAppConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, WatcherError};
use crate::types::Severity;

/// bisq-watcher 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatcherAppConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 워처 목록 (로그 파일 하나당 하나)
    #[serde(default)]
    pub watchers: Vec<WatcherConfig>,
}

impl WatcherAppConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용한 뒤 검증합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, WatcherError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드, 검증 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, WatcherError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                WatcherError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                WatcherError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, WatcherError> {
        toml::from_str(toml_str).map_err(|e| {
            WatcherError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `BISQ_WATCHER_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        override_string(
            &mut self.general.log_level,
            "BISQ_WATCHER_GENERAL_LOG_LEVEL",
        );
        override_string(
            &mut self.general.log_format,
            "BISQ_WATCHER_GENERAL_LOG_FORMAT",
        );
        override_string(
            &mut self.general.rules_path,
            "BISQ_WATCHER_GENERAL_RULES_PATH",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), WatcherError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.general.rules_path.trim().is_empty() {
            return Err(invalid("general.rules_path", "must not be empty"));
        }

        if self.watchers.is_empty() {
            return Err(invalid("watchers", "at least one watcher is required"));
        }

        let mut seen_names = std::collections::HashSet::new();
        for (i, watcher) in self.watchers.iter().enumerate() {
            watcher.validate(&format!("watchers[{i}]"))?;
            if !seen_names.insert(watcher.name.as_str()) {
                return Err(invalid(
                    &format!("watchers[{i}].name"),
                    format!("duplicate watcher name '{}'", watcher.name),
                ));
            }
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// 룰 카탈로그 경로 (YAML 파일 또는 디렉토리)
    pub rules_path: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
            rules_path: "rules".to_owned(),
        }
    }
}

/// 워처 설정
///
/// 감시할 로그 파일 하나와, 그 이벤트를 받을 싱크 목록입니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// 워처 이름 (로그 필드와 헬스 리포트에 사용)
    pub name: String,
    /// 감시할 로그 파일 경로 (`$VAR`, `~`, `%VAR%` 치환 지원)
    pub log_file: String,
    /// 파일 변경 확인 주기 (밀리초)
    pub poll_interval_ms: u64,
    /// 테일러 동작 조정
    pub debug: DebugConfig,
    /// 워처 범위 룰 오버라이드
    pub overwrite_rules: Vec<OverwriteRule>,
    /// 싱크 목록
    pub sinks: Vec<SinkConfig>,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            name: "main".to_owned(),
            log_file: String::new(),
            poll_interval_ms: 1000,
            debug: DebugConfig::default(),
            overwrite_rules: Vec::new(),
            sinks: Vec::new(),
        }
    }
}

impl WatcherConfig {
    fn validate(&self, prefix: &str) -> Result<(), WatcherError> {
        if self.name.trim().is_empty() {
            return Err(invalid(&format!("{prefix}.name"), "must not be empty"));
        }
        if self.log_file.trim().is_empty() {
            return Err(invalid(&format!("{prefix}.log_file"), "must not be empty"));
        }
        if self.poll_interval_ms == 0 {
            return Err(invalid(
                &format!("{prefix}.poll_interval_ms"),
                "must be greater than 0",
            ));
        }
        if self.debug.max_events == Some(0) {
            return Err(invalid(
                &format!("{prefix}.debug.max_events"),
                "must be greater than 0 when set",
            ));
        }
        validate_directives(&self.overwrite_rules, &format!("{prefix}.overwrite_rules"))?;

        if self.sinks.is_empty() {
            return Err(invalid(
                &format!("{prefix}.sinks"),
                "at least one sink is required",
            ));
        }
        for (j, sink) in self.sinks.iter().enumerate() {
            sink.validate(&format!("{prefix}.sinks[{j}]"))?;
        }
        Ok(())
    }

    /// 비활성화되지 않은 싱크 목록
    pub fn enabled_sinks(&self) -> impl Iterator<Item = &SinkConfig> {
        self.sinks.iter().filter(|s| !s.disabled)
    }
}

/// 테일러 동작 조정 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// 시작 시 기존 로그는 캐시만 채우고 이벤트를 내보내지 않음
    pub at_start_build_event_cache_only: bool,
    /// 읽기 사이클마다 되돌아가는 바이트 수 (오버랩 윈도우)
    pub overlapping_go_back_n_positions: u64,
    /// 캐시에 레코드 원문 대신 SHA-256 다이제스트 저장
    pub use_hash: bool,
    /// 캐시 최대 항목 수 (없으면 무제한)
    pub max_events: Option<usize>,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            at_start_build_event_cache_only: true,
            overlapping_go_back_n_positions: 20_000,
            use_hash: true,
            max_events: None,
        }
    }
}

/// 싱크 종류
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// 표준 출력
    #[default]
    Console,
    /// JSON 파일
    File,
    /// 텔레그램 봇
    Telegram,
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Console => write!(f, "console"),
            Self::File => write!(f, "file"),
            Self::Telegram => write!(f, "telegram"),
        }
    }
}

/// 싱크 설정
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// 싱크 종류
    #[serde(rename = "type")]
    pub kind: SinkKind,
    /// 메시지 앞 타임스탬프 형식
    pub timestamp: TimestampMode,
    /// 심각도 임계값. 이보다 덜 심각한 이벤트는 전달하지 않음
    pub level: Severity,
    /// 비활성화 여부
    pub disabled: bool,
    /// 파일 싱크 경로
    pub filename: Option<String>,
    /// 텔레그램 봇 토큰
    pub api_token: Option<String>,
    /// 텔레그램 채팅 ID 목록
    pub chat_ids: Vec<String>,
    /// 텔레그램 봇 명령(`/start`, `/status`) 응답 끄기
    pub disable_commands: bool,
    /// 싱크 범위 룰 오버라이드 (워처 범위보다 우선)
    pub overwrite_rules: Vec<OverwriteRule>,
}

impl SinkConfig {
    /// 봇 명령에 응답해야 하는 텔레그램 싱크의 토큰
    ///
    /// 비활성 싱크, 다른 종류의 싱크, `disable_commands`가 켜진 싱크는 `None`.
    pub fn command_token(&self) -> Option<&str> {
        if self.kind != SinkKind::Telegram || self.disabled || self.disable_commands {
            return None;
        }
        self.api_token.as_deref().filter(|t| !t.trim().is_empty())
    }

    fn validate(&self, prefix: &str) -> Result<(), WatcherError> {
        match self.kind {
            SinkKind::Console => {}
            SinkKind::File => {
                if self.filename.as_deref().is_none_or(|f| f.trim().is_empty()) {
                    return Err(invalid(
                        &format!("{prefix}.filename"),
                        "file sink requires a filename",
                    ));
                }
            }
            SinkKind::Telegram => {
                if self.api_token.as_deref().is_none_or(|t| t.trim().is_empty()) {
                    return Err(invalid(
                        &format!("{prefix}.api_token"),
                        "telegram sink requires an api_token",
                    ));
                }
                if self.chat_ids.is_empty() {
                    return Err(invalid(
                        &format!("{prefix}.chat_ids"),
                        "telegram sink requires at least one chat id",
                    ));
                }
            }
        }

        if let TimestampMode::Custom(format) = &self.timestamp {
            let broken = chrono::format::StrftimeItems::new(format)
                .any(|item| matches!(item, chrono::format::Item::Error));
            if broken || format.is_empty() {
                return Err(invalid(
                    &format!("{prefix}.timestamp"),
                    format!("invalid strftime format '{format}'"),
                ));
            }
        }

        validate_directives(&self.overwrite_rules, &format!("{prefix}.overwrite_rules"))
    }
}

// api_token은 로그에 남지 않도록 가린다
impl fmt::Debug for SinkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkConfig")
            .field("kind", &self.kind)
            .field("timestamp", &self.timestamp)
            .field("level", &self.level)
            .field("disabled", &self.disabled)
            .field("filename", &self.filename)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("chat_ids", &self.chat_ids)
            .field("disable_commands", &self.disable_commands)
            .field("overwrite_rules", &self.overwrite_rules)
            .finish()
    }
}

/// 메시지 타임스탬프 접두어 형식
///
/// TOML에서는 `false`(생략), `true`(ISO-8601), 또는 strftime 문자열로 지정합니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TimestampSetting", into = "TimestampSetting")]
pub enum TimestampMode {
    /// 타임스탬프 생략
    #[default]
    Omitted,
    /// `[2024-09-05T13:54:39.480+02:00] `
    Iso,
    /// 사용자 정의 strftime 형식
    Custom(String),
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum TimestampSetting {
    Flag(bool),
    Format(String),
}

impl From<TimestampSetting> for TimestampMode {
    fn from(setting: TimestampSetting) -> Self {
        match setting {
            TimestampSetting::Flag(true) => Self::Iso,
            TimestampSetting::Flag(false) => Self::Omitted,
            TimestampSetting::Format(format) => Self::Custom(format),
        }
    }
}

impl From<TimestampMode> for TimestampSetting {
    fn from(mode: TimestampMode) -> Self {
        match mode {
            TimestampMode::Omitted => Self::Flag(false),
            TimestampMode::Iso => Self::Flag(true),
            TimestampMode::Custom(format) => Self::Format(format),
        }
    }
}

/// 룰 활성화 지시
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    /// 룰 활성화 (함께 지정된 필드를 덮어씀)
    Active,
    /// 룰 비활성화 (다른 필드는 무시)
    Inactive,
}

/// 룰 오버라이드 지시
///
/// `event_name`으로 카탈로그 룰을 찾아 지정된 필드만 덮어씁니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OverwriteRule {
    /// 대상 룰 이름
    pub event_name: String,
    /// 메시지 템플릿
    pub message: Option<String>,
    /// 심각도 오버라이드
    pub level: Option<Severity>,
    /// 텔레그램 전송 허용 여부
    pub send_to_telegram: Option<bool>,
    /// 활성화 지시
    pub activation: Option<Activation>,
    /// 로거 필터
    pub logger: Option<String>,
    /// 스레드 필터
    pub thread: Option<String>,
}

fn validate_directives(directives: &[OverwriteRule], prefix: &str) -> Result<(), WatcherError> {
    for (k, directive) in directives.iter().enumerate() {
        if directive.event_name.trim().is_empty() {
            return Err(invalid(
                &format!("{prefix}[{k}].event_name"),
                "must not be empty",
            ));
        }
    }
    Ok(())
}

fn invalid(field: &str, reason: impl Into<String>) -> WatcherError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

fn override_string(target: &mut String, env_key: &str) {
    match std::env::var(env_key) {
        Ok(val) => *target = val,
        Err(std::env::VarError::NotUnicode(_)) => {
            warn!(env_key, "env var is not valid unicode, ignoring");
        }
        Err(std::env::VarError::NotPresent) => {}
    }
}
