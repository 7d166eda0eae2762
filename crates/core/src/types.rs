//! 도메인 타입 -- 시스템 전역에서 사용되는 공통 타입
//!
//! 심각도([`Severity`])와 테일러가 생성하고 디스패처가 소비하는
//! 이벤트 데이터([`EventData`])를 정의합니다.

use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// 심각도 레벨
///
/// syslog 계열의 8단계 레벨에 `Unknown`을 더한 것입니다.
/// 심각한 순서: `emerg < alert < crit < error < warning < notice < info < debug`.
/// `Unknown`은 비교 시 `Debug`와 같은 순위로 취급됩니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// 시스템 사용 불가
    Emerg,
    /// 즉시 조치 필요
    Alert,
    /// 치명적 상태
    Crit,
    /// 에러
    Error,
    /// 경고
    Warning,
    /// 주목할 만한 정상 상태
    Notice,
    /// 정보성 이벤트
    Info,
    /// 디버그
    #[default]
    Debug,
    /// 헤더에서 인식하지 못한 레벨
    Unknown,
}

impl Severity {
    /// 심각도 순위 (0 = 가장 심각)
    pub fn rank(self) -> u8 {
        match self {
            Self::Emerg => 0,
            Self::Alert => 1,
            Self::Crit => 2,
            Self::Error => 3,
            Self::Warning => 4,
            Self::Notice => 5,
            Self::Info => 6,
            Self::Debug | Self::Unknown => 7,
        }
    }

    /// 이 심각도가 `threshold`와 같거나 더 심각한지 확인합니다.
    pub fn is_at_least(self, threshold: Severity) -> bool {
        self.rank() <= threshold.rank()
    }

    /// Bisq 로그 헤더의 레벨 토큰을 심각도로 변환합니다.
    ///
    /// `ALERT`, `ERROR`, `WARN`, `INFO`, `DEBUG` 외의 값은 `Unknown`입니다.
    pub fn from_log_level(level: &str) -> Self {
        match level {
            "ALERT" => Self::Alert,
            "ERROR" => Self::Error,
            "WARN" => Self::Warning,
            "INFO" => Self::Info,
            "DEBUG" => Self::Debug,
            _ => Self::Unknown,
        }
    }

    /// 문자열에서 심각도를 파싱합니다.
    ///
    /// 대소문자를 구분하지 않습니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "emerg" | "emergency" => Some(Self::Emerg),
            "alert" => Some(Self::Alert),
            "crit" | "critical" => Some(Self::Crit),
            "error" | "err" => Some(Self::Error),
            "warning" | "warn" => Some(Self::Warning),
            "notice" => Some(Self::Notice),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// 소문자 레벨 이름
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Emerg => "emerg",
            Self::Alert => "alert",
            Self::Crit => "crit",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Notice => "notice",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Unknown => "unknown",
        }
    }

    /// 렌더링된 메시지 앞에 붙는 아이콘
    pub fn icon(self) -> &'static str {
        match self {
            Self::Emerg => "🛑",
            Self::Alert => "🚨",
            Self::Crit => "💥",
            Self::Error => "❗️",
            Self::Warning => "⚠️",
            Self::Notice => "🔶",
            Self::Info => "💡",
            Self::Debug => "🔍",
            Self::Unknown => "",
        }
    }

    /// 시스템 이벤트 이름 접미어 (`systemError`의 `Error`)
    pub fn capitalized(self) -> &'static str {
        match self {
            Self::Emerg => "Emerg",
            Self::Alert => "Alert",
            Self::Crit => "Crit",
            Self::Error => "Error",
            Self::Warning => "Warning",
            Self::Notice => "Notice",
            Self::Info => "Info",
            Self::Debug => "Debug",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 텔레그램 전송 실패를 알리는 내장 이벤트 이름
pub const TELEGRAM_ERROR_EVENT: &str = "telegramError";

/// 테일러가 생성하는 이벤트
///
/// 로그 레코드가 룰 패턴에 매칭되었거나, 시스템 자체가 알릴 내용이
/// 있을 때 생성됩니다. 디스패처는 `event_name`으로 싱크별 룰을 찾습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventData {
    /// 이벤트 고유 ID
    pub id: String,
    /// 레코드 타임스탬프 (시스템 이벤트는 생성 시각)
    pub timestamp: DateTime<Local>,
    /// 레코드 헤더에서 추출한 심각도
    #[serde(rename = "logLevel")]
    pub severity: Severity,
    /// 매칭된 룰 이름
    pub event_name: String,
    /// 캡처 그룹. `[0]`은 전체 매칭, `[n + 1]`은 플레이스홀더 `{n}`의 값
    #[serde(rename = "data")]
    pub captures: Vec<String>,
    /// 레코드의 로거 이름
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logger: Option<String>,
    /// 레코드의 스레드 이름
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<String>,
}

impl EventData {
    /// 새 이벤트를 생성합니다.
    pub fn new(
        event_name: impl Into<String>,
        severity: Severity,
        timestamp: DateTime<Local>,
        captures: Vec<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp,
            severity,
            event_name: event_name.into(),
            captures,
            logger: None,
            thread: None,
        }
    }

    /// 레코드 출처(로거, 스레드)를 설정합니다.
    pub fn with_origin(mut self, logger: impl Into<String>, thread: impl Into<String>) -> Self {
        self.logger = Some(logger.into());
        self.thread = Some(thread.into());
        self
    }

    /// 시스템 이벤트를 생성합니다.
    ///
    /// 이벤트 이름은 `system{Level}`이고 캡처는 `[level, message]`입니다.
    pub fn system(severity: Severity, message: impl Into<String>) -> Self {
        Self::new(
            format!("system{}", severity.capitalized()),
            severity,
            Local::now(),
            vec![severity.as_str().to_owned(), message.into()],
        )
    }

    /// 텔레그램 전송 실패 이벤트를 생성합니다.
    pub fn telegram_error(message: impl Into<String>) -> Self {
        Self::new(
            TELEGRAM_ERROR_EVENT,
            Severity::Error,
            Local::now(),
            vec![Severity::Error.as_str().to_owned(), message.into()],
        )
    }

    /// 시스템 계열 이벤트인지 확인합니다.
    pub fn is_synthetic(&self) -> bool {
        self.event_name.starts_with("system") || self.event_name == TELEGRAM_ERROR_EVENT
    }
}
