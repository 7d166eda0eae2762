//! 룰 데이터 구조 -- 카탈로그 항목과 오버라이드 적용

use serde::{Deserialize, Serialize};

use bisq_watcher_core::config::{Activation, OverwriteRule};
use bisq_watcher_core::types::Severity;

use crate::error::LogPipelineError;

/// 이벤트 이름 최대 길이
const MAX_EVENT_NAME_LEN: usize = 256;

fn default_true() -> bool {
    true
}

/// 이벤트 룰
///
/// `event_name`이 식별자입니다. 해석된 룰 맵 안에서 같은 이름의 룰은
/// 하나만 존재합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// 룰 이름
    pub event_name: String,
    /// 로거 필터 (지정 시 레코드 로거와 정확히 같아야 함)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logger: Option<String>,
    /// 스레드 필터
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<String>,
    /// 패턴 템플릿 (시스템 룰은 비어있음)
    #[serde(default)]
    pub pattern: String,
    /// 메시지 템플릿 (`{n}`, `{*}`)
    pub message: String,
    /// 심각도 오버라이드
    #[serde(default, rename = "level", skip_serializing_if = "Option::is_none")]
    pub severity_override: Option<Severity>,
    /// 텔레그램 전송 허용 여부
    #[serde(default = "default_true", rename = "sendToTelegram")]
    pub telegram_eligible: bool,
    /// 활성화 여부
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Rule {
    /// 패턴 룰을 생성합니다.
    pub fn new(
        event_name: impl Into<String>,
        pattern: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            event_name: event_name.into(),
            logger: None,
            thread: None,
            pattern: pattern.into(),
            message: message.into(),
            severity_override: None,
            telegram_eligible: true,
            is_active: true,
        }
    }

    /// 카탈로그 룰의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogPipelineError> {
        if self.event_name.trim().is_empty() {
            return Err(LogPipelineError::RuleValidation {
                event_name: "(empty)".to_owned(),
                reason: "eventName must not be empty".to_owned(),
            });
        }

        if self.event_name.len() > MAX_EVENT_NAME_LEN {
            return Err(LogPipelineError::RuleValidation {
                event_name: self.event_name.clone(),
                reason: format!("eventName must not exceed {MAX_EVENT_NAME_LEN} characters"),
            });
        }

        if self.pattern.is_empty() {
            return Err(LogPipelineError::RuleValidation {
                event_name: self.event_name.clone(),
                reason: "pattern must not be empty".to_owned(),
            });
        }

        if self.message.is_empty() {
            return Err(LogPipelineError::RuleValidation {
                event_name: self.event_name.clone(),
                reason: "message must not be empty".to_owned(),
            });
        }

        Ok(())
    }

    /// 레코드와 매칭되지 않는 내장 룰인지 확인합니다.
    pub fn is_system(&self) -> bool {
        self.pattern.is_empty()
    }

    /// 오버라이드 지시를 적용합니다.
    ///
    /// `inactive`는 룰을 끄고 다른 필드는 건드리지 않습니다.
    /// 그 외에는 룰을 켜고 지정된 필드를 모두 덮어씁니다.
    pub fn apply(&mut self, directive: &OverwriteRule) {
        if directive.activation == Some(Activation::Inactive) {
            self.is_active = false;
            return;
        }

        self.is_active = true;
        if let Some(message) = &directive.message {
            self.message.clone_from(message);
        }
        if let Some(level) = directive.level {
            self.severity_override = Some(level);
        }
        if let Some(send) = directive.send_to_telegram {
            self.telegram_eligible = send;
        }
        if let Some(logger) = &directive.logger {
            self.logger = Some(logger.clone());
        }
        if let Some(thread) = &directive.thread {
            self.thread = Some(thread.clone());
        }
    }

    /// 이벤트 출처가 룰의 로거/스레드 필터를 통과하는지 확인합니다.
    pub fn matches_origin(&self, logger: Option<&str>, thread: Option<&str>) -> bool {
        let logger_ok = self
            .logger
            .as_deref()
            .is_none_or(|expected| logger == Some(expected));
        let thread_ok = self
            .thread
            .as_deref()
            .is_none_or(|expected| thread == Some(expected));
        logger_ok && thread_ok
    }

    /// 오버라이드가 있으면 그 값을, 없으면 이벤트 심각도를 반환합니다.
    pub fn resolve_severity(&self, event_severity: Severity) -> Severity {
        self.severity_override.unwrap_or(event_severity)
    }
}
