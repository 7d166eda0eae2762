//! 내장 시스템 룰
//!
//! 워처가 스스로 알리는 이벤트(시작/정지, 로테이션, 읽기 실패, 전송 실패)용
//! 룰입니다. 패턴이 없으므로 레코드와 매칭되지 않고, 카탈로그 룰과 같은
//! 싱크 필터를 거쳐 전달됩니다.

use bisq_watcher_core::types::{Severity, TELEGRAM_ERROR_EVENT};

use super::types::Rule;

/// 내장 시스템 룰 목록
pub fn system_rules() -> Vec<Rule> {
    let mut rules: Vec<Rule> = [
        Severity::Crit,
        Severity::Alert,
        Severity::Error,
        Severity::Notice,
        Severity::Info,
    ]
    .into_iter()
    .map(|severity| system_rule(severity, true))
    .collect();

    rules.push(system_rule(Severity::Debug, false));
    rules.push(Rule {
        event_name: TELEGRAM_ERROR_EVENT.to_owned(),
        message: "TelegramError: {0}".to_owned(),
        telegram_eligible: false,
        ..Rule::new(TELEGRAM_ERROR_EVENT, "", "")
    });
    rules
}

/// 예약된 시스템 이벤트 이름인지 확인합니다.
pub fn is_reserved_name(event_name: &str) -> bool {
    system_rules().iter().any(|r| r.event_name == event_name)
}

fn system_rule(severity: Severity, telegram_eligible: bool) -> Rule {
    Rule {
        telegram_eligible,
        ..Rule::new(format!("system{}", severity.capitalized()), "", "{0}")
    }
}
