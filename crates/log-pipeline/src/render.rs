//! 메시지 렌더링
//!
//! 룰의 메시지 템플릿에 캡처를 채우고, 타임스탬프와 아이콘, 레벨을 붙여
//! 싱크에 넘길 한 줄을 만듭니다.
//!
//! ```text
//! <timestamp-prefix><icon> [<level>] <message>
//! ```

use std::fmt::Write as _;

use chrono::{DateTime, Local, SecondsFormat};

use bisq_watcher_core::config::TimestampMode;
use bisq_watcher_core::types::Severity;

/// 메시지 템플릿에 캡처를 채웁니다.
///
/// `{n}`은 `captures[n + 1]`로 모두 치환되고, 첫 번째 `{*}`는
/// `captures[0]`(매칭 전체)으로 치환됩니다. 대응하는 캡처가 없는
/// 플레이스홀더는 그대로 남습니다.
///
/// 템플릿을 왼쪽부터 한 번만 훑으므로 캡처 값 안의 `{n}`은 다시
/// 치환되지 않습니다.
pub fn render_message(template: &str, captures: &[String]) -> String {
    let mut message = String::with_capacity(template.len());
    let mut whole_used = false;
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        message.push_str(&rest[..open]);
        let tail = &rest[open..];
        match placeholder_value(tail, captures, whole_used) {
            Some((value, consumed, is_whole)) => {
                message.push_str(value);
                whole_used |= is_whole;
                rest = &tail[consumed..];
            }
            None => {
                message.push('{');
                rest = &tail[1..];
            }
        }
    }
    message.push_str(rest);
    message
}

/// `{`로 시작하는 `tail`이 치환 가능한 플레이스홀더이면
/// (값, 소비한 바이트 수, `{*}` 여부)를 돌려줍니다.
fn placeholder_value<'c>(
    tail: &str,
    captures: &'c [String],
    whole_used: bool,
) -> Option<(&'c str, usize, bool)> {
    let close = tail.find('}')?;
    let inner = &tail[1..close];
    if inner == "*" {
        if whole_used {
            return None;
        }
        return captures.first().map(|whole| (whole.as_str(), close + 1, true));
    }
    if inner.is_empty() || !inner.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let index: usize = inner.parse().ok()?;
    // `{00}` 같은 표기는 플레이스홀더가 아님
    if index.to_string() != inner {
        return None;
    }
    captures
        .get(index.checked_add(1)?)
        .map(|value| (value.as_str(), close + 1, false))
}

/// 타임스탬프 접두어를 만듭니다.
///
/// 사용자 정의 형식이 잘못되었으면 ISO-8601로 대신합니다.
pub fn timestamp_prefix(mode: &TimestampMode, timestamp: DateTime<Local>) -> String {
    match mode {
        TimestampMode::Omitted => String::new(),
        TimestampMode::Iso => format!("[{}] ", iso(timestamp)),
        TimestampMode::Custom(format) => {
            let mut formatted = String::new();
            if write!(formatted, "{}", timestamp.format(format)).is_err() {
                tracing::debug!(format = %format, "invalid timestamp format, falling back to ISO-8601");
                formatted = iso(timestamp);
            }
            format!("[{formatted}] ")
        }
    }
}

/// 싱크에 넘길 한 줄을 렌더링합니다.
pub fn render_line(
    mode: &TimestampMode,
    timestamp: DateTime<Local>,
    severity: Severity,
    message_template: &str,
    captures: &[String],
) -> String {
    format!(
        "{}{} [{}] {}",
        timestamp_prefix(mode, timestamp),
        severity.icon(),
        severity,
        render_message(message_template, captures)
    )
}

fn iso(timestamp: DateTime<Local>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, false)
}
