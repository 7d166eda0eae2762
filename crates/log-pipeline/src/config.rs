//! 워처 런타임 설정
//!
//! [`TailerConfig`]는 core의 [`WatcherConfig`]에서 파생되며,
//! 로그 파일 경로의 환경변수/홈 디렉토리 치환을 시작 시 한 번 수행합니다.
//!
//! # 사용 예시
//! ```ignore
//! use bisq_watcher_core::config::WatcherAppConfig;
//! use bisq_watcher_log_pipeline::config::TailerConfig;
//!
//! let app = WatcherAppConfig::load("bisq-watcher.toml").await?;
//! let config = TailerConfig::from_core(&app.watchers[0])?;
//! ```

use std::path::PathBuf;
use std::time::Duration;

use bisq_watcher_core::config::WatcherConfig;

use crate::error::LogPipelineError;

/// 이벤트 채널 기본 용량
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1024;

/// 테일러 설정
#[derive(Debug, Clone)]
pub struct TailerConfig {
    /// 워처 이름
    pub watcher_name: String,
    /// 치환이 끝난 로그 파일 경로
    pub path: PathBuf,
    /// 변경 확인 주기
    pub poll_interval: Duration,
    /// 오버랩 윈도우 (바이트)
    pub overlap_window: u64,
    /// 시작 시 캐시만 채울지 여부
    pub cache_only_at_start: bool,
    /// 캐시에 다이제스트 저장 여부
    pub use_hash: bool,
    /// 캐시 최대 항목 수
    pub max_events: Option<usize>,
    /// 테일러 -> 디스패처 채널 용량
    pub event_channel_capacity: usize,
}

impl TailerConfig {
    /// 기본값으로 설정을 생성합니다.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            watcher_name: "main".to_owned(),
            path: path.into(),
            poll_interval: Duration::from_millis(1000),
            overlap_window: 20_000,
            cache_only_at_start: true,
            use_hash: true,
            max_events: None,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }

    /// core의 `WatcherConfig`에서 설정을 생성합니다.
    ///
    /// # Errors
    /// 로그 파일 경로에서 참조한 환경변수가 없는 경우
    pub fn from_core(core: &WatcherConfig) -> Result<Self, LogPipelineError> {
        Ok(Self {
            watcher_name: core.name.clone(),
            path: resolve_path(&core.log_file)?,
            poll_interval: Duration::from_millis(core.poll_interval_ms),
            overlap_window: core.debug.overlapping_go_back_n_positions,
            cache_only_at_start: core.debug.at_start_build_event_cache_only,
            use_hash: core.debug.use_hash,
            max_events: core.debug.max_events,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        })
    }
}

/// 경로의 환경변수와 홈 디렉토리를 치환합니다.
///
/// Windows에서는 `%VAR%`, 그 외에는 `$VAR`/`${VAR}`와 선두 `~`를 치환합니다.
pub fn resolve_path(raw: &str) -> Result<PathBuf, LogPipelineError> {
    expand_path_with(raw, cfg!(windows), |name| std::env::var(name).ok()).map(PathBuf::from)
}

/// 조회 함수를 받아 경로를 치환합니다.
pub fn expand_path_with(
    raw: &str,
    windows: bool,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String, LogPipelineError> {
    let resolve = |name: &str| {
        lookup(name).ok_or_else(|| LogPipelineError::Config {
            field: "log_file".to_owned(),
            reason: format!("environment variable '{name}' referenced in '{raw}' is not set"),
        })
    };

    if windows {
        return expand_percent_vars(raw, resolve);
    }

    let mut expanded = String::with_capacity(raw.len());
    let rest = if raw == "~" || raw.starts_with("~/") {
        expanded.push_str(&resolve("HOME")?);
        &raw[1..]
    } else {
        raw
    };

    let mut chars = rest.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c != '$' {
            expanded.push(c);
            continue;
        }

        let braced = rest[i + 1..].starts_with('{');
        let name_start = if braced { i + 2 } else { i + 1 };
        let name_len = rest[name_start..]
            .char_indices()
            .take_while(|&(k, ch)| {
                ch == '_' || ch.is_ascii_alphabetic() || (k > 0 && ch.is_ascii_digit())
            })
            .count();
        let name_end = name_start + name_len;
        let closed = !braced || rest[name_end..].starts_with('}');

        if name_len == 0 || !closed {
            expanded.push(c);
            continue;
        }

        expanded.push_str(&resolve(&rest[name_start..name_end])?);
        let consumed_to = if braced { name_end + 1 } else { name_end };
        while chars.peek().is_some_and(|&(k, _)| k < consumed_to) {
            chars.next();
        }
    }

    Ok(expanded)
}

fn expand_percent_vars(
    raw: &str,
    resolve: impl Fn(&str) -> Result<String, LogPipelineError>,
) -> Result<String, LogPipelineError> {
    let mut expanded = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find('%') {
        let after = &rest[start + 1..];
        match after.find('%') {
            Some(end) if end > 0 => {
                expanded.push_str(&rest[..start]);
                expanded.push_str(&resolve(&after[..end])?);
                rest = &after[end + 1..];
            }
            _ => {
                expanded.push_str(&rest[..=start]);
                rest = after;
            }
        }
    }
    expanded.push_str(rest);
    Ok(expanded)
}
