#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`tailer`]: 로그 파일 증분 읽기, 레코드 조립, 오버랩 경계 확인, 변경 폴링
//! - [`record`]: Bisq 로그 헤더 파싱과 여러 줄 레코드
//! - [`cache`]: 처리한 레코드의 핑거프린트 캐시
//! - [`pattern`]: 룰 템플릿을 정규식으로 컴파일
//! - [`rule`]: YAML 룰 카탈로그, 내장 시스템 룰, 싱크별 유효 룰 맵 계산
//! - [`dispatch`]: 싱크별 필터링과 전달, 실패 알림
//! - [`render`]: 메시지 템플릿 치환과 타임스탬프 접두어
//! - [`sink`]: 콘솔, 파일, 텔레그램 싱크와 봇 명령 리스너
//! - [`watcher`]: 워처 오케스트레이션 (Pipeline trait 구현)
//! - [`config`]: 테일러 설정과 경로 치환
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! ChangePoller -> Tailer -> PatternMatcher -> Dispatcher -> Sinks
//!      |            |             |               |
//!  stat 폴링    오버랩 + 캐시    YAML 룰       룰 맵 + 임계값
//! ```

pub mod cache;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod pattern;
pub mod record;
pub mod render;
pub mod rule;
pub mod sink;
pub mod tailer;
pub mod watcher;

// --- 주요 타입 re-export ---

// 워처
pub use watcher::{Watcher, WatcherBuilder, WatcherState};

// 설정
pub use config::TailerConfig;

// 에러
pub use error::LogPipelineError;

// 룰
pub use rule::{EffectiveRuleMap, Rule, RuleCatalog, RuleLoader, RuleResolver};

// 테일러
pub use tailer::{ChangePoller, ReadMode, ReadScheduler, Tailer, TailerStats};

// 디스패처와 싱크
pub use dispatch::{Dispatcher, SinkRoute};
pub use sink::{
    BotCommand, BotCommandListener, ConsoleSink, FileSink, Sink, TelegramSink, build_sink,
};

// 캐시와 패턴
pub use cache::FingerprintCache;
pub use pattern::{CompiledPattern, PatternCompiler};
