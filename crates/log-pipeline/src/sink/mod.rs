//! 싱크 -- 렌더링된 이벤트를 전달하는 목적지
//!
//! 모든 싱크는 [`Sink`] trait을 구현하며, 디스패처가 `Box<dyn Sink>`로 보관합니다.
//!
//! - [`ConsoleSink`]: 심각도별 색상으로 표준 출력에 기록
//! - [`FileSink`]: 이벤트와 메시지를 JSON으로 파일에 추가
//! - [`TelegramSink`]: 설정된 채팅마다 봇 API로 전송
//!
//! 텔레그램 싱크의 봇은 [`BotCommandListener`]로 `/start`, `/status` 명령에도
//! 응답합니다.

pub mod bot_commands;
pub mod console;
pub mod file;
pub mod telegram;

pub use bot_commands::{BotCommand, BotCommandListener};
pub use console::ConsoleSink;
pub use file::FileSink;
pub use telegram::TelegramSink;

use bisq_watcher_core::config::{SinkConfig, SinkKind};
use bisq_watcher_core::pipeline::BoxFuture;
use bisq_watcher_core::types::{EventData, Severity};

use crate::error::LogPipelineError;

/// 이벤트 전달 목적지
///
/// `Box<dyn Sink>`로 보관되므로 비동기 메서드는 [`BoxFuture`]를 반환합니다.
pub trait Sink: Send {
    /// 로그와 메트릭 라벨에 쓰이는 이름
    fn name(&self) -> &str;

    /// 싱크 종류
    fn kind(&self) -> SinkKind;

    /// 렌더링된 메시지를 전달합니다.
    ///
    /// # Errors
    /// 전달에 실패한 경우 `LogPipelineError::Sink`
    fn deliver<'a>(
        &'a mut self,
        message: &'a str,
        severity: Severity,
        event: &'a EventData,
    ) -> BoxFuture<'a, Result<(), LogPipelineError>>;

    /// 버퍼를 비우고 자원을 정리합니다.
    fn close(&mut self) -> BoxFuture<'_, Result<(), LogPipelineError>>;
}

/// 설정에서 싱크를 생성합니다.
///
/// # Errors
/// 필수 설정이 빠졌거나 HTTP 클라이언트를 만들 수 없는 경우
pub fn build_sink(config: &SinkConfig) -> Result<Box<dyn Sink>, LogPipelineError> {
    match config.kind {
        SinkKind::Console => Ok(Box::new(ConsoleSink::stdout())),
        SinkKind::File => {
            let filename = config.filename.as_deref().ok_or_else(|| LogPipelineError::Config {
                field: "filename".to_owned(),
                reason: "file sink requires a filename".to_owned(),
            })?;
            Ok(Box::new(FileSink::new(filename)))
        }
        SinkKind::Telegram => {
            let token = config.api_token.as_deref().ok_or_else(|| LogPipelineError::Config {
                field: "api_token".to_owned(),
                reason: "telegram sink requires an api_token".to_owned(),
            })?;
            Ok(Box::new(TelegramSink::new(token, config.chat_ids.clone())?))
        }
    }
}

fn sink_error(sink: &str, reason: impl std::fmt::Display) -> LogPipelineError {
    LogPipelineError::Sink {
        sink: sink.to_owned(),
        reason: reason.to_string(),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_console_sink() {
        let sink = build_sink(&SinkConfig::default()).unwrap();
        assert_eq!(sink.kind(), SinkKind::Console);
        assert_eq!(sink.name(), "console");
    }

    #[test]
    fn build_file_sink_requires_filename() {
        let config = SinkConfig {
            kind: SinkKind::File,
            ..Default::default()
        };
        assert!(matches!(
            build_sink(&config),
            Err(LogPipelineError::Config { .. })
        ));
    }

    #[test]
    fn build_telegram_sink() {
        let config = SinkConfig {
            kind: SinkKind::Telegram,
            api_token: Some("123:abc".to_owned()),
            chat_ids: vec!["42".to_owned()],
            ..Default::default()
        };
        let sink = build_sink(&config).unwrap();
        assert_eq!(sink.kind(), SinkKind::Telegram);
    }
}
