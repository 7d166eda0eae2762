//! 텔레그램 봇 명령 응답
//!
//! `getUpdates` 롱폴링으로 봇에 온 메시지를 받아 명령에 답합니다.
//!
//! | 명령 | 응답 대상 | 응답 |
//! |------|-----------|------|
//! | `/start` | 보낸 사용자 | `Hello <name>!\nBot started.`, `Notifications are now active.` |
//! | `/status` | 메시지가 온 채팅 | `Bot is up and running.` |
//!
//! 폴링 실패는 연속 실패 구간마다 한 번 `telegramError` 이벤트로 알립니다.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};

use bisq_watcher_core::types::EventData;

use super::telegram::{BotApi, HTTP_TIMEOUT, TELEGRAM_API_BASE};
use crate::error::LogPipelineError;

/// 롱폴링 대기 시간
pub const LONG_POLL_TIMEOUT: Duration = Duration::from_secs(25);

/// 폴링 실패 후 재시도까지 대기 시간
pub const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// 봇이 답하는 명령
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    /// 알림 시작 인사
    Start,
    /// 동작 확인
    Status,
}

impl BotCommand {
    /// 메시지 첫 단어에서 명령을 읽습니다. `/status@my_bot` 형식도 허용합니다.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?;
        let command = word.split('@').next().unwrap_or(word);
        match command {
            "/start" => Some(Self::Start),
            "/status" => Some(Self::Status),
            _ => None,
        }
    }

    /// 명령에 대한 응답 메시지 목록
    pub fn replies(self, name: &str) -> Vec<String> {
        match self {
            Self::Start => vec![
                format!("Hello {name}!\nBot started."),
                "Notifications are now active.".to_owned(),
            ],
            Self::Status => vec!["Bot is up and running.".to_owned()],
        }
    }
}

#[derive(Serialize)]
struct GetUpdates {
    offset: i64,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
    from: Option<User>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct User {
    id: i64,
    first_name: Option<String>,
    username: Option<String>,
}

/// 텔레그램 봇 명령 리스너
///
/// 워처가 종료 신호와 이벤트 채널을 넘겨 태스크로 실행합니다.
pub struct BotCommandListener {
    api: BotApi,
    poll_timeout: Duration,
    retry_delay: Duration,
    offset: i64,
}

impl BotCommandListener {
    /// 공식 API 주소로 리스너를 생성합니다.
    ///
    /// # Errors
    /// HTTP 클라이언트를 만들 수 없는 경우
    pub fn new(token: impl Into<String>) -> Result<Self, LogPipelineError> {
        Self::with_api_base(TELEGRAM_API_BASE, token)
    }

    /// API 주소를 지정하여 리스너를 생성합니다.
    ///
    /// # Errors
    /// HTTP 클라이언트를 만들 수 없는 경우
    pub fn with_api_base(
        api_base: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, LogPipelineError> {
        Ok(Self {
            api: BotApi::new(api_base, token)?,
            poll_timeout: LONG_POLL_TIMEOUT,
            retry_delay: POLL_RETRY_DELAY,
            offset: 0,
        })
    }

    /// 롱폴링 대기 시간을 바꿉니다.
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// 실패 후 재시도 대기 시간을 바꿉니다.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// 종료 신호가 올 때까지 명령을 받아 응답합니다.
    pub async fn run(
        mut self,
        events: mpsc::Sender<EventData>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut failing = false;

        loop {
            if *shutdown.borrow() {
                break;
            }
            let result = tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                result = self.poll_once() => result,
            };

            match result {
                Ok(_) => failing = false,
                Err(e) => {
                    tracing::warn!(error = %e, "telegram command polling failed");
                    if !failing {
                        failing = true;
                        let event = EventData::telegram_error(format!("polling error: {e}"));
                        if events.send(event).await.is_err() {
                            break;
                        }
                    }
                    tokio::select! {
                        biased;
                        _ = shutdown.changed() => {}
                        () = tokio::time::sleep(self.retry_delay) => {}
                    }
                }
            }
        }
        tracing::debug!(api_base = %self.api.api_base(), "telegram command listener stopped");
    }

    /// 업데이트를 한 번 가져와 명령에 답합니다.
    ///
    /// 받은 업데이트 수를 반환합니다.
    ///
    /// # Errors
    /// 업데이트 조회 또는 응답 전송에 실패한 경우
    pub async fn poll_once(&mut self) -> Result<usize, LogPipelineError> {
        let request = GetUpdates {
            offset: self.offset,
            timeout: self.poll_timeout.as_secs(),
            allowed_updates: ["message"],
        };
        let updates: Vec<Update> = self
            .api
            .call("getUpdates", &request, self.poll_timeout + HTTP_TIMEOUT)
            .await?;

        for update in &updates {
            self.offset = self.offset.max(update.update_id + 1);
            if let Some(message) = &update.message {
                self.answer(message).await?;
            }
        }
        Ok(updates.len())
    }

    async fn answer(&self, message: &Message) -> Result<(), LogPipelineError> {
        let Some(command) = message.text.as_deref().and_then(BotCommand::parse) else {
            return Ok(());
        };

        let (target, name) = match (command, &message.from) {
            (BotCommand::Start, Some(user)) => (
                user.id,
                user.first_name
                    .as_deref()
                    .or(user.username.as_deref())
                    .unwrap_or("there"),
            ),
            _ => (message.chat.id, "there"),
        };

        tracing::info!(?command, chat_id = target, "answering telegram command");
        for reply in command.replies(name) {
            self.api.send_message(target, &reply).await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for BotCommandListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotCommandListener")
            .field("api_base", &self.api.api_base())
            .field("token", &"***")
            .field("offset", &self.offset)
            .finish()
    }
}
