//! 텔레그램 싱크
//!
//! 봇 API `sendMessage`로 설정된 채팅마다 순서대로 전송합니다.
//! 한 채팅이라도 실패하면 전달 실패로 보고하며, 에러 메시지에는 토큰이 포함된
//! URL을 남기지 않습니다.

use std::fmt;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use bisq_watcher_core::config::SinkKind;
use bisq_watcher_core::pipeline::BoxFuture;
use bisq_watcher_core::types::{EventData, Severity};

use super::{Sink, sink_error};
use crate::error::LogPipelineError;

/// 텔레그램 봇 API 기본 주소
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// 요청 타임아웃
pub(crate) const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct SendMessage<'a, C> {
    chat_id: C,
    text: &'a str,
}

/// 봇 API 응답 봉투
#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// 봇 API 호출 클라이언트 (토큰 포함)
#[derive(Clone)]
pub(crate) struct BotApi {
    client: reqwest::Client,
    api_base: String,
    token: String,
}

impl BotApi {
    pub(crate) fn new(
        api_base: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, LogPipelineError> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| sink_error("telegram", e))?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_owned(),
            token: token.into(),
        })
    }

    pub(crate) fn api_base(&self) -> &str {
        &self.api_base
    }

    fn url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.token)
    }

    /// `sendMessage` 호출
    pub(crate) async fn send_message<C>(&self, chat_id: C, text: &str) -> Result<(), LogPipelineError>
    where
        C: Serialize + fmt::Display,
    {
        self.client
            .post(self.url("sendMessage"))
            .json(&SendMessage {
                chat_id: &chat_id,
                text,
            })
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| sink_error("telegram", format!("chat {chat_id}: {}", e.without_url())))?;
        Ok(())
    }

    /// JSON 본문으로 메서드를 호출하고 `result`를 꺼냅니다.
    pub(crate) async fn call<B, T>(
        &self,
        method: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<T, LogPipelineError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response: ApiResponse<T> = self
            .client
            .post(self.url(method))
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| sink_error("telegram", format!("{method}: {}", e.without_url())))?
            .json()
            .await
            .map_err(|e| sink_error("telegram", format!("{method}: {}", e.without_url())))?;

        match response {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse { description, .. } => Err(sink_error(
                "telegram",
                format!(
                    "{method}: {}",
                    description.unwrap_or_else(|| "request rejected".to_owned())
                ),
            )),
        }
    }
}

/// 텔레그램 봇 싱크
pub struct TelegramSink {
    api: BotApi,
    chat_ids: Vec<String>,
}

impl TelegramSink {
    /// 공식 API 주소로 싱크를 생성합니다.
    ///
    /// # Errors
    /// HTTP 클라이언트를 만들 수 없는 경우
    pub fn new(token: impl Into<String>, chat_ids: Vec<String>) -> Result<Self, LogPipelineError> {
        Self::with_api_base(TELEGRAM_API_BASE, token, chat_ids)
    }

    /// API 주소를 지정하여 싱크를 생성합니다.
    ///
    /// # Errors
    /// HTTP 클라이언트를 만들 수 없는 경우
    pub fn with_api_base(
        api_base: impl Into<String>,
        token: impl Into<String>,
        chat_ids: Vec<String>,
    ) -> Result<Self, LogPipelineError> {
        Ok(Self {
            api: BotApi::new(api_base, token)?,
            chat_ids,
        })
    }

    /// 전송 대상 채팅 수
    pub fn chat_count(&self) -> usize {
        self.chat_ids.len()
    }
}

impl fmt::Debug for TelegramSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramSink")
            .field("api_base", &self.api.api_base())
            .field("token", &"***")
            .field("chat_ids", &self.chat_ids)
            .finish()
    }
}

impl Sink for TelegramSink {
    fn name(&self) -> &str {
        "telegram"
    }

    fn kind(&self) -> SinkKind {
        SinkKind::Telegram
    }

    fn deliver<'a>(
        &'a mut self,
        message: &'a str,
        _severity: Severity,
        _event: &'a EventData,
    ) -> BoxFuture<'a, Result<(), LogPipelineError>> {
        Box::pin(async move {
            for chat_id in &self.chat_ids {
                self.api.send_message(chat_id, message).await?;
            }
            Ok(())
        })
    }

    fn close(&mut self) -> BoxFuture<'_, Result<(), LogPipelineError>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::test_support::fake_bot_api;

    #[tokio::test]
    async fn sends_to_every_chat_in_order() {
        let (base, mut requests) = fake_bot_api(vec![(200, "{}".into()); 2]).await;
        let mut sink =
            TelegramSink::with_api_base(base, "123:abc", vec!["1".into(), "2".into()]).unwrap();
        let event = EventData::system(Severity::Info, "x");

        sink.deliver("hello", Severity::Info, &event).await.unwrap();

        let (line, body) = requests.recv().await.unwrap();
        assert!(line.starts_with("POST /bot123:abc/sendMessage"));
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["chat_id"], "1");
        assert_eq!(json["text"], "hello");

        let (_, body) = requests.recv().await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["chat_id"], "2");
    }

    #[tokio::test]
    async fn http_error_status_is_a_sink_error() {
        let (base, _requests) = fake_bot_api(vec![(401, "{}".into())]).await;
        let mut sink = TelegramSink::with_api_base(base, "secret-token", vec!["1".into()]).unwrap();
        let event = EventData::system(Severity::Info, "x");

        let err = sink.deliver("hello", Severity::Info, &event).await.unwrap_err();
        assert!(matches!(err, LogPipelineError::Sink { .. }));
        assert!(!err.to_string().contains("secret-token"));
    }

    #[tokio::test]
    async fn unreachable_api_is_a_sink_error() {
        let mut sink =
            TelegramSink::with_api_base("http://127.0.0.1:1", "t", vec!["1".into()]).unwrap();
        let event = EventData::system(Severity::Info, "x");
        assert!(sink.deliver("hello", Severity::Info, &event).await.is_err());
    }

    #[tokio::test]
    async fn rejected_call_reports_description() {
        let body = r#"{"ok":false,"description":"Conflict: terminated by other getUpdates request"}"#;
        let (base, _requests) = fake_bot_api(vec![(200, body.into())]).await;
        let api = BotApi::new(base, "t").unwrap();

        let err = api
            .call::<_, Vec<serde_json::Value>>("getUpdates", &serde_json::json!({}), HTTP_TIMEOUT)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Conflict"));
    }

    #[test]
    fn debug_redacts_token() {
        let sink = TelegramSink::new("secret-token", vec![]).unwrap();
        assert!(!format!("{sink:?}").contains("secret-token"));
    }
}
