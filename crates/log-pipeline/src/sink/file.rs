//! 파일 싱크
//!
//! 이벤트 필드에 렌더링된 `message`를 더한 JSON 객체를 보기 좋게 들여쓴 뒤
//! 파일 끝에 추가합니다. 파일과 상위 디렉토리는 첫 전달 때 생성됩니다.

use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

use bisq_watcher_core::config::SinkKind;
use bisq_watcher_core::pipeline::BoxFuture;
use bisq_watcher_core::types::{EventData, Severity};

use super::{Sink, sink_error};
use crate::error::LogPipelineError;

/// JSON 파일 싱크
pub struct FileSink {
    path: PathBuf,
    file: Option<File>,
}

impl FileSink {
    /// 새 파일 싱크를 생성합니다. 파일은 아직 열지 않습니다.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    /// 출력 파일 경로
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn open(&mut self) -> Result<&mut File, LogPipelineError> {
        if self.file.is_none() {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| sink_error("file", format!("{}: {e}", parent.display())))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await
                .map_err(|e| sink_error("file", format!("{}: {e}", self.path.display())))?;
            tracing::debug!(path = %self.path.display(), "file sink opened");
            self.file = Some(file);
        }
        self.file
            .as_mut()
            .ok_or_else(|| sink_error("file", "file handle unavailable"))
    }
}

/// 이벤트를 JSON 객체로 펼치고 `message`를 더합니다.
pub fn event_json(message: &str, event: &EventData) -> Result<String, LogPipelineError> {
    let mut value = serde_json::to_value(event).map_err(|e| sink_error("file", e))?;
    if let Some(object) = value.as_object_mut() {
        object.insert(
            "message".to_owned(),
            serde_json::Value::String(message.to_owned()),
        );
    }
    serde_json::to_string_pretty(&value).map_err(|e| sink_error("file", e))
}

impl Sink for FileSink {
    fn name(&self) -> &str {
        "file"
    }

    fn kind(&self) -> SinkKind {
        SinkKind::File
    }

    fn deliver<'a>(
        &'a mut self,
        message: &'a str,
        _severity: Severity,
        event: &'a EventData,
    ) -> BoxFuture<'a, Result<(), LogPipelineError>> {
        Box::pin(async move {
            let mut entry = event_json(message, event)?;
            entry.push('\n');
            let file = self.open().await?;
            file.write_all(entry.as_bytes())
                .await
                .map_err(|e| sink_error("file", e))?;
            file.flush().await.map_err(|e| sink_error("file", e))
        })
    }

    fn close(&mut self) -> BoxFuture<'_, Result<(), LogPipelineError>> {
        Box::pin(async move {
            if let Some(mut file) = self.file.take() {
                file.flush().await.map_err(|e| sink_error("file", e))?;
                file.sync_all().await.map_err(|e| sink_error("file", e))?;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_contains_event_fields_and_message() {
        let event = EventData::system(Severity::Notice, "rotated");
        let json = event_json("rendered", &event).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["message"], "rendered");
        assert_eq!(value["eventName"], "systemNotice");
        assert_eq!(value["logLevel"], "notice");
        assert_eq!(value["data"][1], "rotated");
        assert!(json.contains("\n  "));
    }

    #[tokio::test]
    async fn appends_to_file_creating_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("app.log");
        let mut sink = FileSink::new(&path);
        let event = EventData::system(Severity::Info, "x");

        sink.deliver("one", Severity::Info, &event).await.unwrap();
        sink.deliver("two", Severity::Info, &event).await.unwrap();
        sink.close().await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("\"message\"").count(), 2);
        assert!(content.contains("\"one\""));
        assert!(content.ends_with("}\n"));
    }

    #[tokio::test]
    async fn unwritable_path_is_a_sink_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file, not dir").unwrap();
        let mut sink = FileSink::new(blocker.join("app.log"));
        let event = EventData::system(Severity::Info, "x");

        let err = sink.deliver("m", Severity::Info, &event).await.unwrap_err();
        assert!(matches!(err, LogPipelineError::Sink { .. }));
    }
}
