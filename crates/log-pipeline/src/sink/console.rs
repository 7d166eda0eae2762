//! 콘솔 싱크

use colored::{ColoredString, Colorize};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use bisq_watcher_core::config::SinkKind;
use bisq_watcher_core::pipeline::BoxFuture;
use bisq_watcher_core::types::{EventData, Severity};

use super::{Sink, sink_error};
use crate::error::LogPipelineError;

/// 심각도별 색상으로 한 줄씩 출력하는 싱크
pub struct ConsoleSink<W = tokio::io::Stdout> {
    writer: W,
}

impl ConsoleSink {
    /// 표준 출력에 쓰는 싱크
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W> ConsoleSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// 임의의 writer에 쓰는 싱크
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// 내부 writer를 돌려받습니다.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn paint(message: &str, severity: Severity) -> ColoredString {
    match severity {
        Severity::Emerg | Severity::Alert | Severity::Crit => message.red().bold(),
        Severity::Error => message.red(),
        Severity::Warning => message.yellow(),
        Severity::Notice => message.cyan(),
        Severity::Info => message.green(),
        Severity::Debug | Severity::Unknown => message.normal(),
    }
}

impl<W> Sink for ConsoleSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    fn name(&self) -> &str {
        "console"
    }

    fn kind(&self) -> SinkKind {
        SinkKind::Console
    }

    fn deliver<'a>(
        &'a mut self,
        message: &'a str,
        severity: Severity,
        _event: &'a EventData,
    ) -> BoxFuture<'a, Result<(), LogPipelineError>> {
        Box::pin(async move {
            let line = format!("{}\n", paint(message, severity));
            self.writer
                .write_all(line.as_bytes())
                .await
                .map_err(|e| sink_error("console", e))?;
            self.writer.flush().await.map_err(|e| sink_error("console", e))
        })
    }

    fn close(&mut self) -> BoxFuture<'_, Result<(), LogPipelineError>> {
        Box::pin(async move { self.writer.flush().await.map_err(|e| sink_error("console", e)) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_one_line_per_message() {
        colored::control::set_override(false);
        let mut sink = ConsoleSink::new(Vec::new());
        let event = EventData::system(Severity::Info, "hello");

        sink.deliver("first", Severity::Info, &event).await.unwrap();
        sink.deliver("second", Severity::Error, &event).await.unwrap();
        sink.close().await.unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(out, "first\nsecond\n");
    }
}
