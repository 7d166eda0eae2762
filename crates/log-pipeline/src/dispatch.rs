//! 디스패처 -- 이벤트를 싱크별 룰 맵으로 걸러 전달합니다.
//!
//! 각 싱크는 자신의 [`EffectiveRuleMap`]을 가진 [`SinkRoute`]로 등록됩니다.
//! 이벤트 하나에 대해 싱크마다 다음을 수행합니다.
//!
//! ```text
//! 룰 조회 ─> 출처 필터 ─> 심각도 결정 ─> 임계값 비교 ─> 렌더링 ─> deliver
//! ```
//!
//! 전달 실패는 `telegramError`(텔레그램 싱크) 또는 `systemError` 이벤트로
//! 바뀌어 실패한 싱크를 제외한 나머지 싱크로 한 번만 전달됩니다.

use metrics::counter;
use tokio::sync::mpsc;

use bisq_watcher_core::config::{SinkKind, TimestampMode};
use bisq_watcher_core::metrics as m;
use bisq_watcher_core::types::{EventData, Severity};

use crate::error::LogPipelineError;
use crate::render::render_line;
use crate::rule::EffectiveRuleMap;
use crate::sink::Sink;

/// 싱크 하나와 그 싱크의 유효 룰 맵
pub struct SinkRoute {
    sink: Box<dyn Sink>,
    rules: EffectiveRuleMap,
    timestamp: TimestampMode,
}

impl SinkRoute {
    /// 새 라우트를 생성합니다.
    pub fn new(sink: Box<dyn Sink>, rules: EffectiveRuleMap, timestamp: TimestampMode) -> Self {
        Self {
            sink,
            rules,
            timestamp,
        }
    }

    /// 싱크 이름
    pub fn name(&self) -> &str {
        self.sink.name()
    }

    /// 유효 룰 맵
    pub fn rules(&self) -> &EffectiveRuleMap {
        &self.rules
    }

    /// 이 싱크로 보낼 메시지를 만듭니다. 걸러지면 `None`.
    pub fn render(&self, event: &EventData) -> Option<(String, Severity)> {
        let rule = self.rules.get(&event.event_name)?;
        if !rule.matches_origin(event.logger.as_deref(), event.thread.as_deref()) {
            return None;
        }
        let severity = rule.resolve_severity(event.severity);
        if !severity.is_at_least(self.rules.threshold()) {
            return None;
        }
        let line = render_line(
            &self.timestamp,
            event.timestamp,
            severity,
            &rule.message,
            &event.captures,
        );
        Some((line, severity))
    }

    /// 걸러지지 않았으면 전달합니다. 전달했으면 `true`.
    async fn deliver(&mut self, event: &EventData) -> Result<bool, LogPipelineError> {
        let Some((line, severity)) = self.render(event) else {
            return Ok(false);
        };
        self.sink.deliver(&line, severity, event).await?;
        Ok(true)
    }
}

/// 워처 하나의 디스패처. 싱크를 단독으로 소유합니다.
pub struct Dispatcher {
    watcher_name: String,
    routes: Vec<SinkRoute>,
}

impl Dispatcher {
    /// 새 디스패처를 생성합니다.
    pub fn new(watcher_name: impl Into<String>, routes: Vec<SinkRoute>) -> Self {
        Self {
            watcher_name: watcher_name.into(),
            routes,
        }
    }

    /// 등록된 싱크 수
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// 등록된 라우트
    pub fn routes(&self) -> &[SinkRoute] {
        &self.routes
    }

    /// 이벤트를 모든 싱크에 전달합니다.
    ///
    /// 실패한 싱크마다 에러 이벤트를 만들어 나머지 싱크에 전달합니다.
    /// 에러 이벤트 전달이 다시 실패하면 로그만 남깁니다.
    pub async fn dispatch(&mut self, event: &EventData) {
        let failures = self.dispatch_except(event, None).await;

        for (failed, kind, error) in failures {
            let notice = match kind {
                SinkKind::Telegram => EventData::telegram_error(error.to_string()),
                _ => EventData::system(Severity::Error, error.to_string()),
            };
            for (index, kind, error) in self.dispatch_except(&notice, Some(failed)).await {
                tracing::error!(
                    watcher = %self.watcher_name,
                    sink = %kind,
                    route = index,
                    error = %error,
                    "failed to deliver sink error notice"
                );
            }
        }
    }

    async fn dispatch_except(
        &mut self,
        event: &EventData,
        skip: Option<usize>,
    ) -> Vec<(usize, SinkKind, LogPipelineError)> {
        let mut failures = Vec::new();
        for (index, route) in self.routes.iter_mut().enumerate() {
            if skip == Some(index) {
                continue;
            }
            let kind = route.sink.kind();
            match route.deliver(event).await {
                Ok(true) => {
                    counter!(m::EVENTS_DELIVERED_TOTAL, m::LABEL_SINK => kind.to_string())
                        .increment(1);
                }
                Ok(false) => {}
                Err(error) => {
                    tracing::warn!(
                        watcher = %self.watcher_name,
                        sink = %kind,
                        event_name = %event.event_name,
                        error = %error,
                        "sink delivery failed"
                    );
                    counter!(m::DELIVERY_FAILURES_TOTAL, m::LABEL_SINK => kind.to_string())
                        .increment(1);
                    failures.push((index, kind, error));
                }
            }
        }
        failures
    }

    /// 채널이 닫힐 때까지 이벤트를 전달하고, 마지막에 싱크를 닫습니다.
    pub async fn run(mut self, mut rx: mpsc::Receiver<EventData>) {
        while let Some(event) = rx.recv().await {
            self.dispatch(&event).await;
        }
        self.close().await;
    }

    /// "Closing logger..."를 알리고 모든 싱크를 닫습니다.
    pub async fn close(&mut self) {
        self.dispatch(&EventData::system(Severity::Notice, "Closing logger..."))
            .await;
        for route in &mut self.routes {
            let closed = route.sink.close().await;
            if let Err(error) = closed {
                tracing::warn!(sink = %route.sink.name(), error = %error, "failed to close sink");
            }
        }
        tracing::debug!(watcher = %self.watcher_name, "dispatcher closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use bisq_watcher_core::config::SinkConfig;
    use bisq_watcher_core::pipeline::BoxFuture;

    use crate::rule::{Rule, RuleCatalog, RuleResolver};

    type Delivered = Arc<Mutex<Vec<(String, Severity)>>>;

    struct RecordingSink {
        kind: SinkKind,
        fail: bool,
        delivered: Delivered,
        closed: Arc<Mutex<bool>>,
    }

    impl Sink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        fn kind(&self) -> SinkKind {
            self.kind
        }

        fn deliver<'a>(
            &'a mut self,
            message: &'a str,
            severity: Severity,
            _event: &'a EventData,
        ) -> BoxFuture<'a, Result<(), LogPipelineError>> {
            Box::pin(async move {
                if self.fail {
                    return Err(LogPipelineError::Sink {
                        sink: "recording".into(),
                        reason: "boom".into(),
                    });
                }
                self.delivered
                    .lock()
                    .unwrap()
                    .push((message.to_owned(), severity));
                Ok(())
            })
        }

        fn close(&mut self) -> BoxFuture<'_, Result<(), LogPipelineError>> {
            Box::pin(async move {
                *self.closed.lock().unwrap() = true;
                Ok(())
            })
        }
    }

    fn recording(kind: SinkKind, fail: bool) -> (Box<dyn Sink>, Delivered, Arc<Mutex<bool>>) {
        let delivered = Delivered::default();
        let closed = Arc::new(Mutex::new(false));
        let sink = RecordingSink {
            kind,
            fail,
            delivered: Arc::clone(&delivered),
            closed: Arc::clone(&closed),
        };
        (Box::new(sink), delivered, closed)
    }

    fn catalog() -> RuleCatalog {
        let mut filtered = Rule::new("Filtered", "x {0}", "filtered {0}");
        filtered.logger = Some("b.c.Expected".into());
        let mut loud = Rule::new("Loud", "loud {0}", "loud {0}");
        loud.severity_override = Some(Severity::Alert);
        RuleCatalog::with_system_rules(vec![
            Rule::new("Trade", "trade {0}", "Trade {0}"),
            filtered,
            loud,
        ])
    }

    fn route(catalog: &RuleCatalog, sink: Box<dyn Sink>, level: Severity) -> SinkRoute {
        let config = SinkConfig {
            kind: sink.kind(),
            level,
            ..SinkConfig::default()
        };
        let rules = RuleResolver::new(catalog, &[]).resolve(&config);
        SinkRoute::new(sink, rules, TimestampMode::Omitted)
    }

    fn trade(severity: Severity) -> EventData {
        EventData::new(
            "Trade",
            severity,
            chrono::Local::now(),
            vec!["whole".into(), "abc".into()],
        )
    }

    #[tokio::test]
    async fn delivers_rendered_message() {
        let catalog = catalog();
        let (sink, delivered, _) = recording(SinkKind::Console, false);
        let mut dispatcher = Dispatcher::new("main", vec![route(&catalog, sink, Severity::Debug)]);

        dispatcher.dispatch(&trade(Severity::Info)).await;

        let delivered = delivered.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert!(delivered[0].0.ends_with("[info] Trade abc"));
    }

    #[tokio::test]
    async fn drops_below_threshold_and_unknown_events() {
        let catalog = catalog();
        let (sink, delivered, _) = recording(SinkKind::Console, false);
        let mut dispatcher = Dispatcher::new("main", vec![route(&catalog, sink, Severity::Warning)]);

        dispatcher.dispatch(&trade(Severity::Info)).await;
        dispatcher
            .dispatch(&EventData::new("NoSuchRule", Severity::Error, chrono::Local::now(), vec![]))
            .await;
        dispatcher.dispatch(&trade(Severity::Error)).await;

        assert_eq!(delivered.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn override_severity_is_used_for_threshold() {
        let catalog = catalog();
        let (sink, delivered, _) = recording(SinkKind::Console, false);
        let mut dispatcher = Dispatcher::new("main", vec![route(&catalog, sink, Severity::Crit)]);

        let loud = EventData::new(
            "Loud",
            Severity::Debug,
            chrono::Local::now(),
            vec!["w".into(), "1".into()],
        );
        dispatcher.dispatch(&loud).await;

        let delivered = delivered.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].1, Severity::Alert);
    }

    #[tokio::test]
    async fn origin_filter_drops_other_loggers() {
        let catalog = catalog();
        let (sink, delivered, _) = recording(SinkKind::Console, false);
        let mut dispatcher = Dispatcher::new("main", vec![route(&catalog, sink, Severity::Debug)]);

        let event = |logger: &str| {
            EventData::new("Filtered", Severity::Info, chrono::Local::now(), vec!["w".into(), "1".into()])
                .with_origin(logger, "main")
        };
        dispatcher.dispatch(&event("b.c.Other")).await;
        dispatcher.dispatch(&event("b.c.Expected")).await;

        assert_eq!(delivered.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn telegram_failure_notifies_other_sinks_only() {
        let catalog = catalog();
        let (broken, _, _) = recording(SinkKind::Telegram, true);
        let (console, delivered, _) = recording(SinkKind::Console, false);
        let mut dispatcher = Dispatcher::new(
            "main",
            vec![
                route(&catalog, broken, Severity::Debug),
                route(&catalog, console, Severity::Debug),
            ],
        );

        dispatcher.dispatch(&trade(Severity::Info)).await;

        let delivered = delivered.lock().unwrap();
        assert_eq!(delivered.len(), 2);
        assert!(delivered[1].0.contains("TelegramError: "));
        assert!(delivered[1].0.contains("boom"));
    }

    #[tokio::test]
    async fn run_closes_sinks_after_channel_closes() {
        let catalog = catalog();
        let (sink, delivered, closed) = recording(SinkKind::Console, false);
        let dispatcher = Dispatcher::new("main", vec![route(&catalog, sink, Severity::Debug)]);
        let (tx, rx) = mpsc::channel(4);

        tx.send(trade(Severity::Info)).await.unwrap();
        drop(tx);
        dispatcher.run(rx).await;

        let delivered = delivered.lock().unwrap();
        assert_eq!(delivered.len(), 2);
        assert!(delivered[1].0.ends_with("Closing logger..."));
        assert!(*closed.lock().unwrap());
    }
}
