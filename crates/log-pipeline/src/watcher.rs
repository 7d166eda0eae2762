//! 워처 -- 로그 파일 하나에 대한 테일러, 폴러, 디스패처 묶음
//!
//! [`Watcher`]는 core의 [`Pipeline`] trait을 구현하여 데몬이 시작/정지/상태 확인을
//! 일관되게 수행할 수 있게 합니다.
//!
//! # 태스크 구성
//! ```text
//! ChangePoller ──notify──> Tailer ──EventData──> Dispatcher ──> Sinks
//!      (watch shutdown)       (watch shutdown)      (채널 종료 시 close)
//!                                                      ^
//! BotCommandListener ──telegramError───────────────────┘
//!      (watch shutdown)
//! ```
//!
//! 봇 명령 리스너는 명령이 꺼지지 않은 텔레그램 싱크의 토큰마다 하나씩 실행됩니다.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use bisq_watcher_core::config::{SinkConfig, WatcherConfig};
use bisq_watcher_core::error::{PipelineError, WatcherError};
use bisq_watcher_core::pipeline::{HealthStatus, Pipeline};
use bisq_watcher_core::types::{EventData, Severity};

use crate::config::TailerConfig;
use crate::dispatch::{Dispatcher, SinkRoute};
use crate::error::LogPipelineError;
use crate::rule::{Rule, RuleCatalog, RuleResolver};
use crate::sink::{BotCommandListener, Sink, build_sink};
use crate::tailer::{ChangePoller, Tailer, TailerStats};

/// 워처 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    /// 생성됨, 아직 시작 전
    Initialized,
    /// 실행 중
    Running,
    /// 정지됨 (재시작 불가)
    Stopped,
}

/// 시작 전까지 보관하는 구성 요소
struct Pending {
    tailer: Tailer,
    dispatcher: Dispatcher,
    event_rx: mpsc::Receiver<EventData>,
    listeners: Vec<BotCommandListener>,
}

/// 로그 파일 하나를 감시하는 워처
///
/// # 사용 예시
/// ```ignore
/// use bisq_watcher_log_pipeline::WatcherBuilder;
///
/// let mut watcher = WatcherBuilder::new()
///     .config(watcher_config)
///     .catalog(catalog)
///     .build()?;
///
/// watcher.start().await?;
/// ```
pub struct Watcher {
    name: String,
    path: PathBuf,
    poll_interval: Duration,
    cache_only_at_start: bool,
    state: WatcherState,
    rules: Vec<Rule>,
    sink_names: Vec<String>,
    bot_listener_count: usize,
    stats: Arc<TailerStats>,
    pending: Mutex<Option<Pending>>,
    event_tx: Option<mpsc::Sender<EventData>>,
    shutdown_tx: Option<watch::Sender<bool>>,
    tailer_task: Option<JoinHandle<()>>,
    poller_task: Option<JoinHandle<()>>,
    dispatcher_task: Option<JoinHandle<()>>,
    listener_tasks: Vec<JoinHandle<()>>,
}

impl Watcher {
    /// 워처 이름
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 감시 중인 파일 경로 (치환 완료)
    pub fn log_path(&self) -> &Path {
        &self.path
    }

    /// 현재 상태
    pub fn state(&self) -> WatcherState {
        self.state
    }

    /// 현재 상태 이름
    pub fn state_name(&self) -> &str {
        match self.state {
            WatcherState::Initialized => "initialized",
            WatcherState::Running => "running",
            WatcherState::Stopped => "stopped",
        }
    }

    /// 레코드와 매칭할 룰 수
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// 연결된 싱크 이름
    pub fn sink_names(&self) -> &[String] {
        &self.sink_names
    }

    /// 봇 명령 리스너 수
    pub fn bot_listener_count(&self) -> usize {
        self.bot_listener_count
    }

    /// 테일러 통계
    pub fn stats(&self) -> Arc<TailerStats> {
        Arc::clone(&self.stats)
    }

    /// 종료 신호를 받았음을 싱크에 알립니다.
    pub async fn announce_shutdown(&self, signal: &str) {
        self.emit(
            Severity::Notice,
            format!("Received {signal}, shutting down gracefully..."),
        )
        .await;
    }

    async fn emit(&self, severity: Severity, message: impl Into<String>) {
        let Some(tx) = self.event_tx.as_ref() else {
            return;
        };
        if tx.send(EventData::system(severity, message)).await.is_err() {
            tracing::debug!(watcher = %self.name, "dispatcher is gone, dropping system event");
        }
    }

    fn take_pending(&mut self) -> Option<Pending> {
        self.pending
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }
}

impl Pipeline for Watcher {
    async fn start(&mut self) -> Result<(), WatcherError> {
        match self.state {
            WatcherState::Running => return Err(PipelineError::AlreadyRunning.into()),
            WatcherState::Stopped => {
                return Err(PipelineError::InitFailed(format!(
                    "watcher '{}' cannot be restarted",
                    self.name
                ))
                .into());
            }
            WatcherState::Initialized => {}
        }
        let Some(Pending {
            mut tailer,
            dispatcher,
            event_rx,
            listeners,
        }) = self.take_pending()
        else {
            return Err(PipelineError::InitFailed(format!(
                "watcher '{}' has no pending components",
                self.name
            ))
            .into());
        };

        tracing::info!(watcher = %self.name, path = %self.path.display(), "starting watcher");
        self.dispatcher_task = Some(tokio::spawn(dispatcher.run(event_rx)));

        self.emit(
            Severity::Info,
            format!("bisq-watcher v{} has started!", env!("CARGO_PKG_VERSION")),
        )
        .await;
        self.emit(Severity::Info, "logProcessor: Starting...").await;

        let matchers = tailer.load_rules(&self.rules).await;
        tracing::info!(watcher = %self.name, rules = matchers, "loaded rule patterns");

        if self.cache_only_at_start {
            self.emit(Severity::Debug, "logProcessor: Building cache...").await;
        }
        self.emit(Severity::Debug, "logProcessor: Reading the logfile at start...")
            .await;
        tailer.initial_read().await;

        self.emit(
            Severity::Info,
            format!("Started watching file {}", self.path.display()),
        )
        .await;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (notifier, wake_rx) = tailer.change_channel();
        let poller = ChangePoller::new(self.path.clone(), self.poll_interval, notifier);

        self.tailer_task = Some(tokio::spawn(tailer.run(wake_rx, shutdown_rx.clone())));
        if let Some(event_tx) = self.event_tx.as_ref() {
            self.listener_tasks = listeners
                .into_iter()
                .map(|listener| tokio::spawn(listener.run(event_tx.clone(), shutdown_rx.clone())))
                .collect();
        }
        self.poller_task = Some(tokio::spawn(poller.run(shutdown_rx)));
        self.shutdown_tx = Some(shutdown_tx);
        self.state = WatcherState::Running;

        tracing::info!(watcher = %self.name, "watcher started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), WatcherError> {
        if self.state != WatcherState::Running {
            return Err(PipelineError::NotRunning.into());
        }

        tracing::info!(watcher = %self.name, "stopping watcher");
        self.emit(Severity::Notice, "logProcessor: Stopping...").await;

        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            // 수신측이 모두 끝났으면 보낼 필요도 없다
            let _ = shutdown_tx.send(true);
        }
        let listeners = self
            .listener_tasks
            .drain(..)
            .map(|task| (Some(task), "bot commands"));
        let tasks: Vec<_> = [
            (self.poller_task.take(), "poller"),
            (self.tailer_task.take(), "tailer"),
        ]
        .into_iter()
        .chain(listeners)
        .collect();
        for (task, label) in tasks {
            if let Some(task) = task
                && let Err(e) = task.await
            {
                tracing::warn!(watcher = %self.name, task = label, error = %e, "task ended abnormally");
            }
        }

        self.emit(
            Severity::Notice,
            format!("Stopped watching file {}", self.path.display()),
        )
        .await;
        self.emit(Severity::Notice, "logProcessor: Stopped!").await;

        self.event_tx = None;
        if let Some(task) = self.dispatcher_task.take()
            && let Err(e) = task.await
        {
            tracing::warn!(watcher = %self.name, task = "dispatcher", error = %e, "task ended abnormally");
        }

        self.state = WatcherState::Stopped;
        tracing::info!(watcher = %self.name, "watcher stopped");
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            WatcherState::Running => match self.stats.last_error() {
                Some(error) => HealthStatus::Degraded(error),
                None => HealthStatus::Healthy,
            },
            WatcherState::Initialized => HealthStatus::Unhealthy("not started".to_owned()),
            WatcherState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}

/// 워처 빌더
///
/// 싱크별 유효 룰 맵을 계산하고 채널과 구성 요소를 준비합니다.
pub struct WatcherBuilder {
    config: Option<WatcherConfig>,
    catalog: Option<Arc<RuleCatalog>>,
    sinks: Option<Vec<(SinkConfig, Box<dyn Sink>)>>,
    bot_listeners: Option<Vec<BotCommandListener>>,
    skip_bot_tokens: HashSet<String>,
    event_channel_capacity: Option<usize>,
}

impl WatcherBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: None,
            catalog: None,
            sinks: None,
            bot_listeners: None,
            skip_bot_tokens: HashSet::new(),
            event_channel_capacity: None,
        }
    }

    /// 워처 설정을 지정합니다.
    pub fn config(mut self, config: WatcherConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// 룰 카탈로그를 지정합니다. 지정하지 않으면 내장 시스템 룰만 사용합니다.
    pub fn catalog(mut self, catalog: Arc<RuleCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// 설정의 싱크 대신 직접 만든 싱크를 사용합니다.
    ///
    /// 각 싱크의 룰 맵은 함께 넘긴 `SinkConfig`로 계산됩니다.
    pub fn sinks(mut self, sinks: Vec<(SinkConfig, Box<dyn Sink>)>) -> Self {
        self.sinks = Some(sinks);
        self
    }

    /// 설정에서 만드는 대신 직접 만든 봇 명령 리스너를 사용합니다.
    pub fn bot_listeners(mut self, listeners: Vec<BotCommandListener>) -> Self {
        self.bot_listeners = Some(listeners);
        self
    }

    /// 다른 워처가 이미 폴링 중인 봇 토큰을 지정합니다.
    ///
    /// 같은 봇을 두 곳에서 `getUpdates`로 폴링하면 텔레그램이 거부하므로
    /// 이 토큰들에는 리스너를 만들지 않습니다.
    pub fn skip_bot_tokens(mut self, tokens: HashSet<String>) -> Self {
        self.skip_bot_tokens = tokens;
        self
    }

    /// 테일러 -> 디스패처 채널 용량을 설정합니다.
    pub fn event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = Some(capacity);
        self
    }

    /// 워처를 빌드합니다.
    ///
    /// # Errors
    /// 설정이 없거나, 경로 치환 또는 싱크 생성에 실패한 경우
    pub fn build(self) -> Result<Watcher, LogPipelineError> {
        let config = self.config.ok_or_else(|| LogPipelineError::Config {
            field: "watcher".to_owned(),
            reason: "watcher config is required".to_owned(),
        })?;
        let catalog = self
            .catalog
            .unwrap_or_else(|| Arc::new(RuleCatalog::with_system_rules(Vec::new())));

        let mut tailer_config = TailerConfig::from_core(&config)?;
        if let Some(capacity) = self.event_channel_capacity {
            tailer_config.event_channel_capacity = capacity;
        }
        if tailer_config.event_channel_capacity == 0 {
            return Err(LogPipelineError::Config {
                field: "event_channel_capacity".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        let listeners = match self.bot_listeners {
            Some(listeners) => listeners,
            // 직접 넘긴 싱크에는 리스너를 붙이지 않는다
            None if self.sinks.is_some() => Vec::new(),
            None => {
                let mut seen = self.skip_bot_tokens;
                config
                    .enabled_sinks()
                    .filter_map(SinkConfig::command_token)
                    .filter(|token| seen.insert((*token).to_owned()))
                    .map(BotCommandListener::new)
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        let sinks = match self.sinks {
            Some(sinks) => sinks,
            None => config
                .enabled_sinks()
                .map(|sink_config| -> Result<_, LogPipelineError> {
                    Ok((sink_config.clone(), build_sink(sink_config)?))
                })
                .collect::<Result<Vec<_>, _>>()?,
        };

        let resolver = RuleResolver::new(&catalog, &config.overwrite_rules);
        let routes: Vec<SinkRoute> = sinks
            .into_iter()
            .map(|(sink_config, sink)| {
                let rules = resolver.resolve(&sink_config);
                SinkRoute::new(sink, rules, sink_config.timestamp.clone())
            })
            .collect();

        // 어느 싱크에서든 유효한 패턴 룰만 매칭한다
        let rules: Vec<Rule> = catalog
            .pattern_rules()
            .filter(|rule| routes.iter().any(|route| route.rules().contains(&rule.event_name)))
            .cloned()
            .collect();
        let sink_names = routes.iter().map(|r| r.name().to_owned()).collect();

        let (event_tx, event_rx) = mpsc::channel(tailer_config.event_channel_capacity);
        let tailer = Tailer::new(tailer_config.clone(), event_tx.clone())?;
        let stats = tailer.stats();
        let dispatcher = Dispatcher::new(config.name.clone(), routes);

        tracing::debug!(
            watcher = %config.name,
            path = %tailer_config.path.display(),
            sinks = dispatcher.route_count(),
            rules = rules.len(),
            bot_listeners = listeners.len(),
            "watcher built"
        );

        Ok(Watcher {
            name: config.name,
            path: tailer_config.path,
            poll_interval: tailer_config.poll_interval,
            cache_only_at_start: tailer_config.cache_only_at_start,
            state: WatcherState::Initialized,
            rules,
            sink_names,
            bot_listener_count: listeners.len(),
            stats,
            pending: Mutex::new(Some(Pending {
                tailer,
                dispatcher,
                event_rx,
                listeners,
            })),
            event_tx: Some(event_tx),
            shutdown_tx: None,
            tailer_task: None,
            poller_task: None,
            dispatcher_task: None,
            listener_tasks: Vec::new(),
        })
    }
}

impl Default for WatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}
