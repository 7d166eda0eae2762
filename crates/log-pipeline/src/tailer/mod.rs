//! 테일러 -- 로그 파일 증분 읽기, 레코드 조립, 패턴 매칭
//!
//! 테일러는 파일 오프셋과 핑거프린트 캐시를 단독으로 소유합니다.
//! 변경 알림마다 마지막 오프셋보다 오버랩 윈도우만큼 앞에서 읽기 시작하여
//! 이미 처리한 레코드를 캐시로 건너뛰고, 새 레코드만 룰과 매칭합니다.
//!
//! # 읽기 사이클
//! ```text
//! stat ─┬─ size < next_offset ──> 로테이션: offset 0, 캐시 비움, notice
//!       └─ start = next_offset - window * 2^k (0 미만이면 0)
//!             │
//!             ▼
//!        [start, size) 줄 단위 스트리밍 ──> 레코드 조립 ──> 경계 확인 ──> 매칭/캐시
//!             │
//!             ▼
//!        next_offset = size
//! ```
//!
//! 윈도우 첫 레코드가 캐시에 없으면(경계 미확인) 사이클을 중단하고
//! 되돌아가는 거리를 두 배로 늘려 다시 읽습니다. 파일 처음에 닿으면
//! 경계는 항상 확인된 것으로 봅니다.

pub mod poller;
pub mod scheduler;

pub use poller::ChangePoller;
pub use scheduler::{Admission, ReadScheduler};

use std::io::SeekFrom;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use metrics::counter;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncSeekExt, BufReader};
use tokio::sync::{mpsc, watch};

use bisq_watcher_core::metrics as m;
use bisq_watcher_core::types::{EventData, Severity};

use crate::cache::FingerprintCache;
use crate::config::TailerConfig;
use crate::error::LogPipelineError;
use crate::pattern::{CompiledPattern, PatternCompiler};
use crate::record::{HeaderParser, LogRecord};
use crate::rule::Rule;

/// 알림 한 번에 실행할 수 있는 최대 사이클 수
pub const MAX_CYCLES_PER_WAKE: u32 = 64;

/// 레코드 처리 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// 캐시만 채우고 매칭하지 않음
    CacheOnly,
    /// 매칭하여 이벤트를 내보냄
    Emit,
}

/// 사이클 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// 끝까지 읽음
    Completed,
    /// 오버랩 경계를 확인하지 못해 중단
    Unconfirmed,
    /// stat 또는 읽기 실패
    Failed,
}

/// 테일러 오프셋 상태
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TailerState {
    /// 다음 사이클 기준 오프셋 (로테이션 외에는 감소하지 않음)
    pub next_offset: u64,
    /// 연속으로 경계를 확인하지 못한 사이클 수
    pub unconfirmed_streak: u32,
}

/// 테일러 통계 (워처 헬스 체크에서 공유)
#[derive(Debug, Default)]
pub struct TailerStats {
    records_processed: AtomicU64,
    events_emitted: AtomicU64,
    read_errors: AtomicU64,
    last_error: Mutex<Option<String>>,
}

impl TailerStats {
    /// 처리한 레코드 수
    pub fn records_processed(&self) -> u64 {
        self.records_processed.load(Ordering::Relaxed)
    }

    /// 내보낸 이벤트 수
    pub fn events_emitted(&self) -> u64 {
        self.events_emitted.load(Ordering::Relaxed)
    }

    /// 읽기 실패 수
    pub fn read_errors(&self) -> u64 {
        self.read_errors.load(Ordering::Relaxed)
    }

    /// 마지막 사이클이 실패했다면 그 사유
    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set_last_error(&self, error: Option<String>) {
        *self
            .last_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = error;
    }
}

/// 변경 알림을 테일러 태스크로 전달하는 핸들
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    scheduler: Arc<ReadScheduler>,
    wake: mpsc::Sender<()>,
}

impl ChangeNotifier {
    /// 변경을 알립니다.
    ///
    /// 읽는 중이면 다시 읽기만 예약하고, 아니면 테일러 태스크를 깨웁니다.
    pub fn notify(&self) -> Admission {
        let admission = self.scheduler.request();
        if admission == Admission::Start && self.wake.try_send(()).is_err() {
            tracing::debug!("tailer task is gone, dropping change notification");
            self.scheduler.release();
        }
        admission
    }
}

struct RuleMatcher {
    event_name: String,
    pattern: Arc<CompiledPattern>,
}

/// 로그 파일 하나를 따라가는 테일러
pub struct Tailer {
    config: TailerConfig,
    parser: HeaderParser,
    cache: FingerprintCache,
    compiler: PatternCompiler,
    matchers: Vec<RuleMatcher>,
    state: TailerState,
    events: mpsc::Sender<EventData>,
    scheduler: Arc<ReadScheduler>,
    stats: Arc<TailerStats>,
}

impl Tailer {
    /// 새 테일러를 생성합니다.
    pub fn new(
        config: TailerConfig,
        events: mpsc::Sender<EventData>,
    ) -> Result<Self, LogPipelineError> {
        Ok(Self {
            cache: FingerprintCache::new(config.max_events, config.use_hash),
            parser: HeaderParser::new()?,
            compiler: PatternCompiler::new(),
            matchers: Vec::new(),
            state: TailerState::default(),
            events,
            scheduler: Arc::new(ReadScheduler::new()),
            stats: Arc::new(TailerStats::default()),
            config,
        })
    }

    /// 룰 패턴을 컴파일하여 매처로 등록합니다.
    ///
    /// 컴파일에 실패한 룰은 `systemError` 이벤트로 알리고 건너뜁니다.
    /// 등록된 매처 수를 반환합니다.
    pub async fn load_rules<'r>(&mut self, rules: impl IntoIterator<Item = &'r Rule>) -> usize {
        let mut failures = Vec::new();
        for rule in rules {
            if rule.is_system() {
                continue;
            }
            match self.compiler.compile(&rule.pattern) {
                Ok(pattern) => self.matchers.push(RuleMatcher {
                    event_name: rule.event_name.clone(),
                    pattern,
                }),
                Err(e) => {
                    tracing::warn!(event_name = %rule.event_name, error = %e, "rule pattern rejected");
                    failures.push(format!("Rule {} disabled: {e}", rule.event_name));
                }
            }
        }
        for message in failures {
            self.emit_system(Severity::Error, message).await;
        }
        tracing::debug!(
            watcher = %self.config.watcher_name,
            matchers = self.matchers.len(),
            templates = self.compiler.cached_count(),
            "compiled rule patterns"
        );
        self.matchers.len()
    }

    /// 변경 알림 핸들과 수신 채널을 만듭니다.
    pub fn change_channel(&self) -> (ChangeNotifier, mpsc::Receiver<()>) {
        let (wake, wake_rx) = mpsc::channel(1);
        let notifier = ChangeNotifier {
            scheduler: Arc::clone(&self.scheduler),
            wake,
        };
        (notifier, wake_rx)
    }

    /// 읽기 스케줄러
    pub fn scheduler(&self) -> Arc<ReadScheduler> {
        Arc::clone(&self.scheduler)
    }

    /// 공유 통계
    pub fn stats(&self) -> Arc<TailerStats> {
        Arc::clone(&self.stats)
    }

    /// 현재 오프셋 상태
    pub fn state(&self) -> TailerState {
        self.state
    }

    /// 캐시된 핑거프린트 수
    pub fn cached_records(&self) -> usize {
        self.cache.len()
    }

    /// 시작 시 파일 전체를 읽습니다.
    ///
    /// `cache_only_at_start`이면 캐시만 채웁니다. 진행률을 10% 단위로 알립니다.
    pub async fn initial_read(&mut self) {
        if self.scheduler.request() == Admission::Deferred {
            tracing::debug!("initial read requested while reading, skipping");
            return;
        }
        let mode = if self.config.cache_only_at_start {
            ReadMode::CacheOnly
        } else {
            ReadMode::Emit
        };
        self.run_wake(mode, true).await;
    }

    /// 읽기 소유를 가진 상태에서 필요한 만큼 사이클을 실행합니다.
    ///
    /// 호출 전에 [`ReadScheduler::request`]가 `Start`를 반환했어야 합니다.
    pub async fn run_wake(&mut self, mut mode: ReadMode, report_progress: bool) {
        let mut cycles = 0u32;
        loop {
            let outcome = self.read_cycle(mode, report_progress && cycles == 0).await;
            cycles += 1;

            let unconfirmed = outcome == CycleOutcome::Unconfirmed;
            if !unconfirmed {
                mode = ReadMode::Emit;
            }
            if !self.scheduler.finish(unconfirmed) {
                return;
            }

            if cycles >= MAX_CYCLES_PER_WAKE {
                tracing::warn!(
                    path = %self.config.path.display(),
                    cycles,
                    "read cycle limit reached, waiting for next change"
                );
                self.scheduler.release();
                return;
            }
        }
    }

    /// 태스크 루프: 깨어날 때마다 읽고, 종료 신호가 오면 멈춥니다.
    ///
    /// 진행 중인 사이클은 끝까지 실행됩니다.
    pub async fn run(mut self, mut wake_rx: mpsc::Receiver<()>, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                wake = wake_rx.recv() => match wake {
                    Some(()) => self.run_wake(ReadMode::Emit, false).await,
                    None => break,
                },
            }
        }
        self.scheduler.release();
        tracing::debug!(path = %self.config.path.display(), "tailer task stopped");
    }

    /// 읽기 사이클 하나를 실행합니다.
    pub async fn read_cycle(&mut self, mode: ReadMode, report_progress: bool) -> CycleOutcome {
        let path = self.config.path.clone();

        let size = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta.len(),
            Err(e) => {
                return self
                    .fail(format!("Cannot access logfile {}: {e}", path.display()))
                    .await;
            }
        };

        let start;
        let mut confirmed;
        if size < self.state.next_offset {
            tracing::info!(
                path = %path.display(),
                size,
                previous_offset = self.state.next_offset,
                "logfile rotated"
            );
            self.state = TailerState::default();
            self.cache.clear();
            counter!(m::ROTATIONS_TOTAL, m::LABEL_WATCHER => self.config.watcher_name.clone())
                .increment(1);
            self.emit_system(
                Severity::Notice,
                format!("The Bisq logfile {} has been rotated!", path.display()),
            )
            .await;
            start = 0;
            confirmed = true;
        } else {
            let back_off = self
                .config
                .overlap_window
                .saturating_mul(2u64.saturating_pow(self.state.unconfirmed_streak));
            start = self.state.next_offset.saturating_sub(back_off);
            confirmed = start == 0 || self.config.overlap_window == 0;
        }

        let mut file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) => {
                return self
                    .fail(format!("Cannot open logfile {}: {e}", path.display()))
                    .await;
            }
        };
        if let Err(e) = file.seek(SeekFrom::Start(start)).await {
            return self
                .fail(format!("Cannot seek logfile {}: {e}", path.display()))
                .await;
        }

        let total = size - start;
        let mut reader = BufReader::new(file.take(total));
        let mut buf = Vec::new();
        let mut open: Option<LogRecord> = None;
        let mut lines_read = 0usize;
        let mut bytes_read = 0u64;
        let mut next_progress = 10u64;

        tracing::trace!(path = %path.display(), start, size, "read cycle started");

        loop {
            buf.clear();
            let n = match reader.read_until(b'\n', &mut buf).await {
                Ok(n) => n,
                Err(e) => {
                    return self
                        .fail(format!("Error reading logfile {}: {e}", path.display()))
                        .await;
                }
            };
            if n == 0 {
                break;
            }
            lines_read += 1;
            bytes_read += n as u64;

            let line = decode_line(&buf);
            match self.parser.parse(&line) {
                Some(header) => {
                    if let Some(record) = open.take() {
                        confirmed = confirmed || self.cache.has(record.text());
                        if !confirmed {
                            return self.unconfirmed(start);
                        }
                        self.process_record(record, mode).await;
                    }
                    open = Some(LogRecord::open(line, header));
                }
                None => match open.as_mut() {
                    Some(record) => record.append(&line),
                    None => tracing::trace!("continuation line without open record, dropped"),
                },
            }

            if report_progress && total > 0 {
                while next_progress <= 100 && bytes_read * 100 >= next_progress * total {
                    self.emit_system(
                        Severity::Debug,
                        format!("logProcessor: Reading the logfile at start... {next_progress}%"),
                    )
                    .await;
                    next_progress += 10;
                }
            }
        }

        if let Some(record) = open.take() {
            confirmed = confirmed || self.cache.has(record.text());
            if !confirmed {
                return self.unconfirmed(start);
            }
            self.process_record(record, mode).await;
        }

        if lines_read > 0 {
            if !confirmed {
                return self.unconfirmed(start);
            }
            self.state.next_offset = size;
        }
        self.state.unconfirmed_streak = 0;
        self.stats.set_last_error(None);
        CycleOutcome::Completed
    }

    async fn process_record(&mut self, record: LogRecord, mode: ReadMode) {
        let text = record.text();
        if self.cache.has(text) {
            return;
        }

        self.stats.records_processed.fetch_add(1, Ordering::Relaxed);
        counter!(m::RECORDS_PROCESSED_TOTAL, m::LABEL_WATCHER => self.config.watcher_name.clone())
            .increment(1);

        if mode == ReadMode::Emit {
            let header = record.header();
            let matched: Vec<EventData> = self
                .matchers
                .iter()
                .filter_map(|matcher| {
                    matcher.pattern.captures(text).map(|captures| {
                        EventData::new(
                            matcher.event_name.clone(),
                            header.severity,
                            header.timestamp,
                            captures,
                        )
                        .with_origin(header.logger.clone(), header.thread.clone())
                    })
                })
                .collect();

            for event in matched {
                tracing::debug!(event_name = %event.event_name, "rule matched");
                self.stats.events_emitted.fetch_add(1, Ordering::Relaxed);
                counter!(m::EVENTS_EMITTED_TOTAL, m::LABEL_WATCHER => self.config.watcher_name.clone())
                    .increment(1);
                self.emit(event).await;
            }
        }

        self.cache.add(text);
    }

    fn unconfirmed(&mut self, start: u64) -> CycleOutcome {
        self.state.unconfirmed_streak = self.state.unconfirmed_streak.saturating_add(1);
        tracing::debug!(
            path = %self.config.path.display(),
            start,
            streak = self.state.unconfirmed_streak,
            "overlap boundary not confirmed, backing off further"
        );
        CycleOutcome::Unconfirmed
    }

    async fn fail(&mut self, message: String) -> CycleOutcome {
        tracing::warn!(path = %self.config.path.display(), error = %message, "read cycle failed");
        self.stats.read_errors.fetch_add(1, Ordering::Relaxed);
        counter!(m::READ_ERRORS_TOTAL, m::LABEL_WATCHER => self.config.watcher_name.clone())
            .increment(1);
        self.stats.set_last_error(Some(message.clone()));
        self.emit_system(Severity::Error, message).await;
        CycleOutcome::Failed
    }

    async fn emit_system(&self, severity: Severity, message: String) {
        self.emit(EventData::system(severity, message)).await;
    }

    async fn emit(&self, event: EventData) {
        if self.events.send(event).await.is_err() {
            tracing::debug!("event channel closed, dropping event");
        }
    }
}

/// 줄 끝의 `\n`/`\r\n`을 떼고 UTF-8로 변환합니다 (잘못된 바이트는 대체).
fn decode_line(buf: &[u8]) -> String {
    let mut end = buf.len();
    if end > 0 && buf[end - 1] == b'\n' {
        end -= 1;
    }
    if end > 0 && buf[end - 1] == b'\r' {
        end -= 1;
    }
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const H1: &str = "Sep-05 13:54:39.480 [main] INFO  b.c.Foo: trade abc started";
    const H2: &str = "Sep-05 13:54:40.100 [main] ERROR b.c.Bar: trade def failed";

    fn trade_rule() -> Rule {
        Rule::new("TradeStarted", "trade {0} started", "Trade {0}")
    }

    fn tailer_for(
        path: &std::path::Path,
        window: u64,
    ) -> (Tailer, mpsc::Receiver<EventData>) {
        let (tx, rx) = mpsc::channel(256);
        let mut config = TailerConfig::new(path);
        config.overlap_window = window;
        config.cache_only_at_start = false;
        (Tailer::new(config, tx).unwrap(), rx)
    }

    fn drain(rx: &mut mpsc::Receiver<EventData>) -> Vec<EventData> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    fn append(path: &std::path::Path, text: &str) {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        file.write_all(text.as_bytes()).unwrap();
    }

    #[test]
    fn decode_line_strips_line_endings() {
        assert_eq!(decode_line(b"abc\r\n"), "abc");
        assert_eq!(decode_line(b"abc\n"), "abc");
        assert_eq!(decode_line(b"abc"), "abc");
        assert_eq!(decode_line(&[0x61, 0xff, b'\n']), "a\u{fffd}");
    }

    #[tokio::test]
    async fn multi_line_record_is_one_unit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bisq.log");
        append(&path, &format!("{H1}\njava.lang.Exception: x\n\tat a.b(C.java:1)\n{H2}\n"));

        let (mut tailer, mut rx) = tailer_for(&path, 1000);
        tailer.load_rules([&trade_rule()]).await;
        assert_eq!(tailer.read_cycle(ReadMode::Emit, false).await, CycleOutcome::Completed);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].captures[1], "abc");
        assert!(events[0].captures[0].contains("\tat a.b(C.java:1)"));
        assert_eq!(events[0].logger.as_deref(), Some("b.c.Foo"));
        assert_eq!(events[0].severity, Severity::Info);
        assert_eq!(tailer.cached_records(), 2);
    }

    #[tokio::test]
    async fn overlap_does_not_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bisq.log");
        append(&path, &format!("{H1}\n{H2}\n"));

        let (mut tailer, mut rx) = tailer_for(&path, 10_000);
        tailer.load_rules([&trade_rule()]).await;
        tailer.read_cycle(ReadMode::Emit, false).await;
        assert_eq!(drain(&mut rx).len(), 1);

        append(&path, "Sep-05 13:55:00.000 [main] INFO  b.c.Foo: trade ghi started\n");
        assert_eq!(tailer.read_cycle(ReadMode::Emit, false).await, CycleOutcome::Completed);
        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].captures[1], "ghi");
    }

    #[tokio::test]
    async fn small_window_backs_off_until_boundary_confirmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bisq.log");
        append(&path, &format!("{H1}\n{H2}\n"));

        let (mut tailer, mut rx) = tailer_for(&path, 5);
        tailer.load_rules([&trade_rule()]).await;
        tailer.read_cycle(ReadMode::Emit, false).await;
        assert_eq!(drain(&mut rx).len(), 1);

        append(&path, "Sep-05 13:55:00.000 [main] INFO  b.c.Foo: trade ghi started\n");
        assert_eq!(tailer.read_cycle(ReadMode::Emit, false).await, CycleOutcome::Unconfirmed);
        assert_eq!(tailer.state().unconfirmed_streak, 1);
        assert!(drain(&mut rx).is_empty());

        assert_eq!(tailer.scheduler().request(), Admission::Start);
        tailer.run_wake(ReadMode::Emit, false).await;

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].captures[1], "ghi");
        assert_eq!(tailer.state().unconfirmed_streak, 0);
        assert_eq!(
            tailer.state().next_offset,
            std::fs::metadata(&path).unwrap().len()
        );
        assert!(!tailer.scheduler().is_reading());
    }

    #[tokio::test]
    async fn rotation_resets_offset_and_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bisq.log");
        append(&path, &format!("{H1}\n{H2}\n"));

        let (mut tailer, mut rx) = tailer_for(&path, 10_000);
        tailer.load_rules([&trade_rule()]).await;
        tailer.read_cycle(ReadMode::Emit, false).await;
        drain(&mut rx);

        std::fs::write(&path, format!("{H1}\n")).unwrap();
        assert_eq!(tailer.read_cycle(ReadMode::Emit, false).await, CycleOutcome::Completed);

        let events = drain(&mut rx);
        assert_eq!(events[0].event_name, "systemNotice");
        assert!(events[0].captures[1].contains("has been rotated"));
        // 같은 텍스트라도 로테이션 뒤에는 새 레코드다
        assert_eq!(events[1].event_name, "TradeStarted");
        assert_eq!(tailer.state().next_offset, (H1.len() + 1) as u64);
    }

    #[tokio::test]
    async fn cache_only_mode_does_not_emit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bisq.log");
        append(&path, &format!("{H1}\n{H2}\n"));

        let (mut tailer, mut rx) = tailer_for(&path, 10_000);
        tailer.load_rules([&trade_rule()]).await;
        tailer.read_cycle(ReadMode::CacheOnly, false).await;
        assert!(drain(&mut rx).is_empty());
        assert_eq!(tailer.cached_records(), 2);
    }

    #[tokio::test]
    async fn missing_file_emits_error_and_keeps_offset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.log");
        let (mut tailer, mut rx) = tailer_for(&path, 10_000);

        assert_eq!(tailer.read_cycle(ReadMode::Emit, false).await, CycleOutcome::Failed);
        let events = drain(&mut rx);
        assert_eq!(events[0].event_name, "systemError");
        assert_eq!(tailer.state().next_offset, 0);
        assert!(tailer.stats().last_error().is_some());
        assert_eq!(tailer.stats().read_errors(), 1);
    }

    #[tokio::test]
    async fn invalid_pattern_reports_system_error() {
        let dir = tempfile::tempdir().unwrap();
        let (mut tailer, mut rx) = tailer_for(&dir.path().join("x.log"), 100);
        let bad = Rule::new("Bad", "id={0:nope}", "m");
        let count = tailer.load_rules([&bad, &trade_rule()]).await;

        assert_eq!(count, 1);
        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_name, "systemError");
        assert!(events[0].captures[1].contains("Bad"));
    }

    #[tokio::test]
    async fn oversized_placeholder_index_disables_only_that_rule() {
        let dir = tempfile::tempdir().unwrap();
        let (mut tailer, mut rx) = tailer_for(&dir.path().join("x.log"), 100);
        let bad = Rule::new("Huge", "trade {9000000000} started", "m");
        let count = tailer.load_rules([&bad, &trade_rule()]).await;

        assert_eq!(count, 1);
        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_name, "systemError");
        assert!(events[0].captures[1].contains("Huge"));
    }

    #[tokio::test]
    async fn progress_events_during_initial_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bisq.log");
        let mut content = String::new();
        for i in 0..50 {
            content.push_str(&format!("Sep-05 13:54:{:02}.000 [main] INFO  b.c.Foo: line {i}\n", i % 60));
        }
        append(&path, &content);

        let (tx, mut rx) = mpsc::channel(256);
        let mut tailer = Tailer::new(TailerConfig::new(&path), tx).unwrap();
        tailer.initial_read().await;

        let progress: Vec<String> = drain(&mut rx)
            .into_iter()
            .filter(|e| e.event_name == "systemDebug")
            .map(|e| e.captures[1].clone())
            .collect();
        assert_eq!(progress.len(), 10);
        assert!(progress[0].ends_with("10%"));
        assert!(progress[9].ends_with("100%"));
        assert!(!tailer.scheduler().is_reading());
    }
}
