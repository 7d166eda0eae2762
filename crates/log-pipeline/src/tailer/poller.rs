//! 변경 감지 폴러 -- 주기적으로 파일 메타데이터를 확인합니다.
//!
//! 크기나 수정 시각이 바뀌거나 파일이 사라졌다 나타나면 [`ChangeNotifier`]로
//! 테일러를 깨웁니다. 첫 확인에서는 항상 알립니다.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use tokio::sync::watch;

use super::ChangeNotifier;

/// 한 번의 메타데이터 확인 결과
#[derive(Debug, Clone, PartialEq, Eq)]
enum FileState {
    Present { len: u64, modified: Option<SystemTime> },
    Missing(ErrorKind),
}

/// 파일 변경 폴러
pub struct ChangePoller {
    path: PathBuf,
    interval: Duration,
    notifier: ChangeNotifier,
    last: Option<FileState>,
}

impl ChangePoller {
    /// 새 폴러를 생성합니다.
    pub fn new(path: impl Into<PathBuf>, interval: Duration, notifier: ChangeNotifier) -> Self {
        Self {
            path: path.into(),
            interval,
            notifier,
            last: None,
        }
    }

    /// 종료 신호가 올 때까지 폴링합니다.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

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
                _ = ticker.tick() => {
                    self.check().await;
                }
            }
        }
        tracing::debug!(path = %self.path.display(), "change poller stopped");
    }

    /// 메타데이터를 한 번 확인하고, 바뀌었으면 알립니다.
    ///
    /// 알림을 보냈으면 `true`를 반환합니다.
    pub async fn check(&mut self) -> bool {
        let state = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => FileState::Present {
                len: meta.len(),
                modified: meta.modified().ok(),
            },
            Err(e) => FileState::Missing(e.kind()),
        };

        if self.last.as_ref() == Some(&state) {
            return false;
        }
        tracing::trace!(path = %self.path.display(), ?state, "logfile changed");
        self.last = Some(state);
        self.notifier.notify();
        true
    }
}
