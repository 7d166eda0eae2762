//! 읽기 스케줄러 -- 테일러당 읽기 사이클을 하나로 제한합니다.
//!
//! 변경 알림이 읽기 도중에 오면 즉시 읽지 않고 "다시 읽기" 플래그만 세웁니다.
//! 사이클이 끝나면 플래그를 확인해 정확히 한 번 더 읽습니다.

use std::sync::{Mutex, MutexGuard};

/// 읽기 요청 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// 읽기를 시작해도 됨 (호출자가 읽기 소유)
    Start,
    /// 이미 읽는 중. 현재 사이클 후 다시 읽도록 예약됨
    Deferred,
}

#[derive(Debug, Default)]
struct SchedulerState {
    reading: bool,
    reread_requested: bool,
}

/// 단일 실행 보장용 `{reading, reread_requested}` 쌍
#[derive(Debug, Default)]
pub struct ReadScheduler {
    state: Mutex<SchedulerState>,
}

impl ReadScheduler {
    /// 새 스케줄러를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 읽기를 요청합니다.
    pub fn request(&self) -> Admission {
        let mut state = self.lock();
        if state.reading {
            state.reread_requested = true;
            Admission::Deferred
        } else {
            state.reading = true;
            Admission::Start
        }
    }

    /// 사이클 종료를 알립니다.
    ///
    /// `more_work`가 참이거나 다시 읽기가 예약되어 있으면 읽기 소유를 유지하고
    /// `true`를 반환합니다. 그렇지 않으면 소유를 놓고 `false`를 반환합니다.
    pub fn finish(&self, more_work: bool) -> bool {
        let mut state = self.lock();
        if more_work || state.reread_requested {
            state.reread_requested = false;
            true
        } else {
            state.reading = false;
            false
        }
    }

    /// 읽기 소유와 예약을 모두 놓습니다.
    pub fn release(&self) {
        let mut state = self.lock();
        state.reading = false;
        state.reread_requested = false;
    }

    /// 읽기 중인지 확인합니다.
    pub fn is_reading(&self) -> bool {
        self.lock().reading
    }

    /// 다시 읽기가 예약되어 있는지 확인합니다.
    pub fn is_reread_requested(&self) -> bool {
        self.lock().reread_requested
    }

    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        // 상태는 bool 두 개뿐이라 poison 이후에도 그대로 쓸 수 있다
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_request_starts() {
        let scheduler = ReadScheduler::new();
        assert_eq!(scheduler.request(), Admission::Start);
        assert!(scheduler.is_reading());
    }

    #[test]
    fn requests_during_read_collapse_into_one_reread() {
        let scheduler = ReadScheduler::new();
        assert_eq!(scheduler.request(), Admission::Start);
        assert_eq!(scheduler.request(), Admission::Deferred);
        assert_eq!(scheduler.request(), Admission::Deferred);

        assert!(scheduler.finish(false));
        assert!(scheduler.is_reading());
        assert!(!scheduler.finish(false));
        assert!(!scheduler.is_reading());
    }

    #[test]
    fn more_work_keeps_ownership() {
        let scheduler = ReadScheduler::new();
        scheduler.request();
        assert!(scheduler.finish(true));
        assert!(scheduler.is_reading());
        assert!(!scheduler.finish(false));
    }

    #[test]
    fn release_clears_everything() {
        let scheduler = ReadScheduler::new();
        scheduler.request();
        scheduler.request();
        scheduler.release();
        assert!(!scheduler.is_reading());
        assert!(!scheduler.is_reread_requested());
        assert_eq!(scheduler.request(), Admission::Start);
    }
}
