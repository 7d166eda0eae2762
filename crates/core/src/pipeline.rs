//! 파이프라인 trait -- 워처 생명주기 정의
//!
//! 각 워처(테일러 + 디스패처 + 싱크)는 [`Pipeline`]을 구현하여
//! 데몬이 동일한 방식으로 시작/정지/상태 확인을 할 수 있게 합니다.
//!
//! # 생명주기
//! ```text
//! Initialized → start() → Running → stop() → Stopped
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::WatcherError;

/// `dyn` trait 메서드에서 사용하는 boxed future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 파이프라인 생명주기 trait
pub trait Pipeline: Send {
    /// 파이프라인을 시작합니다.
    ///
    /// 이미 실행 중이면 `PipelineError::AlreadyRunning`을 반환합니다.
    fn start(&mut self) -> impl Future<Output = Result<(), WatcherError>> + Send;

    /// 파이프라인을 정지합니다.
    ///
    /// 진행 중인 읽기 사이클은 완료되고, 새 사이클은 시작되지 않습니다.
    fn stop(&mut self) -> impl Future<Output = Result<(), WatcherError>> + Send;

    /// 현재 상태를 확인합니다.
    fn health_check(&self) -> impl Future<Output = HealthStatus> + Send;
}

/// 헬스 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// 정상
    Healthy,
    /// 동작 중이지만 문제가 있음 (예: 최근 읽기 실패)
    Degraded(String),
    /// 동작하지 않음
    Unhealthy(String),
}

impl HealthStatus {
    /// 정상 여부
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// 비정상 여부
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, Self::Unhealthy(_))
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded(reason) => write!(f, "degraded: {reason}"),
            Self::Unhealthy(reason) => write!(f, "unhealthy: {reason}"),
        }
    }
}
