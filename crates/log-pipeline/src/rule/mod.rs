//! 이벤트 룰 -- 카탈로그, 오버라이드, 싱크별 해석
//!
//! 룰 카탈로그는 YAML 목록으로 배포됩니다.
//!
//! # 룰 형식
//! ```yaml
//! - eventName: OfferTaken
//!   logger: b.c.o.OpenOfferManager
//!   pattern: "Offer {0:uptoHyphen} was taken"
//!   message: "Your offer {0} was taken"
//!   level: notice
//!   sendToTelegram: true
//!   isActive: true
//! ```
//!
//! # 아키텍처
//! - [`RuleCatalog`]: 이름으로 찾을 수 있는 순서 있는 룰 집합 (시스템 룰 포함)
//! - [`loader`]: YAML 파일 로딩 및 유효성 검증
//! - [`resolver`]: 워처/싱크 범위 오버라이드를 적용한 싱크별 룰 맵
//! - [`system`]: 내장 시스템 룰
//! - [`types`]: 룰 데이터 구조 정의

pub mod catalog;
pub mod loader;
pub mod resolver;
pub mod system;
pub mod types;

pub use catalog::RuleCatalog;
pub use loader::RuleLoader;
pub use resolver::{EffectiveRuleMap, RuleResolver};
pub use system::system_rules;
pub use types::Rule;
