//! 룰 리졸버 -- 싱크별 유효 룰 맵 계산
//!
//! 우선순위: 기본 카탈로그 ⊳ 워처 범위 지시 ⊳ 싱크 범위 지시.
//! 지시를 모두 적용한 뒤 비활성 룰, 텔레그램 비허용 룰(텔레그램 싱크),
//! 임계값보다 덜 심각한 오버라이드를 가진 룰을 제거합니다.

use std::collections::HashMap;

use bisq_watcher_core::config::{OverwriteRule, SinkConfig, SinkKind};
use bisq_watcher_core::types::Severity;

use super::catalog::RuleCatalog;
use super::types::Rule;

/// 싱크 하나의 유효 룰 맵 (`event_name -> Rule`)
#[derive(Debug, Clone, Default)]
pub struct EffectiveRuleMap {
    rules: HashMap<String, Rule>,
    threshold: Severity,
}

impl EffectiveRuleMap {
    /// 이름으로 룰을 찾습니다.
    pub fn get(&self, event_name: &str) -> Option<&Rule> {
        self.rules.get(event_name)
    }

    /// 이름이 있는지 확인합니다.
    pub fn contains(&self, event_name: &str) -> bool {
        self.rules.contains_key(event_name)
    }

    /// 싱크 심각도 임계값
    pub fn threshold(&self) -> Severity {
        self.threshold
    }

    /// 룰 수
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// 비어있는지 확인
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 룰을 순회합니다 (순서 없음).
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values()
    }

    /// 이름순으로 정렬된 룰 이름
    pub fn sorted_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// 카탈로그와 워처 범위 지시를 들고 싱크별 맵을 계산하는 리졸버
pub struct RuleResolver<'a> {
    catalog: &'a RuleCatalog,
    watcher_directives: &'a [OverwriteRule],
}

impl<'a> RuleResolver<'a> {
    /// 새 리졸버를 생성합니다.
    pub fn new(catalog: &'a RuleCatalog, watcher_directives: &'a [OverwriteRule]) -> Self {
        Self {
            catalog,
            watcher_directives,
        }
    }

    /// 싱크의 유효 룰 맵을 계산합니다.
    pub fn resolve(&self, sink: &SinkConfig) -> EffectiveRuleMap {
        let mut rules: HashMap<String, Rule> = self
            .catalog
            .iter()
            .map(|r| (r.event_name.clone(), r.clone()))
            .collect();

        apply_directives(&mut rules, self.watcher_directives, "watcher");
        apply_directives(&mut rules, &sink.overwrite_rules, "sink");

        let threshold = sink.level;
        let push_sink = sink.kind == SinkKind::Telegram;
        rules.retain(|_, rule| {
            rule.is_active
                && (!push_sink || rule.telegram_eligible)
                && rule
                    .severity_override
                    .is_none_or(|severity| severity.is_at_least(threshold))
        });

        tracing::debug!(
            sink = %sink.kind,
            threshold = %threshold,
            count = rules.len(),
            "resolved effective rule map"
        );

        EffectiveRuleMap { rules, threshold }
    }
}

fn apply_directives(rules: &mut HashMap<String, Rule>, directives: &[OverwriteRule], scope: &str) {
    for directive in directives {
        match rules.get_mut(&directive.event_name) {
            Some(rule) => rule.apply(directive),
            None => tracing::warn!(
                event_name = %directive.event_name,
                scope,
                "override names an unknown rule, ignoring"
            ),
        }
    }
}
