//! 룰 카탈로그 -- 이름으로 찾을 수 있는 순서 있는 룰 집합

use std::collections::HashMap;

use super::system::{is_reserved_name, system_rules};
use super::types::Rule;

/// 룰 카탈로그
///
/// 삽입 순서를 유지하며, 같은 이름으로 다시 삽입하면 기존 룰을 교체합니다.
#[derive(Debug, Clone, Default)]
pub struct RuleCatalog {
    rules: Vec<Rule>,
    index: HashMap<String, usize>,
}

impl RuleCatalog {
    /// 빈 카탈로그를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 시스템 룰과 로그 룰로 카탈로그를 생성합니다.
    ///
    /// 시스템 룰 이름과 겹치는 로그 룰은 경고 후 무시됩니다.
    pub fn with_system_rules(log_rules: Vec<Rule>) -> Self {
        let mut catalog = Self::new();
        for rule in system_rules() {
            catalog.insert(rule);
        }
        for rule in log_rules {
            if is_reserved_name(&rule.event_name) {
                tracing::warn!(
                    event_name = %rule.event_name,
                    "rule uses a reserved system event name, skipping"
                );
                continue;
            }
            catalog.insert(rule);
        }
        catalog
    }

    /// 룰을 삽입합니다. 같은 이름의 기존 룰이 있으면 교체하고 반환합니다.
    pub fn insert(&mut self, rule: Rule) -> Option<Rule> {
        match self.index.get(&rule.event_name) {
            Some(&pos) => Some(std::mem::replace(&mut self.rules[pos], rule)),
            None => {
                self.index.insert(rule.event_name.clone(), self.rules.len());
                self.rules.push(rule);
                None
            }
        }
    }

    /// 이름으로 룰을 찾습니다.
    pub fn get(&self, event_name: &str) -> Option<&Rule> {
        self.index.get(event_name).map(|&pos| &self.rules[pos])
    }

    /// 이름이 있는지 확인합니다.
    pub fn contains(&self, event_name: &str) -> bool {
        self.index.contains_key(event_name)
    }

    /// 삽입 순서대로 순회합니다.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// 패턴이 있는(레코드와 매칭되는) 룰만 순회합니다.
    pub fn pattern_rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(|r| !r.is_system())
    }

    /// 룰 수
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// 비어있는지 확인
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
