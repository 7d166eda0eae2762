//! 핑거프린트 캐시 -- 이미 처리한 레코드를 기억합니다.
//!
//! 테일러는 매 읽기 사이클마다 이전 오프셋보다 조금 앞에서 읽기 시작하므로
//! 같은 레코드를 여러 번 보게 됩니다. [`FingerprintCache`]는 처리한 레코드의
//! 식별자(원문 또는 SHA-256 다이제스트)를 삽입 순서대로 보관하여
//! 중복 처리를 막고, 오버랩 경계가 맞는지 확인하는 데 쓰입니다.
//!
//! 용량(`max_events`)을 넘으면 가장 먼저 들어온 항목부터 제거합니다.
//! 조회는 순서를 바꾸지 않습니다.

use std::collections::{HashSet, VecDeque};

use sha2::{Digest, Sha256};

/// 처리된 레코드의 핑거프린트 집합
#[derive(Debug, Default)]
pub struct FingerprintCache {
    /// 존재 확인용 집합
    entries: HashSet<String>,
    /// 삽입 순서 (가장 오래된 항목이 앞)
    order: VecDeque<String>,
    /// 최대 항목 수 (`None`이면 무제한)
    max_events: Option<usize>,
    /// 원문 대신 다이제스트 저장 여부
    use_hash: bool,
}

impl FingerprintCache {
    /// 새 캐시를 생성합니다.
    pub fn new(max_events: Option<usize>, use_hash: bool) -> Self {
        Self {
            entries: HashSet::new(),
            order: VecDeque::new(),
            max_events,
            use_hash,
        }
    }

    /// 레코드를 추가합니다.
    ///
    /// 새로 추가되었으면 `true`, 이미 있었으면 `false`를 반환합니다.
    /// 이미 있는 항목은 순서가 바뀌지 않습니다.
    pub fn add(&mut self, record: &str) -> bool {
        let key = self.key(record);
        if self.entries.contains(&key) {
            return false;
        }

        if let Some(max) = self.max_events {
            while self.order.len() >= max {
                match self.order.pop_front() {
                    Some(oldest) => {
                        self.entries.remove(&oldest);
                    }
                    None => break,
                }
            }
        }

        self.entries.insert(key.clone());
        self.order.push_back(key);
        true
    }

    /// 레코드가 캐시에 있는지 확인합니다.
    pub fn has(&self, record: &str) -> bool {
        self.entries.contains(&self.key(record))
    }

    /// 레코드를 제거합니다. 제거되었으면 `true`를 반환합니다.
    pub fn delete(&mut self, record: &str) -> bool {
        let key = self.key(record);
        if !self.entries.remove(&key) {
            return false;
        }
        if let Some(pos) = self.order.iter().position(|k| *k == key) {
            self.order.remove(pos);
        }
        true
    }

    /// 모든 항목을 제거합니다.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// 항목 수
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// 비어있는지 확인
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn key(&self, record: &str) -> String {
        if self.use_hash {
            fingerprint(record)
        } else {
            record.to_owned()
        }
    }
}

/// 레코드 원문의 SHA-256 다이제스트 (소문자 hex)
pub fn fingerprint(record: &str) -> String {
    format!("{:x}", Sha256::digest(record.as_bytes()))
}
