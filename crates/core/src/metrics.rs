//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()` 매크로를 호출합니다.
//! 익스포터는 설치하지 않으며, 임베딩하는 쪽이 레코더를 선택합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `bisq_watcher_`
//! - 접미어: `_total` (counter)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 워처 이름 레이블 키
pub const LABEL_WATCHER: &str = "watcher";

/// 싱크 종류 레이블 키 (console, file, telegram)
pub const LABEL_SINK: &str = "sink";

// ─── 테일러 메트릭 ─────────────────────────────────────────────────

/// 처리된 레코드 수 (counter)
pub const RECORDS_PROCESSED_TOTAL: &str = "bisq_watcher_records_processed_total";

/// 생성된 이벤트 수 (counter)
pub const EVENTS_EMITTED_TOTAL: &str = "bisq_watcher_events_emitted_total";

/// 감지된 로그 파일 로테이션 수 (counter)
pub const ROTATIONS_TOTAL: &str = "bisq_watcher_rotations_total";

/// 파일 읽기 실패 수 (counter)
pub const READ_ERRORS_TOTAL: &str = "bisq_watcher_read_errors_total";

// ─── 디스패처 메트릭 ───────────────────────────────────────────────

/// 싱크로 전달된 메시지 수 (counter, label: sink)
pub const EVENTS_DELIVERED_TOTAL: &str = "bisq_watcher_events_delivered_total";

/// 싱크 전달 실패 수 (counter, label: sink)
pub const DELIVERY_FAILURES_TOTAL: &str = "bisq_watcher_delivery_failures_total";

/// 모든 메트릭의 설명을 등록합니다.
///
/// 레코더 설치 직후 한 번 호출합니다.
pub fn describe_all() {
    use metrics::describe_counter;

    describe_counter!(
        RECORDS_PROCESSED_TOTAL,
        "Total number of log records processed by tailers"
    );
    describe_counter!(
        EVENTS_EMITTED_TOTAL,
        "Total number of events emitted by tailers"
    );
    describe_counter!(ROTATIONS_TOTAL, "Total number of detected logfile rotations");
    describe_counter!(READ_ERRORS_TOTAL, "Total number of logfile read failures");
    describe_counter!(
        EVENTS_DELIVERED_TOTAL,
        "Rendered messages delivered per sink"
    );
    describe_counter!(DELIVERY_FAILURES_TOTAL, "Failed deliveries per sink");
}
