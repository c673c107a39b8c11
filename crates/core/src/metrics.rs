//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`
//! 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `xlxmon_`
//! - 모듈명: `monitor_`, `store_`
//! - 접미어: `_total` (counter), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(xlxmon_core::metrics::MONITOR_SESSIONS_OPENED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 모듈 레이블 키 (A-Z)
pub const LABEL_MODULE: &str = "module";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

// ─── Monitor 메트릭 ────────────────────────────────────────────────

/// Monitor: 수집된 전체 로그 라인 수 (counter)
pub const MONITOR_LINES_COLLECTED_TOTAL: &str = "xlxmon_monitor_lines_collected_total";

/// Monitor: 분류된 이벤트 수 (counter)
pub const MONITOR_EVENTS_CLASSIFIED_TOTAL: &str = "xlxmon_monitor_events_classified_total";

/// Monitor: 타임스탬프 파싱 실패로 현재 시각을 대입한 횟수 (counter)
pub const MONITOR_TIMESTAMP_FALLBACKS_TOTAL: &str = "xlxmon_monitor_timestamp_fallbacks_total";

/// Monitor: 재개 커서에 의해 건너뛴 이벤트 수 (counter)
pub const MONITOR_EVENTS_SKIPPED_TOTAL: &str = "xlxmon_monitor_events_skipped_total";

/// Monitor: 열린 세션 수 (counter)
pub const MONITOR_SESSIONS_OPENED_TOTAL: &str = "xlxmon_monitor_sessions_opened_total";

/// Monitor: 닫힌 세션 수 (counter)
pub const MONITOR_SESSIONS_CLOSED_TOTAL: &str = "xlxmon_monitor_sessions_closed_total";

/// Monitor: 매칭되는 열림이 없어 드롭된 닫힘 이벤트 수 (counter)
pub const MONITOR_UNMATCHED_CLOSES_TOTAL: &str = "xlxmon_monitor_unmatched_closes_total";

/// Monitor: 현재 열린 세션 수 (gauge)
pub const MONITOR_OPEN_SESSIONS: &str = "xlxmon_monitor_open_sessions";

/// Monitor: 감지된 로그 로테이션 수 (counter)
pub const MONITOR_ROTATIONS_TOTAL: &str = "xlxmon_monitor_rotations_total";

// ─── Store 메트릭 ──────────────────────────────────────────────────

/// Store: 레코드 쓰기 수 (counter, label: result)
pub const STORE_WRITES_TOTAL: &str = "xlxmon_store_writes_total";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 이 함수는 전역 레코더 설치 후 한 번만 호출해야 합니다.
/// 일반적으로 `xlxmon-daemon`의 시작 시점에서 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge};

    describe_counter!(
        MONITOR_LINES_COLLECTED_TOTAL,
        "Total number of raw log lines collected from the tailed file"
    );
    describe_counter!(
        MONITOR_EVENTS_CLASSIFIED_TOTAL,
        "Total number of open/close events classified from log lines"
    );
    describe_counter!(
        MONITOR_TIMESTAMP_FALLBACKS_TOTAL,
        "Total number of lines whose timestamp failed to parse and was replaced with the current time"
    );
    describe_counter!(
        MONITOR_EVENTS_SKIPPED_TOTAL,
        "Total number of events skipped by the resume cursor"
    );
    describe_counter!(
        MONITOR_SESSIONS_OPENED_TOTAL,
        "Total number of session records created"
    );
    describe_counter!(
        MONITOR_SESSIONS_CLOSED_TOTAL,
        "Total number of session records closed"
    );
    describe_counter!(
        MONITOR_UNMATCHED_CLOSES_TOTAL,
        "Total number of close events dropped because no open session matched"
    );
    describe_gauge!(
        MONITOR_OPEN_SESSIONS,
        "Number of sessions currently tracked as open"
    );
    describe_counter!(
        MONITOR_ROTATIONS_TOTAL,
        "Total number of log rotations or truncations detected"
    );
    describe_counter!(
        STORE_WRITES_TOTAL,
        "Total number of record store write operations"
    );
}
