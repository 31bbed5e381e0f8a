//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 이벤트 소스 구현체는 이 상수로 `metrics::counter!()`를 호출합니다.
//! 익스포터 설치는 호스트 프로그램의 몫이며, 설치되지 않으면 기록은 무시됩니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `sockwatch_`
//! - 접미어: `_total` (counter)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(sockwatch_core::metrics::EVENTS_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 파싱 실패 필드 레이블 키 (sport, saddr, oldstate, ...)
pub const LABEL_FIELD: &str = "field";

// ─── 이벤트 메트릭 ─────────────────────────────────────────────────

/// 반환된 이벤트 수 (counter)
pub const EVENTS_TOTAL: &str = "sockwatch_events_total";

/// 관련 없어서 건너뛴 이벤트 수 (counter)
pub const EVENTS_IRRELEVANT_TOTAL: &str = "sockwatch_events_irrelevant_total";

/// 파싱 에러 수 (counter, label: field)
pub const PARSE_ERRORS_TOTAL: &str = "sockwatch_parse_errors_total";

/// 모든 메트릭의 설명을 등록합니다.
///
/// 첫 이벤트를 기록하기 전에 한 번 호출합니다.
/// 레코더가 없어도 패닉하지 않습니다.
pub fn describe_all() {
    use metrics::describe_counter;

    describe_counter!(
        EVENTS_TOTAL,
        "Total number of TCP state change events returned to the consumer"
    );
    describe_counter!(
        EVENTS_IRRELEVANT_TOTAL,
        "Trace lines skipped because they are not AF_INET/IPPROTO_TCP"
    );
    describe_counter!(
        PARSE_ERRORS_TOTAL,
        "Trace lines that failed to parse into an event"
    );
}
