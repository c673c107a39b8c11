//! 재개 필터
//!
//! 재시작 후 과거 이벤트의 중복 기록을 방지합니다.
//! 파이프라인 시작 시 저장소에서 마지막 세션 시작 타임스탬프를 한 번
//! 조회하여 커서로 삼고, 커서 이하의 이벤트를 모두 건너뜁니다.
//!
//! 밀리초 단위 비교이므로 커서와 정확히 같은 밀리초의 서로 다른
//! 이벤트는 재시작 후 함께 건너뛰어집니다. 알려진 정밀도 한계입니다.

/// 타임스탬프 기반 재개 필터
#[derive(Debug, Clone, Copy)]
pub struct ResumeFilter {
    /// 재개 커서 (epoch 밀리초). 저장소가 비어 있으면 0.
    cursor_ms: i64,
}

impl ResumeFilter {
    /// 주어진 커서로 필터를 생성합니다.
    pub fn new(cursor_ms: i64) -> Self {
        Self { cursor_ms }
    }

    /// 이벤트를 건너뛰어야 하는지 판별합니다.
    ///
    /// 커서 이하(`ts_ms <= cursor`)의 이벤트는 이미 처리된 것으로
    /// 간주합니다.
    pub fn should_skip(&self, ts_ms: i64) -> bool {
        ts_ms <= self.cursor_ms
    }

    /// 현재 커서 값을 반환합니다.
    pub fn cursor_ms(&self) -> i64 {
        self.cursor_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_events_at_or_before_cursor() {
        let filter = ResumeFilter::new(1_000);
        assert!(filter.should_skip(999));
        assert!(filter.should_skip(1_000));
        assert!(!filter.should_skip(1_001));
    }

    #[test]
    fn zero_cursor_passes_everything_after_epoch() {
        let filter = ResumeFilter::new(0);
        assert!(!filter.should_skip(1));
        assert!(filter.should_skip(0));
    }
}
