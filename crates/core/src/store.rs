//! 레코드 저장소 trait — Record Sink 확장 포인트 정의
//!
//! 모니터 파이프라인은 이 trait을 통해서만 저장소에 접근합니다.
//! 스키마와 쿼리 최적화는 구현체(`xlxmon-store`)의 책임입니다.

use crate::error::StoreError;
use crate::types::{NewSession, SessionRecord};

/// 세션 레코드 저장소 trait
///
/// 새로운 저장 백엔드를 추가하려면 이 trait을 구현합니다.
/// 모든 메서드의 에러는 치명적으로 취급됩니다 ([`StoreError`] 참조).
pub trait RecordStore: Send + Sync {
    /// 지정한 시스템의 가장 최근 세션 시작 타임스탬프를 조회합니다.
    ///
    /// 재시작 시 재개 커서(resume cursor)로 사용됩니다.
    /// 레코드가 하나도 없으면 `None`을 반환합니다.
    fn find_last_start_ts(
        &self,
        system: &str,
    ) -> impl Future<Output = Result<Option<i64>, StoreError>> + Send;

    /// 새 세션 레코드를 생성하고 부여된 id를 반환합니다.
    ///
    /// `end_ts`는 [`OPEN_SENTINEL`](crate::types::OPEN_SENTINEL)로 초기화됩니다.
    fn create(
        &self,
        session: NewSession,
    ) -> impl Future<Output = Result<String, StoreError>> + Send;

    /// 세션 레코드의 `end_ts`를 설정합니다.
    ///
    /// 해당 id의 레코드가 없으면 [`StoreError::NotFound`]를 반환합니다.
    fn close(
        &self,
        id: &str,
        end_ts: i64,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// 지정한 시스템의 열린 세션(`end_ts == OPEN_SENTINEL`)을 모두 조회합니다.
    ///
    /// 시작 시 선택적 인덱스 복구에 사용됩니다.
    fn find_open_sessions(
        &self,
        system: &str,
    ) -> impl Future<Output = Result<Vec<SessionRecord>, StoreError>> + Send;
}
