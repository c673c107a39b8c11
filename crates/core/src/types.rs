//! 도메인 타입 — 시스템 전역에서 사용되는 공통 타입
//!
//! 세션 레코드와 생성 페이로드를 정의합니다.
//! 타임스탬프는 모두 epoch 기준 밀리초(UTC 정규화)입니다.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 아직 닫히지 않은 세션의 `end_ts` 센티널 값
///
/// 레코드 생성 시 `end_ts`는 항상 이 값으로 시작하며,
/// 닫힘 이벤트가 도착하면 실제 타임스탬프로 정확히 한 번 전이합니다.
pub const OPEN_SENTINEL: i64 = 0;

/// 세션 레코드
///
/// 한 명의 호출자가 하나의 모듈을 점유한 기간을 나타냅니다.
/// `start_ts`는 생성 이후 불변이며, `end_ts`는
/// [`OPEN_SENTINEL`] -> 실제 값으로 한 번만 전이합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// 저장소가 부여한 레코드 식별자
    pub id: String,
    /// 시스템 식별자 (예: "299")
    pub system: String,
    /// 모듈 문자 (A-Z)
    pub module: char,
    /// 세션 시작 시각 (epoch 밀리초)
    pub start_ts: i64,
    /// 세션 종료 시각 (epoch 밀리초, 열려 있으면 [`OPEN_SENTINEL`])
    pub end_ts: i64,
    /// 호출자 콜사인
    pub caller: String,
    /// 경유 스테이션 (서브모듈이 있으면 "CLIENT-X" 형식)
    pub via: String,
}

impl SessionRecord {
    /// 세션이 아직 열려 있는지 확인합니다.
    pub fn is_open(&self) -> bool {
        self.end_ts == OPEN_SENTINEL
    }
}

impl fmt::Display for SessionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}/{}] {} via {} start={} end={}",
            self.system, self.module, self.caller, self.via, self.start_ts, self.end_ts,
        )
    }
}

/// 세션 생성 페이로드
///
/// 저장소가 `id`를 부여하고 `end_ts`를 [`OPEN_SENTINEL`]로 초기화하므로
/// 두 필드는 포함하지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSession {
    /// 시스템 식별자
    pub system: String,
    /// 모듈 문자
    pub module: char,
    /// 세션 시작 시각 (epoch 밀리초)
    pub start_ts: i64,
    /// 호출자 콜사인
    pub caller: String,
    /// 경유 스테이션
    pub via: String,
}

impl fmt::Display for NewSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}/{}] {} via {} start={}",
            self.system, self.module, self.caller, self.via, self.start_ts,
        )
    }
}
