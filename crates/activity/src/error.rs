//! 액티비티 파이프라인 에러 타입
//!
//! [`ActivityError`]는 파이프라인 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<ActivityError> for XlxmonError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.
//!
//! 저장소 에러([`StoreError`])는 치명적이며 변환 시에도 그대로 보존됩니다.
//! 데몬은 이를 보고 0이 아닌 코드로 종료합니다.

use xlxmon_core::error::{MonitorError, StoreError, XlxmonError};

/// 액티비티 파이프라인 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum ActivityError {
    /// 타임스탬프 파싱 실패 (비치명적 — 호출측에서 현재 시각으로 대체)
    #[error("timestamp parse error: '{input}': {reason}")]
    Timestamp {
        /// 파싱에 실패한 입력
        input: String,
        /// 실패 사유
        reason: String,
    },

    /// 로그 추적기 에러 (파일 열기 실패 등)
    #[error("tailer error: {path}: {reason}")]
    Tailer {
        /// 추적 대상 파일 경로
        path: String,
        /// 에러 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 채널 통신 에러
    #[error("channel error: {0}")]
    Channel(String),

    /// 레코드 저장소 에러 (치명적)
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 정규식 컴파일 에러
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl From<ActivityError> for XlxmonError {
    fn from(err: ActivityError) -> Self {
        match err {
            // 저장소 에러는 치명성 판별을 위해 그대로 보존
            ActivityError::Store(e) => XlxmonError::Store(e),
            ActivityError::Io(e) => XlxmonError::Io(e),
            ActivityError::Channel(msg) => XlxmonError::Monitor(MonitorError::ChannelSend(msg)),
            other => XlxmonError::Monitor(MonitorError::InitFailed(other.to_string())),
        }
    }
}
