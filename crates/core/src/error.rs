//! 에러 타입 — 도메인별 에러 정의

/// xlxmon 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum XlxmonError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 모니터 파이프라인 에러
    #[error("monitor error: {0}")]
    Monitor(#[from] MonitorError),

    /// 레코드 저장소 에러
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 모니터 파이프라인 에러
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// 이미 실행 중인 파이프라인을 다시 시작함
    #[error("pipeline already running")]
    AlreadyRunning,

    /// 실행 중이 아닌 파이프라인을 정지함
    #[error("pipeline not running")]
    NotRunning,

    /// 파이프라인 초기화 실패
    #[error("pipeline init failed: {0}")]
    InitFailed(String),

    /// 채널 전송 실패
    #[error("channel send failed: {0}")]
    ChannelSend(String),
}

/// 레코드 저장소 에러
///
/// 저장소 에러는 모두 치명적입니다. 워커는 에러를 상위로 반환하고
/// 데몬은 0이 아닌 종료 코드로 종료합니다 (supervisor가 재시작).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// 저장소에 접근할 수 없음 (파일 열기 실패, 연결 끊김 등)
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// 레코드 쓰기 실패
    #[error("write failed: {0}")]
    Write(String),

    /// 레코드를 찾을 수 없음
    #[error("record not found: {id}")]
    NotFound { id: String },

    /// 쿼리 실패
    #[error("query failed: {0}")]
    Query(String),
}
