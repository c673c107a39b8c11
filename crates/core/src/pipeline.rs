//! 파이프라인 trait — 모듈 생명주기 확장 포인트 정의

use crate::error::XlxmonError;

/// 파이프라인 건강 상태
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// 정상 동작 중
    Healthy,
    /// 동작 중이지만 주의 필요
    Degraded(String),
    /// 동작 불가
    Unhealthy(String),
}

impl HealthStatus {
    /// 동작 불가 상태인지 확인합니다.
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, Self::Unhealthy(_))
    }
}

/// 파이프라인 생명주기 trait
///
/// `xlxmon-daemon`은 이 trait을 통해 파이프라인을
/// 시작/정지하고 상태를 점검합니다.
pub trait Pipeline {
    /// 파이프라인을 시작합니다.
    ///
    /// 이미 실행 중이면 [`MonitorError::AlreadyRunning`](crate::error::MonitorError::AlreadyRunning)을
    /// 반환합니다.
    fn start(&mut self) -> impl Future<Output = Result<(), XlxmonError>> + Send;

    /// 파이프라인을 우아하게 정지합니다.
    ///
    /// 실행 중이 아니면 [`MonitorError::NotRunning`](crate::error::MonitorError::NotRunning)을
    /// 반환합니다.
    fn stop(&mut self) -> impl Future<Output = Result<(), XlxmonError>> + Send;

    /// 현재 건강 상태를 반환합니다.
    fn health_check(&self) -> impl Future<Output = HealthStatus> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unhealthy_detection() {
        assert!(HealthStatus::Unhealthy("stopped".to_owned()).is_unhealthy());
        assert!(!HealthStatus::Healthy.is_unhealthy());
        assert!(!HealthStatus::Degraded("slow".to_owned()).is_unhealthy());
    }
}
