//! 액티비티 파이프라인 설정
//!
//! [`ActivityConfig`]는 core의 [`MonitorConfig`](xlxmon_core::config::MonitorConfig)를
//! 기반으로 파이프라인 전용 설정을 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use xlxmon_core::config::XlxmonConfig;
//! use xlxmon_activity::config::ActivityConfig;
//!
//! let core_config = XlxmonConfig::default();
//! let config = ActivityConfig::from_core(&core_config.monitor);
//! ```

use std::path::PathBuf;

use crate::error::ActivityError;

/// 액티비티 파이프라인 설정
#[derive(Debug, Clone)]
pub struct ActivityConfig {
    /// 추적할 로그 파일 경로
    pub log_path: PathBuf,
    /// 시스템 식별자 (레코드에 기록됨)
    pub system: String,
    /// 로그 발생원 태그 (공백 분리 3번째 필드와 비교)
    pub source_tag: String,
    /// 파일 상태 체크 주기 (밀리초)
    pub poll_interval_ms: u64,
    /// 추적 시작 전 대기 시간 (초)
    pub startup_delay_secs: u64,
    /// 최대 라인 길이 (바이트, 초과분은 잘림)
    pub max_line_length: usize,
    /// 라인 채널 용량
    pub channel_capacity: usize,
    /// 시작 시 열린 세션을 저장소에서 복구할지 여부
    pub recover_open_sessions: bool,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from("/var/log/syslog"),
            system: "299".to_owned(),
            source_tag: "xlxd:".to_owned(),
            poll_interval_ms: 1000,
            startup_delay_secs: 5,
            max_line_length: 64 * 1024,
            channel_capacity: 1024,
            recover_open_sessions: false,
        }
    }
}

impl ActivityConfig {
    /// core의 `MonitorConfig`에서 파이프라인 설정을 생성합니다.
    pub fn from_core(core: &xlxmon_core::config::MonitorConfig) -> Self {
        Self {
            log_path: PathBuf::from(&core.log_path),
            system: core.system.clone(),
            source_tag: core.source_tag.clone(),
            poll_interval_ms: core.poll_interval_ms,
            startup_delay_secs: core.startup_delay_secs,
            max_line_length: core.max_line_length,
            channel_capacity: core.channel_capacity,
            recover_open_sessions: core.recover_open_sessions,
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), ActivityError> {
        const MAX_POLL_INTERVAL_MS: u64 = 60_000; // 1 minute

        if self.log_path.as_os_str().is_empty() {
            return Err(ActivityError::Config {
                field: "log_path".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.system.is_empty() {
            return Err(ActivityError::Config {
                field: "system".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.source_tag.is_empty() {
            return Err(ActivityError::Config {
                field: "source_tag".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.poll_interval_ms == 0 || self.poll_interval_ms > MAX_POLL_INTERVAL_MS {
            return Err(ActivityError::Config {
                field: "poll_interval_ms".to_owned(),
                reason: format!("must be 1-{}", MAX_POLL_INTERVAL_MS),
            });
        }

        if self.max_line_length == 0 {
            return Err(ActivityError::Config {
                field: "max_line_length".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.channel_capacity == 0 {
            return Err(ActivityError::Config {
                field: "channel_capacity".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        Ok(())
    }
}

/// 액티비티 설정 빌더
#[derive(Default)]
pub struct ActivityConfigBuilder {
    config: ActivityConfig,
}

impl ActivityConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 추적할 로그 파일 경로를 설정합니다.
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.log_path = path.into();
        self
    }

    /// 시스템 식별자를 설정합니다.
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.config.system = system.into();
        self
    }

    /// 로그 발생원 태그를 설정합니다.
    pub fn source_tag(mut self, tag: impl Into<String>) -> Self {
        self.config.source_tag = tag.into();
        self
    }

    /// 파일 상태 체크 주기(밀리초)를 설정합니다.
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// 추적 시작 전 대기 시간(초)을 설정합니다.
    pub fn startup_delay_secs(mut self, secs: u64) -> Self {
        self.config.startup_delay_secs = secs;
        self
    }

    /// 최대 라인 길이를 설정합니다.
    pub fn max_line_length(mut self, len: usize) -> Self {
        self.config.max_line_length = len;
        self
    }

    /// 라인 채널 용량을 설정합니다.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    /// 열린 세션 복구 여부를 설정합니다.
    pub fn recover_open_sessions(mut self, recover: bool) -> Self {
        self.config.recover_open_sessions = recover;
        self
    }

    /// 설정을 검증하고 `ActivityConfig`를 생성합니다.
    pub fn build(self) -> Result<ActivityConfig, ActivityError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ActivityConfig::default();
        config.validate().unwrap();
    }

    #[test]
    fn from_core_preserves_values() {
        let core = xlxmon_core::config::MonitorConfig {
            log_path: "/var/log/xlxd.log".to_owned(),
            system: "300".to_owned(),
            poll_interval_ms: 250,
            ..Default::default()
        };
        let config = ActivityConfig::from_core(&core);
        assert_eq!(config.log_path, PathBuf::from("/var/log/xlxd.log"));
        assert_eq!(config.system, "300");
        assert_eq!(config.poll_interval_ms, 250);
        // 나머지 필드는 core 기본값
        assert_eq!(config.source_tag, "xlxd:");
    }

    #[test]
    fn validate_rejects_zero_poll_interval() {
        let config = ActivityConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_source_tag() {
        let config = ActivityConfig {
            source_tag: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn builder_creates_valid_config() {
        let config = ActivityConfigBuilder::new()
            .log_path("/tmp/test.log")
            .system("300")
            .poll_interval_ms(50)
            .startup_delay_secs(0)
            .build()
            .unwrap();
        assert_eq!(config.system, "300");
        assert_eq!(config.poll_interval_ms, 50);
        assert_eq!(config.startup_delay_secs, 0);
    }

    #[test]
    fn builder_rejects_invalid_config() {
        let result = ActivityConfigBuilder::new().channel_capacity(0).build();
        assert!(result.is_err());
    }
}
