//! 설정 관리 — xlxmon.toml 파싱 및 런타임 설정
//!
//! [`XlxmonConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`XLXMON_MONITOR_LOG_PATH=/var/log/syslog` 형식)
//! 3. 설정 파일 (`xlxmon.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), xlxmon_core::error::XlxmonError> {
//! use xlxmon_core::config::XlxmonConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = XlxmonConfig::load("xlxmon.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = XlxmonConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, XlxmonError};

/// xlxmon 통합 설정
///
/// `xlxmon.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 모듈은 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct XlxmonConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 액티비티 모니터 설정
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// 레코드 저장소 설정
    #[serde(default)]
    pub store: StoreConfig,
}

impl XlxmonConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, XlxmonError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, XlxmonError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                XlxmonError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                XlxmonError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, XlxmonError> {
        toml::from_str(toml_str).map_err(|e| {
            XlxmonError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `XLXMON_{SECTION}_{FIELD}`
    /// 예: `XLXMON_MONITOR_LOG_PATH=/var/log/xlxd.log`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "XLXMON_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "XLXMON_GENERAL_LOG_FORMAT");
        override_string(&mut self.general.pid_file, "XLXMON_GENERAL_PID_FILE");

        // Monitor
        override_bool(&mut self.monitor.enabled, "XLXMON_MONITOR_ENABLED");
        override_string(&mut self.monitor.log_path, "XLXMON_MONITOR_LOG_PATH");
        override_string(&mut self.monitor.system, "XLXMON_MONITOR_SYSTEM");
        override_string(&mut self.monitor.source_tag, "XLXMON_MONITOR_SOURCE_TAG");
        override_u64(
            &mut self.monitor.poll_interval_ms,
            "XLXMON_MONITOR_POLL_INTERVAL_MS",
        );
        override_u64(
            &mut self.monitor.startup_delay_secs,
            "XLXMON_MONITOR_STARTUP_DELAY_SECS",
        );
        override_usize(
            &mut self.monitor.max_line_length,
            "XLXMON_MONITOR_MAX_LINE_LENGTH",
        );
        override_usize(
            &mut self.monitor.channel_capacity,
            "XLXMON_MONITOR_CHANNEL_CAPACITY",
        );
        override_bool(
            &mut self.monitor.recover_open_sessions,
            "XLXMON_MONITOR_RECOVER_OPEN_SESSIONS",
        );

        // Store
        override_string(&mut self.store.db_path, "XLXMON_STORE_DB_PATH");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), XlxmonError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        // monitor 검증 (활성화 시에만)
        if self.monitor.enabled {
            if self.monitor.log_path.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "monitor.log_path".to_owned(),
                    reason: "log path must not be empty when monitor is enabled".to_owned(),
                }
                .into());
            }
            if !Path::new(&self.monitor.log_path).is_absolute() {
                return Err(ConfigError::InvalidValue {
                    field: "monitor.log_path".to_owned(),
                    reason: format!("'{}' must be an absolute path", self.monitor.log_path),
                }
                .into());
            }
            if self.monitor.system.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "monitor.system".to_owned(),
                    reason: "system identifier must not be empty".to_owned(),
                }
                .into());
            }
            if self.monitor.source_tag.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "monitor.source_tag".to_owned(),
                    reason: "source tag must not be empty".to_owned(),
                }
                .into());
            }
            if self.monitor.poll_interval_ms == 0 || self.monitor.poll_interval_ms > 60_000 {
                return Err(ConfigError::InvalidValue {
                    field: "monitor.poll_interval_ms".to_owned(),
                    reason: "must be 1-60000".to_owned(),
                }
                .into());
            }
            if self.monitor.max_line_length == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "monitor.max_line_length".to_owned(),
                    reason: "must be greater than 0".to_owned(),
                }
                .into());
            }
            if self.monitor.channel_capacity == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "monitor.channel_capacity".to_owned(),
                    reason: "must be greater than 0".to_owned(),
                }
                .into());
            }
        }

        // store 검증
        if self.store.db_path.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "store.db_path".to_owned(),
                reason: "database path must not be empty".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

// Default는 derive 매크로로 자동 생성 (각 필드가 Default를 구현하므로)

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// PID 파일 경로 (빈 문자열이면 미사용)
    pub pid_file: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            pid_file: "/var/run/xlxmon.pid".to_owned(),
        }
    }
}

/// 액티비티 모니터 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 추적할 로그 파일 경로
    pub log_path: String,
    /// 시스템 식별자 (레코드에 기록됨)
    pub system: String,
    /// 로그 발생원 태그 (syslog 3번째 필드와 비교)
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

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_path: "/var/log/syslog".to_owned(),
            system: "299".to_owned(),
            source_tag: "xlxd:".to_owned(),
            poll_interval_ms: 1000,
            startup_delay_secs: 5,
            max_line_length: 64 * 1024, // 64KB
            channel_capacity: 1024,
            recover_open_sessions: false,
        }
    }
}

/// 레코드 저장소 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite 데이터베이스 파일 경로
    pub db_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: "/var/lib/xlxmon/activity.db".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn default_config_has_sane_values() {
        let config = XlxmonConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "json");
        assert!(config.monitor.enabled);
        assert_eq!(config.monitor.log_path, "/var/log/syslog");
        assert_eq!(config.monitor.system, "299");
        assert_eq!(config.monitor.source_tag, "xlxd:");
        assert!(!config.monitor.recover_open_sessions);
    }

    #[test]
    fn default_config_passes_validation() {
        let config = XlxmonConfig::default();
        config.validate().unwrap();
    }

    #[test]
    fn from_str_empty_toml_uses_defaults() {
        let config = XlxmonConfig::parse("").unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.monitor.system, "299");
    }

    #[test]
    fn from_str_partial_toml_merges_with_defaults() {
        let toml = r#"
[general]
log_level = "debug"

[monitor]
log_path = "/var/log/xlxd.log"
"#;
        let config = XlxmonConfig::parse(toml).unwrap();
        assert_eq!(config.general.log_level, "debug");
        // log_format은 기본값 유지
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.monitor.log_path, "/var/log/xlxd.log");
        assert_eq!(config.monitor.system, "299");
    }

    #[test]
    fn from_str_full_toml() {
        let toml = r#"
[general]
log_level = "warn"
log_format = "pretty"
pid_file = "/opt/xlxmon/xlxmon.pid"

[monitor]
enabled = true
log_path = "/var/log/messages"
system = "300"
source_tag = "xlxd:"
poll_interval_ms = 500
startup_delay_secs = 2
max_line_length = 32768
channel_capacity = 256
recover_open_sessions = true

[store]
db_path = "/opt/xlxmon/activity.db"
"#;
        let config = XlxmonConfig::parse(toml).unwrap();
        assert_eq!(config.general.log_level, "warn");
        assert_eq!(config.monitor.system, "300");
        assert_eq!(config.monitor.poll_interval_ms, 500);
        assert!(config.monitor.recover_open_sessions);
        assert_eq!(config.store.db_path, "/opt/xlxmon/activity.db");
    }

    #[test]
    fn from_str_invalid_toml_returns_error() {
        let result = XlxmonConfig::parse("invalid = [[[toml");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(
            err,
            XlxmonError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = XlxmonConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_invalid_log_format() {
        let mut config = XlxmonConfig::default();
        config.general.log_format = "xml".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_format"));
    }

    #[test]
    fn validate_rejects_relative_log_path_when_enabled() {
        let mut config = XlxmonConfig::default();
        config.monitor.log_path = "logs/syslog".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_path"));
    }

    #[test]
    fn validate_accepts_relative_log_path_when_disabled() {
        let mut config = XlxmonConfig::default();
        config.monitor.enabled = false;
        config.monitor.log_path = "logs/syslog".to_owned();
        // monitor가 비활성화 상태면 경로 검증을 건너뜀
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_zero_poll_interval() {
        let mut config = XlxmonConfig::default();
        config.monitor.poll_interval_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("poll_interval_ms"));
    }

    #[test]
    fn validate_rejects_empty_system() {
        let mut config = XlxmonConfig::default();
        config.monitor.system = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("system"));
    }

    #[test]
    fn validate_rejects_empty_db_path() {
        let mut config = XlxmonConfig::default();
        config.store.db_path = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("db_path"));
    }

    #[test]
    #[serial]
    fn env_override_string() {
        let mut val = "original".to_owned();
        // SAFETY: 테스트는 단일 스레드에서 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_XLXMON_STR", "overridden") };
        override_string(&mut val, "TEST_XLXMON_STR");
        assert_eq!(val, "overridden");
        unsafe { std::env::remove_var("TEST_XLXMON_STR") };
    }

    #[test]
    #[serial]
    fn env_override_bool_invalid_keeps_original() {
        let mut val = false;
        // SAFETY: 테스트는 단일 스레드에서 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_XLXMON_BOOL_BAD", "not-a-bool") };
        override_bool(&mut val, "TEST_XLXMON_BOOL_BAD");
        assert!(!val); // 원래 값 유지
        unsafe { std::env::remove_var("TEST_XLXMON_BOOL_BAD") };
    }

    #[test]
    #[serial]
    fn env_override_applies_to_monitor_section() {
        let mut config = XlxmonConfig::default();
        // SAFETY: 테스트는 단일 스레드에서 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("XLXMON_MONITOR_SYSTEM", "301") };
        unsafe { std::env::set_var("XLXMON_MONITOR_POLL_INTERVAL_MS", "250") };
        config.apply_env_overrides();
        assert_eq!(config.monitor.system, "301");
        assert_eq!(config.monitor.poll_interval_ms, 250);
        unsafe { std::env::remove_var("XLXMON_MONITOR_SYSTEM") };
        unsafe { std::env::remove_var("XLXMON_MONITOR_POLL_INTERVAL_MS") };
    }

    #[test]
    fn env_override_missing_var_keeps_original() {
        let mut val = "original".to_owned();
        override_string(&mut val, "TEST_XLXMON_NONEXISTENT_12345");
        assert_eq!(val, "original");
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = XlxmonConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = XlxmonConfig::parse(&toml_str).unwrap();
        assert_eq!(config.general.log_level, parsed.general.log_level);
        assert_eq!(config.monitor.log_path, parsed.monitor.log_path);
        assert_eq!(config.store.db_path, parsed.store.db_path);
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let result = XlxmonConfig::from_file("/nonexistent/path/xlxmon.toml").await;
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(
            err,
            XlxmonError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
