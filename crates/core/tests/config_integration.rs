//! xlxmon.toml 통합 설정 테스트
//!
//! - xlxmon.toml.example 파싱 테스트
//! - 부분 설정 (일부 섹션만) 로딩 테스트
//! - 환경변수 우선순위 테스트
//! - 빈 파일 / 잘못된 형식 에러 테스트

use serial_test::serial;

use xlxmon_core::config::XlxmonConfig;
use xlxmon_core::error::{ConfigError, XlxmonError};

// =============================================================================
// xlxmon.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_successfully() {
    let content = include_str!("../../../xlxmon.toml.example");
    let config = XlxmonConfig::parse(content).expect("example config should parse");

    // general 기본값 확인
    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, "json");
    assert_eq!(config.general.pid_file, "/var/run/xlxmon.pid");
}

#[test]
fn example_config_passes_validation() {
    let content = include_str!("../../../xlxmon.toml.example");
    let config = XlxmonConfig::parse(content).expect("should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

#[test]
fn example_config_has_correct_monitor_defaults() {
    let content = include_str!("../../../xlxmon.toml.example");
    let config = XlxmonConfig::parse(content).expect("should parse");

    assert!(config.monitor.enabled);
    assert_eq!(config.monitor.log_path, "/var/log/syslog");
    assert_eq!(config.monitor.system, "299");
    assert_eq!(config.monitor.source_tag, "xlxd:");
    assert_eq!(config.monitor.poll_interval_ms, 1000);
    assert_eq!(config.monitor.startup_delay_secs, 5);
    assert_eq!(config.monitor.max_line_length, 65536);
    assert_eq!(config.monitor.channel_capacity, 1024);
    assert!(!config.monitor.recover_open_sessions);
}

#[test]
fn example_config_has_correct_store_defaults() {
    let content = include_str!("../../../xlxmon.toml.example");
    let config = XlxmonConfig::parse(content).expect("should parse");

    assert_eq!(config.store.db_path, "/var/lib/xlxmon/activity.db");
}

#[test]
fn example_config_matches_builtin_defaults() {
    // 예시 파일의 값과 코드상 기본값이 어긋나지 않아야 함
    let content = include_str!("../../../xlxmon.toml.example");
    let from_example = XlxmonConfig::parse(content).expect("should parse");
    let builtin = XlxmonConfig::default();

    assert_eq!(from_example.monitor.system, builtin.monitor.system);
    assert_eq!(from_example.monitor.source_tag, builtin.monitor.source_tag);
    assert_eq!(
        from_example.monitor.poll_interval_ms,
        builtin.monitor.poll_interval_ms
    );
    assert_eq!(from_example.store.db_path, builtin.store.db_path);
}

// =============================================================================
// 부분 설정 테스트
// =============================================================================

#[test]
fn partial_config_only_general() {
    let config = XlxmonConfig::parse(
        r#"
[general]
log_level = "debug"
"#,
    )
    .expect("partial config should parse");

    assert_eq!(config.general.log_level, "debug");
    // 나머지 섹션은 기본값
    assert!(config.monitor.enabled);
    assert_eq!(config.monitor.system, "299");
    assert_eq!(config.store.db_path, "/var/lib/xlxmon/activity.db");
}

#[test]
fn partial_config_only_monitor() {
    let config = XlxmonConfig::parse(
        r#"
[monitor]
log_path = "/var/log/xlxd.log"
system = "950"
"#,
    )
    .expect("partial config should parse");

    assert_eq!(config.monitor.log_path, "/var/log/xlxd.log");
    assert_eq!(config.monitor.system, "950");
    assert_eq!(config.general.log_level, "info");
}

#[test]
fn empty_config_uses_all_defaults() {
    let config = XlxmonConfig::parse("").expect("empty config should parse");
    config.validate().expect("defaults should be valid");
}

// =============================================================================
// 환경변수 우선순위 테스트
// =============================================================================

#[test]
#[serial]
fn env_override_beats_file_value() {
    let mut config = XlxmonConfig::parse(
        r#"
[monitor]
poll_interval_ms = 1000
"#,
    )
    .expect("should parse");

    // SAFETY: serial 테스트이므로 환경변수 경쟁이 없음
    unsafe {
        std::env::set_var("XLXMON_MONITOR_POLL_INTERVAL_MS", "250");
    }
    config.apply_env_overrides();
    unsafe {
        std::env::remove_var("XLXMON_MONITOR_POLL_INTERVAL_MS");
    }

    assert_eq!(config.monitor.poll_interval_ms, 250);
}

#[test]
#[serial]
fn invalid_env_value_keeps_file_value() {
    let mut config = XlxmonConfig::parse(
        r#"
[monitor]
poll_interval_ms = 1000
"#,
    )
    .expect("should parse");

    // SAFETY: serial 테스트이므로 환경변수 경쟁이 없음
    unsafe {
        std::env::set_var("XLXMON_MONITOR_POLL_INTERVAL_MS", "not-a-number");
    }
    config.apply_env_overrides();
    unsafe {
        std::env::remove_var("XLXMON_MONITOR_POLL_INTERVAL_MS");
    }

    assert_eq!(config.monitor.poll_interval_ms, 1000);
}

// =============================================================================
// 에러 케이스 테스트
// =============================================================================

#[test]
fn malformed_toml_is_a_parse_error() {
    let result = XlxmonConfig::parse("[monitor\nlog_path = ");
    assert!(matches!(
        result,
        Err(XlxmonError::Config(ConfigError::ParseFailed { .. }))
    ));
}

#[test]
fn wrong_value_type_is_a_parse_error() {
    let result = XlxmonConfig::parse(
        r#"
[monitor]
poll_interval_ms = "fast"
"#,
    );
    assert!(matches!(
        result,
        Err(XlxmonError::Config(ConfigError::ParseFailed { .. }))
    ));
}

#[tokio::test]
async fn missing_file_is_file_not_found() {
    let result = XlxmonConfig::load("/nonexistent/path/xlxmon.toml").await;
    assert!(matches!(
        result,
        Err(XlxmonError::Config(ConfigError::FileNotFound { .. }))
    ));
}
