//! 이벤트 분류기
//!
//! syslog 라인 하나를 받아 스트림 열림/닫힘 이벤트로 분류합니다.
//!
//! # 분류 절차
//! 1. 공백 분리 3번째 필드가 설정된 발생원 태그(`xlxd:`)가 아니면 무시
//! 2. 피어 keepalive 잡음 라인 무시
//! 3. 첫 필드를 RFC 3339 타임스탬프로 파싱 (나노초 정밀도 허용).
//!    실패 시 현재 시각으로 대체하고 경고만 남김 (비치명적)
//! 4. 열림/닫힘 패턴 매칭 — 둘 다 아니면 무시
//!
//! 열림 라인의 `via`는 클라이언트 콜사인이며, 서브모듈 문자가 공백이
//! 아니면 `CLIENT-X` 형식으로 붙습니다. `caller`는 user 필드의 첫
//! 공백 구분 토큰입니다.

use chrono::{DateTime, Utc};
use metrics::counter;
use regex::Regex;
use tracing::warn;

use xlxmon_core::metrics as m;

use crate::error::ActivityError;

/// 스트림 열림 라인 패턴
///
/// 서브모듈 캡처가 `.`인 것은 의도된 것입니다. 서브모듈이 없는
/// 클라이언트는 이 위치에 공백 문자가 오며, 그것도 유효한 매칭입니다.
const OPEN_PATTERN: &str = r"Opening stream on module (?P<module>[A-Z]) for client (?P<client>[^\s]+)\s+(?P<clientmod>.) with sid \d+ by user (?P<user>.*)";

/// 스트림 닫힘 라인 패턴
const CLOSE_PATTERN: &str = r"Closing stream of module (?P<module>[A-Z])";

/// 피어 연결 keepalive 잡음 (발생원 태그는 같지만 액티비티가 아님)
const PEER_KEEPALIVE: &str = "Sending connect packet to XLX peer";

/// 분류 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// 액티비티와 무관한 라인
    Ignore,
    /// 열림 또는 닫힘 이벤트
    Event(ActivityEvent),
}

/// 분류된 액티비티 이벤트
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEvent {
    /// 이벤트 시각 (epoch 밀리초, UTC 정규화)
    pub ts_ms: i64,
    /// 이벤트 종류
    pub kind: EventKind,
}

/// 이벤트 종류
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// 모듈에 스트림이 열림
    Open {
        /// 모듈 문자 (A-Z)
        module: char,
        /// 호출자 콜사인
        caller: String,
        /// 경유 스테이션
        via: String,
    },
    /// 모듈의 스트림이 닫힘
    Close {
        /// 모듈 문자 (A-Z)
        module: char,
    },
}

/// 이벤트 분류기
pub struct Classifier {
    /// 로그 발생원 태그 (공백 분리 3번째 필드와 비교)
    source_tag: String,
    re_open: Regex,
    re_close: Regex,
}

impl Classifier {
    /// 새 분류기를 생성합니다.
    pub fn new(source_tag: impl Into<String>) -> Result<Self, ActivityError> {
        Ok(Self {
            source_tag: source_tag.into(),
            re_open: Regex::new(OPEN_PATTERN)?,
            re_close: Regex::new(CLOSE_PATTERN)?,
        })
    }

    /// 라인 하나를 분류합니다.
    ///
    /// 타임스탬프 파싱 실패는 비치명적입니다. 현재 시각으로 대체하고
    /// 경고를 남긴 뒤 분류를 계속합니다.
    pub fn classify(&self, line: &str) -> Classification {
        let parts: Vec<&str> = line.split(' ').collect();
        if parts.len() < 3 || parts[2] != self.source_tag {
            return Classification::Ignore;
        }
        if line.contains(PEER_KEEPALIVE) {
            return Classification::Ignore;
        }

        let ts_ms = match parse_timestamp(parts[0]) {
            Ok(ts) => ts,
            Err(e) => {
                // tail 도중 잘린 날짜가 남는 경우가 있음
                warn!(error = %e, "unable to parse line timestamp, substituting current time");
                counter!(m::MONITOR_TIMESTAMP_FALLBACKS_TOTAL).increment(1);
                Utc::now().timestamp_millis()
            }
        };

        if let Some(caps) = self.re_open.captures(line) {
            let module = match caps.name("module").and_then(|c| c.as_str().chars().next()) {
                Some(c) => c,
                None => return Classification::Ignore,
            };
            let client = caps.name("client").map_or("", |c| c.as_str());
            let clientmod = caps.name("clientmod").map_or(" ", |c| c.as_str());
            let user = caps.name("user").map_or("", |c| c.as_str());

            let via = if clientmod != " " {
                format!("{client}-{clientmod}")
            } else {
                client.to_owned()
            };
            let caller = user.split(' ').next().unwrap_or("").to_owned();

            return Classification::Event(ActivityEvent {
                ts_ms,
                kind: EventKind::Open {
                    module,
                    caller,
                    via,
                },
            });
        }

        if let Some(caps) = self.re_close.captures(line) {
            let module = match caps.name("module").and_then(|c| c.as_str().chars().next()) {
                Some(c) => c,
                None => return Classification::Ignore,
            };
            return Classification::Event(ActivityEvent {
                ts_ms,
                kind: EventKind::Close { module },
            });
        }

        Classification::Ignore
    }
}

/// RFC 3339 타임스탬프를 epoch 밀리초(UTC)로 파싱합니다.
///
/// 나노초 정밀도와 임의의 UTC 오프셋을 허용합니다. 오프셋은
/// 타임스탬프 자체가 기술하므로 별도의 타임존 설정은 필요 없습니다.
pub fn parse_timestamp(input: &str) -> Result<i64, ActivityError> {
    DateTime::parse_from_rfc3339(input)
        .map(|dt| dt.with_timezone(&Utc).timestamp_millis())
        .map_err(|e| ActivityError::Timestamp {
            input: input.to_owned(),
            reason: e.to_string(),
        })
}
