//! 세션 상관기
//!
//! 열림/닫힘 이벤트를 모듈별 2상태 기계로 상관하여 저장소에
//! 세션 레코드를 만듭니다.
//!
//! # 상태 기계 (모듈별)
//! - 열림 이벤트: 레코드 생성 후 인덱스에 `모듈 -> 레코드 id` 기록.
//!   이미 열린 레코드가 있으면 인덱스를 덮어씁니다 — 이전 레코드는
//!   영원히 열린 채 남습니다 (닫힘 라인 유실 시의 의도된 동작).
//! - 닫힘 이벤트: 인덱스에서 id를 꺼내 `end_ts`를 기록.
//!   매칭되는 열림이 없으면 경고 후 드롭합니다 (비치명적).
//!
//! 저장소 호출 실패는 그대로 전파됩니다 (치명적).

use std::collections::HashMap;

use tracing::{debug, info, warn};

use xlxmon_core::store::RecordStore;
use xlxmon_core::types::NewSession;

use crate::classifier::{ActivityEvent, EventKind};
use crate::error::ActivityError;

/// 이벤트 적용 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// 세션 레코드가 생성됨
    Opened {
        /// 생성된 레코드 id
        id: String,
        /// 모듈 문자
        module: char,
    },
    /// 세션 레코드가 닫힘
    Closed {
        /// 닫힌 레코드 id
        id: String,
        /// 모듈 문자
        module: char,
    },
    /// 매칭되는 열림이 없어 닫힘 이벤트가 드롭됨
    UnmatchedClose {
        /// 모듈 문자
        module: char,
    },
}

/// 세션 상관기
///
/// 열린 세션 인덱스(`모듈 -> 레코드 id`)를 단독 소유합니다.
/// 재시작 시 인덱스는 비어 있는 상태로 시작하며, 선택적으로
/// [`recover`](SessionCorrelator::recover)로 저장소에서 복구할 수 있습니다.
pub struct SessionCorrelator {
    /// 시스템 식별자 (생성되는 모든 레코드에 기록됨)
    system: String,
    /// 열린 세션 인덱스
    index: HashMap<char, String>,
}

impl SessionCorrelator {
    /// 새 상관기를 생성합니다. 인덱스는 비어 있습니다.
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            index: HashMap::new(),
        }
    }

    /// 저장소의 열린 세션으로 인덱스를 복구합니다.
    ///
    /// 같은 모듈에 열린 레코드가 여러 개면 가장 최근 것이 남습니다.
    /// 복구된 세션 수를 반환합니다.
    pub async fn recover<S: RecordStore>(&mut self, store: &S) -> Result<usize, ActivityError> {
        let open = store.find_open_sessions(&self.system).await?;
        let count = open.len();
        for record in open {
            self.index.insert(record.module, record.id);
        }
        if count > 0 {
            info!(count, "recovered open sessions from store");
        }
        Ok(count)
    }

    /// 이벤트 하나를 저장소에 적용합니다.
    pub async fn apply<S: RecordStore>(
        &mut self,
        store: &S,
        event: &ActivityEvent,
    ) -> Result<Applied, ActivityError> {
        match &event.kind {
            EventKind::Open {
                module,
                caller,
                via,
            } => {
                let id = store
                    .create(NewSession {
                        system: self.system.clone(),
                        module: *module,
                        start_ts: event.ts_ms,
                        caller: caller.clone(),
                        via: via.clone(),
                    })
                    .await?;

                if let Some(abandoned) = self.index.insert(*module, id.clone()) {
                    // 닫힘 라인이 유실된 경우 — 이전 레코드는 열린 채 남음
                    debug!(
                        module = %module,
                        abandoned_id = %abandoned,
                        "open event replaced a still-open session"
                    );
                }

                info!(
                    call = %caller,
                    module = %module,
                    timestamp = event.ts_ms,
                    record_id = %id,
                    "+++ on  +++"
                );
                Ok(Applied::Opened { id, module: *module })
            }
            EventKind::Close { module } => match self.index.remove(module) {
                Some(id) => {
                    store.close(&id, event.ts_ms).await?;
                    info!(
                        module = %module,
                        record_id = %id,
                        timestamp = event.ts_ms,
                        "--- off ---"
                    );
                    Ok(Applied::Closed { id, module: *module })
                }
                None => {
                    warn!(module = %module, "disconnect without connect record");
                    Ok(Applied::UnmatchedClose { module: *module })
                }
            },
        }
    }

    /// 현재 열린 세션 수를 반환합니다.
    pub fn open_count(&self) -> usize {
        self.index.len()
    }
}
