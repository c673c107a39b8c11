//! 인메모리 레코드 저장소 (테스트용)
//!
//! 파이프라인 테스트에서 SQLite 없이 저장소 동작을 검증할 때
//! 사용합니다. [`fail_writes`](MemoryRecordStore::fail_writes)로 쓰기
//! 실패를 주입할 수 있습니다.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use uuid::Uuid;

use xlxmon_core::error::StoreError;
use xlxmon_core::store::RecordStore;
use xlxmon_core::types::{NewSession, OPEN_SENTINEL, SessionRecord};

/// 인메모리 레코드 저장소
#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<Vec<SessionRecord>>,
    fail_writes: AtomicBool,
}

impl MemoryRecordStore {
    /// 빈 저장소를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 이후의 쓰기(create/close)를 실패시킬지 설정합니다.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// 레코드를 삽입 순서대로 미리 채웁니다.
    pub fn seed(&self, record: SessionRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
    }

    /// 모든 레코드의 사본을 삽입 순서대로 반환합니다.
    pub fn records(&self) -> Vec<SessionRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Write("injected write failure".to_owned()));
        }
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<SessionRecord>>, StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError::Unavailable("records lock poisoned".to_owned()))
    }
}

impl RecordStore for MemoryRecordStore {
    async fn find_last_start_ts(&self, system: &str) -> Result<Option<i64>, StoreError> {
        let records = self.lock()?;
        Ok(records
            .iter()
            .filter(|r| r.system == system)
            .map(|r| r.start_ts)
            .max())
    }

    async fn create(&self, session: NewSession) -> Result<String, StoreError> {
        self.check_writable()?;
        let id = Uuid::new_v4().to_string();
        let mut records = self.lock()?;
        records.push(SessionRecord {
            id: id.clone(),
            system: session.system,
            module: session.module,
            start_ts: session.start_ts,
            end_ts: OPEN_SENTINEL,
            caller: session.caller,
            via: session.via,
        });
        Ok(id)
    }

    async fn close(&self, id: &str, end_ts: i64) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut records = self.lock()?;
        match records.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                record.end_ts = end_ts;
                Ok(())
            }
            None => Err(StoreError::NotFound { id: id.to_owned() }),
        }
    }

    async fn find_open_sessions(&self, system: &str) -> Result<Vec<SessionRecord>, StoreError> {
        let records = self.lock()?;
        Ok(records
            .iter()
            .filter(|r| r.system == system && r.is_open())
            .cloned()
            .collect())
    }
}
