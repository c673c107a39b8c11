//! SQLite 기반 레코드 저장소
//!
//! 스키마는 열림 시점에 자동 생성됩니다. `tsoff` 컬럼이 0이면 열린
//! 세션, 그 외에는 닫힌 시각(epoch 밀리초)입니다.
//!
//! 연결은 `Mutex`로 직렬화됩니다. 쓰기 경로는 단일 워커 태스크 하나
//! 뿐이므로 경합은 없고, 쿼리도 짧아 async 런타임을 막지 않습니다.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use metrics::counter;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;
use uuid::Uuid;

use xlxmon_core::error::StoreError;
use xlxmon_core::metrics as m;
use xlxmon_core::store::RecordStore;
use xlxmon_core::types::{NewSession, OPEN_SENTINEL, SessionRecord};

/// 스키마 정의
///
/// 컬럼 이름은 기존 xlxd 대시보드 호환을 위해 유지합니다
/// (`ts`=시작, `tsoff`=종료, `call`=호출자).
const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS activity (
    id     TEXT PRIMARY KEY,
    system TEXT NOT NULL,
    module TEXT NOT NULL,
    ts     INTEGER NOT NULL,
    tsoff  INTEGER NOT NULL DEFAULT 0,
    call   TEXT NOT NULL,
    via    TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_activity_system_ts ON activity (system, ts);
";

/// SQLite 파일 기반 레코드 저장소
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

impl SqliteRecordStore {
    /// 지정한 경로의 데이터베이스를 열거나 생성합니다.
    ///
    /// 부모 디렉터리가 없으면 생성합니다.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Unavailable(format!("create {}: {e}", parent.display())))?;
        }

        let conn = Connection::open(path)
            .map_err(|e| StoreError::Unavailable(format!("open {}: {e}", path.display())))?;
        Self::init_schema(&conn)?;
        info!(path = %path.display(), "activity database opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// 인메모리 데이터베이스를 엽니다 (테스트용).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| StoreError::Unavailable(format!("init schema: {e}")))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("connection lock poisoned".to_owned()))
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> Result<(SessionRecord, String), rusqlite::Error> {
    let module: String = row.get(2)?;
    let record = SessionRecord {
        id: row.get(0)?,
        system: row.get(1)?,
        module: module.chars().next().unwrap_or('?'),
        start_ts: row.get(3)?,
        end_ts: row.get(4)?,
        caller: row.get(5)?,
        via: row.get(6)?,
    };
    Ok((record, module))
}

impl RecordStore for SqliteRecordStore {
    async fn find_last_start_ts(&self, system: &str) -> Result<Option<i64>, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT ts FROM activity WHERE system = ?1 ORDER BY ts DESC LIMIT 1",
            params![system],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| StoreError::Query(e.to_string()))
    }

    async fn create(&self, session: NewSession) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let conn = self.lock()?;
        let result = conn.execute(
            "INSERT INTO activity (id, system, module, ts, tsoff, call, via)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id,
                session.system,
                session.module.to_string(),
                session.start_ts,
                OPEN_SENTINEL,
                session.caller,
                session.via,
            ],
        );
        match result {
            Ok(_) => {
                counter!(m::STORE_WRITES_TOTAL, m::LABEL_RESULT => "ok").increment(1);
                Ok(id)
            }
            Err(e) => {
                counter!(m::STORE_WRITES_TOTAL, m::LABEL_RESULT => "error").increment(1);
                Err(StoreError::Write(e.to_string()))
            }
        }
    }

    async fn close(&self, id: &str, end_ts: i64) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE activity SET tsoff = ?1 WHERE id = ?2",
                params![end_ts, id],
            )
            .inspect_err(|_| {
                counter!(m::STORE_WRITES_TOTAL, m::LABEL_RESULT => "error").increment(1);
            })
            .map_err(|e| StoreError::Write(e.to_string()))?;
        if changed == 0 {
            return Err(StoreError::NotFound { id: id.to_owned() });
        }
        counter!(m::STORE_WRITES_TOTAL, m::LABEL_RESULT => "ok").increment(1);
        Ok(())
    }

    async fn find_open_sessions(&self, system: &str) -> Result<Vec<SessionRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, system, module, ts, tsoff, call, via
                 FROM activity WHERE system = ?1 AND tsoff = ?2 ORDER BY ts",
            )
            .map_err(|e| StoreError::Query(e.to_string()))?;
        let rows = stmt
            .query_map(params![system, OPEN_SENTINEL], row_to_record)
            .map_err(|e| StoreError::Query(e.to_string()))?;

        let mut records = Vec::new();
        for row in rows {
            let (record, module) = row.map_err(|e| StoreError::Query(e.to_string()))?;
            if module.chars().count() != 1 {
                return Err(StoreError::Query(format!(
                    "record {} has malformed module {module:?}",
                    record.id
                )));
            }
            records.push(record);
        }
        Ok(records)
    }
}
