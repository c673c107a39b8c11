#![doc = include_str!("../README.md")]

pub mod memory;
pub mod sqlite;

// 주요 타입 재노출
pub use memory::MemoryRecordStore;
pub use sqlite::SqliteRecordStore;
