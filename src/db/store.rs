//! Keyed persistence for differential records.
//!
//! The orchestrator only needs find + upsert by case identifier, so it talks to
//! this trait. `SqliteDifferentialStore` is the production backend;
//! `InMemoryDifferentialStore` backs tests and ephemeral runs.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, RwLock};

use rusqlite::Connection;

use super::repository::{get_differential_record, upsert_differential_record};
use super::sqlite::{open_database, open_memory_database};
use super::DatabaseError;
use crate::models::DifferentialRecord;

pub trait DifferentialStore: Send + Sync {
    fn find(&self, case_id: &str) -> Result<Option<DifferentialRecord>, DatabaseError>;

    /// Insert or replace. Last writer wins.
    fn upsert(&self, record: &DifferentialRecord) -> Result<(), DatabaseError>;
}

/// SQLite-backed store. rusqlite connections are not `Sync`, so access is serialized.
pub struct SqliteDifferentialStore {
    conn: Mutex<Connection>,
}

impl SqliteDifferentialStore {
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self::from_connection(open_database(path)?))
    }

    pub fn in_memory() -> Result<Self, DatabaseError> {
        Ok(Self::from_connection(open_memory_database()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

impl DifferentialStore for SqliteDifferentialStore {
    fn find(&self, case_id: &str) -> Result<Option<DifferentialRecord>, DatabaseError> {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockFailed)?;
        get_differential_record(&conn, case_id)
    }

    fn upsert(&self, record: &DifferentialRecord) -> Result<(), DatabaseError> {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockFailed)?;
        upsert_differential_record(&conn, record)
    }
}

/// In-memory store backed by RwLock.
#[derive(Default)]
pub struct InMemoryDifferentialStore {
    records: RwLock<HashMap<String, DifferentialRecord>>,
}

impl InMemoryDifferentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DifferentialStore for InMemoryDifferentialStore {
    fn find(&self, case_id: &str) -> Result<Option<DifferentialRecord>, DatabaseError> {
        let records = self.records.read().map_err(|_| DatabaseError::LockFailed)?;
        Ok(records.get(case_id).cloned())
    }

    fn upsert(&self, record: &DifferentialRecord) -> Result<(), DatabaseError> {
        let mut records = self.records.write().map_err(|_| DatabaseError::LockFailed)?;
        records.insert(record.case_id.clone(), record.clone());
        Ok(())
    }
}
