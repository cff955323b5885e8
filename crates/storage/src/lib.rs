//! In-memory backend emulator.
//!
//! Holds every entity collection plus the session → assignment index in one
//! [`Repository`], and enforces the same required-field, uniqueness and
//! referential rules a real server would.

use std::{
    fs,
    path::Path,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use anyhow::{Context, Result};
use shared::domain::{AssignmentId, SessionId};
use thiserror::Error;
use tracing::info;

mod collection;
mod repository;

pub use collection::{record_id, Collection, EntityRules, UniqueKey, Upserted, ValueKind};
pub use repository::{EntityKind, Repository};

/// Wire-shape record as stored by the emulator.
pub type Record = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("{0}")]
    Validation(String),
    #[error("no {entity} with id {id}")]
    NotFound { entity: &'static str, id: i64 },
    #[error("invalid dataset: {0}")]
    Fixture(String),
    #[error("dataset integrity violated: {0}")]
    Integrity(String),
}

/// Shared handle to one [`Repository`].
///
/// Every call runs under a single lock, so a rule check and the write it
/// guards are never interleaved with another call.
#[derive(Clone, Default)]
pub struct Storage {
    repo: Arc<Mutex<Repository>>,
}

impl Storage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_repository(repo: Repository) -> Self {
        Self {
            repo: Arc::new(Mutex::new(repo)),
        }
    }

    pub fn load_fixture(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read fixture '{}'", path.display()))?;
        let value: serde_json::Value = serde_json::from_str(&raw)
            .with_context(|| format!("fixture '{}' is not valid JSON", path.display()))?;
        let repo = Repository::import(value)
            .with_context(|| format!("fixture '{}' was rejected", path.display()))?;
        info!(path = %path.display(), "loaded fixture dataset");
        Ok(Self::from_repository(repo))
    }

    pub fn save_fixture(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create parent directory '{}'", parent.display())
            })?;
        }
        let body = serde_json::to_string_pretty(&self.export())?;
        fs::write(path, body)
            .with_context(|| format!("failed to write fixture '{}'", path.display()))?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Repository> {
        // Writes land only after every check passed; a poisoned lock still
        // guards consistent data.
        self.repo.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn find_all(&self, kind: EntityKind) -> Vec<Record> {
        self.lock().find_all(kind).to_vec()
    }

    pub fn find(&self, kind: EntityKind, id: i64) -> Result<Record, StorageError> {
        self.lock().find(kind, id).cloned()
    }

    pub fn upsert(&self, kind: EntityKind, record: Record) -> Result<Record, StorageError> {
        self.lock().upsert(kind, record)
    }

    pub fn delete(&self, kind: EntityKind, record: &Record) -> Result<Record, StorageError> {
        self.lock().delete(kind, record)
    }

    pub fn positions_for_session(&self, session_id: SessionId) -> Result<Vec<Record>, StorageError> {
        self.lock().positions_for_session(session_id)
    }

    pub fn contract_templates_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<Record>, StorageError> {
        self.lock().contract_templates_for_session(session_id)
    }

    pub fn assignments_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<Record>, StorageError> {
        self.lock().assignments_for_session(session_id)
    }

    pub fn assignment_ids_for_session(&self, session_id: SessionId) -> Option<Vec<AssignmentId>> {
        self.lock().assignment_ids_for_session(session_id)
    }

    pub fn check_integrity(&self) -> Result<(), StorageError> {
        self.lock().check_integrity()
    }

    pub fn export(&self) -> serde_json::Value {
        self.lock().export()
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
