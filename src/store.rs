// Durable task records
//
// The scheduler only needs load/update/commit. YamlTaskStore keeps every record in one YAML
// file; MemoryTaskStore is the same thing without the file.

use crate::models::{TaskRecord, TaskUpdate};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use std::fs;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Task {0} not found")]
    NotFound(u64),

    #[error("Task store I/O error on {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Task store serialization error: {0}")]
    Serialize(#[from] serde_yaml_ng::Error),
}

/// Persistence contract for task records.
#[cfg_attr(test, mockall::automock)]
pub trait TaskStore: Send + Sync {
    /// Insert or replace a record (staged until [`commit`](Self::commit))
    fn insert(&self, record: TaskRecord) -> Result<(), StoreError>;

    fn load(&self, id: u64) -> Result<TaskRecord, StoreError>;

    /// Apply the final job state to the record `id` (staged until [`commit`](Self::commit))
    fn update(&self, id: u64, update: &TaskUpdate) -> Result<(), StoreError>;

    /// Make staged changes durable
    fn commit(&self) -> Result<(), StoreError>;
}

/// In-memory store; `commit` is a no-op.
#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    records: Mutex<IndexMap<u64, TaskRecord>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> MutexGuard<'_, IndexMap<u64, TaskRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TaskStore for MemoryTaskStore {
    fn insert(&self, record: TaskRecord) -> Result<(), StoreError> {
        self.records().insert(record.id, record);
        Ok(())
    }

    fn load(&self, id: u64) -> Result<TaskRecord, StoreError> {
        self.records().get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    fn update(&self, id: u64, update: &TaskUpdate) -> Result<(), StoreError> {
        let mut records = self.records();
        let record = records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        update.apply(record);
        Ok(())
    }

    fn commit(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Task records persisted as a YAML list, rewritten on every commit.
#[derive(Debug)]
pub struct YamlTaskStore {
    path: Utf8PathBuf,
    staged: MemoryTaskStore,
}

impl YamlTaskStore {
    /// Open `path`, loading existing records if the file is there.
    pub fn open(path: impl Into<Utf8PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let staged = MemoryTaskStore::new();

        if path.exists() {
            let content = fs::read_to_string(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            let records: Vec<TaskRecord> = serde_yaml_ng::from_str(&content)?;
            tracing::info!("Loaded {} task records from {}", records.len(), path);
            for record in records {
                staged.insert(record)?;
            }
        }

        Ok(Self { path, staged })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Next unused task id
    pub fn next_id(&self) -> u64 {
        self.staged.records().keys().max().map_or(1, |max| max + 1)
    }

    pub fn all(&self) -> Vec<TaskRecord> {
        self.staged.records().values().cloned().collect()
    }
}

impl TaskStore for YamlTaskStore {
    fn insert(&self, record: TaskRecord) -> Result<(), StoreError> {
        self.staged.insert(record)
    }

    fn load(&self, id: u64) -> Result<TaskRecord, StoreError> {
        self.staged.load(id)
    }

    fn update(&self, id: u64, update: &TaskUpdate) -> Result<(), StoreError> {
        self.staged.update(id, update)
    }

    fn commit(&self) -> Result<(), StoreError> {
        let yaml = serde_yaml_ng::to_string(&self.all())?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&self.path, yaml).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;

        tracing::debug!("Committed task records to {}", self.path);
        Ok(())
    }
}
