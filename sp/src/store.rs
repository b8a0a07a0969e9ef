//! Task storage
//!
//! `TaskStore` is the CRUD collaborator the CLI and the selection step write
//! through. `JsonTaskStore` keeps every task in one JSON document on disk;
//! `MemoryTaskStore` backs tests and holds the same logic without the file.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::{Task, TaskId, TaskPatch, resolve_prefix};

/// Errors from store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Ambiguous task id '{prefix}' matches {count} tasks")]
    Ambiguous { prefix: String, count: usize },

    #[error("Task '{0}' must start before it ends")]
    InvalidTimes(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed task file: {0}")]
    Json(#[from] serde_json::Error),
}

/// CRUD operations over the task collection
pub trait TaskStore {
    /// Every task, in insertion order
    fn list(&self) -> Result<Vec<Task>, StoreError>;

    fn get(&self, id: &TaskId) -> Result<Task, StoreError>;

    /// Add one task; rejects tasks whose start is not before their end
    fn create(&mut self, task: Task) -> Result<Task, StoreError>;

    fn update(&mut self, id: &TaskId, patch: TaskPatch) -> Result<Task, StoreError>;

    fn delete(&mut self, id: &TaskId) -> Result<(), StoreError>;

    /// Append tasks as-is, without de-duplication; all-or-nothing
    fn extend(&mut self, tasks: Vec<Task>) -> Result<usize, StoreError>;

    /// Tasks starting within `[start, end]`, earliest first
    fn list_by_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Task>, StoreError> {
        let mut tasks: Vec<Task> = self
            .list()?
            .into_iter()
            .filter(|t| t.start_time >= start && t.start_time <= end)
            .collect();
        tasks.sort_by_key(|t| t.start_time);
        Ok(tasks)
    }

    /// Flip the completion flag
    fn toggle_completion(&mut self, id: &TaskId) -> Result<Task, StoreError> {
        let task = self.get(id)?;
        self.update(id, TaskPatch::completed(!task.completed))
    }

    /// Find the task whose id equals `prefix`, or whose full or short id starts
    /// with it
    fn resolve_id(&self, prefix: &str) -> Result<TaskId, StoreError> {
        let tasks = self.list()?;
        match resolve_prefix(tasks.iter().map(|t| &t.id), prefix) {
            Ok(Some(id)) => Ok(id),
            Ok(None) => Err(StoreError::NotFound(prefix.trim().to_string())),
            Err(count) => Err(StoreError::Ambiguous {
                prefix: prefix.trim().to_string(),
                count,
            }),
        }
    }
}

fn check_times(task: &Task) -> Result<(), StoreError> {
    if task.has_valid_times() {
        Ok(())
    } else {
        Err(StoreError::InvalidTimes(task.title.clone()))
    }
}

/// In-memory task store
#[derive(Debug, Default, Clone)]
pub struct MemoryTaskStore {
    tasks: Vec<Task>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    fn position(&self, id: &TaskId) -> Result<usize, StoreError> {
        self.tasks
            .iter()
            .position(|t| &t.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

impl TaskStore for MemoryTaskStore {
    fn list(&self) -> Result<Vec<Task>, StoreError> {
        Ok(self.tasks.clone())
    }

    fn get(&self, id: &TaskId) -> Result<Task, StoreError> {
        Ok(self.tasks[self.position(id)?].clone())
    }

    fn create(&mut self, task: Task) -> Result<Task, StoreError> {
        check_times(&task)?;
        debug!(id = %task.id, title = %task.title, "create: called");
        self.tasks.push(task.clone());
        Ok(task)
    }

    fn update(&mut self, id: &TaskId, patch: TaskPatch) -> Result<Task, StoreError> {
        let index = self.position(id)?;
        let mut updated = self.tasks[index].clone();
        patch.apply(&mut updated);
        check_times(&updated)?;
        self.tasks[index] = updated.clone();
        Ok(updated)
    }

    fn delete(&mut self, id: &TaskId) -> Result<(), StoreError> {
        let index = self.position(id)?;
        self.tasks.remove(index);
        Ok(())
    }

    fn extend(&mut self, tasks: Vec<Task>) -> Result<usize, StoreError> {
        for task in &tasks {
            check_times(task)?;
        }
        let count = tasks.len();
        self.tasks.extend(tasks);
        Ok(count)
    }
}

/// Read a JSON document; a missing or blank file yields the default value
pub(crate) fn read_document<T: DeserializeOwned + Default>(path: &Path) -> Result<T, StoreError> {
    match fs::read_to_string(path) {
        Ok(content) if content.trim().is_empty() => Ok(T::default()),
        Ok(content) => Ok(serde_json::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(source) => Err(StoreError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Write a JSON document through a sibling temp file and a rename
pub(crate) fn write_document<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)?;
    Ok(())
}

/// Task store persisted as a single JSON array
///
/// Every mutation rewrites the file through a sibling temp file and a rename.
#[derive(Debug)]
pub struct JsonTaskStore {
    path: PathBuf,
    inner: MemoryTaskStore,
}

impl JsonTaskStore {
    /// Open the store at `path`; a missing or empty file is an empty store
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let tasks: Vec<Task> = read_document(&path)?;

        debug!(?path, count = tasks.len(), "Opened task store");
        Ok(Self {
            path,
            inner: MemoryTaskStore::with_tasks(tasks),
        })
    }

    fn persist(&self) -> Result<(), StoreError> {
        write_document(&self.path, &self.inner.tasks)?;
        debug!(path = ?self.path, count = self.inner.len(), "persist: written");
        Ok(())
    }
}

impl TaskStore for JsonTaskStore {
    fn list(&self) -> Result<Vec<Task>, StoreError> {
        self.inner.list()
    }

    fn get(&self, id: &TaskId) -> Result<Task, StoreError> {
        self.inner.get(id)
    }

    fn create(&mut self, task: Task) -> Result<Task, StoreError> {
        let task = self.inner.create(task)?;
        self.persist()?;
        Ok(task)
    }

    fn update(&mut self, id: &TaskId, patch: TaskPatch) -> Result<Task, StoreError> {
        let task = self.inner.update(id, patch)?;
        self.persist()?;
        Ok(task)
    }

    fn delete(&mut self, id: &TaskId) -> Result<(), StoreError> {
        self.inner.delete(id)?;
        self.persist()
    }

    fn extend(&mut self, tasks: Vec<Task>) -> Result<usize, StoreError> {
        let count = self.inner.extend(tasks)?;
        self.persist()?;
        info!(count, path = ?self.path, "Saved tasks");
        Ok(count)
    }
}
