//! In-memory task repository
//!
//! The repository is an immutable snapshot: every operation returns a new
//! `TaskRepository` and leaves the receiver untouched, so a view derived from
//! one snapshot is never invalidated by a later mutation.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

use super::model::{Task, TaskId, TaskStatus};
use crate::{Error, Result};

/// Ordered, id-unique sequence of tasks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskRepository {
    tasks: Arc<Vec<Task>>,
}

impl TaskRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk load, replacing all content.
    ///
    /// Records repeating an id already seen are dropped.
    pub fn replace_all(records: impl IntoIterator<Item = Task>) -> Self {
        let mut seen = HashSet::new();
        let tasks = records
            .into_iter()
            .filter(|task| {
                let fresh = seen.insert(task.id);
                if !fresh {
                    warn!("Dropping task with duplicate id {}", task.id);
                }
                fresh
            })
            .collect();
        Self {
            tasks: Arc::new(tasks),
        }
    }

    /// Append a record at the end
    pub fn append(&self, task: Task) -> Result<Self> {
        if self.get(task.id).is_some() {
            return Err(Error::DuplicateId(task.id));
        }
        let mut tasks = Vec::with_capacity(self.tasks.len() + 1);
        tasks.extend(self.tasks.iter().cloned());
        tasks.push(task);
        Ok(Self {
            tasks: Arc::new(tasks),
        })
    }

    /// Remove the record with `id`; absent ids are a no-op
    pub fn remove_by_id(&self, id: TaskId) -> Self {
        if self.get(id).is_none() {
            return self.clone();
        }
        let tasks = self.tasks.iter().filter(|t| t.id != id).cloned().collect();
        Self {
            tasks: Arc::new(tasks),
        }
    }

    /// Replace the status of the record with `id`; absent ids are a no-op
    pub fn update_status(&self, id: TaskId, status: TaskStatus) -> Self {
        match self.get(id) {
            Some(task) if task.status != status => {}
            _ => return self.clone(),
        }
        let tasks = self
            .tasks
            .iter()
            .map(|t| {
                if t.id == id {
                    t.clone().with_status(status)
                } else {
                    t.clone()
                }
            })
            .collect();
        Self {
            tasks: Arc::new(tasks),
        }
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Highest id present, if any
    pub fn max_id(&self) -> Option<TaskId> {
        self.tasks.iter().map(|t| t.id).max()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Task> {
        self.tasks.iter()
    }

    pub fn as_slice(&self) -> &[Task] {
        &self.tasks
    }
}

impl<'a> IntoIterator for &'a TaskRepository {
    type Item = &'a Task;
    type IntoIter = std::slice::Iter<'a, Task>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
