//! Task board state
//!
//! `TaskBoard` is the single state container behind the task table: the
//! canonical repository, the active query, the "new task" draft, the id
//! allocator and the derived view. Every mutation goes through one of its
//! methods, and each one re-derives the view before returning.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Error;
use crate::task::{
    count_by_status, filter_tasks, StatusCounts, StatusFilter, Task, TaskDraft, TaskId, TaskQuery,
    TaskRepository, TaskStatus,
};
use crate::Result;

/// Id handed to the first locally added task, one past the seeded ids
pub const FIRST_LOCAL_ID: TaskId = 21;

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
}

/// Fire-and-forget message for the notification surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
            at: Utc::now(),
        }
    }
}

/// Point-in-time copy of everything the rendering surface draws
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSnapshot {
    pub view: Vec<Task>,
    pub counts: StatusCounts,
    pub query: TaskQuery,
    pub draft: TaskDraft,
    pub next_id: TaskId,
}

#[derive(Debug, Clone)]
pub struct TaskBoard {
    repository: TaskRepository,
    query: TaskQuery,
    draft: TaskDraft,
    next_id: TaskId,
    view: Vec<Task>,
}

impl Default for TaskBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskBoard {
    /// Create an empty board
    pub fn new() -> Self {
        Self {
            repository: TaskRepository::new(),
            query: TaskQuery::default(),
            draft: TaskDraft::default(),
            next_id: FIRST_LOCAL_ID,
            view: Vec::new(),
        }
    }

    /// Replace every task, e.g. with the result of ingestion.
    ///
    /// Rejects, without touching the board, a list whose highest id leaves no
    /// room for a new one.
    pub fn load(&mut self, tasks: Vec<Task>) -> Result<()> {
        let repository = TaskRepository::replace_all(tasks);
        let next_id = match repository.max_id() {
            Some(max_id) => max_id
                .checked_add(1)
                .ok_or_else(|| Error::Ingestion(format!("Task id {} is out of range", max_id)))?
                .max(self.next_id),
            None => self.next_id,
        };

        self.repository = repository;
        self.next_id = next_id;
        self.refresh();
        Ok(())
    }

    pub fn set_draft(&mut self, draft: TaskDraft) {
        self.draft = draft;
    }

    /// Submit the current draft as a new task.
    ///
    /// On success the draft is reset and the next id is consumed. A draft
    /// without a title is kept as-is and nothing changes.
    pub fn submit_draft(&mut self) -> Result<Task> {
        if !self.draft.has_title() {
            return Err(Error::Validation("Please enter a title!".to_string()));
        }

        let next_id = self
            .next_id
            .checked_add(1)
            .ok_or_else(|| Error::Validation("No task ids left".to_string()))?;

        let task = self.draft.clone().into_task(self.next_id);
        self.repository = self.repository.append(task.clone())?;
        self.next_id = next_id;
        self.draft = TaskDraft::default();
        self.refresh();

        debug!("Added task {}: {}", task.id, task.title);
        Ok(task)
    }

    /// Replace the draft with `draft` and submit it
    pub fn add_task(&mut self, draft: TaskDraft) -> Result<Task> {
        self.set_draft(draft);
        self.submit_draft()
    }

    /// Delete a task; returns it if it existed
    pub fn delete_task(&mut self, id: TaskId) -> Option<Task> {
        let removed = self.repository.get(id).cloned();
        self.repository = self.repository.remove_by_id(id);
        self.refresh();

        if removed.is_some() {
            debug!("Deleted task {}", id);
        }
        removed
    }

    /// Change a task's status; returns whether the task exists
    pub fn set_status(&mut self, id: TaskId, status: TaskStatus) -> bool {
        let exists = self.repository.get(id).is_some();
        self.repository = self.repository.update_status(id, status);
        self.refresh();

        if exists {
            debug!("Task {} is now {}", id, status);
        }
        exists
    }

    pub fn set_search(&mut self, term: &str) {
        self.query.set_search(term);
        self.refresh();
    }

    pub fn set_status_filter(&mut self, filter: StatusFilter) {
        self.query.set_status(filter);
        self.refresh();
    }

    pub fn repository(&self) -> &TaskRepository {
        &self.repository
    }

    /// Tasks visible under the active query
    pub fn view(&self) -> &[Task] {
        &self.view
    }

    /// Counters over the whole repository, ignoring the query
    pub fn counts(&self) -> StatusCounts {
        count_by_status(&self.repository)
    }

    pub fn query(&self) -> &TaskQuery {
        &self.query
    }

    pub fn draft(&self) -> &TaskDraft {
        &self.draft
    }

    pub fn next_id(&self) -> TaskId {
        self.next_id
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            view: self.view.clone(),
            counts: self.counts(),
            query: self.query.clone(),
            draft: self.draft.clone(),
            next_id: self.next_id,
        }
    }

    fn refresh(&mut self) {
        self.view = filter_tasks(&self.repository, &self.query);
    }
}
