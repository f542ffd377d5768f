//! Remote ingestion
//!
//! One-shot fetch of the external todo list, normalized into task records.

mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::task::{Task, TaskStatus};
use crate::Result;

pub use http::HttpTaskSource;

/// Default remote endpoint
pub const DEFAULT_TODOS_URL: &str = "https://jsonplaceholder.typicode.com/todos";

/// Number of remote records kept
pub const DEFAULT_INGEST_LIMIT: usize = 20;

/// Where the initial task list comes from
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// Fetch and normalize the task list.
    ///
    /// Every failure is reported as `Error::Ingestion`.
    async fn fetch_tasks(&self) -> Result<Vec<Task>>;
}

/// Configuration for remote ingestion
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub url: String,
    pub limit: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_TODOS_URL.to_string(),
            limit: DEFAULT_INGEST_LIMIT,
        }
    }
}

/// An item as served by the remote todo API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteTodo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

impl From<RemoteTodo> for Task {
    fn from(todo: RemoteTodo) -> Self {
        Task::new(todo.id, todo.title).with_status(TaskStatus::from_completed(todo.completed))
    }
}

/// Keep the first `limit` items and map them to task records
pub fn normalize(items: Vec<RemoteTodo>, limit: usize) -> Vec<Task> {
    items.into_iter().take(limit).map(Task::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn todo(id: u64, completed: bool) -> RemoteTodo {
        RemoteTodo {
            user_id: Some(1),
            id,
            title: format!("todo {}", id),
            completed,
        }
    }

    #[test]
    fn test_normalize_maps_completed() {
        let tasks = normalize(vec![todo(1, false), todo(2, true)], DEFAULT_INGEST_LIMIT);
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].status, TaskStatus::ToDo);
        assert_eq!(tasks[1].status, TaskStatus::Done);
        assert_eq!(tasks[1].title, "todo 2");
        assert!(tasks.iter().all(|t| t.description.is_none()));
    }

    #[test]
    fn test_normalize_truncates() {
        let items = (1..=200).map(|id| todo(id, id % 3 == 0)).collect();
        let tasks = normalize(items, DEFAULT_INGEST_LIMIT);
        assert_eq!(tasks.len(), 20);
        assert_eq!(tasks.first().map(|t| t.id), Some(1));
        assert_eq!(tasks.last().map(|t| t.id), Some(20));
    }

    #[test]
    fn test_remote_todo_deserialize() {
        let json = r#"{"userId": 1, "id": 3, "title": "fugiat veniam minus", "completed": false}"#;
        let todo: RemoteTodo = serde_json::from_str(json).unwrap();
        assert_eq!(todo.user_id, Some(1));
        assert_eq!(todo.id, 3);
        assert!(!todo.completed);

        let bare: RemoteTodo = serde_json::from_str(r#"{"id": 4, "title": "x"}"#).unwrap();
        assert_eq!(bare.user_id, None);
        assert!(!bare.completed);
    }
}
