//! Search and status filtering over a task list

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::model::{Task, TaskStatus};
use crate::Error;

/// Status dropdown selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(TaskStatus),
}

impl StatusFilter {
    pub fn matches(&self, status: TaskStatus) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => *wanted == status,
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("All"),
            Self::Only(status) => status.fmt(f),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse::<TaskStatus>()
            .map(Self::Only)
            .map_err(|_| Error::InvalidFilter(s.to_string()))
    }
}

impl Serialize for StatusFilter {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StatusFilter {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Active search term and status filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskQuery {
    search: String,
    status: StatusFilter,
}

impl TaskQuery {
    pub fn new(search: &str, status: StatusFilter) -> Self {
        Self {
            search: search.to_lowercase(),
            status,
        }
    }

    /// Lowercased search term
    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn status(&self) -> StatusFilter {
        self.status
    }

    pub fn set_search(&mut self, term: &str) {
        self.search = term.to_lowercase();
    }

    pub fn set_status(&mut self, status: StatusFilter) {
        self.status = status;
    }

    /// Whether a single record belongs in the view
    pub fn matches(&self, task: &Task) -> bool {
        self.status.matches(task.status) && self.matches_search(task)
    }

    fn matches_search(&self, task: &Task) -> bool {
        if self.search.is_empty() {
            return true;
        }
        task.title.to_lowercase().contains(&self.search)
            || task
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&self.search))
    }
}

/// Derive the visible subset, preserving input order
pub fn filter_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>, query: &TaskQuery) -> Vec<Task> {
    tasks
        .into_iter()
        .filter(|task| query.matches(task))
        .cloned()
        .collect()
}
