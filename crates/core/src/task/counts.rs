//! Per-status counters

use serde::Serialize;

use super::model::{Task, TaskStatus};

/// Tally of tasks per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub to_do: usize,
    pub in_progress: usize,
    pub done: usize,
}

impl StatusCounts {
    pub fn get(&self, status: TaskStatus) -> usize {
        match status {
            TaskStatus::ToDo => self.to_do,
            TaskStatus::InProgress => self.in_progress,
            TaskStatus::Done => self.done,
        }
    }

    pub fn total(&self) -> usize {
        self.to_do + self.in_progress + self.done
    }

    fn bump(&mut self, status: TaskStatus) {
        match status {
            TaskStatus::ToDo => self.to_do += 1,
            TaskStatus::InProgress => self.in_progress += 1,
            TaskStatus::Done => self.done += 1,
        }
    }
}

/// Count every task by status
pub fn count_by_status<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> StatusCounts {
    tasks.into_iter().fold(StatusCounts::default(), |mut counts, task| {
        counts.bump(task.status);
        counts
    })
}
