//! Task module
//!
//! This module contains task records, the in-memory repository and the pure
//! derivations (filtered view, status counters) computed from it.

mod counts;
mod filter;
mod model;
mod repository;

pub use counts::{count_by_status, StatusCounts};
pub use filter::{filter_tasks, StatusFilter, TaskQuery};
pub use model::*;
pub use repository::TaskRepository;
