//! Core library for taskdesk
//!
//! This crate contains the task store and filter engine, including:
//! - Task records, the in-memory repository and the search/status filter
//! - The board state container and its shared async store
//! - Remote ingestion of the initial task list

pub mod board;
pub mod error;
pub mod ingest;
pub mod task;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
