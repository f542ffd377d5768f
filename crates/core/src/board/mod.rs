//! Task board management
//!
//! This module provides the board state container and the shared async store
//! that the rendering surface and the ingestion task operate on.

mod model;
mod store;

pub use model::*;
pub use store::*;
