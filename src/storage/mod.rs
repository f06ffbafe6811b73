//! Storage Module
//!
//! This module provides storage for the market engine: the table of active
//! records created by accepted intents.

pub mod records;

// Re-export for convenience
pub use records::{ActiveRecord, RecordState, RecordStore};
