//! Storage node status library
//!
//! Shapes storage engine state into status views and serves byte ranges of
//! immutable shares. The engine itself is supplied by the caller through
//! the traits in [`engine`].

pub mod abbreviate;
pub mod crawler;
pub mod engine;
pub mod share;
pub mod si;
pub mod stats;
pub mod status;
pub mod utils;

// Re-export commonly used types
pub use engine::{BucketCounter, StorageEngine};
pub use si::StorageIndex;
pub use utils::errors::{Result, StatusError};
