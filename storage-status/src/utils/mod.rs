//! Shared error and logging helpers.

pub mod errors;
pub mod logger;

pub use errors::{Result, StatusError};
