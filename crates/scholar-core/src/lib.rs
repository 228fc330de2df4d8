//! Scholar Hub Core Library
//!
//! This crate provides the domain models, error taxonomy, configuration, and the
//! pure view logic (filtering, sorting, operation tracking) shared by the API
//! client and the CLI. Nothing in here performs network I/O.

pub mod config;
pub mod error;
pub mod models;
pub mod operation;
pub mod validation;
pub mod view;

// Re-export commonly used types
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult, LogLevel};
pub use operation::{OperationGuard, OperationState, OperationTracker};
pub use view::{PostFilter, PostQuery, PostStats, SortOrder};
