//! Core domain types for the NexaDB metadata coordinator.

pub mod config;
pub mod error;
pub mod ids;

pub use config::GcConfig;
pub use error::{CoreError, CoreResult};
pub use ids::{JobId, TaskId};
