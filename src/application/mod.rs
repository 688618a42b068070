//! Application layer orchestrating fetches for recycled slots.

/// Fetch task, registry and coordinator services.
pub mod services;

pub use services::{
    FetchCoordinator, FetchPipeline, FetchTask, RequestStatus, TaskOutcome, TaskRegistry,
};
