pub mod fetch_coordinator;
pub mod fetch_task;
pub mod task_registry;

pub use fetch_coordinator::{FetchCoordinator, RequestStatus};
pub use fetch_task::{FetchPipeline, FetchTask, TaskOutcome};
pub use task_registry::TaskRegistry;
