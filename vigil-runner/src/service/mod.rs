//! Service layer
//!
//! Services contain the business logic of the runner: source
//! synchronization, environment preparation, job execution, and result
//! reporting. All services are trait-based to enable testing and
//! dependency injection.

mod execution;
mod prepare;
mod report;
mod sync;

// Re-export traits
pub use execution::ExecutionService;
pub use prepare::PrepareService;
pub use report::Sink;
pub use sync::SyncService;

// Re-export implementations
pub use execution::{REVISION_ENV, StandardExecutionService};
pub use prepare::{NoopPreparer, PythonVenvPreparer};
pub use report::{Reporter, StdoutSink, WebhookSink};
pub use sync::GitSynchronizer;
