pub mod approval;
pub mod error;
pub mod forms;
pub mod notify;
pub mod reconcile;
pub mod recurrence;
pub mod workflow;

pub use error::WorkflowError;
pub use workflow::WorkflowEngine;
