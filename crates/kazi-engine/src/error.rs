use kazi_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Actor lacks the role or relationship the transition requires.
    #[error("not authorized: {0}")]
    Authorization(String),

    /// Action not valid from the task's current status.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// A requirement of the action is unmet (missing evidence, bad input).
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Concurrent writers collided; the caller should re-read and retry.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
