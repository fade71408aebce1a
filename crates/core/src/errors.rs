use thiserror::Error;

/// Failure taxonomy shared by every travel-order and liquidation transition.
///
/// Each variant is terminal to the attempted call: the caller decides
/// user-facing messaging, nothing is retried here.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("actor `{actor}` is not authorized for this action")]
    Unauthorized { actor: String },
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("action not permitted while status is `{status}`")]
    InvalidState { status: String },
    #[error("no eligible approver is available")]
    NoApproverAvailable,
}

impl WorkflowError {
    pub fn unauthorized(actor: impl Into<String>) -> Self {
        Self::Unauthorized { actor: actor.into() }
    }

    pub fn invalid_state(status: impl Into<String>) -> Self {
        Self::InvalidState { status: status.into() }
    }
}
