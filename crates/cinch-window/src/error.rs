//! Error types for the context window and its collaborators.
//!
//! [`ContextError`] is what every public operation returns. [`ServiceError`]
//! is what a [`CompletionService`](crate::api::CompletionService) returns;
//! only its transient class is retried before being escalated.

use thiserror::Error;

/// Result type for context window operations.
pub type Result<T> = std::result::Result<T, ContextError>;

/// Errors surfaced by the context window.
#[derive(Debug, Error)]
pub enum ContextError {
    /// Invalid policy, parameter type, function descriptor, or config value.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The overview plus the newest turn can never fit in the budget.
    #[error(
        "budget infeasible: overview ({overview_tokens} tokens) + newest turn \
         ({newest_tokens} tokens) exceeds max_tokens ({max_tokens})"
    )]
    BudgetInfeasible {
        overview_tokens: usize,
        newest_tokens: usize,
        max_tokens: usize,
    },

    /// Transient service failures persisted through every retry.
    #[error("completion service unavailable after {attempts} attempt(s): {last_error}")]
    ServiceUnavailable { attempts: u32, last_error: String },

    /// Non-transient failure from the completion service.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// The message at this index cannot be edited (overview or response).
    #[error("message {index} is not an editable user turn")]
    NotEditable { index: usize },

    #[error("message index {index} out of range (ledger has {len} messages)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Errors returned by a completion service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// The response payload could not be decoded. Retried.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The request never produced a response (network, HTTP status).
    #[error("request failed: {0}")]
    Request(String),

    /// The API answered with an explicit error object.
    #[error("API error: {0}")]
    Api(String),
}

impl ServiceError {
    /// Whether this failure belongs to the retryable class.
    pub fn is_transient(&self) -> bool {
        matches!(self, ServiceError::MalformedResponse(_))
    }
}
