//! Completion service layer: the service trait, retry, and a scripted service.
//!
//! These modules sit between the [`ContextWindow`](crate::context::ContextWindow)
//! and whatever executes a model call:
//!
//! - [`service`]: the [`CompletionService`] trait plus its request and
//!   response types. [`OpenRouterClient`](crate::OpenRouterClient) implements it.
//! - [`retry`]: fixed-delay retries that apply only to transient failures
//!   (malformed response payloads). Everything else propagates at once.
//! - [`scripted`]: [`ScriptedService`], an in-memory service that replays
//!   queued completions and records every request it receives.

pub mod retry;
pub mod scripted;
pub mod service;

// Re-export commonly used items at the module level.
pub use retry::{Reply, RetryConfig, complete_text_with_retry, complete_with_retry};
pub use scripted::ScriptedService;
pub use service::{Completion, CompletionFuture, CompletionRequest, CompletionService, FunctionCall};
