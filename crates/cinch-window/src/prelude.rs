//! Convenience re-exports for common `cinch-window` types.
//!
//! Meant to be glob-imported:
//!
//! ```ignore
//! use cinch_window::prelude::*;
//! ```
//!
//! Pulls in the [`ContextWindow`] with its config and input types, the
//! policies, tokenizers, function descriptors, and the completion service
//! layer. Lower-level pieces ([`Compactor`](crate::context::Compactor), the
//! window fitter) stay in their modules.

// ── Core types ──────────────────────────────────────────────────────
pub use crate::{ContextError, Message, MessageRole, OpenRouterClient, ServiceError, ToolDef};

// ── Context management ──────────────────────────────────────────────
pub use crate::context::{
    CharRatioTokenizer, CompactedMessage, ContextConfig, ContextUsage, ContextWindow, DataPolicy,
    EnhancedMessage, FunctionPolicy, MessageState, TiktokenTokenizer, Tokenizer, UserTurn,
};

// ── Functions ───────────────────────────────────────────────────────
pub use crate::function::{FunctionInfo, ParamType, describe_call};

// ── Completion service ──────────────────────────────────────────────
pub use crate::api::{
    Completion, CompletionFuture, CompletionRequest, CompletionService, RetryConfig,
    ScriptedService,
};
