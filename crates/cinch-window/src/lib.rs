//! Token-budgeted conversation ledger for LLM chat clients.
//!
//! `cinch-window` keeps two views of one conversation. The **enhanced** ledger
//! is the authoritative record of every turn: raw user content, associated
//! data, the policy that says what to do with that data once the turn ages,
//! and an optional function descriptor. The **compacted** ledger is what the
//! model actually sees: one rendered string per turn, with a token count.
//!
//! Every call to [`ContextWindow::add_message()`](context::ContextWindow::add_message)
//! compacts the previous user turn according to its policies, fits the
//! compacted history into the token budget, sends the request, and records
//! the response. A failed turn leaves the ledger untouched.
//!
//! # Getting started
//!
//! ```ignore
//! use cinch_window::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ContextError> {
//!     let client = OpenRouterClient::new(std::env::var("OPENROUTER_KEY").unwrap())?;
//!     let tokenizer = TiktokenTokenizer::for_model("openai/gpt-4o")?;
//!
//!     let config = ContextConfig::new("You are a coding assistant.")
//!         .with_model("openai/gpt-4o")
//!         .with_max_tokens(4096)
//!         .with_default_data_policy(DataPolicy::Summarize);
//!
//!     let mut window = ContextWindow::new(config, &client, &tokenizer)?;
//!     let reply = window
//!         .add_message(UserTurn::new("Fix this bug").with_data(stack_trace))
//!         .await?;
//!     println!("{reply}");
//!     println!("{}", window.usage().to_log_string());
//!     Ok(())
//! }
//! ```
//!
//! # Where to find things
//!
//! - **Drive a conversation:** [`ContextWindow`](context::ContextWindow),
//!   [`ContextConfig`](context::ContextConfig), [`UserTurn`](context::UserTurn).
//! - **Decide what happens to old data:** [`DataPolicy`](context::DataPolicy)
//!   and [`FunctionPolicy`](context::FunctionPolicy), applied by
//!   [`context::compaction`].
//! - **Budget arithmetic:** [`context::window`] picks which history to omit;
//!   [`context::tokens`] counts tokens through a pluggable
//!   [`Tokenizer`](context::Tokenizer).
//! - **Describe callable functions:** [`FunctionInfo`](function::FunctionInfo)
//!   and [`describe_call`](function::describe_call).
//! - **Talk to a model:** the [`CompletionService`](api::CompletionService)
//!   trait, implemented by [`OpenRouterClient`] and by the in-memory
//!   [`ScriptedService`](api::ScriptedService). Retry policy lives in
//!   [`api::retry`].
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`context`] | Ledger, compaction, summarization, window fitting, token accounting |
//! | [`function`] | Function descriptors: schema, natural-language rendering, call description |
//! | [`api`] | Completion service trait, scripted service, transient-only retry |
//! | [`error`] | [`ContextError`](error::ContextError) and [`ServiceError`](error::ServiceError) |

pub mod api;
pub mod context;
pub mod error;
pub mod function;
pub mod prelude;

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

pub use error::{ContextError, ServiceError};

// ── Constants ──────────────────────────────────────────────────────

pub const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default model for conversations.
pub const DEFAULT_MODEL: &str = "openai/gpt-3.5-turbo";

// ── Request types ──────────────────────────────────────────────────

/// Chat completion request body.
#[derive(Serialize, Debug, Default)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    // Always sent: zero means deterministic, not "use the API default".
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDef>>,
}

// ── Message types ──────────────────────────────────────────────────

/// Role of a message in the conversation.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A message on the wire.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub role: MessageRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: Some(content.into()),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: Some(content.into()),
        }
    }
}

// ── Tool types ─────────────────────────────────────────────────────

/// The type of a tool definition. Currently always `Function`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum ToolType {
    #[serde(rename = "function")]
    Function,
}

/// Tool definition sent to the API (OpenAI function-calling format).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ToolDef {
    #[serde(rename = "type")]
    pub tool_type: ToolType,
    pub function: FunctionDef,
}

impl ToolDef {
    /// Create a function-calling tool definition.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            tool_type: ToolType::Function,
            function: FunctionDef {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A tool call returned by the model.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ToolCall {
    pub function: FunctionCallData,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FunctionCallData {
    pub name: String,
    pub arguments: String,
}

// ── Response types ─────────────────────────────────────────────────

/// Raw API response (internal deserialization target).
#[derive(Deserialize, Debug)]
struct RawChatResponse {
    choices: Option<Vec<RawChoice>>,
    error: Option<ApiErrorResponse>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

#[derive(Deserialize, Debug)]
struct RawChoice {
    message: RawResponseMessage,
}

#[derive(Deserialize, Debug)]
struct RawResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    message: String,
}

/// Clean return type from `OpenRouterClient::chat()`.
#[derive(Debug)]
pub struct ChatCompletion {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

/// Token usage statistics, logged and then discarded.
#[derive(Deserialize, Debug)]
struct UsageInfo {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
    total_tokens: Option<u32>,
}

// ── Client ─────────────────────────────────────────────────────────

/// Async HTTP client for the OpenRouter chat completions API.
pub struct OpenRouterClient {
    pub(crate) client: reqwest::Client,
    pub(crate) api_key: String,
    pub(crate) referer: String,
    pub(crate) title: String,
}

impl OpenRouterClient {
    /// Create a new client with the given API key and default headers.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ServiceError> {
        Self::with_headers(api_key, "https://github.com/cinch-rs", "cinch-window")
    }

    /// Create a new client with custom Referer and X-Title headers.
    pub fn with_headers(
        api_key: impl Into<String>,
        referer: impl Into<String>,
        title: impl Into<String>,
    ) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .user_agent("cinch-window/0.1")
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| ServiceError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            referer: referer.into(),
            title: title.into(),
        })
    }

    /// Send a chat completion request.
    ///
    /// Transport and HTTP status failures map to [`ServiceError::Request`];
    /// a body that does not decode maps to [`ServiceError::MalformedResponse`].
    pub async fn chat(&self, body: &ChatRequest) -> Result<ChatCompletion, ServiceError> {
        let tool_count = body.tools.as_ref().map_or(0, |t| t.len());
        debug!(
            "LLM request: model={}, messages={}, tools={}, temp={}",
            body.model,
            body.messages.len(),
            tool_count,
            body.temperature,
        );
        trace!(
            "Request payload size: {} bytes",
            serde_json::to_string(body).map_or(0, |s| s.len())
        );

        let start = Instant::now();

        let resp = self
            .client
            .post(OPENROUTER_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .json(body)
            .send()
            .await
            .map_err(|e| ServiceError::Request(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ServiceError::Request(format!("failed to read response: {e}")))?;

        debug!(
            "LLM response: HTTP {} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            text.len()
        );

        if !status.is_success() {
            return Err(ServiceError::Request(format!("HTTP {status}: {text}")));
        }

        parse_chat_response(&text)
    }
}

/// Decode a chat completion body.
fn parse_chat_response(text: &str) -> Result<ChatCompletion, ServiceError> {
    let parsed: RawChatResponse = serde_json::from_str(text)
        .map_err(|e| ServiceError::MalformedResponse(format!("failed to parse response: {e}")))?;

    if let Some(err) = parsed.error {
        return Err(ServiceError::Api(err.message));
    }

    if let Some(ref usage) = parsed.usage {
        debug!(
            "Token usage: prompt={}, completion={}, total={}",
            usage.prompt_tokens.unwrap_or(0),
            usage.completion_tokens.unwrap_or(0),
            usage.total_tokens.unwrap_or(0),
        );
    }

    match parsed.choices.and_then(|c| c.into_iter().next()) {
        Some(c) => Ok(ChatCompletion {
            content: c.message.content,
            tool_calls: c.message.tool_calls.unwrap_or_default(),
        }),
        None => Err(ServiceError::MalformedResponse(
            "response contained no choices".into(),
        )),
    }
}
