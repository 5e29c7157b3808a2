//! The completion service boundary.
//!
//! [`CompletionService`] is the one place the context window leaves the
//! process. Implementations receive the fully fitted message list and return
//! either text or a single function call.

use crate::{ChatRequest, Message, OpenRouterClient, ServiceError, ToolDef};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by [`CompletionService::complete`].
pub type CompletionFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Completion, ServiceError>> + Send + 'a>>;

/// Everything needed to execute one model call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    /// Function schemas the model may call. Empty means none.
    pub functions: Vec<ToolDef>,
    pub temperature: f32,
}

/// A function invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCall {
    pub name: String,
    /// Raw JSON arguments exactly as the service returned them.
    pub arguments: String,
}

/// Result of one model call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub content: Option<String>,
    pub function_call: Option<FunctionCall>,
}

impl Completion {
    /// A plain text completion.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            function_call: None,
        }
    }

    /// A completion that requests a function call.
    pub fn function_call(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            content: None,
            function_call: Some(FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            }),
        }
    }
}

/// Executes a model call.
///
/// Return [`ServiceError::MalformedResponse`] for payloads that could not be
/// decoded (these are retried); any other error is treated as fatal.
///
/// Uses a boxed future so that the trait is dyn-compatible (object-safe).
pub trait CompletionService: Send + Sync {
    fn complete<'a>(&'a self, request: &'a CompletionRequest) -> CompletionFuture<'a>;
}

impl CompletionService for OpenRouterClient {
    fn complete<'a>(&'a self, request: &'a CompletionRequest) -> CompletionFuture<'a> {
        Box::pin(async move {
            let body = ChatRequest {
                model: request.model.clone(),
                messages: request.messages.clone(),
                temperature: request.temperature,
                tools: if request.functions.is_empty() {
                    None
                } else {
                    Some(request.functions.clone())
                },
            };
            let completion = self.chat(&body).await?;
            let function_call = completion
                .tool_calls
                .into_iter()
                .next()
                .map(|call| FunctionCall {
                    name: call.function.name,
                    arguments: call.function.arguments,
                });
            Ok(Completion {
                content: completion.content,
                function_call,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_completion_has_no_call() {
        let c = Completion::text("hi");
        assert_eq!(c.content.as_deref(), Some("hi"));
        assert!(c.function_call.is_none());
    }

    #[test]
    fn function_call_completion_keeps_raw_arguments() {
        let c = Completion::function_call("open", r#"{"filename": "a.py"}"#);
        assert!(c.content.is_none());
        let call = c.function_call.unwrap();
        assert_eq!(call.name, "open");
        assert_eq!(call.arguments, r#"{"filename": "a.py"}"#);
    }
}
