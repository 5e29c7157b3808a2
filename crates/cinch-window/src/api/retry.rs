//! Fixed-delay retry for transient completion failures.
//!
//! Only [`ServiceError::MalformedResponse`] is retried, including a function
//! call whose arguments are not a JSON object. Transport errors, HTTP status
//! errors, and explicit API errors propagate on the first occurrence.

use crate::api::service::{Completion, CompletionRequest, CompletionService};
use crate::error::{ContextError, ServiceError};
use crate::function::parse_arguments;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{info, warn};

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt (0 = fail immediately).
    pub max_retries: u32,
    /// Delay between attempts.
    pub wait_time: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            wait_time: Duration::from_secs(1),
        }
    }
}

impl RetryConfig {
    /// Create a config with the given number of retries and the default wait.
    pub fn with_retries(retries: u32) -> Self {
        Self {
            max_retries: retries,
            ..Default::default()
        }
    }

    /// Set the delay between attempts.
    pub fn with_wait_time(mut self, wait_time: Duration) -> Self {
        self.wait_time = wait_time;
        self
    }

    /// Total number of attempts, the first one included.
    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// A decoded completion.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    FunctionCall {
        name: String,
        arguments: Map<String, Value>,
    },
}

/// Call the service, retrying transient failures per `retry`.
///
/// Exhausting the attempts yields [`ContextError::ServiceUnavailable`];
/// a non-transient error is returned as [`ContextError::Service`] at once.
pub async fn complete_with_retry(
    service: &dyn CompletionService,
    request: &CompletionRequest,
    retry: &RetryConfig,
) -> Result<Reply, ContextError> {
    retry_decoded(service, request, retry, decode_completion).await
}

/// Like [`complete_with_retry`], for calls that must answer in text.
///
/// A function call in place of text is malformed and retried like any
/// other undecodable payload.
pub async fn complete_text_with_retry(
    service: &dyn CompletionService,
    request: &CompletionRequest,
    retry: &RetryConfig,
) -> Result<String, ContextError> {
    retry_decoded(service, request, retry, decode_text).await
}

async fn retry_decoded<T>(
    service: &dyn CompletionService,
    request: &CompletionRequest,
    retry: &RetryConfig,
    decode: fn(Completion) -> Result<T, ServiceError>,
) -> Result<T, ContextError> {
    let attempts = retry.attempts();
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        let outcome = service.complete(request).await.and_then(decode);
        match outcome {
            Ok(reply) => {
                if attempt > 1 {
                    info!("Completion succeeded on attempt {attempt}/{attempts}");
                }
                return Ok(reply);
            }
            Err(e) if e.is_transient() => {
                warn!("Transient completion failure (attempt {attempt}/{attempts}): {e}");
                last_error = e.to_string();
                if attempt < attempts {
                    tokio::time::sleep(retry.wait_time).await;
                }
            }
            Err(e) => return Err(ContextError::Service(e)),
        }
    }

    Err(ContextError::ServiceUnavailable {
        attempts,
        last_error,
    })
}

fn decode_completion(completion: Completion) -> Result<Reply, ServiceError> {
    match completion.function_call {
        Some(call) => Ok(Reply::FunctionCall {
            arguments: parse_arguments(&call.arguments)?,
            name: call.name,
        }),
        None => Ok(Reply::Text(completion.content.unwrap_or_default())),
    }
}

fn decode_text(completion: Completion) -> Result<String, ServiceError> {
    match completion.function_call {
        Some(call) => Err(ServiceError::MalformedResponse(format!(
            "expected text, got a call to function '{}'",
            call.name
        ))),
        None => Ok(completion.content.unwrap_or_default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Message;
    use crate::api::ScriptedService;

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "test-model".into(),
            messages: vec![Message::user("hi")],
            functions: vec![],
            temperature: 0.0,
        }
    }

    fn fast(retries: u32) -> RetryConfig {
        RetryConfig::with_retries(retries).with_wait_time(Duration::ZERO)
    }

    #[test]
    fn default_config_retries_once() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.attempts(), 2);
        assert_eq!(config.wait_time, Duration::from_secs(1));
    }

    #[test]
    fn zero_retries_is_one_attempt() {
        assert_eq!(RetryConfig::with_retries(0).attempts(), 1);
    }

    #[tokio::test]
    async fn malformed_then_success() {
        let service = ScriptedService::new()
            .with_error(ServiceError::MalformedResponse("truncated".into()))
            .with_reply(Completion::text("done"));

        let reply = complete_with_retry(&service, &request(), &fast(2)).await.unwrap();
        assert_eq!(reply, Reply::Text("done".into()));
        assert_eq!(service.request_count(), 2);
    }

    #[tokio::test]
    async fn bad_function_arguments_are_retried() {
        let service = ScriptedService::new()
            .with_reply(Completion::function_call("open", "{not json"))
            .with_reply(Completion::function_call("open", r#"{"filename": "a.py"}"#));

        let reply = complete_with_retry(&service, &request(), &fast(1)).await.unwrap();
        match reply {
            Reply::FunctionCall { name, arguments } => {
                assert_eq!(name, "open");
                assert_eq!(arguments["filename"], "a.py");
            }
            other => panic!("expected function call, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn exhausted_retries_escalate() {
        let service = ScriptedService::new()
            .with_error(ServiceError::MalformedResponse("one".into()))
            .with_error(ServiceError::MalformedResponse("two".into()))
            .with_error(ServiceError::MalformedResponse("three".into()));

        let err = complete_with_retry(&service, &request(), &fast(2))
            .await
            .unwrap_err();
        match err {
            ContextError::ServiceUnavailable {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("three"));
            }
            other => panic!("expected ServiceUnavailable, got {other:?}"),
        }
        assert_eq!(service.request_count(), 3);
    }

    #[tokio::test]
    async fn non_transient_not_retried() {
        let service = ScriptedService::new()
            .with_error(ServiceError::Request("HTTP 401".into()))
            .with_reply(Completion::text("never reached"));

        let err = complete_with_retry(&service, &request(), &fast(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ContextError::Service(ServiceError::Request(_))));
        assert_eq!(service.request_count(), 1);
    }

    #[tokio::test]
    async fn missing_content_is_empty_text() {
        let service = ScriptedService::new().with_reply(Completion::default());
        let reply = complete_with_retry(&service, &request(), &fast(0)).await.unwrap();
        assert_eq!(reply, Reply::Text(String::new()));
    }

    #[tokio::test]
    async fn text_call_retries_function_call_replies() {
        let service = ScriptedService::new()
            .with_reply(Completion::function_call("open", r#"{"filename": "a.py"}"#))
            .with_reply(Completion::text("a summary"));

        let text = complete_text_with_retry(&service, &request(), &fast(1))
            .await
            .unwrap();
        assert_eq!(text, "a summary");
        assert_eq!(service.request_count(), 2);
    }

    #[tokio::test]
    async fn text_call_gives_up_on_persistent_function_calls() {
        let service = ScriptedService::new()
            .with_reply(Completion::function_call("open", "{}"))
            .with_reply(Completion::function_call("open", "{}"));

        let err = complete_text_with_retry(&service, &request(), &fast(1))
            .await
            .unwrap_err();
        match err {
            ContextError::ServiceUnavailable { attempts, last_error } => {
                assert_eq!(attempts, 2);
                assert!(last_error.contains("open"));
            }
            other => panic!("expected ServiceUnavailable, got {other:?}"),
        }
    }
}
