//! Isolated summarization of data dropped from context.
//!
//! The summarizer runs its own two-message conversation: a fixed system
//! instruction and one user request carrying the data. It never sees the
//! main ledger, and successive summaries never see each other's requests.

use crate::Message;
use crate::api::retry::{RetryConfig, complete_text_with_retry};
use crate::api::service::{CompletionRequest, CompletionService};
use crate::error::ContextError;
use tracing::debug;

/// Default system instruction for the summarization conversation.
pub const DEFAULT_SUMMARIZATION_SYSTEM: &str = "\
You are summarizing data that was dropped from the context of a conversation to save space. \
Write a concise, factual summary that lets the conversation continue without the original data.

Rules:
- Only include facts present in the data. Do not infer or extrapolate.
- Preserve file paths, identifiers, numbers, and error messages verbatim.
- Be concise. Every token must earn its place.";

/// State for the summarization sub-flow.
#[derive(Debug, Clone)]
pub struct Summarizer {
    /// Seed instruction only, between calls.
    messages: Vec<Message>,
    /// Number of summaries produced.
    summary_count: usize,
}

impl Summarizer {
    /// Seed with `system`, or [`DEFAULT_SUMMARIZATION_SYSTEM`] when `None`.
    pub fn new(system: Option<&str>) -> Self {
        Self {
            messages: vec![Message::system(
                system.unwrap_or(DEFAULT_SUMMARIZATION_SYSTEM),
            )],
            summary_count: 0,
        }
    }

    /// The summarizer's own message list.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn summary_count(&self) -> usize {
        self.summary_count
    }

    /// Build the user request for a block of data.
    pub fn build_request(data: &str) -> String {
        format!("Summarize the following data:\n\n{data}")
    }

    /// Summarize `data` with one model call.
    ///
    /// The request turn is removed again whether the call succeeds or fails.
    pub async fn summarize(
        &mut self,
        service: &dyn CompletionService,
        model: &str,
        retry: &RetryConfig,
        data: &str,
    ) -> Result<String, ContextError> {
        self.messages.push(Message::user(Self::build_request(data)));
        let request = CompletionRequest {
            model: model.to_string(),
            messages: self.messages.clone(),
            functions: Vec::new(),
            temperature: 0.0,
        };

        let outcome = complete_text_with_retry(service, &request, retry).await;
        self.messages.truncate(1);

        let summary = outcome?;
        self.summary_count += 1;
        debug!(
            "Summarized {} bytes of data into {} bytes",
            data.len(),
            summary.len()
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MessageRole;
    use crate::api::{Completion, ScriptedService};
    use crate::error::ServiceError;
    use std::time::Duration;

    fn no_retry() -> RetryConfig {
        RetryConfig::with_retries(0).with_wait_time(Duration::ZERO)
    }

    #[test]
    fn seeded_with_default_instruction() {
        let summarizer = Summarizer::new(None);
        assert_eq!(summarizer.messages().len(), 1);
        assert_eq!(summarizer.messages()[0].role, MessageRole::System);
        assert!(
            summarizer.messages()[0]
                .content
                .as_deref()
                .unwrap()
                .contains("dropped from the context")
        );
    }

    #[test]
    fn custom_instruction_overrides_default() {
        let summarizer = Summarizer::new(Some("Summarize tersely."));
        assert_eq!(
            summarizer.messages()[0].content.as_deref(),
            Some("Summarize tersely.")
        );
    }

    #[tokio::test]
    async fn summarize_returns_text_and_restores_list() {
        let service = ScriptedService::new().with_reply(Completion::text("short"));
        let mut summarizer = Summarizer::new(None);

        let summary = summarizer
            .summarize(&service, "m", &no_retry(), "long data")
            .await
            .unwrap();

        assert_eq!(summary, "short");
        assert_eq!(summarizer.messages().len(), 1);
        assert_eq!(summarizer.summary_count(), 1);

        let sent = &service.requests()[0].messages;
        assert_eq!(sent.len(), 2);
        assert!(sent[1].content.as_deref().unwrap().contains("long data"));
    }

    #[tokio::test]
    async fn successive_calls_do_not_see_each_other() {
        let service = ScriptedService::new()
            .with_reply(Completion::text("one"))
            .with_reply(Completion::text("two"));
        let mut summarizer = Summarizer::new(None);

        summarizer
            .summarize(&service, "m", &no_retry(), "first block")
            .await
            .unwrap();
        summarizer
            .summarize(&service, "m", &no_retry(), "second block")
            .await
            .unwrap();

        let second = &service.requests()[1].messages;
        assert_eq!(second.len(), 2);
        assert!(
            second
                .iter()
                .all(|m| !m.content.as_deref().unwrap_or("").contains("first block"))
        );
    }

    #[tokio::test]
    async fn failure_still_restores_list() {
        let service = ScriptedService::new().with_error(ServiceError::Api("down".into()));
        let mut summarizer = Summarizer::new(None);

        let result = summarizer
            .summarize(&service, "m", &no_retry(), "data")
            .await;

        assert!(result.is_err());
        assert_eq!(summarizer.messages().len(), 1);
        assert_eq!(summarizer.summary_count(), 0);
    }

    #[tokio::test]
    async fn function_call_reply_is_not_a_summary() {
        let service = ScriptedService::new()
            .with_reply(Completion::function_call("open", "{}"))
            .with_reply(Completion::text("the real summary"));
        let mut summarizer = Summarizer::new(None);

        let retry = RetryConfig::with_retries(1).with_wait_time(Duration::ZERO);
        let summary = summarizer
            .summarize(&service, "m", &retry, "data")
            .await
            .unwrap();
        assert_eq!(summary, "the real summary");
        assert_eq!(service.request_count(), 2);

        let service = ScriptedService::new().with_reply(Completion::function_call("open", "{}"));
        let err = summarizer
            .summarize(&service, "m", &no_retry(), "data")
            .await
            .unwrap_err();
        assert!(matches!(err, ContextError::ServiceUnavailable { attempts: 1, .. }));
        assert_eq!(summarizer.messages().len(), 1);
        assert_eq!(summarizer.summary_count(), 1);
    }
}
