//! Turn compaction: rich ledger record → minimal transmitted text.
//!
//! A user turn is sent twice in two different shapes. While it is the newest
//! turn it goes out at full fidelity ([`Compactor::render_pending`]). Once a
//! newer turn arrives it is rendered through its policies
//! ([`Compactor::compact`]) and stays that way. A newest turn too large to
//! send raw gets its compacted form straight away.
//!
//! | Data policy | Appended after the user content |
//! |-------------|---------------------------------|
//! | `Pure` | the raw data under [`DATA_FRAMING`] |
//! | `Remove` | nothing |
//! | `Summarize` | the summarizer's output under [`DATA_FRAMING`] |
//!
//! With `FunctionPolicy::Include` and a function descriptor present, the
//! descriptor's [`render()`](crate::function::FunctionInfo::render) clause
//! follows. The token count is always that of the final string.

use crate::MessageRole;
use crate::api::retry::RetryConfig;
use crate::api::service::CompletionService;
use crate::context::message::{CompactedMessage, EnhancedMessage};
use crate::context::policy::{DataPolicy, FunctionPolicy};
use crate::context::summarizer::Summarizer;
use crate::context::tokens::TokenAccountant;
use crate::error::ContextError;
use tracing::debug;

/// Sentence introducing a turn's associated data.
pub const DATA_FRAMING: &str = "\n\nThe following data was associated with this message:\n";

/// Renders user turns. Holds no state of its own.
pub struct Compactor<'a> {
    pub service: &'a dyn CompletionService,
    pub accountant: TokenAccountant<'a>,
    pub retry: &'a RetryConfig,
}

impl Compactor<'_> {
    /// Full-fidelity form of a turn: content plus raw data, whatever the policy.
    pub fn render_pending(&self, message: &EnhancedMessage) -> CompactedMessage {
        let mut content = message.user_content().to_string();
        if let Some(data) = non_empty_data(message) {
            content.push_str(DATA_FRAMING);
            content.push_str(data);
        }
        CompactedMessage::new(MessageRole::User, content, &self.accountant)
    }

    /// Policy-driven form of a turn. Calls the summarizer for `Summarize`.
    pub async fn compact(
        &self,
        message: &EnhancedMessage,
        summarizer: &mut Summarizer,
    ) -> Result<CompactedMessage, ContextError> {
        let mut content = message.user_content().to_string();

        if let Some(data) = non_empty_data(message) {
            match message.data_policy() {
                DataPolicy::Pure => {
                    content.push_str(DATA_FRAMING);
                    content.push_str(data);
                }
                DataPolicy::Remove => {}
                DataPolicy::Summarize => {
                    let summary = summarizer
                        .summarize(
                            self.service,
                            self.accountant.model(),
                            self.retry,
                            data,
                        )
                        .await?;
                    content.push_str(DATA_FRAMING);
                    content.push_str(&summary);
                }
            }
        }

        if message.function_policy() == FunctionPolicy::Include
            && let Some(info) = message.function_info()
        {
            content.push_str("\n\n");
            content.push_str(&info.render());
        }

        let compacted = CompactedMessage::new(MessageRole::User, content, &self.accountant);
        debug!(
            "Compacted turn ({} policy): {} -> {} tokens",
            message.data_policy(),
            message.token_count(),
            compacted.token_count
        );
        Ok(compacted)
    }
}

fn non_empty_data(message: &EnhancedMessage) -> Option<&str> {
    message.data().filter(|d| !d.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Completion, ScriptedService};
    use crate::context::message::UserTurn;
    use crate::context::tokens::CharRatioTokenizer;
    use crate::function::FunctionInfo;
    use std::time::Duration;

    const TRACE: &str = "Traceback (most recent call last):\n  File \"a.py\", line 3\nKeyError: 'x'";

    struct Fixture {
        service: ScriptedService,
        tokenizer: CharRatioTokenizer,
        retry: RetryConfig,
    }

    impl Fixture {
        fn new(service: ScriptedService) -> Self {
            Self {
                service,
                tokenizer: CharRatioTokenizer::new(1.0),
                retry: RetryConfig::with_retries(0).with_wait_time(Duration::ZERO),
            }
        }

        fn compactor(&self) -> Compactor<'_> {
            Compactor {
                service: &self.service,
                accountant: TokenAccountant::new(&self.tokenizer, "m"),
                retry: &self.retry,
            }
        }
    }

    fn turn(policy: DataPolicy) -> EnhancedMessage {
        EnhancedMessage::pending(UserTurn::new("Fix this bug").with_data(TRACE), policy)
    }

    #[tokio::test]
    async fn pure_keeps_data_verbatim() {
        let fx = Fixture::new(ScriptedService::new());
        let mut summarizer = Summarizer::new(None);
        let out = fx
            .compactor()
            .compact(&turn(DataPolicy::Pure), &mut summarizer)
            .await
            .unwrap();
        assert_eq!(out.content, format!("Fix this bug{DATA_FRAMING}{TRACE}"));
        assert_eq!(out.token_count, out.content.chars().count());
        assert_eq!(fx.service.request_count(), 0);
    }

    #[tokio::test]
    async fn remove_drops_data() {
        let fx = Fixture::new(ScriptedService::new());
        let mut summarizer = Summarizer::new(None);
        let out = fx
            .compactor()
            .compact(&turn(DataPolicy::Remove), &mut summarizer)
            .await
            .unwrap();
        assert_eq!(out.content, "Fix this bug");
        assert_eq!(out.token_count, 12);
        assert_eq!(fx.service.request_count(), 0);
    }

    #[tokio::test]
    async fn summarize_uses_only_summary() {
        let fx = Fixture::new(ScriptedService::new().with_reply(Completion::text("KeyError in a.py")));
        let mut summarizer = Summarizer::new(None);
        let out = fx
            .compactor()
            .compact(&turn(DataPolicy::Summarize), &mut summarizer)
            .await
            .unwrap();
        assert_eq!(out.content, format!("Fix this bug{DATA_FRAMING}KeyError in a.py"));
        assert!(!out.content.contains("Traceback"));
        assert_eq!(fx.service.request_count(), 1);
    }

    #[tokio::test]
    async fn missing_data_never_summarizes() {
        let fx = Fixture::new(ScriptedService::new());
        let mut summarizer = Summarizer::new(None);
        let msg = EnhancedMessage::pending(UserTurn::new("hello"), DataPolicy::Summarize);
        let out = fx.compactor().compact(&msg, &mut summarizer).await.unwrap();
        assert_eq!(out.content, "hello");
        assert_eq!(fx.service.request_count(), 0);
    }

    #[tokio::test]
    async fn function_clause_follows_policy() {
        let fx = Fixture::new(ScriptedService::new());
        let mut summarizer = Summarizer::new(None);
        let info = FunctionInfo::build("x", "", [("filename", "string", "the file", true)]).unwrap();

        let included = EnhancedMessage::pending(
            UserTurn::new("open it").with_function(info.clone()),
            DataPolicy::Pure,
        );
        let ignored = EnhancedMessage::pending(
            UserTurn::new("open it")
                .with_function(info.clone())
                .with_function_policy(FunctionPolicy::Ignore),
            DataPolicy::Pure,
        );

        let a = fx.compactor().compact(&included, &mut summarizer).await.unwrap();
        let b = fx.compactor().compact(&ignored, &mut summarizer).await.unwrap();
        assert_eq!(a.content, format!("open it\n\n{}", info.render()));
        assert_eq!(b.content, "open it");
    }

    #[test]
    fn pending_render_ignores_policy() {
        let fx = Fixture::new(ScriptedService::new());
        let out = fx.compactor().render_pending(&turn(DataPolicy::Remove));
        assert!(out.content.contains(TRACE));
        assert_eq!(out.role, MessageRole::User);
    }
}
