//! The [`ContextWindow`]: one conversation's dual ledger and its turn loop.
//!
//! Each [`add_message`](ContextWindow::add_message) runs one turn through
//! four states, logged at `debug`:
//!
//! 1. **AWAITING_COMPACTION**: the previous pending turn is compacted
//!    (possibly summarizing its data) and the new turn is rendered at full
//!    fidelity. A new turn whose raw form cannot fit beside the overview is
//!    rendered through its data policy instead, and keeps that form.
//! 2. **FITTING**: the staged ledger is fitted into `max_tokens`.
//! 3. **CALLING**: the fitted window goes to the completion service.
//! 4. **RECORDED**: the response is appended and the staged state committed.
//!
//! Nothing is committed before RECORDED. An error at any earlier point
//! leaves the ledger, its counters, and the summarizer as they were.

use crate::api::retry::{Reply, complete_with_retry};
use crate::api::service::{CompletionRequest, CompletionService};
use crate::context::budget::ContextUsage;
use crate::context::compaction::Compactor;
use crate::context::config::ContextConfig;
use crate::context::message::{CompactedMessage, EnhancedMessage, UserTurn};
use crate::context::policy::DataPolicy;
use crate::context::summarizer::Summarizer;
use crate::context::tokens::{TokenAccountant, Tokenizer};
use crate::context::window::fit;
use crate::error::{ContextError, Result};
use crate::function::{FunctionInfo, describe_arguments};
use crate::{MessageRole, ToolDef};
use tracing::{debug, info};

/// Token-budgeted conversation with per-turn compaction.
///
/// `enhanced` and `compacted` are index-aligned; index 0 of both is the
/// overview.
pub struct ContextWindow<'a> {
    config: ContextConfig,
    service: &'a dyn CompletionService,
    tokenizer: &'a dyn Tokenizer,
    enhanced: Vec<EnhancedMessage>,
    compacted: Vec<CompactedMessage>,
    /// Sum of `compacted[..].token_count`.
    total_tokens: usize,
    /// Window tokens sent across all main requests.
    tokens_sent: usize,
    summarizer: Summarizer,
}

impl<'a> ContextWindow<'a> {
    /// Validate `config` and seed the ledger with the overview.
    pub fn new(
        config: ContextConfig,
        service: &'a dyn CompletionService,
        tokenizer: &'a dyn Tokenizer,
    ) -> Result<Self> {
        config.validate()?;

        let accountant = TokenAccountant::new(tokenizer, &config.model);
        let overview = CompactedMessage::new(
            MessageRole::System,
            config.high_level_overview.clone(),
            &accountant,
        );
        if overview.token_count > config.max_tokens {
            return Err(ContextError::BudgetInfeasible {
                overview_tokens: overview.token_count,
                newest_tokens: 0,
                max_tokens: config.max_tokens,
            });
        }

        let total_tokens = overview.token_count;
        let summarizer = Summarizer::new(config.summarization_system.as_deref());
        info!(
            "Context window opened: model={}, max_tokens={}, overview={} tokens",
            config.model, config.max_tokens, total_tokens
        );

        Ok(Self {
            enhanced: vec![EnhancedMessage::overview(
                &config.high_level_overview,
                overview.token_count,
            )],
            compacted: vec![overview],
            total_tokens,
            tokens_sent: 0,
            summarizer,
            config,
            service,
            tokenizer,
        })
    }

    /// Run one turn and return the recorded response text.
    ///
    /// A returned function call is recorded (and returned) as its
    /// [`describe_arguments`] text.
    pub async fn add_message(&mut self, turn: impl Into<UserTurn>) -> Result<String> {
        let turn = turn.into();
        let data_policy = turn.data_policy.unwrap_or(self.config.default_data_policy);
        let functions: Vec<ToolDef> = turn
            .function_info
            .iter()
            .map(FunctionInfo::to_tool_def)
            .collect();

        let compactor = compactor(self.service, self.tokenizer, &self.config);
        let mut summarizer = self.summarizer.clone();
        let mut pending = EnhancedMessage::pending(turn, data_policy);
        let mut rendered = compactor.render_pending(&pending);
        pending.set_token_count(rendered.token_count);

        let overview_tokens = self.compacted.first().map_or(0, |m| m.token_count);
        let max_tokens = self.config.max_tokens;
        if overview_tokens + rendered.token_count > max_tokens
            && data_policy != DataPolicy::Pure
            && pending.data().is_some()
        {
            debug!(
                "New turn is {} tokens raw, over budget; applying {} policy now",
                rendered.token_count, data_policy
            );
            rendered = compactor.compact(&pending, &mut summarizer).await?;
            pending.mark_sent_compacted();
        }
        if overview_tokens + rendered.token_count > max_tokens {
            return Err(ContextError::BudgetInfeasible {
                overview_tokens,
                newest_tokens: rendered.token_count,
                max_tokens,
            });
        }
        pending.set_token_count(rendered.token_count);

        // ── AWAITING_COMPACTION ──
        debug!(
            "AWAITING_COMPACTION: new turn {} tokens ({} policy)",
            rendered.token_count, data_policy
        );
        let mut staged = self.compacted.clone();
        let mut staged_total = self.total_tokens;
        let mut aged = None;
        if let Some(index) = self.enhanced.iter().rposition(EnhancedMessage::is_pending) {
            let previous = &self.enhanced[index];
            if previous.is_sent_compacted() {
                // Ledger already holds the compacted form.
                aged = Some((index, staged[index].token_count));
            } else {
                let replacement = compactor.compact(previous, &mut summarizer).await?;
                staged_total = staged_total - staged[index].token_count + replacement.token_count;
                aged = Some((index, replacement.token_count));
                staged[index] = replacement;
            }
        }
        staged_total += rendered.token_count;
        staged.push(rendered);

        // ── FITTING ──
        let counts: Vec<usize> = staged.iter().map(|m| m.token_count).collect();
        let window = fit(&counts, staged_total, self.config.max_tokens)?;
        debug!(
            "FITTING: {} staged tokens, sending {} from index {}",
            staged_total, window.window_tokens, window.start
        );

        // ── CALLING ──
        let request = CompletionRequest {
            model: self.config.model.clone(),
            messages: window
                .indices(staged.len())
                .map(|i| staged[i].to_message())
                .collect(),
            functions,
            temperature: self.config.temperature,
        };
        debug!(
            "CALLING: {} messages, {} function(s)",
            request.messages.len(),
            request.functions.len()
        );
        let reply = complete_with_retry(self.service, &request, &self.config.retry).await?;
        let text = match reply {
            Reply::Text(text) => text,
            Reply::FunctionCall { name, arguments } => describe_arguments(&name, &arguments),
        };

        // ── RECORDED ──
        let response =
            CompactedMessage::new(MessageRole::Assistant, text.clone(), &compactor.accountant);
        if let Some((index, tokens)) = aged {
            self.enhanced[index].mark_compacted(tokens);
        }
        self.enhanced.push(pending);
        self.enhanced
            .push(EnhancedMessage::response(text.clone(), response.token_count));
        staged_total += response.token_count;
        staged.push(response);

        self.compacted = staged;
        self.total_tokens = staged_total;
        self.tokens_sent += window.window_tokens;
        self.summarizer = summarizer;

        debug!("RECORDED: {}", self.usage().to_log_string());
        Ok(text)
    }

    /// Change a user turn's data policy and/or function descriptor.
    ///
    /// A pending turn sent at full fidelity is updated in place (its
    /// outbound form does not depend on either). Any other user turn is
    /// re-compacted and the token delta applied.
    pub async fn edit_message(
        &mut self,
        index: usize,
        data_policy: Option<DataPolicy>,
        function_info: Option<FunctionInfo>,
    ) -> Result<()> {
        let len = self.enhanced.len();
        let Some(current) = self.enhanced.get(index) else {
            return Err(ContextError::IndexOutOfRange { index, len });
        };
        if !current.is_editable() {
            return Err(ContextError::NotEditable { index });
        }

        let mut edited = current.clone();
        if let Some(policy) = data_policy {
            edited.set_data_policy(policy);
        }
        if let Some(info) = function_info {
            edited.set_function_info(info);
        }

        if edited.is_pending() && !edited.is_sent_compacted() {
            debug!("Edited pending turn {index}");
            self.enhanced[index] = edited;
            return Ok(());
        }

        let compactor = compactor(self.service, self.tokenizer, &self.config);
        let mut summarizer = self.summarizer.clone();
        let replacement = compactor.compact(&edited, &mut summarizer).await?;

        let previous = self.compacted[index].token_count;
        edited.set_token_count(replacement.token_count);
        self.total_tokens = self.total_tokens - previous + replacement.token_count;
        debug!(
            "Re-compacted turn {index}: {previous} -> {} tokens",
            replacement.token_count
        );
        self.enhanced[index] = edited;
        self.compacted[index] = replacement;
        self.summarizer = summarizer;
        Ok(())
    }

    /// Dump the compacted ledger, one `[role] content` block per message.
    pub fn visualize(&self) -> String {
        self.compacted
            .iter()
            .map(|m| format!("[{}] {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn total_tokens(&self) -> usize {
        self.total_tokens
    }

    pub fn tokens_sent(&self) -> usize {
        self.tokens_sent
    }

    pub fn enhanced_messages(&self) -> &[EnhancedMessage] {
        &self.enhanced
    }

    pub fn compacted_messages(&self) -> &[CompactedMessage] {
        &self.compacted
    }

    /// Re-sum the compacted token counts. Equals `total_tokens()`.
    pub fn recount_tokens(&self) -> usize {
        self.compacted.iter().map(|m| m.token_count).sum()
    }

    pub fn pending_count(&self) -> usize {
        self.enhanced.iter().filter(|m| m.is_pending()).count()
    }

    /// Summaries produced so far.
    pub fn summary_count(&self) -> usize {
        self.summarizer.summary_count()
    }

    pub fn usage(&self) -> ContextUsage {
        ContextUsage::new(self.total_tokens, self.config.max_tokens)
    }
}

fn compactor<'b>(
    service: &'b dyn CompletionService,
    tokenizer: &'b dyn Tokenizer,
    config: &'b ContextConfig,
) -> Compactor<'b> {
    Compactor {
        service,
        accountant: TokenAccountant::new(tokenizer, &config.model),
        retry: &config.retry,
    }
}
