//! Ledger records: the enhanced (authoritative) and compacted (transmitted)
//! views of a turn, plus the [`UserTurn`] input type.

use crate::context::policy::{DataPolicy, FunctionPolicy};
use crate::context::tokens::TokenAccountant;
use crate::function::FunctionInfo;
use crate::{Message, MessageRole};

/// Lifecycle of an [`EnhancedMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageState {
    /// Newest user turn. Sent at full fidelity unless that cannot fit.
    Pending,
    /// Aged user turn, rendered through its policies. Terminal.
    Compacted,
    /// Overview or assistant response. Never compacted.
    Final,
}

/// A new user turn, as handed to
/// [`ContextWindow::add_message`](crate::context::ContextWindow::add_message).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserTurn {
    pub content: String,
    pub data: Option<String>,
    /// `None` uses the window's default data policy.
    pub data_policy: Option<DataPolicy>,
    pub function_info: Option<FunctionInfo>,
    pub function_policy: FunctionPolicy,
}

impl UserTurn {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            data: None,
            data_policy: None,
            function_info: None,
            function_policy: FunctionPolicy::default(),
        }
    }

    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn with_data_policy(mut self, policy: DataPolicy) -> Self {
        self.data_policy = Some(policy);
        self
    }

    pub fn with_function(mut self, info: FunctionInfo) -> Self {
        self.function_info = Some(info);
        self
    }

    pub fn with_function_policy(mut self, policy: FunctionPolicy) -> Self {
        self.function_policy = policy;
        self
    }
}

impl From<&str> for UserTurn {
    fn from(content: &str) -> Self {
        Self::new(content)
    }
}

impl From<String> for UserTurn {
    fn from(content: String) -> Self {
        Self::new(content)
    }
}

/// The full-fidelity record of one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnhancedMessage {
    role: MessageRole,
    user_content: String,
    data: Option<String>,
    data_policy: DataPolicy,
    function_info: Option<FunctionInfo>,
    function_policy: FunctionPolicy,
    token_count: usize,
    state: MessageState,
    /// Pending turn sent in its compacted form because the raw form was over budget.
    sent_compacted: bool,
}

impl EnhancedMessage {
    pub(crate) fn overview(text: impl Into<String>, token_count: usize) -> Self {
        Self::finalized(MessageRole::System, text.into(), token_count)
    }

    pub(crate) fn response(text: impl Into<String>, token_count: usize) -> Self {
        Self::finalized(MessageRole::Assistant, text.into(), token_count)
    }

    fn finalized(role: MessageRole, user_content: String, token_count: usize) -> Self {
        Self {
            role,
            user_content,
            data: None,
            data_policy: DataPolicy::Pure,
            function_info: None,
            function_policy: FunctionPolicy::Ignore,
            token_count,
            state: MessageState::Final,
            sent_compacted: false,
        }
    }

    /// A new user turn with its policy already resolved.
    pub(crate) fn pending(turn: UserTurn, data_policy: DataPolicy) -> Self {
        Self {
            role: MessageRole::User,
            user_content: turn.content,
            data: turn.data,
            data_policy,
            function_info: turn.function_info,
            function_policy: turn.function_policy,
            token_count: 0,
            state: MessageState::Pending,
            sent_compacted: false,
        }
    }

    /// Pending → Compacted. Only the token count changes.
    pub(crate) fn mark_compacted(&mut self, token_count: usize) {
        debug_assert_eq!(self.state, MessageState::Pending);
        self.state = MessageState::Compacted;
        self.token_count = token_count;
    }

    pub(crate) fn mark_sent_compacted(&mut self) {
        debug_assert_eq!(self.state, MessageState::Pending);
        self.sent_compacted = true;
    }

    pub(crate) fn set_token_count(&mut self, token_count: usize) {
        self.token_count = token_count;
    }

    pub(crate) fn set_data_policy(&mut self, policy: DataPolicy) {
        self.data_policy = policy;
    }

    pub(crate) fn set_function_info(&mut self, info: FunctionInfo) {
        self.function_info = Some(info);
    }

    pub fn role(&self) -> MessageRole {
        self.role
    }

    pub fn user_content(&self) -> &str {
        &self.user_content
    }

    pub fn data(&self) -> Option<&str> {
        self.data.as_deref()
    }

    pub fn data_policy(&self) -> DataPolicy {
        self.data_policy
    }

    pub fn function_info(&self) -> Option<&FunctionInfo> {
        self.function_info.as_ref()
    }

    pub fn function_policy(&self) -> FunctionPolicy {
        self.function_policy
    }

    pub fn token_count(&self) -> usize {
        self.token_count
    }

    pub fn state(&self) -> MessageState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        self.state == MessageState::Pending
    }

    /// Whether the ledger already holds this turn's compacted form.
    pub fn is_sent_compacted(&self) -> bool {
        self.sent_compacted
    }

    /// Whether this is a user turn that `edit_message` may change.
    pub fn is_editable(&self) -> bool {
        self.role == MessageRole::User && self.state != MessageState::Final
    }
}

/// The rendered form of a turn. The only thing ever sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactedMessage {
    pub role: MessageRole,
    pub content: String,
    pub token_count: usize,
}

impl CompactedMessage {
    /// Render `content` and count its tokens.
    pub fn new(role: MessageRole, content: impl Into<String>, accountant: &TokenAccountant<'_>) -> Self {
        let content = content.into();
        let token_count = accountant.count(&content);
        Self {
            role,
            content,
            token_count,
        }
    }

    pub fn to_message(&self) -> Message {
        Message {
            role: self.role,
            content: Some(self.content.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tokens::CharRatioTokenizer;

    #[test]
    fn user_turn_builder_sets_fields() {
        let turn = UserTurn::new("Fix this bug")
            .with_data("trace")
            .with_data_policy(DataPolicy::Summarize)
            .with_function_policy(FunctionPolicy::Ignore);
        assert_eq!(turn.content, "Fix this bug");
        assert_eq!(turn.data.as_deref(), Some("trace"));
        assert_eq!(turn.data_policy, Some(DataPolicy::Summarize));
        assert_eq!(turn.function_policy, FunctionPolicy::Ignore);
    }

    #[test]
    fn plain_strings_become_turns() {
        let turn: UserTurn = "hello".into();
        assert_eq!(turn.content, "hello");
        assert!(turn.data_policy.is_none());
        assert_eq!(turn.function_policy, FunctionPolicy::Include);
    }

    #[test]
    fn pending_turn_compacts_once() {
        let mut msg = EnhancedMessage::pending(UserTurn::new("hi"), DataPolicy::Remove);
        msg.set_token_count(12);
        assert!(msg.is_pending());
        assert!(msg.is_editable());
        msg.mark_compacted(2);
        assert_eq!(msg.state(), MessageState::Compacted);
        assert_eq!(msg.token_count(), 2);
        assert!(msg.is_editable());
        assert!(!msg.is_sent_compacted());
    }

    #[test]
    fn oversized_pending_turn_keeps_its_state() {
        let mut msg = EnhancedMessage::pending(UserTurn::new("hi"), DataPolicy::Summarize);
        msg.mark_sent_compacted();
        assert!(msg.is_pending());
        assert!(msg.is_sent_compacted());
        assert!(msg.is_editable());
    }

    #[test]
    fn overview_and_responses_are_final() {
        let overview = EnhancedMessage::overview("sys", 3);
        let response = EnhancedMessage::response("ok", 2);
        assert_eq!(overview.state(), MessageState::Final);
        assert_eq!(overview.role(), MessageRole::System);
        assert_eq!(response.role(), MessageRole::Assistant);
        assert!(!overview.is_editable());
        assert!(!response.is_editable());
    }

    #[test]
    fn compacted_message_counts_its_content() {
        let tokenizer = CharRatioTokenizer::new(1.0);
        let accountant = TokenAccountant::new(&tokenizer, "m");
        let msg = CompactedMessage::new(MessageRole::User, "abcdef", &accountant);
        assert_eq!(msg.token_count, 6);
        assert_eq!(msg.to_message(), Message::user("abcdef"));
    }
}
