//! Context window management: the dual ledger, compaction, and fitting.
//!
//! Every conversation keeps two parallel lists. The **enhanced** list is the
//! authoritative record of each turn (content, data, policies, function
//! descriptor). The **compacted** list holds what is actually transmitted.
//! The pieces:
//!
//! 1. **[`tokens`]**: [`Tokenizer`] and the [`TokenAccountant`] that binds
//!    it to a model.
//! 2. **[`message`]**: [`EnhancedMessage`], [`CompactedMessage`], and the
//!    [`UserTurn`] input.
//! 3. **[`compaction`]**: renders an aged turn through its [`DataPolicy`]
//!    and [`FunctionPolicy`].
//! 4. **[`summarizer`]**: isolated model calls that shrink data for
//!    [`DataPolicy::Summarize`].
//! 5. **[`window`]**: picks which oldest turns to omit so a request fits
//!    `max_tokens`.
//! 6. **[`manager`]**: the [`ContextWindow`] that ties the turn loop
//!    together.

pub mod budget;
pub mod compaction;
pub mod config;
pub mod manager;
pub mod message;
pub mod policy;
pub mod summarizer;
pub mod tokens;
pub mod window;

// Re-export commonly used items at the module level.
pub use budget::{ContextUsage, DEFAULT_CHARS_PER_TOKEN};
pub use compaction::{Compactor, DATA_FRAMING};
pub use config::{ContextConfig, DEFAULT_MAX_TOKENS};
pub use manager::ContextWindow;
pub use message::{CompactedMessage, EnhancedMessage, MessageState, UserTurn};
pub use policy::{DataPolicy, FunctionPolicy};
pub use summarizer::{DEFAULT_SUMMARIZATION_SYSTEM, Summarizer};
pub use tokens::{CharRatioTokenizer, TiktokenTokenizer, TokenAccountant, Tokenizer};
pub use window::{WindowFit, fit};
