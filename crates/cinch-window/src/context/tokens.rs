//! Token accounting.
//!
//! A [`Tokenizer`] turns text into a token count for a given model. The
//! [`TokenAccountant`] binds one tokenizer to one model so the rest of the
//! crate can simply ask "how many tokens is this?".

use crate::context::budget::DEFAULT_CHARS_PER_TOKEN;
use crate::error::ContextError;
use std::fmt;
use tiktoken_rs::CoreBPE;
use tracing::debug;

/// Counts tokens. Must be pure and deterministic per model identifier.
pub trait Tokenizer: Send + Sync {
    fn count(&self, model: &str, text: &str) -> usize;
}

/// A tokenizer bound to a model.
#[derive(Clone, Copy)]
pub struct TokenAccountant<'a> {
    tokenizer: &'a dyn Tokenizer,
    model: &'a str,
}

impl<'a> TokenAccountant<'a> {
    pub fn new(tokenizer: &'a dyn Tokenizer, model: &'a str) -> Self {
        Self { tokenizer, model }
    }

    /// Token cost of `text`. Empty text costs nothing.
    pub fn count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        self.tokenizer.count(self.model, text)
    }

    pub fn model(&self) -> &str {
        self.model
    }
}

impl fmt::Debug for TokenAccountant<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenAccountant")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

// ── Tiktoken ───────────────────────────────────────────────────────

/// BPE tokenizer from `tiktoken-rs`, resolved once at construction.
///
/// The `model` argument of [`Tokenizer::count`] is ignored: the encoding was
/// chosen for the model passed to [`for_model`](Self::for_model).
pub struct TiktokenTokenizer {
    bpe: CoreBPE,
    /// Model the encoding was resolved for, or `cl100k_base` on fallback.
    encoding: String,
}

impl TiktokenTokenizer {
    /// Resolve the encoding for `model`. OpenRouter-style `vendor/model`
    /// names are looked up by their model part; unknown models fall back
    /// to `cl100k_base`.
    pub fn for_model(model: &str) -> Result<Self, ContextError> {
        let bare = model.rsplit('/').next().unwrap_or(model);
        if let Ok(bpe) = tiktoken_rs::get_bpe_from_model(bare) {
            debug!("Using tiktoken encoding for model {bare}");
            return Ok(Self {
                bpe,
                encoding: bare.to_string(),
            });
        }
        debug!("No tiktoken encoding for {bare}, falling back to cl100k_base");
        Self::cl100k()
    }

    /// The `cl100k_base` encoding.
    pub fn cl100k() -> Result<Self, ContextError> {
        let bpe = tiktoken_rs::cl100k_base().map_err(|e| {
            ContextError::Configuration(format!("failed to load cl100k_base encoding: {e}"))
        })?;
        Ok(Self {
            bpe,
            encoding: "cl100k_base".to_string(),
        })
    }

    pub fn encoding(&self) -> &str {
        &self.encoding
    }
}

impl Tokenizer for TiktokenTokenizer {
    fn count(&self, _model: &str, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

impl fmt::Debug for TiktokenTokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TiktokenTokenizer")
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}

// ── Character ratio ────────────────────────────────────────────────

/// Estimates tokens as `ceil(chars / chars_per_token)`.
///
/// No model data needed. A ratio of `1.0` counts one token per character,
/// which makes budgets easy to reason about in tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharRatioTokenizer {
    chars_per_token: f64,
}

impl CharRatioTokenizer {
    /// Non-positive ratios are clamped to `1.0`.
    pub fn new(chars_per_token: f64) -> Self {
        let chars_per_token = if chars_per_token > 0.0 {
            chars_per_token
        } else {
            1.0
        };
        Self { chars_per_token }
    }
}

impl Default for CharRatioTokenizer {
    fn default() -> Self {
        Self::new(DEFAULT_CHARS_PER_TOKEN)
    }
}

impl Tokenizer for CharRatioTokenizer {
    fn count(&self, _model: &str, text: &str) -> usize {
        (text.chars().count() as f64 / self.chars_per_token).ceil() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Panicking;

    impl Tokenizer for Panicking {
        fn count(&self, _model: &str, _text: &str) -> usize {
            panic!("tokenizer should not be consulted");
        }
    }

    #[test]
    fn empty_text_is_zero_without_tokenizer() {
        let accountant = TokenAccountant::new(&Panicking, "m");
        assert_eq!(accountant.count(""), 0);
    }

    #[test]
    fn char_ratio_rounds_up() {
        let tokenizer = CharRatioTokenizer::new(4.0);
        assert_eq!(tokenizer.count("m", "abcd"), 1);
        assert_eq!(tokenizer.count("m", "abcde"), 2);
    }

    #[test]
    fn unit_ratio_counts_characters() {
        let tokenizer = CharRatioTokenizer::new(1.0);
        let accountant = TokenAccountant::new(&tokenizer, "m");
        assert_eq!(accountant.count("héllo"), 5);
    }

    #[test]
    fn invalid_ratio_is_clamped() {
        assert_eq!(CharRatioTokenizer::new(0.0), CharRatioTokenizer::new(1.0));
        assert_eq!(CharRatioTokenizer::new(-3.0), CharRatioTokenizer::new(1.0));
    }

    #[test]
    fn default_ratio_matches_budget_estimate() {
        let tokenizer = CharRatioTokenizer::default();
        assert_eq!(tokenizer.count("m", &"a".repeat(35)), 10);
    }

    #[test]
    fn tiktoken_counts_are_deterministic() {
        let tokenizer = TiktokenTokenizer::for_model("openai/gpt-3.5-turbo").unwrap();
        let text = "You are a coding assistant.";
        let first = tokenizer.count("openai/gpt-3.5-turbo", text);
        assert!(first > 0);
        assert_eq!(first, tokenizer.count("openai/gpt-3.5-turbo", text));
        assert!(tokenizer.count("m", &text.repeat(10)) > first * 5);
        assert_eq!(tokenizer.encoding(), "gpt-3.5-turbo");
        assert!(format!("{tokenizer:?}").contains("gpt-3.5-turbo"));
    }

    #[test]
    fn tiktoken_unknown_model_falls_back() {
        let tokenizer = TiktokenTokenizer::for_model("someone/unknown-model").unwrap();
        assert!(tokenizer.count("m", "hello world") > 0);
        assert_eq!(tokenizer.encoding(), "cl100k_base");
    }
}
