//! Configuration for a [`ContextWindow`](super::ContextWindow).
//!
//! ```ignore
//! let config = ContextConfig::new("You are a Python debugging assistant.")
//!     .with_model("openai/gpt-4o-mini")
//!     .with_max_tokens(4096)
//!     .with_default_data_policy(DataPolicy::Summarize)
//!     .with_retries(3);
//! ```

use crate::DEFAULT_MODEL;
use crate::api::retry::RetryConfig;
use crate::context::policy::DataPolicy;
use crate::error::{ContextError, Result};
use std::time::Duration;

/// Default per-request token budget.
pub const DEFAULT_MAX_TOKENS: usize = 2048;

/// Settings fixed for the lifetime of one conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextConfig {
    /// System overview pinned at index 0 of every request.
    pub high_level_overview: String,
    /// Data policy for turns that do not name one.
    pub default_data_policy: DataPolicy,
    /// Model identifier, also used to pick the tokenizer encoding.
    pub model: String,
    /// Maximum tokens per outbound request (overview included).
    pub max_tokens: usize,
    /// System instruction for the summarizer. `None` uses the built-in one.
    pub summarization_system: Option<String>,
    /// Sampling temperature for main requests. Summaries always use 0.
    pub temperature: f32,
    /// Retry policy for transient service failures.
    pub retry: RetryConfig,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            high_level_overview: String::new(),
            default_data_policy: DataPolicy::default(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            summarization_system: None,
            temperature: 0.0,
            retry: RetryConfig::default(),
        }
    }
}

impl ContextConfig {
    /// Create a config with the given overview and defaults elsewhere.
    pub fn new(high_level_overview: impl Into<String>) -> Self {
        Self {
            high_level_overview: high_level_overview.into(),
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_default_data_policy(mut self, policy: DataPolicy) -> Self {
        self.default_data_policy = policy;
        self
    }

    pub fn with_summarization_system(mut self, system: impl Into<String>) -> Self {
        self.summarization_system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the number of retries after the first attempt.
    pub fn with_retries(mut self, max_retries: u32) -> Self {
        self.retry.max_retries = max_retries;
        self
    }

    /// Set the fixed delay between attempts.
    pub fn with_wait_time(mut self, wait_time: Duration) -> Self {
        self.retry.wait_time = wait_time;
        self
    }

    /// Reject settings no conversation could run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_tokens == 0 {
            return Err(ContextError::Configuration(
                "max_tokens must be greater than zero".into(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(ContextError::Configuration("model must not be empty".into()));
        }
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(ContextError::Configuration(format!(
                "temperature must be a non-negative number, got {}",
                self.temperature
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ContextConfig::new("overview");
        assert_eq!(config.high_level_overview, "overview");
        assert_eq!(config.model, "openai/gpt-3.5-turbo");
        assert_eq!(config.max_tokens, 2048);
        assert_eq!(config.default_data_policy, DataPolicy::Pure);
        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.retry.wait_time, Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_methods() {
        let config = ContextConfig::new("o")
            .with_model("openai/gpt-4o")
            .with_max_tokens(512)
            .with_default_data_policy(DataPolicy::Remove)
            .with_summarization_system("be brief")
            .with_temperature(0.7)
            .with_retries(4)
            .with_wait_time(Duration::from_millis(10));
        assert_eq!(config.model, "openai/gpt-4o");
        assert_eq!(config.max_tokens, 512);
        assert_eq!(config.default_data_policy, DataPolicy::Remove);
        assert_eq!(config.summarization_system.as_deref(), Some("be brief"));
        assert_eq!(config.retry.attempts(), 5);
        assert_eq!(config.retry.wait_time, Duration::from_millis(10));
    }

    #[test]
    fn zero_budget_is_rejected() {
        let err = ContextConfig::new("o").with_max_tokens(0).validate().unwrap_err();
        assert!(matches!(err, ContextError::Configuration(_)));
    }

    #[test]
    fn empty_model_and_bad_temperature_are_rejected() {
        assert!(ContextConfig::new("o").with_model(" ").validate().is_err());
        assert!(ContextConfig::new("o").with_temperature(-1.0).validate().is_err());
        assert!(ContextConfig::new("o").with_temperature(f32::NAN).validate().is_err());
    }
}
