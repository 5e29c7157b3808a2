//! Budget snapshots for logging and diagnostics.

/// Default characters per token (conservative estimate for English text).
/// Most tokenizers average 3-4 chars per token; we use 3.5 as a middle ground.
pub const DEFAULT_CHARS_PER_TOKEN: f64 = 3.5;

/// Snapshot of ledger usage against the token budget.
///
/// `total_tokens` covers the whole compacted ledger, including history that
/// the window fitter omits from requests, so `usage_pct` can exceed 1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextUsage {
    /// Sum of compacted token counts in the ledger.
    pub total_tokens: usize,
    /// Maximum tokens per request.
    pub max_tokens: usize,
    /// Usage as a fraction (0.0 to 1.0+).
    pub usage_pct: f64,
}

impl ContextUsage {
    pub fn new(total_tokens: usize, max_tokens: usize) -> Self {
        let usage_pct = if max_tokens > 0 {
            total_tokens as f64 / max_tokens as f64
        } else {
            1.0
        };
        Self {
            total_tokens,
            max_tokens,
            usage_pct,
        }
    }

    /// Whether the full ledger still fits in one request.
    pub fn fits(&self) -> bool {
        self.total_tokens <= self.max_tokens
    }

    /// Format as a short log-friendly string.
    pub fn to_log_string(&self) -> String {
        format!(
            "context: {} tokens ({:.0}% of {})",
            self.total_tokens,
            self.usage_pct * 100.0,
            self.max_tokens,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_pct_is_fraction_of_budget() {
        let usage = ContextUsage::new(50, 200);
        assert!((usage.usage_pct - 0.25).abs() < f64::EPSILON);
        assert!(usage.fits());
    }

    #[test]
    fn over_budget_ledger_does_not_fit() {
        let usage = ContextUsage::new(300, 200);
        assert!(usage.usage_pct > 1.0);
        assert!(!usage.fits());
    }

    #[test]
    fn zero_budget_reports_full() {
        let usage = ContextUsage::new(0, 0);
        assert!((usage.usage_pct - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn usage_log_string_format() {
        let log = ContextUsage::new(8, 100).to_log_string();
        assert_eq!(log, "context: 8 tokens (8% of 100)");
    }
}
