//! Window fitting: which prefix of history to omit from an outbound request.
//!
//! The overview (index 0) and the newest turn are always sent. When the
//! staged ledger exceeds the budget, the oldest turns after the overview are
//! left out, oldest first, until the remainder fits. The ledger itself is
//! never modified; omitted turns stay available to later requests should
//! the budget allow.

use crate::error::{ContextError, Result};
use tracing::debug;

/// Outcome of fitting one request into the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowFit {
    /// First non-overview index included in the request.
    pub start: usize,
    /// Turns omitted between the overview and `start`.
    pub dropped_messages: usize,
    pub dropped_tokens: usize,
    /// Tokens actually sent: overview plus `messages[start..]`.
    pub window_tokens: usize,
}

impl WindowFit {
    /// Indices of the messages to send, overview first.
    pub fn indices(&self, len: usize) -> impl Iterator<Item = usize> {
        let start = self.start.max(1);
        std::iter::once(0)
            .filter(move |_| len > 0)
            .chain(start..len)
    }
}

/// Fit `token_counts` (overview first, newest last) into `max_tokens`.
///
/// `total_tokens` is the sum of `token_counts`.
pub fn fit(token_counts: &[usize], total_tokens: usize, max_tokens: usize) -> Result<WindowFit> {
    let Some(&overview) = token_counts.first() else {
        return Ok(WindowFit::default());
    };
    let newest = if token_counts.len() > 1 {
        token_counts[token_counts.len() - 1]
    } else {
        0
    };

    if overview + newest > max_tokens {
        return Err(ContextError::BudgetInfeasible {
            overview_tokens: overview,
            newest_tokens: newest,
            max_tokens,
        });
    }

    if total_tokens <= max_tokens {
        return Ok(WindowFit {
            start: 0,
            dropped_messages: 0,
            dropped_tokens: 0,
            window_tokens: total_tokens,
        });
    }

    let overflow = total_tokens - max_tokens;
    let last = token_counts.len() - 1;
    let mut dropped_tokens = 0;
    let mut start = 1;
    // Never reaches `last`: everything between overview and newest sums to
    // at least the overflow once the infeasibility check has passed.
    while dropped_tokens < overflow && start < last {
        dropped_tokens += token_counts[start];
        start += 1;
    }

    let fit = WindowFit {
        start,
        dropped_messages: start - 1,
        dropped_tokens,
        window_tokens: total_tokens - dropped_tokens,
    };
    debug!(
        "Window fit: omitting {} oldest message(s) ({} tokens), sending {} of {} tokens",
        fit.dropped_messages, fit.dropped_tokens, fit.window_tokens, total_tokens
    );
    Ok(fit)
}
