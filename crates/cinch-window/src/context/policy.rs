//! Per-turn compaction policies.

use crate::error::ContextError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What happens to a turn's associated data once the turn is compacted.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DataPolicy {
    /// Keep the data verbatim.
    #[default]
    Pure,
    /// Drop the data.
    Remove,
    /// Replace the data with a generated summary.
    Summarize,
}

/// Whether a compacted turn keeps a description of its requested function.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FunctionPolicy {
    #[default]
    Include,
    Ignore,
}

impl FromStr for DataPolicy {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pure" => Ok(DataPolicy::Pure),
            "remove" => Ok(DataPolicy::Remove),
            "summarize" => Ok(DataPolicy::Summarize),
            other => Err(ContextError::Configuration(format!(
                "unknown data policy '{other}' (expected pure, remove, or summarize)"
            ))),
        }
    }
}

impl FromStr for FunctionPolicy {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "include" => Ok(FunctionPolicy::Include),
            "ignore" => Ok(FunctionPolicy::Ignore),
            other => Err(ContextError::Configuration(format!(
                "unknown function policy '{other}' (expected include or ignore)"
            ))),
        }
    }
}

impl fmt::Display for DataPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataPolicy::Pure => write!(f, "pure"),
            DataPolicy::Remove => write!(f, "remove"),
            DataPolicy::Summarize => write!(f, "summarize"),
        }
    }
}

impl fmt::Display for FunctionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionPolicy::Include => write!(f, "include"),
            FunctionPolicy::Ignore => write!(f, "ignore"),
        }
    }
}
