use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeResult {
    Success,
    Fail,
    /// Only produced by ending a session early.
    Skipped,
}

impl OutcomeResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeResult::Success => "success",
            OutcomeResult::Fail => "fail",
            OutcomeResult::Skipped => "skipped",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "success" => Some(OutcomeResult::Success),
            "fail" => Some(OutcomeResult::Fail),
            "skipped" => Some(OutcomeResult::Skipped),
            _ => None,
        }
    }
}

impl fmt::Display for OutcomeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal classification of one drill attempt.
///
/// `result` is what the player declared. It is never recomputed from
/// `achieved_value` against the drill target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DrillOutcome {
    pub drill_id: String,
    #[serde(rename = "outcome")]
    pub result: OutcomeResult,
    #[serde(default)]
    pub achieved_value: i64,
}

impl DrillOutcome {
    pub fn new(drill_id: impl Into<String>, result: OutcomeResult, achieved_value: i64) -> Self {
        Self {
            drill_id: drill_id.into(),
            result,
            achieved_value,
        }
    }

    pub fn skipped(drill_id: impl Into<String>) -> Self {
        Self::new(drill_id, OutcomeResult::Skipped, 0)
    }
}
