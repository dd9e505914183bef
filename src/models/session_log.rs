use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DrillOutcome, SessionRef};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionLogStatus {
    Completed,
    EndedEarly,
}

impl SessionLogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionLogStatus::Completed => "Completed",
            SessionLogStatus::EndedEarly => "EndedEarly",
        }
    }
}

/// Persisted record of one finished run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionLog {
    pub id: String,
    pub session_ref: SessionRef,
    pub squad_session_id: Option<String>,
    pub status: SessionLogStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// Wall clock from "Begin Session" to save, never the sum of drill durations.
    pub duration_minutes: u32,
    pub rpe: u8,
    pub notes: String,
    pub drill_performances: Vec<DrillOutcome>,
}
