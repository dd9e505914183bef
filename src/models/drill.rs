use serde::{Deserialize, Serialize};

/// Stand-in id for drill items whose producer supplied none.
pub const UNKNOWN_DRILL_ID: &str = "unknown_drill";

/// Numeric goal a player reports against during feedback, e.g. "Shots Made: 20".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DrillTarget {
    pub label: String,
    pub value: i64,
}

/// Canonical drill entry of a session definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DrillItem {
    pub id: String,
    pub name: String,
    pub nominal_duration_seconds: u32,
    pub notes: Option<String>,
    pub instructions: Option<String>,
    pub target: Option<DrillTarget>,
    pub media_ref: Option<String>,
}

impl DrillItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>, nominal_minutes: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            nominal_duration_seconds: nominal_minutes.saturating_mul(60),
            notes: None,
            instructions: None,
            target: None,
            media_ref: None,
        }
    }

    pub fn with_target(mut self, label: impl Into<String>, value: i64) -> Self {
        self.target = Some(DrillTarget {
            label: label.into(),
            value,
        });
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn nominal_minutes(&self) -> u32 {
        self.nominal_duration_seconds / 60
    }

    pub fn has_known_id(&self) -> bool {
        self.id != UNKNOWN_DRILL_ID
    }
}
