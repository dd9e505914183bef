//! Session definition models.
//!
//! A `SessionDefinition` is immutable once adapted; the drill order it was
//! built with is the order a run walks through.

use serde::{Deserialize, Serialize};

use super::DrillItem;

/// Identifies which planned session a log belongs to.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRef {
    pub program_id: Option<String>,
    pub session_day_order: Option<u32>,
    pub session_id: Option<String>,
    /// Set when a coach runs the session live for a squad.
    pub squad_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionDefinition {
    pub title: String,
    pub session_ref: SessionRef,
    items: Vec<DrillItem>,
}

impl SessionDefinition {
    pub fn new(title: impl Into<String>, session_ref: SessionRef, items: Vec<DrillItem>) -> Self {
        Self {
            title: title.into(),
            session_ref,
            items,
        }
    }

    pub fn items(&self) -> &[DrillItem] {
        &self.items
    }

    pub fn item(&self, index: usize) -> Option<&DrillItem> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Planned length shown on the overview; unrelated to the logged duration.
    pub fn total_nominal_minutes(&self) -> u32 {
        self.items
            .iter()
            .map(DrillItem::nominal_minutes)
            .fold(0u32, |total, minutes| total.saturating_add(minutes))
    }
}
