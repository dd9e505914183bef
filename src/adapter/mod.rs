//! Collapses the drill shapes produced by the manual builder, the AI
//! generator and the premade templates into one canonical
//! [`SessionDefinition`].
//!
//! Producers disagree on key names (`drill_id` / `drillId` / `id`,
//! `duration_minutes` / `targetDurationMin` / `duration`, ...). Each concept
//! has an ordered alias list and the first usable value wins. Nothing past
//! this module looks at raw upstream keys.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{DrillItem, DrillTarget, SessionDefinition, SessionRef, UNKNOWN_DRILL_ID};

const ENABLE_LOGS: bool = true;

use crate::log_warn;

const ITEM_LIST_KEYS: &[&str] = &["items", "drills"];
const TITLE_KEYS: &[&str] = &["title", "name"];
const PROGRAM_ID_KEYS: &[&str] = &["program_id", "programId"];
const DAY_ORDER_KEYS: &[&str] = &["day_order", "dayOrder", "session_day_order", "day"];
const SESSION_ID_KEYS: &[&str] = &["session_id", "sessionId", "id"];
const SQUAD_ID_KEYS: &[&str] = &["squad_id", "squadId"];

const DRILL_ID_KEYS: &[&str] = &["drill_id", "drillId", "id"];
const DRILL_NAME_KEYS: &[&str] = &["drill_name", "drillName", "name"];
const DURATION_MINUTES_KEYS: &[&str] = &[
    "duration_minutes",
    "targetDurationMin",
    "duration",
    "default_duration_min",
    "defaultDurationMin",
];
const INSTRUCTION_KEYS: &[&str] = &["description", "instructions"];
const MEDIA_KEYS: &[&str] = &["video_url", "visualUrl", "mediaRef", "media_ref"];

const DEFAULT_TITLE: &str = "Training Session";
const DEFAULT_DRILL_NAME: &str = "Drill";
const DEFAULT_TARGET_LABEL: &str = "Target";

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("session definition is not a JSON object")]
    NotAnObject,
    #[error("session definition has no item list")]
    MissingItems,
    #[error("drill item {index} is not a JSON object")]
    InvalidItem { index: usize },
    #[error("failed to parse session definition: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct DefinitionAdapter {
    default_drill_minutes: u32,
}

impl Default for DefinitionAdapter {
    fn default() -> Self {
        Self::new(10)
    }
}

impl DefinitionAdapter {
    pub fn new(default_drill_minutes: u32) -> Self {
        Self {
            default_drill_minutes,
        }
    }

    /// Parses a JSON document. `null` or a definition without drills yields
    /// `Ok(None)`: there is nothing to run and the caller shows a placeholder.
    pub fn from_json_str(&self, raw: &str) -> Result<Option<SessionDefinition>, AdapterError> {
        let value: Value = serde_json::from_str(raw)?;
        self.adapt_optional(Some(&value))
    }

    pub fn adapt_optional(
        &self,
        raw: Option<&Value>,
    ) -> Result<Option<SessionDefinition>, AdapterError> {
        match raw {
            None | Some(Value::Null) => Ok(None),
            Some(value) => {
                let definition = self.adapt(value)?;
                Ok((!definition.is_empty()).then_some(definition))
            }
        }
    }

    pub fn adapt(&self, raw: &Value) -> Result<SessionDefinition, AdapterError> {
        let object = raw.as_object().ok_or(AdapterError::NotAnObject)?;

        let items = ITEM_LIST_KEYS
            .iter()
            .find_map(|key| object.get(*key).and_then(Value::as_array))
            .ok_or(AdapterError::MissingItems)?;

        let items = items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                item.as_object()
                    .ok_or(AdapterError::InvalidItem { index })
                    .map(|fields| self.adapt_item(index, fields))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let title = first_string(object, TITLE_KEYS).unwrap_or_else(|| DEFAULT_TITLE.to_string());

        Ok(SessionDefinition::new(title, session_ref(object), items))
    }

    fn adapt_item(&self, index: usize, fields: &Map<String, Value>) -> DrillItem {
        let id = first_string(fields, DRILL_ID_KEYS).unwrap_or_else(|| {
            log_warn!("drill item {index} has no id; using {UNKNOWN_DRILL_ID}");
            UNKNOWN_DRILL_ID.to_string()
        });

        // Zero counts as missing, matching how every producer treats it.
        let minutes = DURATION_MINUTES_KEYS
            .iter()
            .find_map(|key| fields.get(*key).and_then(as_positive_u32))
            .unwrap_or(self.default_drill_minutes);

        DrillItem {
            id,
            name: first_string(fields, DRILL_NAME_KEYS)
                .unwrap_or_else(|| DEFAULT_DRILL_NAME.to_string()),
            nominal_duration_seconds: minutes.saturating_mul(60),
            notes: first_string(fields, &["notes"]),
            instructions: first_string(fields, INSTRUCTION_KEYS),
            target: target(fields),
            media_ref: first_string(fields, MEDIA_KEYS),
        }
    }
}

fn session_ref(object: &Map<String, Value>) -> SessionRef {
    SessionRef {
        program_id: first_string(object, PROGRAM_ID_KEYS),
        session_day_order: DAY_ORDER_KEYS
            .iter()
            .find_map(|key| object.get(*key).and_then(as_positive_u32)),
        session_id: first_string(object, SESSION_ID_KEYS),
        squad_id: first_string(object, SQUAD_ID_KEYS),
    }
}

/// Resolves `target{value,label}`, `target_value`/`target_prompt`, or
/// `successCriteria{target,prompt}`, in that order.
fn target(fields: &Map<String, Value>) -> Option<DrillTarget> {
    if let Some(nested) = fields.get("target").and_then(Value::as_object) {
        if let Some(value) = nested.get("value").and_then(as_i64) {
            return Some(DrillTarget {
                label: first_string(nested, &["label", "prompt"])
                    .unwrap_or_else(|| DEFAULT_TARGET_LABEL.to_string()),
                value,
            });
        }
    }

    if let Some(value) = fields.get("target_value").and_then(as_i64) {
        return Some(DrillTarget {
            label: first_string(fields, &["target_prompt", "target_label"])
                .unwrap_or_else(|| DEFAULT_TARGET_LABEL.to_string()),
            value,
        });
    }

    let criteria = fields.get("successCriteria").and_then(Value::as_object)?;
    let value = criteria.get("target").and_then(as_i64)?;
    Some(DrillTarget {
        label: first_string(criteria, &["prompt", "label"])
            .unwrap_or_else(|| DEFAULT_TARGET_LABEL.to_string()),
        value,
    })
}

/// First alias holding a non-blank string or a number.
fn first_string(fields: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match fields.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_positive_u32(value: &Value) -> Option<u32> {
    as_i64(value)
        .filter(|v| *v > 0)
        .and_then(|v| u32::try_from(v).ok())
}
