use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};

use crate::models::{OutcomeResult, SessionLogStatus};

pub fn to_i64(value: usize) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

pub fn to_u32(value: i64, field: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| anyhow!("{field} contains out-of-range value {value}"))
}

pub fn to_u8(value: i64, field: &str) -> Result<u8> {
    u8::try_from(value).map_err(|_| anyhow!("{field} contains out-of-range value {value}"))
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_status(value: &str) -> Result<SessionLogStatus> {
    match value {
        "Completed" => Ok(SessionLogStatus::Completed),
        "EndedEarly" => Ok(SessionLogStatus::EndedEarly),
        other => Err(anyhow!("unknown session log status {other}")),
    }
}

pub fn parse_outcome(value: &str) -> Result<OutcomeResult> {
    OutcomeResult::parse(value).ok_or_else(|| anyhow!("unknown drill outcome {value}"))
}
