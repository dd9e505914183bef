use std::collections::BTreeSet;

use serde::Serialize;

use super::{OutcomeResult, SessionLog};

/// How far a player is through a multi-day program.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProgramProgress {
    pub completed_days: usize,
    pub required_days: usize,
    pub is_complete: bool,
}

/// Compares the day orders a program schedules against those with a saved log.
pub fn program_progress(required: &[u32], logged: &[u32]) -> ProgramProgress {
    let required: BTreeSet<u32> = required.iter().copied().collect();
    let logged: BTreeSet<u32> = logged.iter().copied().collect();
    let completed_days = required.intersection(&logged).count();

    ProgramProgress {
        completed_days,
        required_days: required.len(),
        is_complete: !required.is_empty() && completed_days == required.len(),
    }
}

/// Totals across every saved log of a program, for the completion screen.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProgramTotals {
    pub sessions: usize,
    pub total_minutes: u32,
    pub successes: usize,
    pub fails: usize,
    pub skipped: usize,
}

pub fn program_totals(logs: &[SessionLog]) -> ProgramTotals {
    logs.iter().fold(ProgramTotals::default(), |mut totals, log| {
        totals.sessions += 1;
        totals.total_minutes = totals.total_minutes.saturating_add(log.duration_minutes);
        for performance in &log.drill_performances {
            match performance.result {
                OutcomeResult::Success => totals.successes += 1,
                OutcomeResult::Fail => totals.fails += 1,
                OutcomeResult::Skipped => totals.skipped += 1,
            }
        }
        totals
    })
}
