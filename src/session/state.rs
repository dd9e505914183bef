use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{models::DrillOutcome, timer::DrillTimer};

use super::OutcomeRecorder;

pub const DEFAULT_COUNTDOWN_SECONDS: u8 = 3;
pub const DEFAULT_RPE: u8 = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionPhase {
    Overview,
    Prep,
    Countdown,
    Active,
    Feedback,
    Summary,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Overview => "OVERVIEW",
            SessionPhase::Prep => "PREP",
            SessionPhase::Countdown => "COUNTDOWN",
            SessionPhase::Active => "ACTIVE",
            SessionPhase::Feedback => "FEEDBACK",
            SessionPhase::Summary => "SUMMARY",
        }
    }

    /// Hold-to-end is offered everywhere a drill is in progress.
    pub fn allows_end_early(&self) -> bool {
        !matches!(self, SessionPhase::Overview | SessionPhase::Summary)
    }

    /// Phases that suspend on the 1 Hz tick.
    pub fn is_timed(&self) -> bool {
        matches!(self, SessionPhase::Countdown | SessionPhase::Active)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable state of one run. Only [`super::reduce`] produces new values.
///
/// Invariants:
/// - in PREP, COUNTDOWN and ACTIVE, `outcomes().len() == current_index()`;
/// - `time_remaining_seconds()` never exceeds the current drill's nominal duration;
/// - in SUMMARY there is exactly one outcome per drill, in drill order.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRunState {
    pub(crate) phase: SessionPhase,
    pub(crate) current_index: usize,
    pub(crate) timer: DrillTimer,
    pub(crate) countdown_from: u8,
    pub(crate) countdown_value: u8,
    pub(crate) started_at: Option<DateTime<Utc>>,
    pub(crate) recorder: OutcomeRecorder,
    pub(crate) achieved_input: String,
    pub(crate) rpe: u8,
    pub(crate) notes: String,
    pub(crate) ended_early: bool,
    /// Generation of the tick source the state currently expects, if any.
    pub(crate) ticker: Option<u64>,
    pub(crate) last_generation: u64,
}

impl Default for SessionRunState {
    fn default() -> Self {
        Self::new(DEFAULT_COUNTDOWN_SECONDS, DEFAULT_RPE)
    }
}

impl SessionRunState {
    pub fn new(countdown_from: u8, default_rpe: u8) -> Self {
        Self {
            phase: SessionPhase::Overview,
            current_index: 0,
            timer: DrillTimer::new(),
            countdown_from,
            countdown_value: countdown_from,
            started_at: None,
            recorder: OutcomeRecorder::default(),
            achieved_input: String::new(),
            rpe: default_rpe.clamp(1, 10),
            notes: String::new(),
            ended_early: false,
            ticker: None,
            last_generation: 0,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn time_remaining_seconds(&self) -> u32 {
        self.timer.remaining_seconds()
    }

    pub fn is_timer_running(&self) -> bool {
        self.timer.is_running()
    }

    pub fn timer(&self) -> &DrillTimer {
        &self.timer
    }

    pub fn countdown_value(&self) -> u8 {
        self.countdown_value
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn outcomes(&self) -> &[DrillOutcome] {
        self.recorder.outcomes()
    }

    pub fn achieved_input(&self) -> &str {
        &self.achieved_input
    }

    pub fn rpe(&self) -> u8 {
        self.rpe
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn ended_early(&self) -> bool {
        self.ended_early
    }

    pub fn active_ticker(&self) -> Option<u64> {
        self.ticker
    }
}
