use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum TimerStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Stopped,
}

/// Result of feeding one tick into a [`DrillTimer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The timer was not running; nothing changed.
    Ignored,
    Counted { remaining_seconds: u32 },
    /// Reached zero on this tick and stopped itself.
    Expired,
}

/// One-second countdown for the drill currently on screen.
///
/// Invariant: `remaining_seconds <= duration_seconds`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DrillTimer {
    status: TimerStatus,
    duration_seconds: u32,
    remaining_seconds: u32,
}

impl DrillTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a fresh duration. Nothing carries over from the previous drill.
    pub fn reset(&mut self, duration_seconds: u32) {
        *self = Self {
            status: TimerStatus::Idle,
            duration_seconds,
            remaining_seconds: duration_seconds,
        };
    }

    pub fn start(&mut self) -> bool {
        if self.status != TimerStatus::Idle || self.remaining_seconds == 0 {
            return false;
        }
        self.status = TimerStatus::Running;
        true
    }

    pub fn pause(&mut self) -> bool {
        if self.status != TimerStatus::Running {
            return false;
        }
        self.status = TimerStatus::Paused;
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.status != TimerStatus::Paused || self.remaining_seconds == 0 {
            return false;
        }
        self.status = TimerStatus::Running;
        true
    }

    /// Halts the countdown for good; the remaining time is kept for display.
    pub fn stop(&mut self) {
        self.status = TimerStatus::Stopped;
    }

    pub fn tick(&mut self) -> TickOutcome {
        if self.status != TimerStatus::Running {
            return TickOutcome::Ignored;
        }

        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds == 0 {
            self.status = TimerStatus::Stopped;
            TickOutcome::Expired
        } else {
            TickOutcome::Counted {
                remaining_seconds: self.remaining_seconds,
            }
        }
    }

    pub fn status(&self) -> TimerStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    pub fn duration_seconds(&self) -> u32 {
        self.duration_seconds
    }
}

/// `m:ss`, as shown on the active drill screen.
pub fn format_clock(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
