mod drill;
mod outcome;
mod progress;
mod session;
mod session_log;

pub use drill::{DrillItem, DrillTarget, UNKNOWN_DRILL_ID};
pub use outcome::{DrillOutcome, OutcomeResult};
pub use progress::{program_progress, program_totals, ProgramProgress, ProgramTotals};
pub use session::{SessionDefinition, SessionRef};
pub use session_log::{SessionLog, SessionLogStatus};
