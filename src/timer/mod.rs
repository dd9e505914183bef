pub mod state;
pub mod ticker;

pub use state::{format_clock, DrillTimer, TickOutcome, TimerStatus};
pub use ticker::TickerHandle;
