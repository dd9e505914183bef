//! Framework-free session execution core.
//!
//! [`reduce`] is a pure `(state, event) -> (state, effects)` function. It has
//! no clock and no timer: ticks arrive as events, and starting or stopping
//! the 1 Hz source is requested through [`Effect`]s that the runtime carries
//! out. Any client can drive it with its own rendering and timer adapter.

pub mod assembler;
pub mod error;
pub mod recorder;
pub mod reducer;
pub mod sink;
pub mod state;

pub use assembler::{assemble, duration_minutes, normalize_drill_id, SQUAD_NOTES_PREFIX};
pub use error::TransitionError;
pub use recorder::OutcomeRecorder;
pub use reducer::{reduce, Effect, SessionEvent, Transition, ENDED_EARLY_MARKER};
pub use sink::SessionLogSink;
pub use state::{SessionPhase, SessionRunState, DEFAULT_COUNTDOWN_SECONDS, DEFAULT_RPE};
