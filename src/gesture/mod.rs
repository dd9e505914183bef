//! Press-and-hold confirmation used to end a session early.

pub mod hold;
pub mod timer;

pub use hold::{HoldDetector, DEFAULT_HOLD_THRESHOLD};
pub use timer::HoldTimer;
