pub mod controller;
pub mod signal;

pub use controller::{SessionClose, SessionController, SessionSnapshot};
pub use signal::RuntimeSignal;
