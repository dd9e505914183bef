pub mod adapter;
pub mod db;
pub mod gesture;
pub mod models;
pub mod runner;
pub mod runtime;
pub mod session;
pub mod settings;
pub mod timer;
pub mod utils;

pub use adapter::{AdapterError, DefinitionAdapter};
pub use db::Database;
pub use runner::run;
pub use runtime::{RuntimeSignal, SessionClose, SessionController, SessionSnapshot};
pub use settings::{RuntimeSettings, SettingsStore};
