// Settings module
// Persists the keep-alive tuning as JSON in the app data directory

#[allow(clippy::module_inception)]
pub mod settings;

pub use settings::{KeepAliveSettings, SessionSettings};
