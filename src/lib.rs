// Alarm keep-alive - keeps the host process resumable with a near-silent signal
// Module declarations
pub mod audio;
#[cfg(feature = "tauri-plugin")]
mod commands;
pub mod controller;
pub mod error;
pub mod logging;
pub mod platform;
pub mod settings;
pub mod state;

pub use controller::{Collaborators, KeepAliveController, KeepAliveStatus, RefreshOutcome, StartOutcome};
pub use error::{KeepAliveError, Result};
pub use settings::KeepAliveSettings;
pub use state::KeepAliveState;

/// Tauri plugin managing a [`KeepAliveState`] for the app.
///
/// The silent asset is looked up under the app's resource directory and the
/// settings are read from `keepalive.json` in its data directory.
#[cfg(feature = "tauri-plugin")]
pub fn init<R: tauri::Runtime>() -> tauri::plugin::TauriPlugin<R> {
    use tauri::Manager;

    tauri::plugin::Builder::new("keep-alive")
        .invoke_handler(tauri::generate_handler![
            commands::start,
            commands::try_start,
            commands::refresh,
            commands::stop,
            commands::status,
            commands::add_requester,
            commands::release,
            commands::notify_interruption,
        ])
        .setup(|app, _api| {
            logging::init();

            let app_dir = app.path().app_data_dir()?;
            let resource_dir = app.path().resource_dir()?;
            let settings = KeepAliveSettings::load(&app_dir)?;

            // Timer ticks run on Tauri's own tokio runtime
            let runtime = tauri::async_runtime::handle().inner().clone();

            let state = KeepAliveState::new(
                settings,
                platform::BundleRegistrar::new(resource_dir),
                runtime,
                audio::default_playback_factory(),
            );
            app.manage(state);

            tracing::info!("keep-alive plugin initialized");
            Ok(())
        })
        .build()
}
