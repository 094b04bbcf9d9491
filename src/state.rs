// Host-side state: one controller plus the concrete platform services
use std::sync::Arc;

use tokio::runtime::Handle;

use crate::audio::PlaybackFactory;
use crate::controller::{Collaborators, KeepAliveController};
use crate::platform::{BundleAssetResolver, BundleRegistrar, InterruptionBus, ProcessAudioSession, TokioTimer};
use crate::settings::KeepAliveSettings;

pub struct KeepAliveState {
    pub controller: KeepAliveController,
    pub interruptions: Arc<InterruptionBus>,
    pub session: Arc<ProcessAudioSession>,
    pub registrar: BundleRegistrar,
}

impl KeepAliveState {
    pub fn new(
        settings: KeepAliveSettings,
        registrar: BundleRegistrar,
        runtime: Handle,
        playback: Arc<dyn PlaybackFactory>,
    ) -> Self {
        let interruptions = Arc::new(InterruptionBus::new());
        let session = Arc::new(ProcessAudioSession::new());

        let controller = KeepAliveController::new(
            settings,
            Collaborators {
                assets: Arc::new(BundleAssetResolver),
                playback,
                session: session.clone(),
                interruptions: interruptions.clone(),
                timer: Arc::new(TokioTimer::new(runtime)),
            },
        );

        Self {
            controller,
            interruptions,
            session,
            registrar,
        }
    }

    pub fn start(&self) {
        self.controller.start(&self.registrar);
    }

    pub fn refresh(&self) {
        self.controller.refresh(&self.registrar);
    }
}
