// Keep-alive life-cycle controller
//
// Holds the single process-wide session: a playback handle, the periodic
// timer re-triggering it, and the interruption subscription. All three exist
// together or not at all.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, error};

use crate::audio::{PlaybackFactory, PlaybackHandle};
use crate::error::Result;
use crate::platform::{
    AssetResolver, AudioSession, InterruptionCenter, InterruptionEvent, PeriodicTimer, PluginRegistrar,
    SubscriptionId, TimerHandle,
};
use crate::settings::KeepAliveSettings;

/// The platform services the controller drives.
#[derive(Clone)]
pub struct Collaborators {
    pub assets: Arc<dyn AssetResolver>,
    pub playback: Arc<dyn PlaybackFactory>,
    pub session: Arc<dyn AudioSession>,
    pub interruptions: Arc<dyn InterruptionCenter>,
    pub timer: Arc<dyn PeriodicTimer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyActive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The session was running and emitted immediately.
    Emitted,
    /// The session was not running and has been started.
    Started,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeepAliveStatus {
    pub active: bool,
    pub emissions: u64,
    pub requesters: Vec<i32>,
}

struct ActiveSession {
    generation: u64,
    player: Box<dyn PlaybackHandle>,
    timer: Box<dyn TimerHandle>,
    subscription: SubscriptionId,
}

#[derive(Default)]
struct SessionState {
    active: Option<ActiveSession>,
    requesters: BTreeSet<i32>,
}

impl SessionState {
    fn generation(&self) -> Option<u64> {
        self.active.as_ref().map(|session| session.generation)
    }
}

// Collaborators are only ever called with `state` unlocked; callbacks they
// deliver re-enter through the lock and check the session generation.
struct Inner {
    settings: KeepAliveSettings,
    collaborators: Collaborators,
    state: Mutex<SessionState>,
    next_generation: AtomicU64,
    emissions: AtomicU64,
}

/// Cheap to clone; every clone drives the same session.
#[derive(Clone)]
pub struct KeepAliveController {
    inner: Arc<Inner>,
}

impl KeepAliveController {
    pub fn new(settings: KeepAliveSettings, collaborators: Collaborators) -> Self {
        Self {
            inner: Arc::new(Inner {
                settings,
                collaborators,
                state: Mutex::new(SessionState::default()),
                next_generation: AtomicU64::new(1),
                emissions: AtomicU64::new(0),
            }),
        }
    }

    pub fn settings(&self) -> &KeepAliveSettings {
        &self.inner.settings
    }

    /// Start the keep-alive signal. Failures are logged, never returned.
    pub fn start(&self, registrar: &dyn PluginRegistrar) {
        if let Err(e) = self.try_start(registrar) {
            error!(error = %e, "could not start silent player");
        }
    }

    /// Start the keep-alive signal, surfacing why it could not start.
    ///
    /// The first emission happens one period after a successful start.
    pub fn try_start(&self, registrar: &dyn PluginRegistrar) -> Result<StartOutcome> {
        if self.is_active() {
            debug!("silent player already running");
            return Ok(StartOutcome::AlreadyActive);
        }

        let settings = &self.inner.settings;
        let collaborators = &self.inner.collaborators;

        let path = collaborators
            .assets
            .resolve(&settings.asset, &settings.package, registrar)?;

        let mut player = collaborators.playback.create(&path)?;
        player.set_number_of_loops(settings.number_of_loops);
        player.set_volume(settings.effective_volume());

        let generation = self.inner.next_generation.fetch_add(1, Ordering::SeqCst);

        let weak = Arc::downgrade(&self.inner);
        let subscription = collaborators.interruptions.subscribe(Arc::new(move |event| {
            with_inner(&weak, |inner| inner.on_interruption(generation, event))
        }));

        let weak = Arc::downgrade(&self.inner);
        let timer = collaborators
            .timer
            .schedule(settings.period(), Arc::new(move || with_inner(&weak, |inner| inner.emit_now(generation))));

        let session = ActiveSession {
            generation,
            player,
            timer,
            subscription,
        };

        let lost = {
            let mut state = self.inner.state.lock();
            if state.active.is_some() {
                Some(session)
            } else {
                state.active = Some(session);
                None
            }
        };

        if let Some(session) = lost {
            debug!("silent player started concurrently, discarding this one");
            self.inner.teardown(session);
            return Ok(StartOutcome::AlreadyActive);
        }

        debug!(path = %path.display(), period_ms = settings.period_ms, generation, "started silent player");
        Ok(StartOutcome::Started)
    }

    /// Emit right away if running, otherwise start. Failures are logged.
    pub fn refresh(&self, registrar: &dyn PluginRegistrar) {
        if let Err(e) = self.try_refresh(registrar) {
            error!(error = %e, "could not refresh silent player");
        }
    }

    pub fn try_refresh(&self, registrar: &dyn PluginRegistrar) -> Result<RefreshOutcome> {
        let generation = self.inner.state.lock().generation();
        match generation {
            Some(generation) => {
                self.inner.emit_now(generation);
                debug!("refreshed silent player");
                Ok(RefreshOutcome::Emitted)
            }
            None => {
                debug!("silent player not running, starting it instead of refreshing");
                match self.try_start(registrar)? {
                    StartOutcome::Started => Ok(RefreshOutcome::Started),
                    // Another caller started it in the meantime
                    StartOutcome::AlreadyActive => self.try_refresh(registrar),
                }
            }
        }
    }

    /// Tear the session down. A no-op when not running.
    pub fn stop(&self) {
        let taken = self.inner.state.lock().active.take();
        match taken {
            Some(session) => {
                self.inner.teardown(session);
                debug!("stopped silent player");
            }
            None => debug!("silent player already stopped"),
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.state.lock().active.is_some()
    }

    pub fn status(&self) -> KeepAliveStatus {
        let state = self.inner.state.lock();
        KeepAliveStatus {
            active: state.active.is_some(),
            emissions: self.inner.emissions.load(Ordering::SeqCst),
            requesters: state.requesters.iter().copied().collect(),
        }
    }

    /// Record an alarm that needs the process kept alive. True if new.
    pub fn add_requester(&self, id: i32) -> bool {
        self.inner.state.lock().requesters.insert(id)
    }

    /// Forget an alarm. Returns how many remain.
    pub fn remove_requester(&self, id: i32) -> usize {
        let mut state = self.inner.state.lock();
        state.requesters.remove(&id);
        state.requesters.len()
    }

    pub fn requesters(&self) -> Vec<i32> {
        self.inner.state.lock().requesters.iter().copied().collect()
    }

    /// Forget an alarm and stop once nobody needs keep-alive anymore.
    pub fn release(&self, id: i32) {
        let taken = {
            let mut state = self.inner.state.lock();
            state.requesters.remove(&id);
            if state.requesters.is_empty() {
                state.active.take()
            } else {
                None
            }
        };

        if let Some(session) = taken {
            self.inner.teardown(session);
            debug!(alarm = id, "last keep-alive requester released, stopped silent player");
        }
    }
}

fn with_inner(weak: &Weak<Inner>, f: impl FnOnce(&Inner)) {
    if let Some(inner) = weak.upgrade() {
        f(&inner);
    }
}

impl Inner {
    fn is_current(&self, generation: u64) -> bool {
        self.state.lock().generation() == Some(generation)
    }

    /// Request the mixing policy, then play. Session failures do not stop
    /// the play attempt. Callbacks of a session that has since been stopped
    /// or replaced do nothing.
    fn emit_now(&self, generation: u64) {
        if !self.is_current(generation) {
            return;
        }

        self.mix_with_other_audio();

        let mut state = self.state.lock();
        match state.active.as_mut() {
            Some(session) if session.generation == generation => {
                if !session.player.play() {
                    debug!("silent player queued nothing");
                }
                self.emissions.fetch_add(1, Ordering::SeqCst);
            }
            _ => debug!(generation, "stale keep-alive emission dropped"),
        }
    }

    fn mix_with_other_audio(&self) {
        let session = &self.collaborators.session;
        let policy = &self.settings.session;

        let result = session
            .set_category(policy.category, policy.mode, policy.options)
            .and_then(|()| session.set_active(true));

        match result {
            Ok(()) => debug!("playing concurrently with other audio sources"),
            Err(e) => error!(error = %e, "error setting up audio session to mix with others"),
        }
    }

    fn on_interruption(&self, generation: u64, event: InterruptionEvent) {
        match event {
            InterruptionEvent::Began | InterruptionEvent::Ended => {
                debug!(%event, "audio interruption");
                self.emit_now(generation);
            }
            InterruptionEvent::Other => {}
        }
    }

    /// Must be called without `state` held.
    fn teardown(&self, mut session: ActiveSession) {
        self.collaborators.interruptions.unsubscribe(session.subscription);
        session.timer.cancel();
        session.player.stop();
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(session) = self.state.get_mut().active.take() {
            self.teardown(session);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::NullSink;
    use crate::audio::{ClipPlayer, DecodedClip};
    use crate::error::KeepAliveError;
    use crate::platform::{BundleRegistrar, InterruptionBus, ManualTimer, ProcessAudioSession};
    use std::path::{Path, PathBuf};

    struct FixedAsset;

    impl AssetResolver for FixedAsset {
        fn resolve(&self, _: &str, _: &str, registrar: &dyn PluginRegistrar) -> Result<PathBuf> {
            Ok(registrar.asset_root().join("blank.mp3"))
        }
    }

    struct SilentFactory(NullSink);

    impl PlaybackFactory for SilentFactory {
        fn create(&self, _: &Path) -> Result<Box<dyn PlaybackHandle>> {
            let clip = DecodedClip::from_samples(vec![0.0; 8], 8_000, 1);
            Ok(Box::new(ClipPlayer::new(clip, self.0.clone())))
        }
    }

    struct Fixture {
        controller: KeepAliveController,
        timer: ManualTimer,
        bus: Arc<InterruptionBus>,
        sink: NullSink,
        registrar: BundleRegistrar,
    }

    fn fixture() -> Fixture {
        let timer = ManualTimer::new();
        let bus = Arc::new(InterruptionBus::new());
        let sink = NullSink::new();
        let controller = KeepAliveController::new(
            KeepAliveSettings::default(),
            Collaborators {
                assets: Arc::new(FixedAsset),
                playback: Arc::new(SilentFactory(sink.clone())),
                session: Arc::new(ProcessAudioSession::new()),
                interruptions: bus.clone(),
                timer: Arc::new(timer.clone()),
            },
        );
        Fixture {
            controller,
            timer,
            bus,
            sink,
            registrar: BundleRegistrar::new("/bundle"),
        }
    }

    #[test]
    fn start_arms_timer_without_emitting() {
        let f = fixture();

        assert_eq!(f.controller.try_start(&f.registrar).unwrap(), StartOutcome::Started);
        assert!(f.controller.is_active());
        assert_eq!(f.timer.periods(), vec![std::time::Duration::from_secs(10)]);
        assert_eq!(f.bus.subscriber_count(), 1);
        assert_eq!(f.sink.samples_written(), 0);
        assert_eq!(f.controller.status().emissions, 0);
    }

    #[test]
    fn tick_emits_once() {
        let f = fixture();
        f.controller.start(&f.registrar);

        f.timer.fire();

        assert_eq!(f.controller.status().emissions, 1);
        assert_eq!(f.sink.samples_written(), 8);
    }

    #[test]
    fn stop_releases_everything() {
        let f = fixture();
        f.controller.start(&f.registrar);
        f.controller.stop();

        assert!(!f.controller.is_active());
        assert_eq!(f.timer.live_count(), 0);
        assert_eq!(f.bus.subscriber_count(), 0);
        assert_eq!(f.timer.fire(), 0);
    }

    #[test]
    fn dropping_the_controller_tears_down() {
        let f = fixture();
        f.controller.start(&f.registrar);
        drop(f.controller);

        assert_eq!(f.timer.live_count(), 0);
        assert_eq!(f.bus.subscriber_count(), 0);
    }

    #[test]
    fn release_of_last_requester_stops() {
        let f = fixture();
        f.controller.start(&f.registrar);
        assert!(f.controller.add_requester(7));
        assert!(f.controller.add_requester(3));
        assert!(!f.controller.add_requester(7));

        f.controller.release(7);
        assert!(f.controller.is_active());
        assert_eq!(f.controller.requesters(), vec![3]);

        f.controller.release(3);
        assert!(!f.controller.is_active());
        assert_eq!(f.timer.live_count(), 0);
        assert_eq!(f.bus.subscriber_count(), 0);
    }

    #[test]
    fn release_of_unknown_alarm_keeps_pending_ones_alive() {
        let f = fixture();
        f.controller.start(&f.registrar);
        f.controller.add_requester(5);

        f.controller.release(99);

        assert!(f.controller.is_active());
        assert_eq!(f.controller.requesters(), vec![5]);
    }

    #[test]
    fn callbacks_of_a_replaced_session_do_not_play() {
        let f = fixture();
        f.controller.start(&f.registrar);
        let old = f.controller.inner.state.lock().generation().unwrap();

        f.controller.stop();
        f.controller.start(&f.registrar);
        let current = f.controller.inner.state.lock().generation().unwrap();

        f.controller.inner.emit_now(old);
        f.controller.inner.on_interruption(old, InterruptionEvent::Ended);
        assert_ne!(old, current);
        assert_eq!(f.controller.status().emissions, 0);
        assert_eq!(f.sink.samples_written(), 0);

        f.controller.inner.emit_now(current);
        assert_eq!(f.controller.status().emissions, 1);
    }

    #[test]
    fn status_serializes_for_hosts() {
        let f = fixture();
        f.controller.add_requester(1);

        let json = serde_json::to_value(f.controller.status()).unwrap();
        assert_eq!(json, serde_json::json!({ "active": false, "emissions": 0, "requesters": [1] }));
    }

    #[test]
    fn asset_failure_surfaces_through_try_start() {
        struct Missing;
        impl AssetResolver for Missing {
            fn resolve(&self, asset: &str, _: &str, _: &dyn PluginRegistrar) -> Result<PathBuf> {
                Err(KeepAliveError::AssetNotFound {
                    asset: asset.to_string(),
                    path: PathBuf::from("/bundle/missing"),
                })
            }
        }

        let f = fixture();
        let controller = KeepAliveController::new(
            KeepAliveSettings::default(),
            Collaborators {
                assets: Arc::new(Missing),
                ..f.controller.inner.collaborators.clone()
            },
        );

        let err = controller.try_start(&f.registrar).unwrap_err();
        assert!(err.aborts_start());
        assert!(!controller.is_active());
        assert_eq!(f.timer.scheduled_count(), 0);
    }
}
