//! Fake platform services shared by the lifecycle tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use alarm_keepalive_lib::audio::{PlaybackFactory, PlaybackHandle};
use alarm_keepalive_lib::platform::{
    AssetResolver, AudioSession, BundleRegistrar, CategoryOptions, InterruptionBus, ManualTimer, PeriodicTimer,
    PluginRegistrar, SessionCategory, SessionMode,
};
use alarm_keepalive_lib::{Collaborators, KeepAliveController, KeepAliveError, KeepAliveSettings, Result};

/// Counters observed by the fake player and factory.
#[derive(Default)]
pub struct PlaybackLog {
    pub created: AtomicUsize,
    pub plays: AtomicUsize,
    pub stops: AtomicUsize,
    pub live: AtomicUsize,
    pub last_volume_bits: AtomicUsize,
    pub last_loops: AtomicUsize,
}

impl PlaybackLog {
    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn last_volume(&self) -> f32 {
        f32::from_bits(self.last_volume_bits.load(Ordering::SeqCst) as u32)
    }
}

struct FakePlayer {
    log: Arc<PlaybackLog>,
}

impl PlaybackHandle for FakePlayer {
    fn play(&mut self) -> bool {
        self.log.plays.fetch_add(1, Ordering::SeqCst);
        true
    }

    fn stop(&mut self) {
        self.log.stops.fetch_add(1, Ordering::SeqCst);
    }

    fn set_volume(&mut self, volume: f32) {
        self.log.last_volume_bits.store(volume.to_bits() as usize, Ordering::SeqCst);
    }

    fn set_number_of_loops(&mut self, loops: u32) {
        self.log.last_loops.store(loops as usize, Ordering::SeqCst);
    }
}

impl Drop for FakePlayer {
    fn drop(&mut self) {
        self.log.live.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct FakePlayback {
    pub log: Arc<PlaybackLog>,
    pub fail: AtomicBool,
}

impl PlaybackFactory for FakePlayback {
    fn create(&self, path: &Path) -> Result<Box<dyn PlaybackHandle>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(KeepAliveError::PlaybackConstructionFailed {
                path: path.to_path_buf(),
                reason: "device busy".to_string(),
            });
        }
        self.log.created.fetch_add(1, Ordering::SeqCst);
        self.log.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePlayer { log: Arc::clone(&self.log) }))
    }
}

pub struct FakeAssets {
    pub missing: AtomicBool,
}

impl AssetResolver for FakeAssets {
    fn resolve(&self, asset: &str, package: &str, registrar: &dyn PluginRegistrar) -> Result<PathBuf> {
        let path = registrar
            .asset_root()
            .join(registrar.lookup_key_for_asset(asset, package));
        if self.missing.load(Ordering::SeqCst) {
            Err(KeepAliveError::AssetNotFound {
                asset: asset.to_string(),
                path,
            })
        } else {
            Ok(path)
        }
    }
}

#[derive(Default)]
pub struct FakeSession {
    pub fail: AtomicBool,
    pub configured: AtomicUsize,
    pub activated: AtomicUsize,
}

impl AudioSession for FakeSession {
    fn set_category(&self, category: SessionCategory, mode: SessionMode, options: CategoryOptions) -> Result<()> {
        assert_eq!(category, SessionCategory::Playback);
        assert_eq!(mode, SessionMode::Default);
        assert!(options.mix_with_others);
        if self.fail.load(Ordering::SeqCst) {
            return Err(KeepAliveError::AudioSessionConfigFailed("session busy".to_string()));
        }
        self.configured.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn set_active(&self, _active: bool) -> Result<()> {
        self.activated.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct Harness {
    pub controller: KeepAliveController,
    pub registrar: BundleRegistrar,
    pub playback: Arc<FakePlayback>,
    pub assets: Arc<FakeAssets>,
    pub session: Arc<FakeSession>,
    pub bus: Arc<InterruptionBus>,
}

pub fn fake_playback() -> Arc<FakePlayback> {
    Arc::new(FakePlayback {
        log: Arc::new(PlaybackLog::default()),
        fail: AtomicBool::new(false),
    })
}

pub fn fake_assets() -> Arc<FakeAssets> {
    Arc::new(FakeAssets {
        missing: AtomicBool::new(false),
    })
}

impl Harness {
    pub fn with_timer(timer: Arc<dyn PeriodicTimer>) -> Self {
        let playback = fake_playback();
        let assets = fake_assets();
        let session = Arc::new(FakeSession::default());
        let bus = Arc::new(InterruptionBus::new());

        let controller = KeepAliveController::new(
            KeepAliveSettings::default(),
            Collaborators {
                assets: assets.clone(),
                playback: playback.clone(),
                session: session.clone(),
                interruptions: bus.clone(),
                timer,
            },
        );

        Self {
            controller,
            registrar: BundleRegistrar::new("/app/resources"),
            playback,
            assets,
            session,
            bus,
        }
    }

    pub fn manual() -> (Self, ManualTimer) {
        let timer = ManualTimer::new();
        (Self::with_timer(Arc::new(timer.clone())), timer)
    }

    pub fn plays(&self) -> usize {
        self.playback.log.plays()
    }

    /// Playback handle present iff a timer is armed.
    pub fn assert_both_or_neither(&self, timer: &ManualTimer) {
        assert_eq!(
            self.playback.log.live() == 1,
            timer.live_count() == 1,
            "playback handle and timer out of step"
        );
        assert_eq!(self.controller.is_active(), timer.live_count() == 1);
    }
}
