// Silent clip player
use std::path::Path;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use crate::audio::decoder::DecodedClip;
use crate::audio::sink::{AudioSink, NullSink};
use crate::error::Result;

/// A constructed playback device for one media resource.
pub trait PlaybackHandle: Send {
    /// Start playing from the beginning. Returns false if nothing was queued.
    fn play(&mut self) -> bool;

    fn stop(&mut self);

    fn set_volume(&mut self, volume: f32);

    /// Extra repetitions after the first play (0 plays once).
    fn set_number_of_loops(&mut self, loops: u32);
}

/// Builds playback handles from resolved asset paths.
pub trait PlaybackFactory: Send + Sync {
    fn create(&self, path: &Path) -> Result<Box<dyn PlaybackHandle>>;
}

/// Plays an in-memory clip into an [`AudioSink`].
pub struct ClipPlayer<S: AudioSink> {
    clip: DecodedClip,
    sink: S,
    volume: f32,
    number_of_loops: u32,
}

impl<S: AudioSink> ClipPlayer<S> {
    pub fn new(clip: DecodedClip, sink: S) -> Self {
        Self {
            clip,
            sink,
            volume: 1.0,
            number_of_loops: 0,
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn number_of_loops(&self) -> u32 {
        self.number_of_loops
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

impl<S: AudioSink> PlaybackHandle for ClipPlayer<S> {
    fn play(&mut self) -> bool {
        // Restart rather than append to a play still in progress
        self.sink.clear();

        let rendered: Vec<f32> = self.clip.samples().iter().map(|s| s * self.volume).collect();
        let mut queued = 0;
        for _ in 0..=self.number_of_loops {
            let written = self.sink.write(&rendered);
            queued += written;
            if written < rendered.len() {
                tracing::debug!(written, wanted = rendered.len(), "audio sink full, clip truncated");
                break;
            }
        }
        queued > 0
    }

    fn stop(&mut self) {
        self.sink.clear();
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn set_number_of_loops(&mut self, loops: u32) {
        self.number_of_loops = loops;
    }
}

/// Decodes the asset and plays it into a [`NullSink`].
///
/// For hosts without an audio device of their own (CI, servers); the decode
/// step still validates the asset exactly like a device-backed factory.
#[derive(Debug, Default)]
pub struct HeadlessPlaybackFactory {
    written: Arc<AtomicU64>,
}

impl HeadlessPlaybackFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Samples rendered by every player this factory built.
    pub fn samples_written(&self) -> u64 {
        self.written.load(std::sync::atomic::Ordering::Relaxed)
    }
}

impl PlaybackFactory for HeadlessPlaybackFactory {
    fn create(&self, path: &Path) -> Result<Box<dyn PlaybackHandle>> {
        let clip = DecodedClip::from_file(path)?;
        tracing::debug!(
            path = %path.display(),
            frames = clip.frames(),
            sample_rate = clip.sample_rate(),
            "decoded silent clip"
        );
        Ok(Box::new(ClipPlayer::new(clip, NullSink::with_counter(Arc::clone(&self.written)))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::decoder::tests::write_silent_wav;
    use crate::error::KeepAliveError;

    #[test]
    fn play_restarts_and_scales_by_volume() {
        let clip = DecodedClip::from_samples(vec![0.5; 10], 8_000, 1);
        let sink = NullSink::new();
        let mut player = ClipPlayer::new(clip, sink.clone());
        player.set_volume(0.01);

        assert!(player.play());
        assert!(player.play());

        assert_eq!(sink.samples_written(), 20);
        assert_eq!(sink.clears(), 2);
        assert_eq!(player.volume(), 0.01);
    }

    #[test]
    fn loops_repeat_the_clip() {
        let clip = DecodedClip::from_samples(vec![0.0; 4], 8_000, 2);
        let sink = NullSink::new();
        let mut player = ClipPlayer::new(clip, sink.clone());
        player.set_number_of_loops(2);

        player.play();
        assert_eq!(sink.samples_written(), 12);
    }

    #[test]
    fn headless_factory_decodes_asset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.wav");
        write_silent_wav(&path, 8_000, 1, 400);

        let factory = HeadlessPlaybackFactory::new();
        let mut player = factory.create(&path).unwrap();
        player.play();

        assert_eq!(factory.samples_written(), 400);
    }

    #[test]
    fn headless_factory_rejects_missing_file() {
        let factory = HeadlessPlaybackFactory::new();
        let err = factory.create(Path::new("/nowhere/blank.mp3")).err().unwrap();

        assert!(matches!(err, KeepAliveError::PlaybackConstructionFailed { .. }));
    }
}
