// Audio playback module
// Uses Symphonia for decoding the silent clip and cpal for output

pub mod decoder;
#[cfg(feature = "cpal-output")]
pub mod output;
pub mod player;
pub mod sink;

use std::sync::Arc;

pub use decoder::DecodedClip;
pub use player::{ClipPlayer, HeadlessPlaybackFactory, PlaybackFactory, PlaybackHandle};
pub use sink::{AudioSink, NullSink};

#[cfg(feature = "cpal-output")]
pub use output::{CpalOutput, CpalPlaybackFactory};

/// The device-backed factory when built with `cpal-output`, headless otherwise.
pub fn default_playback_factory() -> Arc<dyn PlaybackFactory> {
    #[cfg(feature = "cpal-output")]
    {
        Arc::new(CpalPlaybackFactory)
    }
    #[cfg(not(feature = "cpal-output"))]
    {
        Arc::new(HeadlessPlaybackFactory::new())
    }
}
