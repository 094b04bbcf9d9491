// Clip decoding using Symphonia
// The keep-alive asset is short, so it is decoded once into memory

use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{KeepAliveError, Result};

/// Interleaved f32 PCM held in memory.
#[derive(Debug, Clone)]
pub struct DecodedClip {
    samples: Arc<[f32]>,
    sample_rate: u32,
    channels: usize,
}

impl DecodedClip {
    /// Decode a whole audio file
    pub fn from_file(path: &Path) -> Result<Self> {
        let failed = |reason: String| KeepAliveError::PlaybackConstructionFailed {
            path: path.to_path_buf(),
            reason,
        };

        let mut decoder = ClipDecoder::open(path).map_err(failed)?;
        let mut samples = Vec::new();
        while let Some(chunk) = decoder.decode_next().map_err(failed)? {
            samples.extend_from_slice(&chunk);
        }

        if samples.is_empty() {
            return Err(failed("no audio frames decoded".to_string()));
        }

        Ok(Self::from_samples(samples, decoder.sample_rate, decoder.channels))
    }

    pub fn from_samples(samples: Vec<f32>, sample_rate: u32, channels: usize) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
            channels: channels.max(1),
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    /// Remap to `channels` output channels, cycling through the source ones
    /// (mono is duplicated, surplus source channels are dropped).
    pub fn with_channels(&self, channels: usize) -> Self {
        let channels = channels.max(1);
        if channels == self.channels {
            return self.clone();
        }

        let mut remapped = Vec::with_capacity(self.frames() * channels);
        for frame in self.samples.chunks_exact(self.channels) {
            for ch in 0..channels {
                remapped.push(frame[ch % self.channels]);
            }
        }
        Self::from_samples(remapped, self.sample_rate, channels)
    }
}

struct ClipDecoder {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    channels: usize,
}

impl ClipDecoder {
    fn open(path: &Path) -> std::result::Result<Self, String> {
        let file = File::open(path).map_err(|e| format!("failed to open file: {e}"))?;

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| format!("failed to probe file format: {e}"))?;

        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| "no audio track found".to_string())?;

        let track_id = track.id;
        let sample_rate = track.codec_params.sample_rate.unwrap_or(44100);
        let channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(2);

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| format!("failed to create decoder: {e}"))?;

        Ok(Self {
            format,
            decoder,
            track_id,
            sample_rate,
            channels,
        })
    }

    /// Next packet as interleaved f32, or None at end of stream
    fn decode_next(&mut self) -> std::result::Result<Option<Vec<f32>>, String> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    return Ok(None);
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.decoder.reset();
                    continue;
                }
                Err(e) => return Err(format!("failed to read packet: {e}")),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
                    buffer.copy_interleaved_ref(decoded);
                    return Ok(Some(buffer.samples().to_vec()));
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    tracing::debug!("decode error (skipping packet): {e}");
                    continue;
                }
                Err(e) => return Err(format!("decode failed: {e}")),
            }
        }
    }
}
