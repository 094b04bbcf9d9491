// Audio output using cpal
// The stream is owned by a dedicated thread since cpal streams are not Send
// on every backend; samples reach it through a ring buffer

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use parking_lot::Mutex;
use ringbuf::{HeapRb, traits::{Consumer, Observer, Producer, Split}};
use rubato::{FftFixedIn, Resampler};

use crate::audio::decoder::DecodedClip;
use crate::audio::player::{ClipPlayer, PlaybackFactory, PlaybackHandle};
use crate::audio::sink::AudioSink;
use crate::error::{KeepAliveError, Result};

const RING_BUFFER_SIZE: usize = 48000 * 2 * 2; // ~2s of stereo audio at 48kHz
const RESAMPLE_CHUNK: usize = 1024;

type RingProducer = ringbuf::HeapProd<f32>;
type RingConsumer = ringbuf::HeapCons<f32>;

pub struct CpalOutput {
    producer: Arc<Mutex<RingProducer>>,
    pending_skip: Arc<AtomicUsize>,
    sample_rate: u32,
    channels: u16,
    shutdown: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl CpalOutput {
    /// Open the default output device
    pub fn open() -> Result<Self> {
        let rb = HeapRb::<f32>::new(RING_BUFFER_SIZE);
        let (producer, consumer) = rb.split();
        let pending_skip = Arc::new(AtomicUsize::new(0));
        let skip = Arc::clone(&pending_skip);

        let (ready_tx, ready_rx) = mpsc::channel::<std::result::Result<(u32, u16), String>>();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let thread = std::thread::Builder::new()
            .name("keepalive-output".to_string())
            .spawn(move || {
                let stream = match Self::start_stream(consumer, skip) {
                    Ok((stream, rate, channels)) => {
                        let _ = ready_tx.send(Ok((rate, channels)));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                // Parked until the owner hangs up
                let _ = shutdown_rx.recv();
                drop(stream);
            })
            .map_err(|e| KeepAliveError::Output(format!("failed to spawn output thread: {e}")))?;

        let (sample_rate, channels) = ready_rx
            .recv()
            .map_err(|_| KeepAliveError::Output("output thread exited early".to_string()))?
            .map_err(KeepAliveError::Output)?;

        tracing::debug!(sample_rate, channels, "audio output stream started");

        Ok(Self {
            producer: Arc::new(Mutex::new(producer)),
            pending_skip,
            sample_rate,
            channels,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    fn start_stream(
        consumer: RingConsumer,
        skip: Arc<AtomicUsize>,
    ) -> std::result::Result<(Stream, u32, u16), String> {
        let host = cpal::default_host();

        let device = host.default_output_device().ok_or("No output device available")?;

        let config = device
            .default_output_config()
            .map_err(|e| format!("Failed to get default output config: {e}"))?;

        let sample_rate = config.sample_rate().0;
        let channels = config.channels();
        let stream_config = config.config();

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => Self::build_stream::<f32>(&device, &stream_config, consumer, skip)?,
            cpal::SampleFormat::I16 => Self::build_stream::<i16>(&device, &stream_config, consumer, skip)?,
            cpal::SampleFormat::U16 => Self::build_stream::<u16>(&device, &stream_config, consumer, skip)?,
            format => return Err(format!("Unsupported sample format: {format:?}")),
        };

        stream.play().map_err(|e| format!("Failed to start stream: {e}"))?;

        Ok((stream, sample_rate, channels))
    }

    fn build_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
        device: &cpal::Device,
        config: &StreamConfig,
        mut consumer: RingConsumer,
        skip: Arc<AtomicUsize>,
    ) -> std::result::Result<Stream, String> {
        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    // Drop what was queued before the last clear
                    for _ in 0..skip.swap(0, Ordering::AcqRel) {
                        if consumer.try_pop().is_none() {
                            break;
                        }
                    }

                    for sample in data.iter_mut() {
                        let value = consumer.try_pop().unwrap_or(0.0);
                        *sample = T::from_sample(value);
                    }
                },
                move |err| {
                    tracing::error!("audio output error: {err}");
                },
                None,
            )
            .map_err(|e| format!("Failed to build output stream: {e}"))
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

impl AudioSink for CpalOutput {
    fn write(&self, samples: &[f32]) -> usize {
        self.producer.lock().push_slice(samples)
    }

    fn clear(&self) {
        let queued = self.producer.lock().occupied_len();
        self.pending_skip.store(queued, Ordering::Release);
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        self.shutdown.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Convert a clip to `target_rate`, keeping its channel layout.
pub fn resample(clip: &DecodedClip, target_rate: u32) -> Result<DecodedClip> {
    if clip.sample_rate() == target_rate || clip.frames() == 0 {
        return Ok(clip.clone());
    }

    let channels = clip.channels();
    let mut resampler = FftFixedIn::<f32>::new(
        clip.sample_rate() as usize,
        target_rate as usize,
        RESAMPLE_CHUNK,
        2,
        channels,
    )
    .map_err(|e| KeepAliveError::Output(format!("failed to create resampler: {e}")))?;

    let planar: Vec<Vec<f32>> = (0..channels)
        .map(|ch| clip.samples().iter().skip(ch).step_by(channels).copied().collect())
        .collect();

    let frames = clip.frames();
    let mut out: Vec<Vec<f32>> = vec![Vec::new(); channels];
    let mut pos = 0;
    while pos < frames {
        let need = resampler.input_frames_next();
        let end = (pos + need).min(frames);
        let chunk: Vec<Vec<f32>> = planar
            .iter()
            .map(|plane| {
                let mut part = plane[pos..end].to_vec();
                part.resize(need, 0.0);
                part
            })
            .collect();

        let processed = resampler
            .process(&chunk, None)
            .map_err(|e| KeepAliveError::Output(format!("resampling failed: {e}")))?;
        for (plane, part) in out.iter_mut().zip(processed) {
            plane.extend(part);
        }
        pos = end;
    }

    let out_frames = out.first().map(Vec::len).unwrap_or(0);
    let mut interleaved = Vec::with_capacity(out_frames * channels);
    for frame in 0..out_frames {
        for plane in &out {
            interleaved.push(plane[frame]);
        }
    }

    Ok(DecodedClip::from_samples(interleaved, target_rate, channels))
}

/// Plays the decoded asset on the default output device.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalPlaybackFactory;

impl PlaybackFactory for CpalPlaybackFactory {
    fn create(&self, path: &Path) -> Result<Box<dyn PlaybackHandle>> {
        let failed = |e: KeepAliveError| KeepAliveError::PlaybackConstructionFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        let clip = DecodedClip::from_file(path)?;
        let output = CpalOutput::open().map_err(failed)?;
        let clip = resample(&clip.with_channels(usize::from(output.channels())), output.sample_rate()).map_err(failed)?;

        Ok(Box::new(ClipPlayer::new(clip, output)))
    }
}
