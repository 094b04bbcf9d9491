// Destination for rendered clip samples
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Somewhere interleaved samples can be queued for output.
pub trait AudioSink: Send {
    /// Queue samples without blocking. Returns how many were accepted.
    fn write(&self, samples: &[f32]) -> usize;

    /// Drop anything still queued.
    fn clear(&self);
}

/// Discards samples but keeps count of them. Used by headless hosts.
#[derive(Debug, Default, Clone)]
pub struct NullSink {
    written: Arc<AtomicU64>,
    clears: Arc<AtomicUsize>,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Share the sample counter with someone else (e.g. the factory).
    pub fn with_counter(written: Arc<AtomicU64>) -> Self {
        Self {
            written,
            clears: Arc::default(),
        }
    }

    pub fn samples_written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::Relaxed)
    }
}

impl AudioSink for NullSink {
    fn write(&self, samples: &[f32]) -> usize {
        self.written.fetch_add(samples.len() as u64, Ordering::Relaxed);
        samples.len()
    }

    fn clear(&self) {
        self.clears.fetch_add(1, Ordering::Relaxed);
    }
}
