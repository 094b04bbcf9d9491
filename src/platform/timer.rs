// Periodic timers driving the keep-alive emissions
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

pub type TickCallback = Arc<dyn Fn() + Send + Sync>;

/// A scheduled periodic timer. Cancelling is immediate: no tick fires after
/// `cancel` returns.
pub trait TimerHandle: Send {
    fn cancel(&self);
}

pub trait PeriodicTimer: Send + Sync {
    /// Arm a repeating timer. The first tick is one `period` from now.
    fn schedule(&self, period: Duration, callback: TickCallback) -> Box<dyn TimerHandle>;
}

/// Timer backed by a task on a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioTimer {
    runtime: Handle,
}

impl TokioTimer {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Use the runtime we are currently running on, if any.
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl PeriodicTimer for TokioTimer {
    fn schedule(&self, period: Duration, callback: TickCallback) -> Box<dyn TimerHandle> {
        let period = period.max(Duration::from_millis(1));
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);

        let task = self.runtime.spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                if flag.load(Ordering::Acquire) {
                    break;
                }
                callback();
            }
        });

        Box::new(TokioTimerHandle { cancelled, task })
    }
}

struct TokioTimerHandle {
    cancelled: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl TimerHandle for TokioTimerHandle {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.task.abort();
    }
}

impl Drop for TokioTimerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

struct ManualEntry {
    period: Duration,
    callback: TickCallback,
    cancelled: Arc<AtomicBool>,
}

/// Timer whose ticks are fired explicitly by the host's own run loop.
#[derive(Default, Clone)]
pub struct ManualTimer {
    entries: Arc<Mutex<Vec<ManualEntry>>>,
    scheduled: Arc<AtomicUsize>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire one tick on every live timer. Returns the number of callbacks run.
    pub fn fire(&self) -> usize {
        let callbacks: Vec<TickCallback> = {
            let mut entries = self.entries.lock();
            entries.retain(|entry| !entry.cancelled.load(Ordering::Acquire));
            entries.iter().map(|entry| Arc::clone(&entry.callback)).collect()
        };

        for callback in &callbacks {
            callback();
        }
        callbacks.len()
    }

    /// Total number of `schedule` calls so far, cancelled timers included.
    pub fn scheduled_count(&self) -> usize {
        self.scheduled.load(Ordering::SeqCst)
    }

    pub fn live_count(&self) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|entry| !entry.cancelled.load(Ordering::Acquire))
            .count()
    }

    pub fn periods(&self) -> Vec<Duration> {
        self.entries
            .lock()
            .iter()
            .filter(|entry| !entry.cancelled.load(Ordering::Acquire))
            .map(|entry| entry.period)
            .collect()
    }
}

impl PeriodicTimer for ManualTimer {
    fn schedule(&self, period: Duration, callback: TickCallback) -> Box<dyn TimerHandle> {
        let cancelled = Arc::new(AtomicBool::new(false));
        self.entries.lock().push(ManualEntry {
            period,
            callback,
            cancelled: Arc::clone(&cancelled),
        });
        self.scheduled.fetch_add(1, Ordering::SeqCst);
        Box::new(ManualTimerHandle { cancelled })
    }
}

struct ManualTimerHandle {
    cancelled: Arc<AtomicBool>,
}

impl TimerHandle for ManualTimerHandle {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

impl Drop for ManualTimerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
