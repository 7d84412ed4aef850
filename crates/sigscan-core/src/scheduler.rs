//! Cancellable recurring timer driving auto-refresh.
//!
//! At most one ticker task is alive per [`RefreshScheduler`]. Arming aborts
//! the previous ticker before spawning the next one, and [`generation`]
//! increments on every arm or cancel so callers can observe how many
//! re-arms happened.
//!
//! Each firing spawns the task detached: cancelling stops future firings
//! but never aborts a task that already started.
//!
//! [`generation`]: RefreshScheduler::generation

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use crate::ValidationError;

pub const MIN_REFRESH_PERIOD: Duration = Duration::from_secs(1);
/// One week.
pub const MAX_REFRESH_PERIOD: Duration = Duration::from_secs(7 * 24 * 60 * 60);

pub type RefreshFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
pub type RefreshTask = Arc<dyn Fn() -> RefreshFuture + Send + Sync>;

#[derive(Default)]
struct Slot {
    ticker: Option<JoinHandle<()>>,
    task: Option<RefreshTask>,
    period: Option<Duration>,
}

#[derive(Default)]
pub struct RefreshScheduler {
    slot: Mutex<Slot>,
    generation: AtomicU64,
    fired: Arc<AtomicU64>,
}

impl RefreshScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts firing `task` every `period`, replacing any previous schedule.
    /// The first firing happens one full period from now.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm(&self, period: Duration, task: RefreshTask) -> Result<(), ValidationError> {
        validate_period(period)?;
        let mut slot = self.lock();
        self.arm_locked(&mut slot, period, task);
        Ok(())
    }

    /// Re-arms the current task with a new period. No-op when not armed.
    pub fn reschedule(&self, period: Duration) -> Result<(), ValidationError> {
        validate_period(period)?;
        let mut slot = self.lock();
        if let Some(task) = slot.task.clone() {
            self.arm_locked(&mut slot, period, task);
        }
        Ok(())
    }

    /// Stops future firings. Returns whether a ticker was running.
    pub fn cancel(&self) -> bool {
        let mut slot = self.lock();
        let was_armed = Self::abort(&mut slot);
        slot.task = None;
        slot.period = None;
        if was_armed {
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            debug!(generation, "auto-refresh cancelled");
        }
        was_armed
    }

    pub fn is_armed(&self) -> bool {
        self.lock().ticker.is_some()
    }

    pub fn period(&self) -> Option<Duration> {
        self.lock().period
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Total firings across every schedule this scheduler ran.
    pub fn fired(&self) -> u64 {
        self.fired.load(Ordering::SeqCst)
    }

    fn arm_locked(&self, slot: &mut Slot, period: Duration, task: RefreshTask) {
        Self::abort(slot);
        slot.ticker = Some(spawn_ticker(period, Arc::clone(&task), Arc::clone(&self.fired)));
        slot.task = Some(task);
        slot.period = Some(period);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(period_secs = period.as_secs(), generation, "auto-refresh armed");
    }

    fn abort(slot: &mut Slot) -> bool {
        match slot.ticker.take() {
            Some(ticker) => {
                ticker.abort();
                true
            }
            None => false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        let slot = self.slot.get_mut().unwrap_or_else(PoisonError::into_inner);
        Self::abort(slot);
    }
}

impl std::fmt::Debug for RefreshScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshScheduler")
            .field("armed", &self.is_armed())
            .field("period", &self.period())
            .field("generation", &self.generation())
            .field("fired", &self.fired())
            .finish()
    }
}

fn validate_period(period: Duration) -> Result<(), ValidationError> {
    if period < MIN_REFRESH_PERIOD {
        return Err(ValidationError::RefreshIntervalTooShort {
            secs: period.as_secs(),
            min_secs: MIN_REFRESH_PERIOD.as_secs(),
        });
    }
    if period > MAX_REFRESH_PERIOD {
        return Err(ValidationError::RefreshIntervalTooLong {
            secs: period.as_secs(),
            max_secs: MAX_REFRESH_PERIOD.as_secs(),
        });
    }
    Ok(())
}

fn spawn_ticker(period: Duration, task: RefreshTask, fired: Arc<AtomicU64>) -> JoinHandle<()> {
    let start = Instant::now() + period;
    tokio::spawn(async move {
        let mut ticker = interval_at(start, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            fired.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(task());
        }
    })
}
