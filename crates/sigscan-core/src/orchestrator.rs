//! Scan request lifecycle and auto-refresh.
//!
//! [`ScanOrchestrator`] is a cheap handle (`Clone`) over shared state. It
//! snapshots the current inputs, issues the request through a
//! [`ScanService`], normalizes the payload and folds the outcome into the
//! [`ScannerState`] reducer. Locks are never held across the network await,
//! so a manual scan and an auto-refresh scan can overlap; whichever resolves
//! last is the one left in state.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::history::{SessionEntry, SessionHistory};
use crate::normalize::normalize_response;
use crate::request::{ScanMode, ScanProfile, ScanRequest, ScannerRunConfig};
use crate::scheduler::{RefreshFuture, RefreshScheduler, RefreshTask};
use crate::service::ScanService;
use crate::state::{self, ScannerEvent, ScannerState};
use crate::{ScanError, ScanResult, Symbol, Timeframe, UtcDateTime, ValidationError};

/// What a successful scan produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanOutcome {
    pub session_id: Uuid,
    pub results: Vec<ScanResult>,
    pub warnings: Vec<String>,
}

struct Inner {
    service: Arc<dyn ScanService>,
    profile: Mutex<ScanProfile>,
    state: Mutex<ScannerState>,
    updates: watch::Sender<ScannerState>,
    history: Mutex<SessionHistory>,
    scheduler: RefreshScheduler,
    refresh_in_flight: AtomicBool,
    skipped_refreshes: AtomicU64,
}

#[derive(Clone)]
pub struct ScanOrchestrator {
    inner: Arc<Inner>,
}

impl ScanOrchestrator {
    pub fn new(service: Arc<dyn ScanService>, state: ScannerState) -> Self {
        let (updates, _) = watch::channel(state.clone());
        Self {
            inner: Arc::new(Inner {
                service,
                profile: Mutex::new(ScanProfile::default()),
                state: Mutex::new(state),
                updates,
                history: Mutex::new(SessionHistory::default()),
                scheduler: RefreshScheduler::new(),
                refresh_in_flight: AtomicBool::new(false),
                skipped_refreshes: AtomicU64::new(0),
            }),
        }
    }

    pub fn with_profile(self, profile: ScanProfile) -> Self {
        self.set_profile(profile);
        self
    }

    pub fn with_history(self, history: SessionHistory) -> Self {
        *lock(&self.inner.history) = history;
        self
    }

    /// Runs one scan with the current inputs.
    ///
    /// Empty inputs are rejected before the scan enters `Scanning`; the
    /// previous results stay. A backend failure ends in `Failure` with the
    /// result list cleared. Nothing is retried.
    pub async fn scan(&self, mode: ScanMode) -> Result<ScanOutcome, ScanError> {
        let (symbols, timeframes) = {
            let state = lock(&self.inner.state);
            (state.symbols.clone(), state.timeframes.clone())
        };
        let config = match ScannerRunConfig::new(symbols, timeframes) {
            Ok(config) => config,
            Err(error) => {
                debug!(error = %error, "scan rejected");
                self.dispatch(ScannerEvent::ScanRejected(error.clone()));
                return Err(ScanError::from(error));
            }
        };
        self.dispatch(ScannerEvent::ScanStarted);
        let profile = self.profile();
        let request = ScanRequest::build(&config, &profile, mode);
        info!(
            symbols = config.symbols().len(),
            timeframes = config.timeframes().len(),
            quick = request.is_quick(),
            "scan started"
        );

        let payload = match self.inner.service.scan(request).await {
            Ok(payload) => payload,
            Err(error) => {
                warn!(code = error.code(), error = %error, "scan failed");
                self.dispatch(ScannerEvent::ScanFailed(error.clone()));
                return Err(error);
            }
        };

        let batch = normalize_response(&payload);
        info!(
            results = batch.results.len(),
            warnings = batch.warnings.len(),
            "scan completed"
        );
        self.dispatch(ScannerEvent::ScanSucceeded {
            results: batch.results.clone(),
            warnings: batch.warnings.clone(),
            at: UtcDateTime::now(),
        });

        let entry = SessionEntry::new(
            config.symbols().to_vec(),
            config.timeframes().to_vec(),
            batch.results.clone(),
        );
        let session_id = lock(&self.inner.history).record(entry);

        Ok(ScanOutcome {
            session_id,
            results: batch.results,
            warnings: batch.warnings,
        })
    }

    /// Enables, disables or retimes auto-refresh.
    ///
    /// Any previous timer is cancelled before a new one is armed, so exactly
    /// one timer is live while enabled. `interval: None` keeps the current
    /// interval. A scan already running is left to finish.
    pub fn set_auto_refresh(
        &self,
        enabled: bool,
        interval: Option<Duration>,
    ) -> Result<(), ValidationError> {
        let period = interval.unwrap_or_else(|| lock(&self.inner.state).auto_refresh.interval);
        if enabled {
            self.inner.scheduler.arm(period, self.refresh_task())?;
        } else {
            self.inner.scheduler.cancel();
        }
        self.dispatch(ScannerEvent::AutoRefreshChanged { enabled, interval });
        info!(enabled, interval_secs = period.as_secs(), "auto-refresh updated");
        Ok(())
    }

    fn refresh_task(&self) -> RefreshTask {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        Arc::new(move || {
            let weak = weak.clone();
            Box::pin(async move {
                if let Some(inner) = weak.upgrade() {
                    ScanOrchestrator { inner }.refresh_tick().await;
                }
            }) as RefreshFuture
        })
    }

    /// One timer firing. Skipped while the previous refresh scan is still out.
    async fn refresh_tick(&self) {
        if self.inner.refresh_in_flight.swap(true, Ordering::SeqCst) {
            self.inner.skipped_refreshes.fetch_add(1, Ordering::SeqCst);
            debug!("auto-refresh tick skipped; previous refresh still running");
            return;
        }
        if let Err(error) = self.scan(ScanMode::Quick).await {
            warn!(code = error.code(), "auto-refresh scan failed");
        }
        self.inner.refresh_in_flight.store(false, Ordering::SeqCst);
    }

    /// Copies a history entry's symbols and timeframes back into the inputs.
    pub fn restore_session(&self, id: Uuid) -> Result<(), ValidationError> {
        let entry = lock(&self.inner.history).get(id).cloned();
        let entry = entry.ok_or_else(|| ValidationError::UnknownSession { id: id.to_string() })?;
        self.dispatch(ScannerEvent::SessionRestored {
            id,
            symbols: entry.symbols,
            timeframes: entry.timeframes,
        });
        Ok(())
    }

    /// Applies one event and returns the resulting state.
    pub fn dispatch(&self, event: ScannerEvent) -> ScannerState {
        let mut current = lock(&self.inner.state);
        *current = state::reduce(&current, event);
        self.inner.updates.send_replace(current.clone());
        current.clone()
    }

    /// Receiver that observes every state transition.
    pub fn subscribe(&self) -> watch::Receiver<ScannerState> {
        self.inner.updates.subscribe()
    }

    pub fn set_symbols(&self, symbols: Vec<Symbol>) {
        self.dispatch(ScannerEvent::SymbolsChanged(symbols));
    }

    pub fn set_timeframes(&self, timeframes: Vec<Timeframe>) {
        self.dispatch(ScannerEvent::TimeframesChanged(timeframes));
    }

    pub fn set_profile(&self, profile: ScanProfile) {
        *lock(&self.inner.profile) = profile;
    }

    pub fn profile(&self) -> ScanProfile {
        *lock(&self.inner.profile)
    }

    pub fn state(&self) -> ScannerState {
        lock(&self.inner.state).clone()
    }

    /// Filtered and sorted copy of the current results.
    pub fn visible_results(&self) -> Vec<ScanResult> {
        let current = lock(&self.inner.state);
        state::visible_results(&current).into_iter().cloned().collect()
    }

    pub fn history(&self) -> SessionHistory {
        lock(&self.inner.history).clone()
    }

    pub fn clear_history(&self) {
        lock(&self.inner.history).clear();
    }

    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.inner.scheduler
    }

    pub fn skipped_refreshes(&self) -> u64 {
        self.inner.skipped_refreshes.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for ScanOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanOrchestrator")
            .field("scheduler", &self.inner.scheduler)
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
