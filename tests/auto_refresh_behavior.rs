//! Behavior-driven tests for auto-refresh
//!
//! These tests verify HOW the refresh timer drives quick scans: when it
//! fires, how re-timing replaces the old timer, what cancellation stops and
//! what happens when a refresh is still running at the next tick. Time is
//! paused and advanced by hand.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use sigscan_core::service::ScanFuture;
use sigscan_core::{
    MockScanService, ScanError, ScanMode, ScanOrchestrator, ScanPhase, ScanRequest, ScanService,
    ScannerState, Symbol, Timeframe, ValidationError,
};
use sigscan_tests::settle;
use tokio::sync::oneshot;

/// Answers from the mock payload, or waits on a held gate when one is queued.
#[derive(Default)]
struct ScriptedBackend {
    held: Mutex<VecDeque<oneshot::Receiver<()>>>,
    quick_flags: Mutex<Vec<bool>>,
}

impl ScriptedBackend {
    fn hold_next(&self) -> oneshot::Sender<()> {
        let (release, held) = oneshot::channel();
        self.held.lock().expect("lock").push_back(held);
        release
    }

    fn calls(&self) -> usize {
        self.quick_flags.lock().expect("lock").len()
    }

    fn quick_flags(&self) -> Vec<bool> {
        self.quick_flags.lock().expect("lock").clone()
    }
}

impl ScanService for ScriptedBackend {
    fn scan<'a>(&'a self, request: ScanRequest) -> ScanFuture<'a> {
        self.quick_flags.lock().expect("lock").push(request.is_quick());
        let held = self.held.lock().expect("lock").pop_front();
        Box::pin(async move {
            if let Some(held) = held {
                held.await
                    .map_err(|_| ScanError::transport("release dropped"))?;
            }
            Ok::<Value, ScanError>(MockScanService::payload(&request))
        })
    }
}

fn orchestrator(backend: &Arc<ScriptedBackend>) -> ScanOrchestrator {
    let state = ScannerState::new(
        vec![Symbol::parse("BTCUSDT").expect("valid")],
        vec![Timeframe::parse("1h").expect("valid")],
    );
    ScanOrchestrator::new(backend.clone(), state)
}

async fn advance(duration: Duration) {
    tokio::time::advance(duration).await;
    settle().await;
}

const SECOND: Duration = Duration::from_secs(1);

// =============================================================================
// Timer Firing
// =============================================================================

#[tokio::test(start_paused = true)]
async fn when_auto_refresh_is_enabled_system_runs_quick_scans_each_period() {
    // Given: Auto-refresh every 60 seconds
    let backend = Arc::new(ScriptedBackend::default());
    let scanner = orchestrator(&backend);
    scanner
        .set_auto_refresh(true, Some(Duration::from_secs(60)))
        .expect("valid interval");

    // When: Just under one period passes
    advance(59 * SECOND).await;

    // Then: Nothing has fired yet
    assert_eq!(backend.calls(), 0);

    // When: The period elapses, then a second one
    advance(SECOND).await;
    assert_eq!(backend.calls(), 1);
    advance(60 * SECOND).await;

    // Then: Two quick scans ran and both completed
    assert_eq!(backend.quick_flags(), vec![true, true]);
    let state = scanner.state();
    assert_eq!(state.completed_scans, 2);
    assert_eq!(state.phase, ScanPhase::Success);
    assert!(state.auto_refresh.enabled);
    assert_eq!(scanner.history().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn when_interval_is_shortened_system_replaces_the_timer_instead_of_adding_one() {
    // Given: Auto-refresh every 60 seconds
    let backend = Arc::new(ScriptedBackend::default());
    let scanner = orchestrator(&backend);
    scanner
        .set_auto_refresh(true, Some(Duration::from_secs(60)))
        .expect("valid interval");

    // When: The interval is changed to 30 seconds right away
    scanner
        .set_auto_refresh(true, Some(Duration::from_secs(30)))
        .expect("valid interval");

    // Then: Exactly one firing at 30s, and at 60s only the new timer fires
    advance(29 * SECOND).await;
    assert_eq!(backend.calls(), 0);
    advance(SECOND).await;
    assert_eq!(backend.calls(), 1);
    advance(30 * SECOND).await;
    assert_eq!(backend.calls(), 2);

    assert_eq!(scanner.scheduler().period(), Some(Duration::from_secs(30)));
    assert_eq!(scanner.scheduler().generation(), 2);
    assert_eq!(scanner.state().auto_refresh.interval, Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn when_auto_refresh_is_disabled_system_stops_future_scans() {
    // Given: One refresh has already happened
    let backend = Arc::new(ScriptedBackend::default());
    let scanner = orchestrator(&backend);
    scanner
        .set_auto_refresh(true, Some(Duration::from_secs(30)))
        .expect("valid interval");
    advance(30 * SECOND).await;
    assert_eq!(backend.calls(), 1);

    // When: Auto-refresh is turned off and time keeps running
    scanner.set_auto_refresh(false, None).expect("disable");
    advance(120 * SECOND).await;

    // Then: No further scans, interval remembered for next time
    assert_eq!(backend.calls(), 1);
    assert!(!scanner.scheduler().is_armed());
    let state = scanner.state();
    assert!(!state.auto_refresh.enabled);
    assert_eq!(state.auto_refresh.interval, Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn when_refresh_is_disabled_mid_scan_system_lets_the_running_scan_finish() {
    // Given: A refresh scan held open by a slow backend
    let backend = Arc::new(ScriptedBackend::default());
    let release = backend.hold_next();
    let scanner = orchestrator(&backend);
    scanner
        .set_auto_refresh(true, Some(Duration::from_secs(30)))
        .expect("valid interval");
    advance(30 * SECOND).await;
    assert_eq!(backend.calls(), 1);
    assert_eq!(scanner.state().phase, ScanPhase::Scanning);

    // When: Auto-refresh is disabled, then the backend answers
    scanner.set_auto_refresh(false, None).expect("disable");
    release.send(()).expect("scan still waiting");
    settle().await;

    // Then: The scan completed normally
    let state = scanner.state();
    assert_eq!(state.phase, ScanPhase::Success);
    assert_eq!(state.results.len(), 1);
    assert!(!state.auto_refresh.enabled);
}

#[tokio::test(start_paused = true)]
async fn when_previous_refresh_is_still_running_system_skips_the_tick() {
    // Given: A refresh scan that will not answer until released
    let backend = Arc::new(ScriptedBackend::default());
    let release = backend.hold_next();
    let scanner = orchestrator(&backend);
    scanner
        .set_auto_refresh(true, Some(Duration::from_secs(30)))
        .expect("valid interval");
    advance(30 * SECOND).await;

    // When: The next tick arrives while it is still running
    advance(30 * SECOND).await;

    // Then: No second request is sent and the skip is counted
    assert_eq!(backend.calls(), 1);
    assert_eq!(scanner.skipped_refreshes(), 1);
    assert_eq!(scanner.scheduler().fired(), 2);

    // When: The first refresh completes and another period passes
    release.send(()).expect("scan still waiting");
    settle().await;
    advance(30 * SECOND).await;

    // Then: Refreshing resumes
    assert_eq!(backend.calls(), 2);
    assert_eq!(scanner.state().completed_scans, 2);
}

// =============================================================================
// Interaction with Manual Scans and Validation
// =============================================================================

#[tokio::test(start_paused = true)]
async fn when_user_scans_manually_system_keeps_the_refresh_timer_running() {
    // Given: Auto-refresh armed
    let backend = Arc::new(ScriptedBackend::default());
    let scanner = orchestrator(&backend);
    scanner
        .set_auto_refresh(true, Some(Duration::from_secs(30)))
        .expect("valid interval");

    // When: A manual deep scan runs between ticks
    advance(10 * SECOND).await;
    scanner.scan(ScanMode::Deep).await.expect("manual scan");
    advance(20 * SECOND).await;

    // Then: Both ran, the manual one in deep mode
    assert_eq!(backend.quick_flags(), vec![false, true]);
    assert!(scanner.scheduler().is_armed());
}

#[tokio::test(start_paused = true)]
async fn when_interval_is_below_one_second_system_rejects_it_and_stays_disabled() {
    // Given: An idle scanner
    let backend = Arc::new(ScriptedBackend::default());
    let scanner = orchestrator(&backend);

    // When: A sub-second interval is requested
    let error = scanner
        .set_auto_refresh(true, Some(Duration::from_millis(500)))
        .expect_err("too short");

    // Then: Nothing was armed and the state is unchanged
    assert!(matches!(error, ValidationError::RefreshIntervalTooShort { .. }));
    assert!(!scanner.scheduler().is_armed());
    assert!(!scanner.state().auto_refresh.enabled);
    advance(10 * SECOND).await;
    assert_eq!(backend.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn when_interval_exceeds_one_week_system_rejects_it_and_keeps_the_running_timer() {
    // Given: Auto-refresh every 30 seconds
    let backend = Arc::new(ScriptedBackend::default());
    let scanner = orchestrator(&backend);
    scanner
        .set_auto_refresh(true, Some(Duration::from_secs(30)))
        .expect("valid interval");

    // When: An interval far beyond a week is requested
    let error = scanner
        .set_auto_refresh(true, Some(Duration::from_secs(u64::MAX)))
        .expect_err("too long");

    // Then: Rejected without panicking; the 30 second timer keeps running
    assert!(matches!(error, ValidationError::RefreshIntervalTooLong { .. }));
    assert_eq!(scanner.scheduler().period(), Some(Duration::from_secs(30)));
    assert_eq!(scanner.state().auto_refresh.interval, Duration::from_secs(30));
    advance(30 * SECOND).await;
    assert_eq!(backend.calls(), 1);
}
