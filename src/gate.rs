//! Frame admission control
//!
//! Decides, per incoming frame, whether a decode attempt should run now.
//! Rejection is cheap and has no side effects, so the capture subsystem's
//! delivery context is never blocked and dropped frames retain no buffer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::models::ScanSettings;

/// Outcome of the admission check for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Decode this frame now
    Admitted,
    /// Too soon since the last decode attempt
    TooSoonSinceAnalysis,
    /// Too soon since the last successful scan
    TooSoonSinceScan,
    /// A decode is already in flight
    Busy,
    /// The session has been cancelled
    Cancelled,
}

impl GateDecision {
    /// Whether the frame was admitted for decoding
    pub fn is_admitted(self) -> bool {
        matches!(self, GateDecision::Admitted)
    }
}

/// Shared per-session scan state.
///
/// One struct behind an `Arc` instead of free-floating flags: the frame
/// delivery context and the main control flow (start/stop) race on these, so
/// everything is atomic or mutex-held. `working` is the sole mutual-exclusion
/// mechanism preventing overlapping decode attempts.
#[derive(Debug)]
pub struct ScanState {
    /// When the last admitted decode attempt started. Updated only when a
    /// decode actually starts, never on a throttled frame.
    last_analysis: Mutex<Option<Instant>>,
    pub(crate) was_scanned: AtomicBool,
    pub(crate) working: AtomicBool,
    pub(crate) cancelled: AtomicBool,
    pub(crate) analyzing: AtomicBool,
}

impl ScanState {
    /// Fresh state for a session that has not been started yet. `cancelled`
    /// starts true so frames arriving before `start` are rejected.
    pub fn new() -> Self {
        Self {
            last_analysis: Mutex::new(None),
            was_scanned: AtomicBool::new(false),
            working: AtomicBool::new(false),
            cancelled: AtomicBool::new(true),
            analyzing: AtomicBool::new(true),
        }
    }

    /// Clear throttling state and lift cancellation, ready for a new run
    pub fn reset(&self) {
        *lock_unpoisoned(&self.last_analysis) = None;
        self.was_scanned.store(false, Ordering::SeqCst);
        self.working.store(false, Ordering::SeqCst);
        self.cancelled.store(false, Ordering::SeqCst);
    }

    /// Reject all frames from now on. Cooperative: an in-flight decode is
    /// not interrupted, only new admissions are prevented.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether a decode is currently in flight
    pub fn is_working(&self) -> bool {
        self.working.load(Ordering::SeqCst)
    }

    /// Whether the session has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Whether the last dispatch reported a successful scan
    pub fn was_scanned_recently(&self) -> bool {
        self.was_scanned.load(Ordering::SeqCst)
    }

    /// Timestamp of the last admitted decode attempt
    pub fn last_analysis(&self) -> Option<Instant> {
        *lock_unpoisoned(&self.last_analysis)
    }

    pub(crate) fn release_working(&self) {
        self.working.store(false, Ordering::SeqCst);
    }
}

impl Default for ScanState {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Pure admission rule over an explicit state snapshot.
///
/// `elapsed_since_analysis` is `None` when no decode has started yet this
/// session. Rules are checked in order; the first that holds rejects the
/// frame.
pub fn evaluate(
    elapsed_since_analysis: Option<Duration>,
    was_scanned: bool,
    working: bool,
    cancelled: bool,
    settings: &ScanSettings,
) -> GateDecision {
    if let Some(elapsed) = elapsed_since_analysis {
        if elapsed < settings.delay_between_analyzing_frames {
            return GateDecision::TooSoonSinceAnalysis;
        }
        if was_scanned && elapsed < settings.delay_between_continuous_scans {
            return GateDecision::TooSoonSinceScan;
        }
    }
    if working {
        return GateDecision::Busy;
    }
    if cancelled {
        return GateDecision::Cancelled;
    }
    GateDecision::Admitted
}

/// Admission control over the incoming frame stream
#[derive(Debug)]
pub struct FrameGate {
    settings: ScanSettings,
}

impl FrameGate {
    /// Gate with the given throttling settings
    pub fn new(settings: ScanSettings) -> Self {
        Self { settings }
    }

    /// The gate's throttling settings
    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    /// Check one frame against the session state.
    ///
    /// On admission the state mutates: `was_scanned` clears, `working` is
    /// acquired, and `last_analysis` moves to `now`. On rejection nothing
    /// changes. A `now` earlier than `last_analysis` (out-of-order delivery)
    /// counts as zero elapsed and rejects by throttle.
    pub fn admit(&self, state: &ScanState, now: Instant) -> GateDecision {
        let elapsed = state
            .last_analysis()
            .map(|last| now.checked_duration_since(last).unwrap_or(Duration::ZERO));

        let decision = evaluate(
            elapsed,
            state.was_scanned.load(Ordering::SeqCst),
            state.working.load(Ordering::SeqCst),
            state.cancelled.load(Ordering::SeqCst),
            &self.settings,
        );

        match decision {
            GateDecision::Admitted => {
                // compare-exchange so a racing callback loses cleanly
                if state
                    .working
                    .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                    .is_err()
                {
                    return GateDecision::Busy;
                }
                state.was_scanned.store(false, Ordering::SeqCst);
                *lock_unpoisoned(&state.last_analysis) = Some(now);
                GateDecision::Admitted
            }
            GateDecision::TooSoonSinceAnalysis => {
                debug!("too soon between frames");
                decision
            }
            GateDecision::TooSoonSinceScan => {
                debug!("too soon since last scan");
                decision
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with_delays(analysis_ms: u64, continuous_ms: u64) -> ScanSettings {
        ScanSettings {
            delay_between_analyzing_frames: Duration::from_millis(analysis_ms),
            delay_between_continuous_scans: Duration::from_millis(continuous_ms),
            ..ScanSettings::default()
        }
    }

    fn running_state() -> ScanState {
        let state = ScanState::new();
        state.reset();
        state
    }

    #[test]
    fn test_first_frame_is_admitted() {
        let gate = FrameGate::new(settings_with_delays(100, 1000));
        let state = running_state();
        let now = Instant::now();

        assert_eq!(gate.admit(&state, now), GateDecision::Admitted);
        assert!(state.is_working());
        assert_eq!(state.last_analysis(), Some(now));
    }

    #[test]
    fn test_throttle_scenario() {
        // delay 100ms: frames at 0ms and 50ms -> second rejected; 150ms -> admitted
        let gate = FrameGate::new(settings_with_delays(100, 1000));
        let state = running_state();
        let t0 = Instant::now();

        assert_eq!(gate.admit(&state, t0), GateDecision::Admitted);
        state.release_working();

        assert_eq!(
            gate.admit(&state, t0 + Duration::from_millis(50)),
            GateDecision::TooSoonSinceAnalysis
        );
        assert_eq!(
            gate.admit(&state, t0 + Duration::from_millis(150)),
            GateDecision::Admitted
        );
    }

    #[test]
    fn test_rejection_leaves_state_unchanged() {
        let gate = FrameGate::new(settings_with_delays(100, 1000));
        let state = running_state();
        let t0 = Instant::now();

        assert_eq!(gate.admit(&state, t0), GateDecision::Admitted);
        state.release_working();

        let decision = gate.admit(&state, t0 + Duration::from_millis(10));
        assert!(!decision.is_admitted());
        assert!(!state.is_working());
        assert_eq!(state.last_analysis(), Some(t0));
    }

    #[test]
    fn test_continuous_scan_delay() {
        let gate = FrameGate::new(settings_with_delays(100, 1000));
        let state = running_state();
        let t0 = Instant::now();

        assert_eq!(gate.admit(&state, t0), GateDecision::Admitted);
        state.was_scanned.store(true, Ordering::SeqCst);
        state.release_working();

        // Analysis delay has elapsed but the continuous-scan delay has not
        assert_eq!(
            gate.admit(&state, t0 + Duration::from_millis(200)),
            GateDecision::TooSoonSinceScan
        );
        // After the continuous-scan delay the frame goes through and the
        // scanned flag clears
        assert_eq!(
            gate.admit(&state, t0 + Duration::from_millis(1100)),
            GateDecision::Admitted
        );
        assert!(!state.was_scanned_recently());
    }

    #[test]
    fn test_busy_while_working() {
        let gate = FrameGate::new(settings_with_delays(0, 0));
        let state = running_state();
        let t0 = Instant::now();

        assert_eq!(gate.admit(&state, t0), GateDecision::Admitted);
        // working has not been released
        assert_eq!(
            gate.admit(&state, t0 + Duration::from_millis(500)),
            GateDecision::Busy
        );
    }

    #[test]
    fn test_cancelled_rejects() {
        let gate = FrameGate::new(settings_with_delays(0, 0));
        let state = running_state();
        state.cancel();

        assert_eq!(gate.admit(&state, Instant::now()), GateDecision::Cancelled);
        assert!(!state.is_working());
    }

    #[test]
    fn test_fresh_state_rejects_until_reset() {
        let gate = FrameGate::new(settings_with_delays(0, 0));
        let state = ScanState::new();

        assert_eq!(gate.admit(&state, Instant::now()), GateDecision::Cancelled);
        state.reset();
        assert_eq!(gate.admit(&state, Instant::now()), GateDecision::Admitted);
    }

    #[test]
    fn test_out_of_order_timestamp_rejects() {
        let gate = FrameGate::new(settings_with_delays(100, 1000));
        let state = running_state();
        let t0 = Instant::now() + Duration::from_millis(500);

        assert_eq!(gate.admit(&state, t0), GateDecision::Admitted);
        state.release_working();

        // A frame stamped before the last analysis counts as zero elapsed
        assert_eq!(
            gate.admit(&state, t0 - Duration::from_millis(100)),
            GateDecision::TooSoonSinceAnalysis
        );
    }

    #[test]
    fn test_evaluate_order() {
        let settings = settings_with_delays(100, 1000);
        let soon = Some(Duration::from_millis(10));

        // Throttle wins over every other reason
        assert_eq!(
            evaluate(soon, true, true, true, &settings),
            GateDecision::TooSoonSinceAnalysis
        );
        // Continuous-scan check comes before working
        assert_eq!(
            evaluate(Some(Duration::from_millis(500)), true, true, true, &settings),
            GateDecision::TooSoonSinceScan
        );
        // Working before cancelled
        assert_eq!(
            evaluate(None, false, true, true, &settings),
            GateDecision::Busy
        );
        assert_eq!(
            evaluate(None, false, false, true, &settings),
            GateDecision::Cancelled
        );
        assert_eq!(
            evaluate(None, false, false, false, &settings),
            GateDecision::Admitted
        );
    }
}
