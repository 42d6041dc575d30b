//! Scan session lifecycle
//!
//! `Stopped -> Starting -> Running -> Stopping -> Stopped`. While running,
//! the host capture subsystem hands each frame to [`ScanSession::process_frame`]
//! from its serialized delivery context; start/stop arrive concurrently from
//! the main control flow.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::dispatch::{DecodeEngine, dispatch};
use crate::gate::{FrameGate, GateDecision, ScanState, lock_unpoisoned};
use crate::models::{Frame, ScanResult, ScanSettings};
use crate::utils::luminance::to_luminance_source;

/// Lifecycle phase of a scan session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Not scanning; frames are rejected
    Stopped,
    /// Start requested, state being reset
    Starting,
    /// Scanning; frames flow through gate, adapter, and dispatch
    Running,
    /// Stop requested, waiting for an in-flight decode to finish
    Stopping,
}

/// What happened to one frame handed to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The gate dropped the frame without decoding
    Rejected(GateDecision),
    /// Decoded but nothing usable was found (includes recovered per-frame
    /// adapter and engine failures)
    NoDetection,
    /// This many symbols were reported to the result sink
    Scanned(usize),
}

type ResultSink = Box<dyn FnMut(&[ScanResult]) + Send>;

/// A scanning session: shared throttling state, the frame gate, the decoding
/// engine, and the result sink, driven once per incoming frame.
pub struct ScanSession<E> {
    gate: FrameGate,
    state: Arc<ScanState>,
    engine: E,
    sink: Mutex<Option<ResultSink>>,
    phase: Mutex<SessionPhase>,
}

impl<E: DecodeEngine> ScanSession<E> {
    /// Create a stopped session
    pub fn new(settings: ScanSettings, engine: E) -> Self {
        Self {
            gate: FrameGate::new(settings),
            state: Arc::new(ScanState::new()),
            engine,
            sink: Mutex::new(None),
            phase: Mutex::new(SessionPhase::Stopped),
        }
    }

    /// Install the result sink invoked with each filtered result sequence
    pub fn on_results(&self, sink: impl FnMut(&[ScanResult]) + Send + 'static) {
        *lock_unpoisoned(&self.sink) = Some(Box::new(sink));
    }

    /// The session's throttling settings
    pub fn settings(&self) -> &ScanSettings {
        self.gate.settings()
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> SessionPhase {
        *lock_unpoisoned(&self.phase)
    }

    /// Shared scan state, for hosts that surface it in an overlay UI
    pub fn state(&self) -> &Arc<ScanState> {
        &self.state
    }

    /// Pause or resume decoding without tearing the session down. While
    /// paused, frames are still admitted and converted but the engine is
    /// never invoked.
    pub fn set_analyzing(&self, analyzing: bool) {
        self.state.analyzing.store(analyzing, Ordering::SeqCst);
    }

    /// Whether decoding is currently enabled
    pub fn is_analyzing(&self) -> bool {
        self.state.analyzing.load(Ordering::SeqCst)
    }

    /// Begin scanning. Idempotent: starting a session that is not stopped is
    /// a no-op.
    pub fn start(&self) {
        let mut phase = lock_unpoisoned(&self.phase);
        if *phase != SessionPhase::Stopped {
            return;
        }
        *phase = SessionPhase::Starting;
        self.state.reset();
        *phase = SessionPhase::Running;
        info!("scan session running");
    }

    /// Process one captured frame: gate, luminance conversion, decode
    /// dispatch. The frame's capture timestamp is the admission clock, and
    /// its buffer is released before this returns.
    pub fn process_frame(&self, frame: &Frame<'_>) -> FrameOutcome {
        let decision = self.gate.admit(&self.state, frame.timestamp());
        if !decision.is_admitted() {
            return FrameOutcome::Rejected(decision);
        }

        // working is held from here; every path below must release it
        let rotate = self.gate.settings().rotate_buffer_for_orientation;
        let luminance = match to_luminance_source(frame, rotate) {
            Ok(luminance) => luminance,
            Err(err) => {
                self.state.release_working();
                warn!(error = %err, "frame skipped");
                return FrameOutcome::NoDetection;
            }
        };

        let mut sink = lock_unpoisoned(&self.sink);
        let results = match sink.as_mut() {
            Some(sink) => dispatch(
                &luminance,
                self.gate.settings(),
                &self.state,
                &self.engine,
                sink,
            ),
            None => dispatch(
                &luminance,
                self.gate.settings(),
                &self.state,
                &self.engine,
                &mut |_| {},
            ),
        };

        if results.is_empty() {
            FrameOutcome::NoDetection
        } else {
            FrameOutcome::Scanned(results.len())
        }
    }

    /// Stop scanning. Sets `cancelled` so new frames are rejected, then
    /// waits for an in-flight dispatch to release `working` before the
    /// session is fully stopped. Idempotent: a second stop has no further
    /// effect.
    pub fn stop(&self) {
        {
            let mut phase = lock_unpoisoned(&self.phase);
            if matches!(*phase, SessionPhase::Stopped | SessionPhase::Stopping) {
                return;
            }
            *phase = SessionPhase::Stopping;
        }

        info!("stopping scan session");
        self.state.cancel();

        while self.state.is_working() {
            thread::sleep(Duration::from_millis(1));
        }

        *lock_unpoisoned(&self.phase) = SessionPhase::Stopped;
    }
}
