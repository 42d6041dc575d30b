//! Decode dispatch
//!
//! Invokes the decoding engine on an admitted frame's luminance sample,
//! filters the results, and reports them to the session's result sink. The
//! `working` flag acquired by the gate is released here on every path.

use std::sync::atomic::Ordering;

use tracing::{debug, error};

use crate::error::ScanError;
use crate::gate::ScanState;
use crate::models::{LuminanceSource, ScanResult, ScanSettings};

/// The external barcode decoding engine.
///
/// The pipeline contains none of the decoding logic itself; it hands the
/// engine a luminance sample and collects whatever comes back. An `Err`
/// means the engine could not read the input at all and is treated as "no
/// result" by dispatch.
pub trait DecodeEngine {
    /// Decode at most one symbol from the sample
    fn decode(&self, luminance: &LuminanceSource) -> Result<Option<ScanResult>, ScanError>;

    /// Decode every symbol found in the sample. The default wraps
    /// [`DecodeEngine::decode`] for engines without a native multi-decode
    /// entry point.
    fn decode_multiple(&self, luminance: &LuminanceSource) -> Result<Vec<ScanResult>, ScanError> {
        Ok(self.decode(luminance)?.into_iter().collect())
    }
}

/// Releases `working` when dropped — on success, failure, early return, or
/// a panic inside the engine.
struct WorkingGuard<'a>(&'a ScanState);

impl Drop for WorkingGuard<'_> {
    fn drop(&mut self) {
        self.0.release_working();
    }
}

/// Run the engine on one admitted luminance sample.
///
/// Chooses the engine entry point per `decode_multiple_barcodes`, drops
/// results with empty or whitespace-only text, and on a non-empty remainder
/// marks the state scanned and invokes `sink` exactly once with the full
/// filtered sequence. Engine failure is logged and yields an empty result;
/// the next admitted frame retries naturally.
pub fn dispatch(
    luminance: &LuminanceSource,
    settings: &ScanSettings,
    state: &ScanState,
    engine: &dyn DecodeEngine,
    sink: &mut dyn FnMut(&[ScanResult]),
) -> Vec<ScanResult> {
    let _working = WorkingGuard(state);

    if !state.analyzing.load(Ordering::SeqCst) {
        return Vec::new();
    }

    let raw = if settings.decode_multiple_barcodes {
        engine.decode_multiple(luminance)
    } else {
        engine.decode(luminance).map(|r| r.into_iter().collect())
    };

    let raw = match raw {
        Ok(results) => results,
        Err(err) => {
            error!(error = %err, "decode failed");
            return Vec::new();
        }
    };

    let filtered: Vec<ScanResult> = raw.into_iter().filter(ScanResult::has_text).collect();

    if filtered.is_empty() {
        debug!("no result after filtering");
        return Vec::new();
    }

    state.was_scanned.store(true, Ordering::SeqCst);
    sink(&filtered);
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BarcodeFormat;
    use std::sync::atomic::AtomicUsize;

    struct FixedEngine(Vec<ScanResult>);

    impl DecodeEngine for FixedEngine {
        fn decode(&self, _: &LuminanceSource) -> Result<Option<ScanResult>, ScanError> {
            Ok(self.0.first().cloned())
        }

        fn decode_multiple(&self, _: &LuminanceSource) -> Result<Vec<ScanResult>, ScanError> {
            Ok(self.0.clone())
        }
    }

    struct FailingEngine;

    impl DecodeEngine for FailingEngine {
        fn decode(&self, _: &LuminanceSource) -> Result<Option<ScanResult>, ScanError> {
            Err(ScanError::Engine("unreadable input".into()))
        }
    }

    struct CountingEngine(AtomicUsize);

    impl DecodeEngine for CountingEngine {
        fn decode(&self, _: &LuminanceSource) -> Result<Option<ScanResult>, ScanError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }
    }

    fn working_state() -> ScanState {
        let state = ScanState::new();
        state.reset();
        state.working.store(true, Ordering::SeqCst);
        state
    }

    fn sample() -> LuminanceSource {
        LuminanceSource::new(vec![0u8; 16], 4, 4)
    }

    fn result(text: &str) -> ScanResult {
        ScanResult::new(text, BarcodeFormat::QrCode)
    }

    #[test]
    fn test_single_decode_reports_once() {
        let state = working_state();
        let engine = FixedEngine(vec![result("HELLO")]);
        let mut calls = Vec::new();

        let results = dispatch(
            &sample(),
            &ScanSettings::default(),
            &state,
            &engine,
            &mut |r| calls.push(r.to_vec()),
        );

        assert_eq!(results.len(), 1);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0][0].text, "HELLO");
        assert!(state.was_scanned_recently());
        assert!(!state.is_working());
    }

    #[test]
    fn test_multi_decode_uses_multi_entry_point() {
        let state = working_state();
        let engine = FixedEngine(vec![result("A"), result("B")]);
        let settings = ScanSettings {
            decode_multiple_barcodes: true,
            ..ScanSettings::default()
        };
        let mut reported = 0;

        let results = dispatch(&sample(), &settings, &state, &engine, &mut |r| {
            reported = r.len();
        });

        assert_eq!(results.len(), 2);
        assert_eq!(reported, 2);
    }

    #[test]
    fn test_whitespace_results_are_dropped() {
        let state = working_state();
        let engine = FixedEngine(vec![result("   ")]);
        let mut called = false;

        let results = dispatch(
            &sample(),
            &ScanSettings::default(),
            &state,
            &engine,
            &mut |_| called = true,
        );

        assert!(results.is_empty());
        assert!(!called);
        assert!(!state.was_scanned_recently());
        assert!(!state.is_working());
    }

    #[test]
    fn test_multi_decode_filters_mixed_results() {
        let state = working_state();
        let engine = FixedEngine(vec![result(""), result("OK"), result("\t")]);
        let settings = ScanSettings {
            decode_multiple_barcodes: true,
            ..ScanSettings::default()
        };

        let results = dispatch(&sample(), &settings, &state, &engine, &mut |_| {});
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "OK");
    }

    #[test]
    fn test_engine_failure_is_recovered() {
        let state = working_state();
        let mut called = false;

        let results = dispatch(
            &sample(),
            &ScanSettings::default(),
            &state,
            &FailingEngine,
            &mut |_| called = true,
        );

        assert!(results.is_empty());
        assert!(!called);
        assert!(!state.is_working());
        assert!(!state.was_scanned_recently());
    }

    #[test]
    fn test_paused_session_skips_engine() {
        let state = working_state();
        state.analyzing.store(false, Ordering::SeqCst);
        let engine = CountingEngine(AtomicUsize::new(0));

        let results = dispatch(
            &sample(),
            &ScanSettings::default(),
            &state,
            &engine,
            &mut |_| {},
        );

        assert!(results.is_empty());
        assert_eq!(engine.0.load(Ordering::SeqCst), 0);
        assert!(!state.is_working());
    }

    #[test]
    fn test_default_multi_decode_wraps_single() {
        let engine = CountingEngine(AtomicUsize::new(0));
        let results = engine.decode_multiple(&sample()).unwrap();
        assert!(results.is_empty());
        assert_eq!(engine.0.load(Ordering::SeqCst), 1);
    }
}
