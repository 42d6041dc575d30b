//! barcode-scan - Frame-throttled barcode scanning pipeline
//!
//! The portable core of a camera barcode scanner: admission control over the
//! incoming frame stream, luminance conversion of raw 32-bpp pixel buffers,
//! and dispatch into a pluggable decoding engine. The host capture subsystem
//! supplies frames; the engine (behind [`DecodeEngine`]) does the actual
//! symbol decoding.
//!
//! ```
//! use std::time::Instant;
//! use barcode_scan::{
//!     DecodeEngine, Frame, LuminanceSource, MemoryBuffer, PixelFormat, ScanError, ScanResult,
//!     ScanSession, ScanSettings,
//! };
//!
//! struct NoopEngine;
//!
//! impl DecodeEngine for NoopEngine {
//!     fn decode(&self, _: &LuminanceSource) -> Result<Option<ScanResult>, ScanError> {
//!         Ok(None)
//!     }
//! }
//!
//! let session = ScanSession::new(ScanSettings::default(), NoopEngine);
//! session.on_results(|results| println!("scanned {} symbols", results.len()));
//! session.start();
//!
//! let buffer = MemoryBuffer::new(vec![0u8; 640 * 480 * 4]);
//! let frame = Frame::new(&buffer, 640, 480, PixelFormat::Bgra32, Instant::now());
//! session.process_frame(&frame);
//! session.stop();
//! ```

#![warn(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

/// Decode dispatch (engine invocation, result filtering and reporting)
pub mod dispatch;
/// Error types
pub mod error;
/// Frame admission control (throttling, backpressure, cancellation)
pub mod gate;
/// Core data structures (Frame, LuminanceSource, ScanResult, ScanSettings)
pub mod models;
/// Scan session lifecycle
pub mod session;
/// Utility functions (luminance conversion)
pub mod utils;

pub use dispatch::DecodeEngine;
pub use error::ScanError;
pub use gate::{FrameGate, GateDecision, ScanState};
pub use models::{
    BarcodeFormat, BufferGuard, Frame, LuminanceSource, MemoryBuffer, Orientation, PixelBuffer,
    PixelFormat, ScanResult, ScanSettings,
};
pub use session::{FrameOutcome, ScanSession, SessionPhase};

use utils::luminance::to_luminance_source;

/// Decode a single frame outside any session.
///
/// Converts the frame to luminance, runs the engine entry point selected by
/// the settings, and returns the filtered results. No throttling and no
/// shared state; engine and buffer failures propagate to the caller.
pub fn decode_frame(
    frame: &Frame<'_>,
    settings: &ScanSettings,
    engine: &dyn DecodeEngine,
) -> Result<Vec<ScanResult>, ScanError> {
    let luminance = to_luminance_source(frame, settings.rotate_buffer_for_orientation)?;

    let raw = if settings.decode_multiple_barcodes {
        engine.decode_multiple(&luminance)?
    } else {
        engine.decode(&luminance)?.into_iter().collect()
    };

    Ok(raw.into_iter().filter(ScanResult::has_text).collect())
}
