//! Error types for the scanning pipeline.
//!
//! Only session setup errors are fatal to the caller. Per-frame failures
//! (engine errors, buffer lock errors) are recovered inside the pipeline and
//! surface as an empty result for that frame; the next frame retries
//! naturally.

use thiserror::Error;

/// Errors raised by the scanning pipeline.
#[derive(Debug, Error)]
pub enum ScanError {
    /// No capture device is available. Fatal to session start.
    #[error("no capture device available")]
    NoDevice,

    /// Capture subsystem setup failed. Fatal to session start.
    #[error("capture setup failed: {0}")]
    Setup(String),

    /// The pixel buffer could not be locked or is shorter than the frame
    /// dimensions require. Recovered per frame.
    #[error("pixel buffer unavailable: {0}")]
    BufferLock(String),

    /// The decoding engine signalled failure on this frame's input.
    /// Recovered per frame.
    #[error("decode engine failed: {0}")]
    Engine(String),
}
