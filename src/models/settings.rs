use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// Throttling and decoding options for a scan session.
///
/// Deserializable from config files; delays are given as integer
/// milliseconds. Every field has a default, so a partial table works.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanSettings {
    /// Minimum interval between decode attempts. Frames arriving sooner are
    /// dropped without decoding.
    #[serde(
        default = "default_analysis_delay",
        deserialize_with = "duration_millis"
    )]
    pub delay_between_analyzing_frames: Duration,

    /// Minimum interval after a successful scan before decoding resumes.
    /// Keeps continuous mode from reporting the same symbol dozens of times.
    #[serde(
        default = "default_continuous_delay",
        deserialize_with = "duration_millis"
    )]
    pub delay_between_continuous_scans: Duration,

    /// Use the engine's multi-decode entry point and report every symbol
    /// found in a frame.
    #[serde(default)]
    pub decode_multiple_barcodes: bool,

    /// Rotate the buffer counter-clockwise before decoding, for portrait
    /// device orientations.
    #[serde(default)]
    pub rotate_buffer_for_orientation: bool,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            delay_between_analyzing_frames: default_analysis_delay(),
            delay_between_continuous_scans: default_continuous_delay(),
            decode_multiple_barcodes: false,
            rotate_buffer_for_orientation: false,
        }
    }
}

fn default_analysis_delay() -> Duration {
    Duration::from_millis(150)
}

fn default_continuous_delay() -> Duration {
    Duration::from_millis(1000)
}

fn duration_millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_millis)
}
