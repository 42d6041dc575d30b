//! Utility functions for frame processing
//!
//! - Luminance conversion (BGRA/RGBA to grayscale)

pub mod luminance;
