//! Convert 32-bpp pixel buffers to 8-bit luminance
//! Y = 0.299*R + 0.587*G + 0.114*B
//! Uses fast integer arithmetic: Y = (76*R + 150*G + 29*B) >> 8

use rayon::prelude::*;

use crate::error::ScanError;
use crate::models::{Frame, LuminanceSource, PixelFormat};

/// Coefficients for luminance conversion: Y = (76*R + 150*G + 29*B) >> 8
const COEF_R: i32 = 76;
const COEF_G: i32 = 150;
const COEF_B: i32 = 29;

/// Frames with at least this many pixels take the parallel conversion path
const PARALLEL_PIXEL_THRESHOLD: usize = 1280 * 720;

/// Convert a 32-bpp pixel buffer to grayscale
///
/// `pixels` must hold exactly `width * height * 4` bytes; the caller slices
/// away any platform padding first.
pub fn luminance_32bpp(pixels: &[u8], width: usize, height: usize, format: PixelFormat) -> Vec<u8> {
    let (r_off, g_off, b_off) = format.channel_offsets();
    let pixel_count = width * height;
    let mut gray = vec![0u8; pixel_count];

    for (i, out) in gray.iter_mut().enumerate() {
        let idx = i * PixelFormat::BYTES_PER_PIXEL;
        let r = pixels[idx + r_off] as i32;
        let g = pixels[idx + g_off] as i32;
        let b = pixels[idx + b_off] as i32;
        let lum = (COEF_R * r + COEF_G * g + COEF_B * b) >> 8;
        *out = lum.min(255) as u8;
    }

    gray
}

/// Convert a 32-bpp pixel buffer to grayscale using parallel processing
/// Processes rows in parallel for multi-core speedup
pub fn luminance_32bpp_parallel(
    pixels: &[u8],
    width: usize,
    height: usize,
    format: PixelFormat,
) -> Vec<u8> {
    let (r_off, g_off, b_off) = format.channel_offsets();
    let pixel_count = width * height;
    let mut gray = vec![0u8; pixel_count];

    gray.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        let row_start = y * width * PixelFormat::BYTES_PER_PIXEL;
        for (x, out) in row.iter_mut().enumerate() {
            let idx = row_start + x * PixelFormat::BYTES_PER_PIXEL;
            let r = pixels[idx + r_off] as i32;
            let g = pixels[idx + g_off] as i32;
            let b = pixels[idx + b_off] as i32;
            let lum = (COEF_R * r + COEF_G * g + COEF_B * b) >> 8;
            *out = lum.min(255) as u8;
        }
    });

    gray
}

/// Convert a frame's pixel buffer into the luminance sample the decoding
/// engine expects.
///
/// Acquires the buffer read lock, converts, and releases the lock before
/// returning — the capture subsystem needs the buffer back immediately to
/// keep supplying frames. A buffer longer than `width * height * 4` bytes is
/// sliced to that length and never read beyond; a shorter buffer fails with
/// [`ScanError::BufferLock`].
pub fn to_luminance_source(frame: &Frame<'_>, rotate: bool) -> Result<LuminanceSource, ScanError> {
    let (width, height) = (frame.width(), frame.height());
    let expected = frame.expected_len();

    let gray = {
        let guard = frame.buffer().lock_read()?;
        if guard.len() < expected {
            return Err(ScanError::BufferLock(format!(
                "buffer holds {} bytes, frame needs {}",
                guard.len(),
                expected
            )));
        }
        let pixels = &guard[..expected];
        if width * height >= PARALLEL_PIXEL_THRESHOLD {
            luminance_32bpp_parallel(pixels, width, height, frame.format())
        } else {
            luminance_32bpp(pixels, width, height, frame.format())
        }
        // guard drops here; the lock is released before the engine runs
    };

    let source = LuminanceSource::new(gray, width, height);
    Ok(if rotate {
        source.rotate_counter_clockwise()
    } else {
        source
    })
}
