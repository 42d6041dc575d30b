use std::fmt;
use std::ops::Deref;
use std::time::Instant;

use crate::error::ScanError;

/// Pixel layout of a captured frame. Both layouts are 32 bits per pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Blue, green, red, alpha byte order (native capture layout on most
    /// mobile capture stacks).
    Bgra32,
    /// Red, green, blue, alpha byte order.
    Rgba32,
}

impl PixelFormat {
    /// Bytes per pixel for all supported formats
    pub const BYTES_PER_PIXEL: usize = 4;

    /// Byte offsets of the (red, green, blue) channels within one pixel
    pub(crate) fn channel_offsets(self) -> (usize, usize, usize) {
        match self {
            PixelFormat::Bgra32 => (2, 1, 0),
            PixelFormat::Rgba32 => (0, 1, 2),
        }
    }
}

/// Device interface orientation, as reported by the host UI layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Device held upright
    Portrait,
    /// Device held upright, flipped
    PortraitUpsideDown,
    /// Device rotated left
    LandscapeLeft,
    /// Device rotated right
    LandscapeRight,
}

impl Orientation {
    /// Whether the preview buffer needs a counter-clockwise rotation before
    /// decoding. Capture buffers arrive in landscape layout, so both portrait
    /// orientations require it.
    pub fn requires_rotation(self) -> bool {
        matches!(self, Orientation::Portrait | Orientation::PortraitUpsideDown)
    }
}

/// A read-locked view of a pixel buffer.
///
/// Dereferences to the raw bytes. The lock is released when the guard drops,
/// on every exit path including panics, so the capture subsystem gets its
/// buffer back before the callback returns.
pub struct BufferGuard<'a> {
    data: &'a [u8],
    release: Option<Box<dyn FnOnce() + 'a>>,
}

impl<'a> BufferGuard<'a> {
    /// Guard over a buffer that needs no explicit unlock
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            release: None,
        }
    }

    /// Guard that runs `release` when dropped
    pub fn with_release(data: &'a [u8], release: impl FnOnce() + 'a) -> Self {
        Self {
            data,
            release: Some(Box::new(release)),
        }
    }
}

impl Deref for BufferGuard<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.data
    }
}

impl Drop for BufferGuard<'_> {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for BufferGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferGuard")
            .field("len", &self.data.len())
            .finish()
    }
}

/// A pixel buffer lent by the capture subsystem for the duration of one
/// frame callback.
///
/// Implementations must not require the lock to be held past the guard's
/// lifetime; the pipeline never retains the buffer past the callback.
pub trait PixelBuffer {
    /// Acquire a read lock on the raw bytes
    fn lock_read(&self) -> Result<BufferGuard<'_>, ScanError>;
}

/// `Vec`-backed pixel buffer for tests and in-process frame sources
#[derive(Debug, Clone)]
pub struct MemoryBuffer {
    data: Vec<u8>,
}

impl MemoryBuffer {
    /// Wrap raw pixel bytes
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Buffer length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl PixelBuffer for MemoryBuffer {
    fn lock_read(&self) -> Result<BufferGuard<'_>, ScanError> {
        Ok(BufferGuard::new(&self.data))
    }
}

/// One captured camera frame.
///
/// The buffer is borrowed: it belongs to the capture subsystem and is only
/// valid for the duration of the frame callback.
pub struct Frame<'a> {
    buffer: &'a dyn PixelBuffer,
    width: usize,
    height: usize,
    format: PixelFormat,
    timestamp: Instant,
}

impl<'a> Frame<'a> {
    /// Create a frame over a lent pixel buffer
    pub fn new(
        buffer: &'a dyn PixelBuffer,
        width: usize,
        height: usize,
        format: PixelFormat,
        timestamp: Instant,
    ) -> Self {
        Self {
            buffer,
            width,
            height,
            format,
            timestamp,
        }
    }

    /// Frame width in pixels
    pub fn width(&self) -> usize {
        self.width
    }

    /// Frame height in pixels
    pub fn height(&self) -> usize {
        self.height
    }

    /// Pixel layout of the buffer
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Capture timestamp, used as the admission clock
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    /// The lent pixel buffer
    pub fn buffer(&self) -> &dyn PixelBuffer {
        self.buffer
    }

    /// Expected byte length of the pixel data. The underlying buffer may be
    /// longer (platform row padding); bytes past this length are never read.
    pub fn expected_len(&self) -> usize {
        self.width * self.height * PixelFormat::BYTES_PER_PIXEL
    }
}

impl fmt::Debug for Frame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("timestamp", &self.timestamp)
            .finish()
    }
}
