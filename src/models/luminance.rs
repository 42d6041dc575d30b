/// Grayscale view of a frame — the decoding engine's required input
///
/// Owns its pixel bytes: by the time a `LuminanceSource` exists, the capture
/// buffer it was converted from has already been released.
#[derive(Debug, Clone)]
pub struct LuminanceSource {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl LuminanceSource {
    /// Create a luminance source from 8-bit grayscale bytes
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self {
            data,
            width,
            height,
        }
    }

    /// Width in pixels
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> usize {
        self.height
    }

    /// Raw grayscale bytes, row-major
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Luminance at (x, y); out-of-bounds reads as 0
    pub fn get(&self, x: usize, y: usize) -> u8 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.data[y * self.width + x]
    }

    /// One row of luminance values
    pub fn row(&self, y: usize) -> &[u8] {
        let start = y * self.width;
        &self.data[start..start + self.width]
    }

    /// Rotate the sample 90° counter-clockwise.
    ///
    /// Applied when the device is held in a portrait orientation, so the
    /// decoder sees the symbol the way the user does. Dimensions swap.
    pub fn rotate_counter_clockwise(&self) -> LuminanceSource {
        let mut rotated = vec![0u8; self.data.len()];
        let (w, h) = (self.width, self.height);
        for y in 0..h {
            let row = &self.data[y * w..(y + 1) * w];
            for (x, &value) in row.iter().enumerate() {
                // source (x, y) -> dest (y, w - 1 - x); dest width is h
                rotated[(w - 1 - x) * h + y] = value;
            }
        }
        LuminanceSource::new(rotated, h, w)
    }
}
