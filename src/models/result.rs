/// Barcode symbology of a decoded result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BarcodeFormat {
    /// Aztec 2D barcode
    Aztec,
    /// Codabar 1D format
    Codabar,
    /// Code 39 1D format
    Code39,
    /// Code 93 1D format
    Code93,
    /// Code 128 1D format
    Code128,
    /// Data Matrix 2D barcode
    DataMatrix,
    /// EAN-8 1D format
    Ean8,
    /// EAN-13 1D format
    Ean13,
    /// Interleaved 2 of 5 1D format
    Itf,
    /// PDF417 stacked format
    Pdf417,
    /// QR Code 2D barcode
    QrCode,
    /// UPC-A 1D format
    UpcA,
    /// UPC-E 1D format
    UpcE,
}

/// One decoded symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    /// Decoded text content
    pub text: String,
    /// Symbology the engine recognized
    pub format: BarcodeFormat,
    /// Raw symbol bytes, when the engine provides them
    pub raw_bytes: Option<Vec<u8>>,
}

impl ScanResult {
    /// Create a result with text content only
    pub fn new(text: impl Into<String>, format: BarcodeFormat) -> Self {
        Self {
            text: text.into(),
            format,
            raw_bytes: None,
        }
    }

    /// Attach the raw symbol bytes
    pub fn with_raw_bytes(mut self, raw_bytes: Vec<u8>) -> Self {
        self.raw_bytes = Some(raw_bytes);
        self
    }

    /// Whether the text content is non-empty after trimming whitespace.
    /// Results failing this check are dropped before reporting.
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}
