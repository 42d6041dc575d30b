pub mod frame;
pub mod luminance;
pub mod result;
pub mod settings;

pub use frame::{BufferGuard, Frame, MemoryBuffer, Orientation, PixelBuffer, PixelFormat};
pub use luminance::LuminanceSource;
pub use result::{BarcodeFormat, ScanResult};
pub use settings::ScanSettings;
