pub mod barcode;
pub mod format;
pub mod invert;
pub mod marker;
pub mod processor;

pub use barcode::Barcode;
pub use format::{BarcodeFormat, FormatSet};
pub use marker::{encode_marker, MarkerDetector};
pub use processor::BarcodeProcessor;
