use serde::{Deserialize, Serialize};

use super::format::BarcodeFormat;

/// A decoded barcode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Barcode {
    /// Value exactly as encoded
    pub raw_value: Option<String>,
    /// Value formatted for display
    pub display_value: Option<String>,
    pub format: BarcodeFormat,
}

impl Barcode {
    pub fn new(value: impl Into<String>, format: BarcodeFormat) -> Self {
        let value = value.into();
        Self {
            raw_value: Some(value.clone()),
            display_value: Some(value),
            format,
        }
    }

    /// Best available text: display value, falling back to the raw value
    pub fn text(&self) -> &str {
        self.display_value
            .as_deref()
            .or(self.raw_value.as_deref())
            .unwrap_or_default()
    }
}
