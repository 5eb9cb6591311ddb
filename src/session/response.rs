use serde::{Deserialize, Serialize};

use crate::scanner::{Barcode, BarcodeFormat};

const GS1_SYMBOLOGY_ID: &str = "]C1";

/// Result handed back to the caller of a scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResponse {
    pub text: String,
    pub format: String,
    pub cancelled: bool,
}

impl ScanResponse {
    pub fn found(barcode: &Barcode, assume_gs1: bool) -> Self {
        let mut text = barcode.text().to_string();
        if assume_gs1 {
            text = text.replace(GS1_SYMBOLOGY_ID, "");
        }
        // Some decoders report UPC-A as its 13-digit EAN form
        if barcode.format == BarcodeFormat::UpcA && text.chars().count() == 13 {
            text = text.chars().skip(1).collect();
        }

        Self {
            text,
            format: barcode.format.as_str().to_string(),
            cancelled: false,
        }
    }

    pub fn cancelled() -> Self {
        Self {
            text: String::new(),
            format: String::new(),
            cancelled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gs1_identifier_stripped_only_when_assumed() {
        let barcode = Barcode::new("]C10100012345678905", BarcodeFormat::Code128);
        assert_eq!(ScanResponse::found(&barcode, true).text, "0100012345678905");
        assert_eq!(
            ScanResponse::found(&barcode, false).text,
            "]C10100012345678905"
        );
    }

    #[test]
    fn test_upc_a_leading_digit_dropped() {
        let barcode = Barcode::new("0012345678905", BarcodeFormat::UpcA);
        let response = ScanResponse::found(&barcode, false);
        assert_eq!(response.text, "012345678905");
        assert_eq!(response.format, "UPC_A");

        let ean = Barcode::new("0012345678905", BarcodeFormat::Ean13);
        assert_eq!(ScanResponse::found(&ean, false).text, "0012345678905");
    }

    #[test]
    fn test_cancelled_shape() {
        let json = serde_json::to_value(ScanResponse::cancelled()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"text": "", "format": "", "cancelled": true})
        );
    }
}
