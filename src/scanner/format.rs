use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Barcode symbologies a scan can be restricted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BarcodeFormat {
    QrCode,
    DataMatrix,
    UpcA,
    UpcE,
    Ean8,
    Ean13,
    Code39,
    Code93,
    Code128,
    Codabar,
    Itf,
    Pdf417,
    Aztec,
}

impl BarcodeFormat {
    pub const ALL: [BarcodeFormat; 13] = [
        Self::QrCode,
        Self::DataMatrix,
        Self::UpcA,
        Self::UpcE,
        Self::Ean8,
        Self::Ean13,
        Self::Code39,
        Self::Code93,
        Self::Code128,
        Self::Codabar,
        Self::Itf,
        Self::Pdf417,
        Self::Aztec,
    ];

    /// Name used on the bridge, e.g. `QR_CODE`
    pub fn as_str(self) -> &'static str {
        match self {
            Self::QrCode => "QR_CODE",
            Self::DataMatrix => "DATA_MATRIX",
            Self::UpcA => "UPC_A",
            Self::UpcE => "UPC_E",
            Self::Ean8 => "EAN_8",
            Self::Ean13 => "EAN_13",
            Self::Code39 => "CODE_39",
            Self::Code93 => "CODE_93",
            Self::Code128 => "CODE_128",
            Self::Codabar => "CODABAR",
            Self::Itf => "ITF",
            Self::Pdf417 => "PDF_417",
            Self::Aztec => "AZTEC",
        }
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

impl fmt::Display for BarcodeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BarcodeFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|format| format.as_str() == s)
            .ok_or_else(|| format!("unknown barcode format: {s}"))
    }
}

impl TryFrom<String> for BarcodeFormat {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BarcodeFormat> for String {
    fn from(format: BarcodeFormat) -> Self {
        format.as_str().to_string()
    }
}

/// Set of enabled formats. The empty set accepts every format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatSet(u16);

impl FormatSet {
    pub fn all() -> Self {
        Self(0)
    }

    /// Parse a comma-separated format list, skipping names we do not know
    pub fn parse(list: &str) -> Self {
        let mut set = Self::default();
        for name in list.split(',') {
            let name: String = name.chars().filter(|c| !c.is_whitespace()).collect();
            if name.is_empty() {
                continue;
            }
            match name.parse::<BarcodeFormat>() {
                Ok(format) => set.insert(format),
                Err(e) => debug!("Skipping format: {}", e),
            }
        }
        set
    }

    pub fn insert(&mut self, format: BarcodeFormat) {
        self.0 |= format.bit();
    }

    pub fn is_all(&self) -> bool {
        self.0 == 0
    }

    pub fn accepts(&self, format: BarcodeFormat) -> bool {
        self.is_all() || self.0 & format.bit() != 0
    }

    pub fn iter(&self) -> impl Iterator<Item = BarcodeFormat> + '_ {
        BarcodeFormat::ALL
            .into_iter()
            .filter(move |format| self.accepts(*format))
    }
}

impl FromIterator<BarcodeFormat> for FormatSet {
    fn from_iter<I: IntoIterator<Item = BarcodeFormat>>(iter: I) -> Self {
        let mut set = Self::default();
        for format in iter {
            set.insert(format);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_names_roundtrip() {
        for format in BarcodeFormat::ALL {
            assert_eq!(format.as_str().parse::<BarcodeFormat>(), Ok(format));
        }
        assert!("qr_code".parse::<BarcodeFormat>().is_err());
    }

    #[test]
    fn test_parse_skips_unknown_formats() {
        let set = FormatSet::parse("QR_CODE, FOO ,EAN_13,,");
        assert!(!set.is_all());
        assert!(set.accepts(BarcodeFormat::QrCode));
        assert!(set.accepts(BarcodeFormat::Ean13));
        assert!(!set.accepts(BarcodeFormat::Aztec));
        assert_eq!(set.iter().count(), 2);
    }

    #[test]
    fn test_only_unknown_formats_means_all() {
        let set = FormatSet::parse("NOT_A_FORMAT");
        assert!(set.is_all());
        assert!(set.accepts(BarcodeFormat::Pdf417));
        assert_eq!(set.iter().count(), BarcodeFormat::ALL.len());
    }
}
