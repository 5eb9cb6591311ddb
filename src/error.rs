//! Error types for scanline

use thiserror::Error;

/// Failure reported by a detector for one frame
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectError {
    #[error("Detector rejected frame: {0}")]
    InvalidFrame(String),

    #[error("Detection failed: {0}")]
    Failed(String),

    #[error("Detector is closed")]
    Closed,
}

/// Scan session errors
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Camera error: {0}")]
    Camera(String),

    #[error("Frame source closed before a barcode was found")]
    SourceClosed,

    #[error("Detection error: {0}")]
    Detect(#[from] DetectError),
}

/// Errors surfaced to the bridge caller. The `Display` text is the error
/// string handed back to the calling application.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Scan is already in progress")]
    ScanInProgress,

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Unexpected error")]
    Scan(#[from] ScanError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
