pub mod bridge;
pub mod capture;
pub mod error;
pub mod pipeline;
pub mod scanner;
pub mod session;

use std::path::Path;

use arc_swap::ArcSwap;
use capture::frame::PixelFormat;
use serde::{Deserialize, Serialize};

pub use error::{BridgeError, ConfigError, DetectError, ScanError};

/// Global configuration that can be atomically swapped at runtime
pub static CONFIG: once_cell::sync::Lazy<ArcSwap<Config>> =
    once_cell::sync::Lazy::new(|| ArcSwap::from_pointee(Config::default()));

/// System configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub capture: CaptureConfig,
    pub pipeline: PipelineConfig,
    pub scan: ScanDefaults,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub buffer_count: u32,
    pub format: PixelFormat,
    /// Synthetic camera only: frames rendered before the payload appears
    pub payload_after_frames: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Give every other frame to the detector inverted
    pub invert_alternate_frames: bool,
}

/// Defaults for scan options the caller leaves out
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanDefaults {
    pub result_display_duration_ms: u64,
    pub disable_success_beep: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 30,
            buffer_count: 4,
            format: PixelFormat::Nv21,
            payload_after_frames: 10,
        }
    }
}

impl Config {
    /// Defaults, then the optional TOML file, then `SCANLINE_*` environment
    /// variables (`SCANLINE_CAPTURE__WIDTH=320`).
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Config::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config: Config = builder
            .add_source(
                config::Environment::with_prefix("SCANLINE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let capture = &self.capture;
        if capture.width == 0 || capture.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "capture size must be non-zero, got {}x{}",
                capture.width, capture.height
            )));
        }
        if capture.fps == 0 {
            return Err(ConfigError::Invalid("capture fps must be non-zero".into()));
        }
        // One frame pending plus one in flight
        if capture.buffer_count < 2 {
            return Err(ConfigError::Invalid(format!(
                "buffer_count must be at least 2, got {}",
                capture.buffer_count
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_single_buffer() {
        let mut config = Config::default();
        config.capture.buffer_count = 1;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[capture]\nwidth = 320\nheight = 240\n\n[pipeline]\ninvert_alternate_frames = true\n\n[scan]\nresult_display_duration_ms = 1500"
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.capture.width, 320);
        assert_eq!(config.capture.height, 240);
        assert_eq!(config.capture.fps, 30);
        assert!(config.pipeline.invert_alternate_frames);
        assert_eq!(config.scan.result_display_duration_ms, 1500);
    }

    #[test]
    fn test_environment_overrides_nested_keys() {
        // Only this test sets the variable; no other test reads the key
        std::env::set_var("SCANLINE_CAPTURE__PAYLOAD_AFTER_FRAMES", "7");
        let config = Config::load(None);
        std::env::remove_var("SCANLINE_CAPTURE__PAYLOAD_AFTER_FRAMES");

        let config = config.unwrap();
        assert_eq!(config.capture.payload_after_frames, 7);
        assert_eq!(config.capture.width, 640);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let missing = Path::new("/nonexistent/scanline.toml");
        assert!(matches!(
            Config::load(Some(missing)),
            Err(ConfigError::Load(_))
        ));
    }
}
