use crate::capture::{CameraRequest, Orientation};
use crate::scanner::FormatSet;
use crate::ScanDefaults;

/// Everything a caller can ask of one scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOptions {
    pub formats: FormatSet,
    pub prefer_front_camera: bool,
    pub show_flip_camera_button: bool,
    pub show_torch_button: bool,
    pub torch_on: bool,
    /// How long to keep the result on screen before returning it. 0 returns
    /// immediately.
    pub result_display_duration_ms: u64,
    pub prompt: Option<String>,
    pub orientation: Option<Orientation>,
    pub disable_success_beep: bool,
    /// Strip GS1 `]C1` symbology identifiers from the result
    pub assume_gs1: bool,
}

impl ScanOptions {
    pub fn from_defaults(defaults: &ScanDefaults) -> Self {
        Self {
            result_display_duration_ms: defaults.result_display_duration_ms,
            disable_success_beep: defaults.disable_success_beep,
            ..Self::default()
        }
    }

    pub fn camera_request(&self) -> CameraRequest {
        CameraRequest {
            prefer_front_camera: self.prefer_front_camera,
            torch_on: self.torch_on,
            orientation: self.orientation,
        }
    }
}
