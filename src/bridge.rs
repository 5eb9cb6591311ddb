//! Request/response entry point for the host application
//!
//! The host sends an action name and a JSON array of configuration objects
//! and receives either a `ScanResponse` or an error string. Parsing is best
//! effort: entries and keys that do not make sense are logged and skipped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use crate::capture::{CameraProvider, Frame, Orientation, Unpooled};
use crate::error::{BridgeError, ScanError};
use crate::pipeline::{detect_once, Detector};
use crate::scanner::{Barcode, BarcodeProcessor, FormatSet};
use crate::session::{ScanFeedback, ScanOptions, ScanResponse, ScanSession};

pub const SCAN_ACTION: &str = "scan";

/// Build scan options from the bridge argument array.
///
/// Later objects override earlier ones. Non-object entries are skipped.
pub fn parse_scan_args(args: &Value, base: ScanOptions) -> ScanOptions {
    let mut options = base;

    let entries = match args {
        Value::Array(entries) => entries.as_slice(),
        Value::Object(_) => std::slice::from_ref(args),
        other => {
            debug!("Ignoring scan arguments of unexpected shape: {}", other);
            return options;
        }
    };

    for entry in entries {
        match entry {
            Value::Object(obj) => apply_object(&mut options, obj),
            other => debug!("Skipping non-object scan argument: {}", other),
        }
    }
    options
}

fn apply_object(options: &mut ScanOptions, obj: &Map<String, Value>) {
    for (key, value) in obj {
        let applied = match key.as_str() {
            "formats" => value
                .as_str()
                .map(|list| options.formats = FormatSet::parse(list)),
            "preferFrontCamera" => value
                .as_bool()
                .map(|b| options.prefer_front_camera = b),
            "showFlipCameraButton" => value
                .as_bool()
                .map(|b| options.show_flip_camera_button = b),
            "showTorchButton" => value.as_bool().map(|b| options.show_torch_button = b),
            "torchOn" => value.as_bool().map(|b| options.torch_on = b),
            "disableSuccessBeep" => value
                .as_bool()
                .map(|b| options.disable_success_beep = b),
            "assumeGS1" => value.as_bool().map(|b| options.assume_gs1 = b),
            "resultDisplayDuration" => duration_ms(value)
                .map(|ms| options.result_display_duration_ms = ms),
            "prompt" => value
                .as_str()
                .map(|prompt| options.prompt = Some(prompt.to_string())),
            "orientation" => serde_json::from_value::<Orientation>(value.clone())
                .ok()
                .map(|orientation| options.orientation = Some(orientation)),
            _ => {
                debug!("Ignoring unknown scan option {}", key);
                continue;
            }
        };

        if applied.is_none() {
            debug!("Skipping malformed scan option {}: {}", key, value);
        }
    }
}

/// Milliseconds from a number or a numeric string. Negative means none.
fn duration_ms(value: &Value) -> Option<u64> {
    let ms = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }?;
    Some(ms.max(0) as u64)
}

fn check_shape(args: &Value) -> Result<(), BridgeError> {
    if args.is_array() || args.is_object() {
        Ok(())
    } else {
        Err(BridgeError::InvalidArguments(format!(
            "expected an array of options, got {args}"
        )))
    }
}

fn request_options(args: &Value) -> ScanOptions {
    parse_scan_args(args, ScanOptions::from_defaults(&crate::CONFIG.load().scan))
}

/// Scan one still frame with the formats and text handling of a scan request.
///
/// Returns `None` when the frame holds no barcode of an enabled format.
pub async fn scan_still<E>(
    engine: E,
    frame: Frame,
    args: &Value,
) -> Result<Option<ScanResponse>, BridgeError>
where
    E: Detector<Item = Barcode>,
{
    check_shape(args)?;
    let options = request_options(args);

    let processor = BarcodeProcessor::new(engine, options.formats);
    let found = detect_once(&processor, frame, Arc::new(Unpooled))
        .await
        .map_err(ScanError::from)?;
    Ok(found.map(|barcode| ScanResponse::found(&barcode, options.assume_gs1)))
}

/// Bridge between the host application and scan sessions.
///
/// Allows one scan at a time.
pub struct Bridge<P, E> {
    camera: P,
    engine: Arc<E>,
    feedback: Arc<dyn ScanFeedback>,
    scan_in_progress: AtomicBool,
}

impl<P, E> Bridge<P, E>
where
    P: CameraProvider,
    E: Detector<Item = Barcode>,
{
    pub fn new(camera: P, engine: Arc<E>) -> Self {
        Self {
            camera,
            engine,
            feedback: Arc::new(()),
            scan_in_progress: AtomicBool::new(false),
        }
    }

    pub fn with_feedback(mut self, feedback: Arc<dyn ScanFeedback>) -> Self {
        self.feedback = feedback;
        self
    }

    pub fn is_scanning(&self) -> bool {
        self.scan_in_progress.load(Ordering::Acquire)
    }

    #[instrument(skip(self, args))]
    pub async fn execute(&self, action: &str, args: &Value) -> Result<ScanResponse, BridgeError> {
        if action != SCAN_ACTION {
            return Err(BridgeError::UnknownAction(action.to_string()));
        }
        check_shape(args)?;

        if self
            .scan_in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(BridgeError::ScanInProgress);
        }
        let _guard = ScanGuard(&self.scan_in_progress);

        let options = request_options(args);
        info!(?options, "Starting scan");

        let session = ScanSession::new(options, Arc::clone(&self.engine))
            .with_feedback(Arc::clone(&self.feedback));
        Ok(session.run(&self.camera).await?)
    }

    /// Same as [`Self::execute`], with the response serialized for the host
    pub async fn execute_json(&self, action: &str, args: &str) -> Result<String, String> {
        let args: Value = serde_json::from_str(args).map_err(|e| {
            BridgeError::InvalidArguments(e.to_string()).to_string()
        })?;
        let response = self.execute(action, &args).await.map_err(|e| e.to_string())?;
        serde_json::to_string(&response).map_err(|e| e.to_string())
    }
}

/// Clears the in-progress flag however the scan ends
struct ScanGuard<'a>(&'a AtomicBool);

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::BarcodeFormat;
    use serde_json::json;

    #[test]
    fn test_parse_full_request() {
        let args = json!([{
            "formats": "QR_CODE, EAN_13",
            "preferFrontCamera": true,
            "showFlipCameraButton": true,
            "showTorchButton": true,
            "torchOn": true,
            "resultDisplayDuration": 1500,
            "prompt": "Place a barcode inside the scan area",
            "orientation": "landscape",
            "disableSuccessBeep": true,
            "assumeGS1": true
        }]);
        let options = parse_scan_args(&args, ScanOptions::default());

        assert!(options.formats.accepts(BarcodeFormat::QrCode));
        assert!(!options.formats.accepts(BarcodeFormat::Aztec));
        assert!(options.prefer_front_camera);
        assert!(options.show_flip_camera_button);
        assert!(options.show_torch_button);
        assert!(options.torch_on);
        assert_eq!(options.result_display_duration_ms, 1500);
        assert_eq!(
            options.prompt.as_deref(),
            Some("Place a barcode inside the scan area")
        );
        assert_eq!(options.orientation, Some(Orientation::Landscape));
        assert!(options.disable_success_beep);
        assert!(options.assume_gs1);
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let args = json!([
            "not an object",
            42,
            {
                "torchOn": "yes",
                "orientation": "sideways",
                "resultDisplayDuration": "250",
                "assumeGS1": true,
                "somethingElse": 1
            }
        ]);
        let options = parse_scan_args(&args, ScanOptions::default());

        assert!(!options.torch_on);
        assert_eq!(options.orientation, None);
        assert_eq!(options.result_display_duration_ms, 250);
        assert!(options.assume_gs1);
        assert!(options.formats.is_all());
    }

    #[test]
    fn test_defaults_survive_empty_request() {
        let base = ScanOptions {
            result_display_duration_ms: 800,
            ..ScanOptions::default()
        };
        let options = parse_scan_args(&json!([]), base.clone());
        assert_eq!(options, base);
    }

    #[test]
    fn test_negative_duration_clamps_to_zero() {
        assert_eq!(duration_ms(&json!(-5)), Some(0));
        assert_eq!(duration_ms(&json!(12.7)), Some(12));
        assert_eq!(duration_ms(&json!(true)), None);
    }
}
