//! Strategy traits plugged into the frame pipeline

use std::sync::Arc;

use async_trait::async_trait;

use crate::capture::Frame;
use crate::error::DetectError;

/// Asynchronous detector that inspects one frame at a time.
///
/// The pipeline never has more than one `detect` call outstanding per
/// pipeline, and never cancels one once started.
#[async_trait]
pub trait Detector: Send + Sync + 'static {
    /// One detected feature
    type Item: Send + 'static;

    /// Detect features in `frame`. The frame must not be retained after the
    /// returned future completes.
    async fn detect(&self, frame: &Frame) -> Result<Vec<Self::Item>, DetectError>;

    /// Release detector resources. Called once, when the pipeline stops.
    fn close(&self) {}
}

#[async_trait]
impl<D: Detector + ?Sized> Detector for Arc<D> {
    type Item = D::Item;

    async fn detect(&self, frame: &Frame) -> Result<Vec<Self::Item>, DetectError> {
        (**self).detect(frame).await
    }

    fn close(&self) {
        (**self).close()
    }
}

/// Consumer of detection outcomes
pub trait ResultSink<T>: Send + Sync + 'static {
    /// First item of a non-empty detection
    fn on_detected(&self, item: T);

    fn on_error(&self, error: DetectError);
}

impl<T, S: ResultSink<T> + ?Sized> ResultSink<T> for Arc<S> {
    fn on_detected(&self, item: T) {
        (**self).on_detected(item)
    }

    fn on_error(&self, error: DetectError) {
        (**self).on_error(error)
    }
}

/// Result sink built from two closures
pub struct CallbackSink<F, E> {
    on_detected: F,
    on_error: E,
}

impl<T, F, E> ResultSink<T> for CallbackSink<F, E>
where
    F: Fn(T) + Send + Sync + 'static,
    E: Fn(DetectError) + Send + Sync + 'static,
{
    fn on_detected(&self, item: T) {
        (self.on_detected)(item)
    }

    fn on_error(&self, error: DetectError) {
        (self.on_error)(error)
    }
}

pub fn sink_fn<T, F, E>(on_detected: F, on_error: E) -> CallbackSink<F, E>
where
    F: Fn(T) + Send + Sync + 'static,
    E: Fn(DetectError) + Send + Sync + 'static,
{
    CallbackSink {
        on_detected,
        on_error,
    }
}
