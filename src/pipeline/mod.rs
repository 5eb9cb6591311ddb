pub mod detector;
pub mod processor;
pub mod single_shot;
pub mod slots;
pub mod stats;

pub use detector::{sink_fn, CallbackSink, Detector, ResultSink};
pub use processor::FramePipeline;
pub use single_shot::detect_once;
pub use stats::PipelineStats;
