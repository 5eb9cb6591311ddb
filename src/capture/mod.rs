pub mod camera;
pub mod frame;
pub mod source;
pub mod still;

pub use camera::{CameraProvider, CameraRequest, CameraStream, Orientation, SyntheticCamera};
pub use frame::{Frame, FrameMetadata, PixelFormat, Rotation};
pub use source::{FrameLease, FramePool, FrameSource, Unpooled};
