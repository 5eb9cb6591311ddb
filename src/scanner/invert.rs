use bytes::Bytes;

use crate::capture::{Frame, PixelFormat};

/// Copy of `frame` with dark and light swapped, so light-on-dark codes read
/// as ordinary ones.
///
/// Luma is inverted around 255; chroma is mirrored around 128 (wrapping).
pub fn invert_frame(frame: &Frame) -> Frame {
    let mut data = frame.data.to_vec();

    match frame.meta.format {
        PixelFormat::Nv21 | PixelFormat::Yuv420 => {
            let (luma, chroma) = data.split_at_mut(frame.luma_len());
            luma.iter_mut().for_each(|y| *y = !*y);
            chroma.iter_mut().for_each(|c| *c = c.wrapping_neg());
        }
        PixelFormat::Gray8 | PixelFormat::Rgb24 => {
            data.iter_mut().for_each(|b| *b = !*b);
        }
    }

    Frame {
        data: Bytes::from(data),
        meta: frame.meta.clone(),
        timestamp: frame.timestamp,
    }
}
