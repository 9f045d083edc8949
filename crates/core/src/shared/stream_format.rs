use std::fmt;

use super::frame::Frame;

/// Packed pixel layouts the virtual camera can be negotiated with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Bgr24,
}

impl PixelFormat {
    pub fn channels(&self) -> u8 {
        3
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelFormat::Bgr24 => write!(f, "bgr24"),
        }
    }
}

/// Geometry and timing contract between the pipeline and the frame sink.
///
/// Fixed for the lifetime of a sink; derived from the first captured frame.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamFormat {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub pixel_format: PixelFormat,
}

impl StreamFormat {
    pub fn for_frame(frame: &Frame, fps: f64, pixel_format: PixelFormat) -> Self {
        Self {
            width: frame.width(),
            height: frame.height(),
            fps,
            pixel_format,
        }
    }

    /// True when `frame` can be delivered under this contract unchanged.
    pub fn matches(&self, frame: &Frame) -> bool {
        frame.width() == self.width
            && frame.height() == self.height
            && frame.channels() == self.pixel_format.channels()
    }
}
