use crate::shared::error::BoxError;
use crate::shared::frame::Frame;
use crate::shared::stream_format::StreamFormat;

/// Publishes frames to a virtual camera device.
///
/// The format negotiated in `open` is fixed until `close`.
pub trait FrameSink {
    fn open(&mut self, format: &StreamFormat) -> Result<(), BoxError>;

    /// Delivers one frame. Frames that don't match the negotiated format
    /// are rejected.
    fn send(&mut self, frame: &Frame) -> Result<(), BoxError>;

    /// Blocks until the next nominal frame slot.
    fn pace(&mut self);

    /// Releases the device. Idempotent.
    fn close(&mut self) -> Result<(), BoxError>;
}
