use crate::shared::error::BoxError;
use crate::shared::frame::Frame;

/// Pulls frames from a capture device.
///
/// Implementations own the device handle exclusively and hide driver and
/// codec details; the pipeline only sees packed BGR [`Frame`]s.
pub trait FrameSource {
    /// Acquires the capture device.
    fn open(&mut self) -> Result<(), BoxError>;

    /// Returns the next frame, `Ok(None)` at end of stream, or `Err` when
    /// the device fails mid-stream.
    fn read_frame(&mut self) -> Result<Option<Frame>, BoxError>;

    /// Releases the device. Safe to call after a failed `open` and more
    /// than once.
    fn close(&mut self);
}
