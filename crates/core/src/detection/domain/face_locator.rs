use crate::shared::bounding_box::BoundingBox;
use crate::shared::error::BoxError;
use crate::shared::frame::Frame;

/// Domain interface for face detection.
///
/// Returns every face box found in `frame`, in no particular order. Boxes
/// may extend past the frame edges; callers clamp them before use.
/// Implementations may keep inference state between calls, hence `&mut self`.
pub trait FaceLocator {
    fn locate(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, BoxError>;
}
