use crate::shared::error::BoxError;
use crate::shared::frame::Frame;

use super::blur_params::BlurParams;

/// Domain interface for the irreversible smoothing applied to a face region.
///
/// `region` is a crop of the output frame; the result must have exactly the
/// same dimensions so the caller can paste it back in place. The kernel size
/// in `params` is already normalized to an odd value.
pub trait RegionRedactor {
    fn redact(&self, region: &Frame, params: &BlurParams) -> Result<Frame, BoxError>;
}
