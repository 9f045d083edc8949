use std::cell::RefCell;

use crate::blurring::domain::blur_params::BlurParams;
use crate::blurring::domain::region_redactor::RegionRedactor;
use crate::shared::error::BoxError;
use crate::shared::frame::Frame;

use super::gaussian;

/// Kernel sizes at or above this blur a downscaled copy of the region.
const DOWNSCALE_KERNEL_THRESHOLD: usize = 100;

/// Target kernel size after downscaling.
const DOWNSCALED_KERNEL_SIZE: usize = 50;

/// CPU redactor using a separable Gaussian blur over the whole region.
///
/// Very large kernels are applied to a downscaled copy and upscaled back,
/// with kernel size and sigma shrunk by the same factor.
pub struct GaussianRedactor {
    kernels: RefCell<Option<CachedKernels>>,
    blur_temp: RefCell<Vec<f32>>,
}

struct CachedKernels {
    params: BlurParams,
    full: Vec<f32>,
    scale: usize,
    small: Vec<f32>,
}

impl CachedKernels {
    fn build(params: BlurParams) -> Self {
        let k = params.kernel_size();
        let scale = if k >= DOWNSCALE_KERNEL_THRESHOLD {
            (k / DOWNSCALED_KERNEL_SIZE).max(1)
        } else {
            1
        };
        let small_k = (k / scale) | 1;
        Self {
            params,
            full: gaussian::gaussian_kernel_1d(k, params.sigma()),
            scale,
            small: gaussian::gaussian_kernel_1d(small_k, params.sigma() / scale as f64),
        }
    }
}

impl GaussianRedactor {
    pub fn new() -> Self {
        Self {
            kernels: RefCell::new(None),
            blur_temp: RefCell::new(Vec::new()),
        }
    }
}

impl Default for GaussianRedactor {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionRedactor for GaussianRedactor {
    fn redact(&self, region: &Frame, params: &BlurParams) -> Result<Frame, BoxError> {
        let mut kernels = self.kernels.borrow_mut();
        if kernels.as_ref().map_or(true, |k| k.params != *params) {
            *kernels = Some(CachedKernels::build(*params));
        }
        let kernels = kernels.as_ref().ok_or("kernel cache not initialized")?;

        let w = region.width() as usize;
        let h = region.height() as usize;
        let channels = region.channels() as usize;
        let mut out = region.clone();
        let mut temp = self.blur_temp.borrow_mut();

        let scale = kernels.scale;
        if scale <= 1 || w < scale * 2 || h < scale * 2 {
            gaussian::separable_blur(out.data_mut(), w, h, channels, &kernels.full, &mut temp);
        } else {
            let (mut small, sw, sh) = gaussian::downscale(region.data(), w, h, channels, scale);
            gaussian::separable_blur(&mut small, sw, sh, channels, &kernels.small, &mut temp);
            let upscaled = gaussian::upscale(&small, sw, sh, channels, w, h);
            out.data_mut().copy_from_slice(&upscaled);
        }

        Ok(out)
    }
}
