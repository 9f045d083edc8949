/// Gaussian blur parameters, fixed for the whole run.
///
/// The kernel size is always odd and at least 1; construction is the only
/// place where that invariant is established.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlurParams {
    kernel_size: usize,
    sigma: f64,
}

impl BlurParams {
    /// Builds parameters from raw configuration values.
    ///
    /// Even kernel sizes are bumped to the next odd value, anything below 1
    /// becomes 1 and anything above [`MAX_KERNEL_SIZE`] becomes the cap.
    /// Negative or non-finite sigma is rejected.
    pub fn new(kernel_size: i64, sigma: f64) -> Result<Self, String> {
        if !sigma.is_finite() || sigma < 0.0 {
            return Err(format!("Blur sigma must be a non-negative number, got {sigma}"));
        }
        Ok(Self {
            kernel_size: normalize_kernel_size(kernel_size),
            sigma,
        })
    }

    pub fn kernel_size(&self) -> usize {
        self.kernel_size
    }

    /// Standard deviation of the Gaussian; 0 means derive it from the kernel size.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }
}

/// Largest kernel size a run will use; bigger values are coerced down to it.
///
/// Already far past the point where a face is unrecognizable, and keeps the
/// kernel allocation bounded for any configured integer.
pub const MAX_KERNEL_SIZE: usize = 1001;

/// Coerces a configured kernel size to the nearest odd value in
/// `1..=MAX_KERNEL_SIZE`.
pub fn normalize_kernel_size(kernel_size: i64) -> usize {
    if kernel_size < 1 {
        return 1;
    }
    if kernel_size >= MAX_KERNEL_SIZE as i64 {
        return MAX_KERNEL_SIZE;
    }
    let k = kernel_size as usize;
    if k % 2 == 0 {
        k + 1
    } else {
        k
    }
}
