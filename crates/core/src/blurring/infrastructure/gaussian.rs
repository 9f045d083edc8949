//! Separable Gaussian blur over packed 8-bit pixel buffers.
//!
//! Borders are handled by clamping to the nearest edge pixel, so a blurred
//! region never samples pixels outside itself.

/// Builds a normalized 1D Gaussian kernel.
///
/// `kernel_size` must be odd and >= 1. A `sigma` of 0 (or below) is derived
/// from the kernel size with OpenCV's `getGaussianKernel` convention.
pub fn gaussian_kernel_1d(kernel_size: usize, sigma: f64) -> Vec<f32> {
    debug_assert!(kernel_size >= 1 && kernel_size % 2 == 1);
    let sigma = if sigma > 0.0 {
        sigma
    } else {
        0.3 * ((kernel_size as f64 - 1.0) * 0.5 - 1.0) + 0.8
    };
    let half = (kernel_size / 2) as f64;
    let weights: Vec<f64> = (0..kernel_size)
        .map(|i| {
            let x = i as f64 - half;
            (-x * x / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f64 = weights.iter().sum();
    weights.iter().map(|&w| (w / sum) as f32).collect()
}

/// Blurs `data` in place with a precomputed kernel, reusing `temp` between calls.
pub fn separable_blur(
    data: &mut [u8],
    width: usize,
    height: usize,
    channels: usize,
    kernel: &[f32],
    temp: &mut Vec<f32>,
) {
    if kernel.len() <= 1 || width == 0 || height == 0 {
        return;
    }
    let half = (kernel.len() / 2) as isize;
    temp.clear();
    temp.resize(width * height * channels, 0.0);

    let clamp = |i: isize, len: usize| i.clamp(0, len as isize - 1) as usize;

    // Horizontal pass: data -> temp
    for y in 0..height {
        let row = &data[y * width * channels..(y + 1) * width * channels];
        let out = &mut temp[y * width * channels..(y + 1) * width * channels];
        for x in 0..width {
            for c in 0..channels {
                let sum: f32 = kernel
                    .iter()
                    .enumerate()
                    .map(|(k, &w)| {
                        let sx = clamp(x as isize + k as isize - half, width);
                        row[sx * channels + c] as f32 * w
                    })
                    .sum();
                out[x * channels + c] = sum;
            }
        }
    }

    // Vertical pass: temp -> data
    let stride = width * channels;
    for y in 0..height {
        for i in 0..stride {
            let sum: f32 = kernel
                .iter()
                .enumerate()
                .map(|(k, &w)| {
                    let sy = clamp(y as isize + k as isize - half, height);
                    temp[sy * stride + i] * w
                })
                .sum();
            data[y * stride + i] = sum.round().clamp(0.0, 255.0) as u8;
        }
    }
}

/// Downscales by an integer factor using area averaging.
pub fn downscale(
    data: &[u8],
    width: usize,
    height: usize,
    channels: usize,
    scale: usize,
) -> (Vec<u8>, usize, usize) {
    let new_w = width / scale;
    let new_h = height / scale;
    let mut out = vec![0u8; new_w * new_h * channels];

    for y in 0..new_h {
        for x in 0..new_w {
            for c in 0..channels {
                let mut sum = 0u32;
                for dy in 0..scale {
                    for dx in 0..scale {
                        let sy = y * scale + dy;
                        let sx = x * scale + dx;
                        sum += data[(sy * width + sx) * channels + c] as u32;
                    }
                }
                out[(y * new_w + x) * channels + c] = (sum / (scale * scale) as u32) as u8;
            }
        }
    }

    (out, new_w, new_h)
}

/// Upscales to `target_w × target_h` using bilinear interpolation.
pub fn upscale(
    data: &[u8],
    width: usize,
    height: usize,
    channels: usize,
    target_w: usize,
    target_h: usize,
) -> Vec<u8> {
    let mut out = vec![0u8; target_w * target_h * channels];
    let ratio = |src: usize, dst: usize| (src as f32 - 1.0) / (dst as f32 - 1.0).max(1.0);
    let rx = ratio(width, target_w);
    let ry = ratio(height, target_h);

    for y in 0..target_h {
        let src_y = y as f32 * ry;
        let y0 = (src_y.floor() as usize).min(height - 1);
        let y1 = (y0 + 1).min(height - 1);
        let fy = src_y - y0 as f32;
        for x in 0..target_w {
            let src_x = x as f32 * rx;
            let x0 = (src_x.floor() as usize).min(width - 1);
            let x1 = (x0 + 1).min(width - 1);
            let fx = src_x - x0 as f32;

            for c in 0..channels {
                let px = |xx: usize, yy: usize| data[(yy * width + xx) * channels + c] as f32;
                let top = px(x0, y0) * (1.0 - fx) + px(x1, y0) * fx;
                let bottom = px(x0, y1) * (1.0 - fx) + px(x1, y1) * fx;
                let val = top * (1.0 - fy) + bottom * fy;
                out[(y * target_w + x) * channels + c] = val.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    out
}
