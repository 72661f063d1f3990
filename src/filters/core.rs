//! Core raster utilities shared by the geometry analyzer and the compositor.
//!
//! This module provides:
//! - Gaussian kernel generation and separable blurs of scalar fields
//! - 5-tap Sobel derivatives
//! - Bilinear resampling of scalar fields
//! - Exact Euclidean distance transform

use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};

/// Generate a 1D Gaussian kernel.
///
/// # Arguments
/// * `sigma` - Standard deviation of the Gaussian
///
/// # Returns
/// Normalized 1D kernel as Vec<f32>
pub fn gaussian_kernel_1d(sigma: f32) -> Vec<f32> {
    if sigma <= 0.0 {
        return vec![1.0];
    }

    // Kernel size = 6 sigma (covers 99.7% of distribution), ensure odd
    let kernel_size = ((sigma * 6.0).ceil() as usize) | 1;
    let half = kernel_size / 2;

    let mut kernel: Vec<f32> = (0..kernel_size)
        .map(|i| {
            let x = i as f32 - half as f32;
            (-x * x / (2.0 * sigma * sigma)).exp()
        })
        .collect();

    let sum: f32 = kernel.iter().sum();
    for v in kernel.iter_mut() {
        *v /= sum;
    }

    kernel
}

/// Half-width in pixels of the kernel `gaussian_kernel_1d(sigma)` produces.
pub fn gaussian_radius(sigma: f32) -> usize {
    gaussian_kernel_1d(sigma).len() / 2
}

/// Correlate a scalar field with a horizontal and a vertical 1D kernel.
///
/// Borders are handled by clamping (edge pixels are replicated).
pub fn convolve_separable(field: ArrayView2<f32>, kernel_x: &[f32], kernel_y: &[f32]) -> Array2<f32> {
    let (height, width) = field.dim();
    if height == 0 || width == 0 {
        return Array2::zeros((height, width));
    }
    let half_x = kernel_x.len() / 2;
    let half_y = kernel_y.len() / 2;

    let mut temp = Array2::<f32>::zeros((height, width));
    let mut result = Array2::<f32>::zeros((height, width));

    // Horizontal pass
    for y in 0..height {
        for x in 0..width {
            let mut sum = 0.0f32;
            for (ki, &kv) in kernel_x.iter().enumerate() {
                let sx = (x as isize + ki as isize - half_x as isize)
                    .clamp(0, width as isize - 1) as usize;
                sum += field[[y, sx]] * kv;
            }
            temp[[y, x]] = sum;
        }
    }

    // Vertical pass
    for y in 0..height {
        for x in 0..width {
            let mut sum = 0.0f32;
            for (ki, &kv) in kernel_y.iter().enumerate() {
                let sy = (y as isize + ki as isize - half_y as isize)
                    .clamp(0, height as isize - 1) as usize;
                sum += temp[[sy, x]] * kv;
            }
            result[[y, x]] = sum;
        }
    }

    result
}

/// Gaussian blur of an unbounded scalar field.
pub fn blur_field(field: ArrayView2<f32>, sigma: f32) -> Array2<f32> {
    if sigma <= 0.0 {
        return field.to_owned();
    }
    let kernel = gaussian_kernel_1d(sigma);
    convolve_separable(field, &kernel, &kernel)
}

/// Gaussian blur of an alpha field, clamped to 0.0-1.0.
pub fn blur_alpha_f32(alpha: ArrayView2<f32>, sigma: f32) -> Array2<f32> {
    blur_field(alpha, sigma).mapv(|v| v.clamp(0.0, 1.0))
}

/// Gaussian blur applied independently to each channel of a (H, W, C) field.
pub fn blur_channels(field: ArrayView3<f32>, sigma: f32) -> Array3<f32> {
    let mut result = field.to_owned();
    if sigma <= 0.0 {
        return result;
    }
    for (c, mut channel) in result.axis_iter_mut(Axis(2)).enumerate() {
        let blurred = blur_field(field.index_axis(Axis(2), c), sigma);
        channel.assign(&blurred);
    }
    result
}

const SOBEL5_SMOOTH: [f32; 5] = [1.0, 4.0, 6.0, 4.0, 1.0];
const SOBEL5_DERIV: [f32; 5] = [-1.0, -2.0, 0.0, 2.0, 1.0];

/// 5x5 Sobel derivative along x (positive where the field increases to the right).
pub fn sobel5_x(field: ArrayView2<f32>) -> Array2<f32> {
    convolve_separable(field, &SOBEL5_DERIV, &SOBEL5_SMOOTH)
}

/// 5x5 Sobel derivative along y (positive where the field increases downward).
pub fn sobel5_y(field: ArrayView2<f32>) -> Array2<f32> {
    convolve_separable(field, &SOBEL5_SMOOTH, &SOBEL5_DERIV)
}

/// Resample a scalar field with bilinear interpolation.
///
/// Uses pixel-centre alignment: output pixel `i` samples source coordinate
/// `(i + 0.5) * scale - 0.5`, clamped to the source extent.
pub fn resize_bilinear(field: ArrayView2<f32>, out_height: usize, out_width: usize) -> Array2<f32> {
    let (in_h, in_w) = field.dim();
    let mut result = Array2::<f32>::zeros((out_height, out_width));
    if in_h == 0 || in_w == 0 {
        return result;
    }
    if (in_h, in_w) == (out_height, out_width) {
        result.assign(&field);
        return result;
    }

    let scale_y = in_h as f32 / out_height as f32;
    let scale_x = in_w as f32 / out_width as f32;

    for y in 0..out_height {
        let sy = ((y as f32 + 0.5) * scale_y - 0.5).clamp(0.0, (in_h - 1) as f32);
        let y0 = sy.floor() as usize;
        let y1 = (y0 + 1).min(in_h - 1);
        let fy = sy - y0 as f32;

        for x in 0..out_width {
            let sx = ((x as f32 + 0.5) * scale_x - 0.5).clamp(0.0, (in_w - 1) as f32);
            let x0 = sx.floor() as usize;
            let x1 = (x0 + 1).min(in_w - 1);
            let fx = sx - x0 as f32;

            let a = field[[y0, x0]] + fx * (field[[y0, x1]] - field[[y0, x0]]);
            let b = field[[y1, x0]] + fx * (field[[y1, x1]] - field[[y1, x0]]);
            result[[y, x]] = a + fy * (b - a);
        }
    }

    result
}

const EDT_INF: f64 = 1e20;

/// Squared distance transform of a sampled 1D function (lower envelope of parabolas).
fn edt_1d(f: &[f64], d: &mut [f64], v: &mut [usize], z: &mut [f64]) {
    let n = f.len();
    if n == 0 {
        return;
    }

    let mut k = 0usize;
    v[0] = 0;
    z[0] = -EDT_INF;
    z[1] = EDT_INF;

    let intersect = |q: usize, p: usize| {
        let (qf, pf) = (q as f64, p as f64);
        ((f[q] + qf * qf) - (f[p] + pf * pf)) / (2.0 * qf - 2.0 * pf)
    };

    for q in 1..n {
        let mut s = intersect(q, v[k]);
        // z[0] is -inf, so this never walks below the first parabola
        while k > 0 && s <= z[k] {
            k -= 1;
            s = intersect(q, v[k]);
        }
        k += 1;
        v[k] = q;
        z[k] = s;
        z[k + 1] = EDT_INF;
    }

    k = 0;
    for (q, out) in d.iter_mut().enumerate().take(n) {
        let qf = q as f64;
        while z[k + 1] < qf {
            k += 1;
        }
        let p = v[k] as f64;
        *out = (qf - p) * (qf - p) + f[v[k]];
    }
}

/// Exact Euclidean distance from every foreground pixel to the nearest background pixel.
///
/// Foreground is any non-zero mask value. Pixels outside the image count as
/// background, so a region touching the border fades toward it. Background
/// pixels get distance 0.
pub fn distance_transform(mask: ArrayView2<u8>) -> Array2<f32> {
    let (height, width) = mask.dim();
    if height == 0 || width == 0 {
        return Array2::zeros((height, width));
    }

    // One pixel of background padding on every side.
    let ph = height + 2;
    let pw = width + 2;
    let mut grid = Array2::<f64>::zeros((ph, pw));
    for y in 0..height {
        for x in 0..width {
            if mask[[y, x]] != 0 {
                grid[[y + 1, x + 1]] = EDT_INF;
            }
        }
    }

    let longest = ph.max(pw);
    let mut f = vec![0.0f64; longest];
    let mut d = vec![0.0f64; longest];
    let mut v = vec![0usize; longest];
    let mut z = vec![0.0f64; longest + 1];

    // Columns
    for x in 0..pw {
        for y in 0..ph {
            f[y] = grid[[y, x]];
        }
        edt_1d(&f[..ph], &mut d[..ph], &mut v, &mut z);
        for y in 0..ph {
            grid[[y, x]] = d[y];
        }
    }

    // Rows
    for y in 0..ph {
        for x in 0..pw {
            f[x] = grid[[y, x]];
        }
        edt_1d(&f[..pw], &mut d[..pw], &mut v, &mut z);
        for x in 0..pw {
            grid[[y, x]] = d[x];
        }
    }

    let mut result = Array2::<f32>::zeros((height, width));
    for y in 0..height {
        for x in 0..width {
            result[[y, x]] = grid[[y + 1, x + 1]].sqrt() as f32;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_gaussian_kernel_normalized() {
        let kernel = gaussian_kernel_1d(2.0);
        let sum: f32 = kernel.iter().sum();
        assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-5);
        assert_eq!(kernel.len() % 2, 1);
        assert_eq!(gaussian_radius(5.0), 15);
    }

    #[test]
    fn test_blur_constant_field_unchanged() {
        let field = Array2::<f32>::from_elem((8, 8), 0.6);
        let blurred = blur_field(field.view(), 3.0);
        for &v in blurred.iter() {
            assert_abs_diff_eq!(v, 0.6, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_blur_alpha_spreads_edge() {
        let mut alpha = Array2::<f32>::zeros((1, 11));
        for x in 0..5 {
            alpha[[0, x]] = 1.0;
        }
        let blurred = blur_alpha_f32(alpha.view(), 1.0);
        assert!(blurred[[0, 5]] > 0.0);
        assert!(blurred[[0, 4]] < 1.0);
        assert!(blurred.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_sobel_on_ramp() {
        let field = Array2::from_shape_fn((9, 9), |(_, x)| x as f32);
        let gx = sobel5_x(field.view());
        let gy = sobel5_y(field.view());
        // Unit slope gives 8 (derivative taps) * 16 (smoothing taps)
        assert_abs_diff_eq!(gx[[4, 4]], 128.0, epsilon = 1e-3);
        assert_abs_diff_eq!(gy[[4, 4]], 0.0, epsilon = 1e-3);
    }

    #[test]
    fn test_resize_identity_and_upscale() {
        let field = Array2::from_shape_fn((2, 2), |(y, x)| (y * 2 + x) as f32);
        let same = resize_bilinear(field.view(), 2, 2);
        assert_eq!(same, field);

        let up = resize_bilinear(field.view(), 4, 4);
        assert_eq!(up.dim(), (4, 4));
        assert_abs_diff_eq!(up[[0, 0]], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(up[[3, 3]], 3.0, epsilon = 1e-6);
        assert!(up[[1, 1]] > 0.0 && up[[1, 1]] < 3.0);
    }

    #[test]
    fn test_distance_transform_square() {
        let mut mask = Array2::<u8>::zeros((9, 9));
        for y in 2..7 {
            for x in 2..7 {
                mask[[y, x]] = 1;
            }
        }
        let dist = distance_transform(mask.view());
        assert_eq!(dist[[0, 0]], 0.0);
        assert_abs_diff_eq!(dist[[2, 2]], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(dist[[4, 4]], 3.0, epsilon = 1e-6);
        assert_abs_diff_eq!(dist[[3, 2]], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_distance_transform_border_counts_as_background() {
        let mask = Array2::<u8>::ones((5, 5));
        let dist = distance_transform(mask.view());
        assert_abs_diff_eq!(dist[[0, 0]], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(dist[[2, 2]], 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_distance_transform_diagonal() {
        let mut mask = Array2::<u8>::ones((7, 7));
        mask[[0, 0]] = 0;
        let dist = distance_transform(mask.view());
        // (3,3) is sqrt(18) from (0,0) but only 4 from the padded border
        assert_abs_diff_eq!(dist[[3, 3]], 4.0, epsilon = 1e-6);
        assert_abs_diff_eq!(dist[[1, 1]], 2.0f32.sqrt(), epsilon = 1e-6);
    }
}
