//! Separable Gaussian blur for sensor-noise suppression.

use ndarray::{Array2, ArrayView2};

/// Normalized 1D Gaussian kernel.
///
/// A non-positive `sigma` is derived from the size as
/// `0.3 * ((size - 1) * 0.5 - 1) + 0.8`. Even sizes are bumped to the next
/// odd size so the kernel stays centered.
pub fn gaussian_kernel(size: usize, sigma: f64) -> Vec<f64> {
    let size = if size % 2 == 0 { size + 1 } else { size };
    let sigma = if sigma > 0.0 {
        sigma
    } else {
        0.3 * ((size as f64 - 1.0) * 0.5 - 1.0) + 0.8
    };

    let half = (size / 2) as f64;
    let weights: Vec<f64> = (0..size)
        .map(|i| {
            let d = i as f64 - half;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
}

/// Reflect an out-of-range index back inside `0..len` without repeating the
/// edge sample (`dcb|abcd|cba`).
fn reflect(i: isize, len: usize) -> usize {
    let len = len as isize;
    if len == 1 {
        return 0;
    }
    let period = 2 * (len - 1);
    let m = i.rem_euclid(period);
    (if m < len { m } else { period - m }) as usize
}

/// Gaussian blur of an intensity image.
pub fn gaussian_blur(image: ArrayView2<u8>, size: usize, sigma: f64) -> Array2<u8> {
    let kernel = gaussian_kernel(size, sigma);
    let half = (kernel.len() / 2) as isize;
    let (rows, cols) = image.dim();
    if rows == 0 || cols == 0 {
        return image.to_owned();
    }

    let horizontal = Array2::from_shape_fn((rows, cols), |(r, c)| {
        kernel
            .iter()
            .enumerate()
            .map(|(k, w)| w * image[[r, reflect(c as isize + k as isize - half, cols)]] as f64)
            .sum::<f64>()
    });

    Array2::from_shape_fn((rows, cols), |(r, c)| {
        let v: f64 = kernel
            .iter()
            .enumerate()
            .map(|(k, w)| w * horizontal[[reflect(r as isize + k as isize - half, rows), c]])
            .sum();
        v.round().clamp(0.0, 255.0) as u8
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn kernel_is_normalized_and_symmetric() {
        let k = gaussian_kernel(5, 0.0);
        assert_eq!(k.len(), 5);
        assert_relative_eq!(k.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(k[0], k[4], epsilon = 1e-12);
        assert!(k[2] > k[1] && k[1] > k[0]);
    }

    #[test]
    fn even_size_becomes_odd() {
        assert_eq!(gaussian_kernel(4, 1.0).len(), 5);
    }

    #[test]
    fn reflect_mirrors_without_edge_repeat() {
        assert_eq!(reflect(-1, 5), 1);
        assert_eq!(reflect(-2, 5), 2);
        assert_eq!(reflect(5, 5), 3);
        assert_eq!(reflect(2, 5), 2);
        assert_eq!(reflect(-3, 1), 0);
    }

    #[test]
    fn uniform_image_is_unchanged() {
        let image = Array2::from_elem((8, 12), 77u8);
        assert_eq!(gaussian_blur(image.view(), 5, 1.2), image);
    }

    #[test]
    fn single_hot_pixel_spreads() {
        let mut image = Array2::zeros((9, 9));
        image[[4, 4]] = 255u8;
        let blurred = gaussian_blur(image.view(), 5, 1.0);
        assert!(blurred[[4, 4]] < 255);
        assert!(blurred[[4, 5]] > 0);
        assert_eq!(blurred[[0, 0]], 0);
    }
}
