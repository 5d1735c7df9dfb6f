//! Window functions shared by spectral analysis and curve smoothing.

use std::f64::consts::PI;

use ndarray::Array1;

use crate::operations::types::WindowType;

/// Generates a symmetric window of `size` samples.
///
/// The cosine windows use an `N - 1` denominator, so the first and last
/// samples of a Hann window are exactly zero. Windows of length 0 or 1
/// degenerate to all ones.
pub fn generate_window(size: usize, window_type: WindowType) -> Array1<f64> {
    if size <= 1 {
        return Array1::ones(size);
    }
    let n_max = (size - 1) as f64;
    match window_type {
        WindowType::Rectangular => Array1::ones(size),
        WindowType::Hanning => {
            Array1::from_shape_fn(size, |i| 0.5 * (1.0 - (2.0 * PI * i as f64 / n_max).cos()))
        }
        WindowType::Hamming => {
            Array1::from_shape_fn(size, |i| 0.54 - 0.46 * (2.0 * PI * i as f64 / n_max).cos())
        }
        WindowType::Blackman => Array1::from_shape_fn(size, |i| {
            let n = i as f64;
            0.42 - 0.5 * (2.0 * PI * n / n_max).cos() + 0.08 * (4.0 * PI * n / n_max).cos()
        }),
    }
}

/// Hamming window of `size` samples.
pub fn hamming(size: usize) -> Array1<f64> {
    generate_window(size, WindowType::Hamming)
}
