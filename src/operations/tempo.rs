//! Dominant inter-beat interval estimation.
//!
//! The activation curve is smoothed with a Hamming kernel, autocorrelated
//! over a lag range derived from the tempo limits, and the strongest lag is
//! taken as the beat interval.

use ndarray::{Array1, ArrayView1};

use crate::activations::Activations;
use crate::operations::peak_picking::convolve_same;
use crate::operations::types::{AcfNormalization, TempoConfig};
use crate::operations::window::hamming;
use crate::AudioEventResult;

/// Smooths `activations` with a Hamming kernel of `width` frames.
///
/// Widths of 0 and 1 return the input unchanged.
pub fn smooth_signal(activations: ArrayView1<'_, f64>, width: usize) -> Array1<f64> {
    if width <= 1 {
        return activations.to_owned();
    }
    convolve_same(activations, &hamming(width).to_vec())
}

/// Autocorrelation of `activations` for every lag in `min_tau..=max_tau`.
///
/// Entry `i` holds lag `min_tau + i`. Lags at or beyond the curve length are 0.
pub fn interval_histogram_acf(
    activations: ArrayView1<'_, f64>,
    min_tau: usize,
    max_tau: usize,
    normalization: AcfNormalization,
) -> Array1<f64> {
    let n = activations.len();
    if max_tau < min_tau {
        return Array1::zeros(0);
    }
    Array1::from_shape_fn(max_tau - min_tau + 1, |i| {
        let tau = min_tau + i;
        if tau >= n {
            return 0.0;
        }
        let overlap = n - tau;
        let sum: f64 = activations
            .slice(ndarray::s![..overlap])
            .iter()
            .zip(activations.slice(ndarray::s![tau..]))
            .map(|(a, b)| a * b)
            .sum();
        match normalization {
            AcfNormalization::None => sum,
            AcfNormalization::Unbiased => sum / overlap as f64,
        }
    })
}

/// Lag of the histogram maximum; ties go to the smallest lag.
pub fn dominant_interval(histogram: ArrayView1<'_, f64>, min_tau: usize) -> usize {
    let mut best = 0;
    for (i, &value) in histogram.iter().enumerate() {
        if value > histogram[best] {
            best = i;
        }
    }
    min_tau + best
}

/// Estimates beat intervals and tempi from activation curves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoEstimator {
    config: TempoConfig,
}

impl TempoEstimator {
    /// Creates an estimator.
    ///
    /// # Errors
    /// Returns a parameter error for non-positive or inverted bpm limits.
    pub fn new(config: TempoConfig) -> AudioEventResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The estimator configuration.
    pub const fn config(&self) -> &TempoConfig {
        &self.config
    }

    /// Dominant interval in frames of the given curve.
    ///
    /// Returns `None` for empty or silent curves and for curves too short to
    /// hold the smallest lag.
    pub fn dominant_interval(&self, activations: &Activations) -> Option<usize> {
        self.estimate_interval(activations.values().view(), activations.fps())
    }

    /// Tempo in beats per minute, `60 · fps / interval`.
    pub fn tempo(&self, activations: &Activations) -> Option<f64> {
        self.dominant_interval(activations)
            .map(|tau| 60.0 * activations.fps() / tau as f64)
    }

    /// Dominant interval of a raw curve sampled at `fps`.
    pub fn estimate_interval(&self, values: ArrayView1<'_, f64>, fps: f64) -> Option<usize> {
        let (min_tau, max_tau) = self.config.lag_range(fps);
        if values.len() <= min_tau {
            return None;
        }
        let smoothed = smooth_signal(values, self.config.smooth_frames(fps));
        let histogram =
            interval_histogram_acf(smoothed.view(), min_tau, max_tau, self.config.normalization);
        let peak = histogram.iter().copied().fold(0.0, f64::max);
        if peak <= 0.0 {
            return None;
        }
        let interval = dominant_interval(histogram.view(), min_tau);
        tracing::trace!(min_tau, max_tau, interval, "dominant interval");
        Some(interval)
    }
}
