//! Peak picking on activation curves.
//!
//! This module turns a continuous activation curve into discrete event
//! positions. It implements smoothing, adaptive thresholding against a moving
//! average and local maximum selection, plus the [`OnsetDetector`] front end
//! that works in seconds rather than frames.
//!
//! ## Mathematical Foundation
//!
//! ### Smoothing
//!
//! The curve is optionally convolved with a kernel `w` of length `M`, keeping
//! the centered part of the full convolution:
//!
//! ```text
//! y[n] = Σ_j x[n + (M-1)/2 - j] · w[j]
//! ```
//!
//! ### Adaptive Thresholding
//!
//! With a moving average over `[t - pre_avg, t + post_avg]` (zero padded):
//!
//! ```text
//! keep[t] = x[t] ≥ avg[t] + δ
//! ```
//!
//! When both averaging widths are 0 no average is used and `δ` is an absolute
//! threshold. This is the right choice for level-independent activations such
//! as neural network outputs.
//!
//! ### Peak Selection
//!
//! A kept sample is a peak if it equals the maximum over
//! `[t - pre_max, t + post_max]` (zero padded) and is non-zero. For online
//! detection every `post_*` width is 0.

use ndarray::{Array1, ArrayView1};

use crate::activations::{Activations, EventSequence, combine_events};
use crate::operations::types::{CombineMode, OnsetDetectorConfig, PeakPickingConfig, Smoothing};
use crate::operations::window::hamming;
use crate::AudioEventResult;

/// Convolution that keeps the input length, centered like numpy's `same` mode.
pub fn convolve_same(signal: ArrayView1<'_, f64>, kernel: &[f64]) -> Array1<f64> {
    let n = signal.len();
    let m = kernel.len();
    if m == 0 || n == 0 {
        return signal.to_owned();
    }
    let offset = (m - 1) / 2;
    Array1::from_shape_fn(n, |out| {
        let i = out + offset;
        let j_min = i.saturating_sub(n - 1);
        let j_max = i.min(m - 1);
        (j_min..=j_max).map(|j| signal[i - j] * kernel[j]).sum()
    })
}

/// Applies the configured smoothing; kernels of fewer than 2 taps are ignored.
pub fn smooth_activations(activations: ArrayView1<'_, f64>, smoothing: &Smoothing) -> Array1<f64> {
    match smoothing {
        Smoothing::Hamming(width) if *width > 1 => {
            let kernel = hamming(*width).to_vec();
            convolve_same(activations, &kernel)
        }
        Smoothing::Kernel(kernel) if kernel.len() > 1 => convolve_same(activations, kernel),
        _ => activations.to_owned(),
    }
}

/// Mean over `[t - pre, t + post]`, treating samples outside the curve as 0.
pub fn moving_average(values: ArrayView1<'_, f64>, pre: usize, post: usize) -> Array1<f64> {
    let n = values.len();
    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0);
    for &v in values {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + v);
    }
    let length = (pre + post + 1) as f64;
    Array1::from_shape_fn(n, |t| {
        let lo = t.saturating_sub(pre);
        let hi = (t + post + 1).min(n);
        (prefix[hi] - prefix[lo]) / length
    })
}

/// Maximum over `[t - pre, t + post]`, treating samples outside the curve as 0.
pub fn moving_maximum(values: ArrayView1<'_, f64>, pre: usize, post: usize) -> Array1<f64> {
    let n = values.len();
    Array1::from_shape_fn(n, |t| {
        let lo = t.saturating_sub(pre);
        let hi = (t + post + 1).min(n);
        let padded = t < pre || t + post >= n;
        let inside = values
            .slice(ndarray::s![lo..hi])
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        if padded { inside.max(0.0) } else { inside }
    })
}

/// Returns the ascending frame indices of the peaks in `activations`.
///
/// Empty and all-zero curves yield no peaks.
pub fn peak_picking(activations: ArrayView1<'_, f64>, config: &PeakPickingConfig) -> Vec<usize> {
    if activations.is_empty() {
        return Vec::new();
    }
    let smoothed = smooth_activations(activations, &config.smoothing);

    let detections = if config.pre_avg + config.post_avg > 0 {
        let average = moving_average(smoothed.view(), config.pre_avg, config.post_avg);
        ndarray::Zip::from(&smoothed)
            .and(&average)
            .map_collect(|&x, &avg| if x >= avg + config.threshold { x } else { 0.0 })
    } else {
        smoothed.mapv(|x| if x >= config.threshold { x } else { 0.0 })
    };

    let peaks: Vec<usize> = if config.pre_max + config.post_max > 0 {
        let maximum = moving_maximum(detections.view(), config.pre_max, config.post_max);
        detections
            .iter()
            .zip(&maximum)
            .enumerate()
            .filter(|&(_, (&d, &m))| d != 0.0 && d == m)
            .map(|(t, _)| t)
            .collect()
    } else {
        detections
            .iter()
            .enumerate()
            .filter(|&(_, &d)| d != 0.0)
            .map(|(t, _)| t)
            .collect()
    };
    tracing::trace!(num_frames = activations.len(), num_peaks = peaks.len(), "peak picking");
    peaks
}

/// Onset detection on activation curves with parameters in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct OnsetDetector {
    config: OnsetDetectorConfig,
}

impl OnsetDetector {
    /// Creates a detector.
    ///
    /// # Errors
    /// Returns a parameter error for negative durations or a non-finite
    /// threshold or delay.
    pub fn new(config: OnsetDetectorConfig) -> AudioEventResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The detector configuration.
    pub const fn config(&self) -> &OnsetDetectorConfig {
        &self.config
    }

    /// Frame-level parameters for the given frame rate.
    pub fn frame_config(&self, fps: f64) -> PeakPickingConfig {
        self.config.to_frames(fps)
    }

    /// Detects onsets and reports them in seconds, shifted by the delay and
    /// combined according to the combine mode.
    ///
    /// # Errors
    /// Returns a parameter error if the combined onsets are not strictly
    /// increasing, which only a non-finite delay could cause.
    pub fn detect(&self, activations: &Activations) -> AudioEventResult<EventSequence> {
        let fps = activations.fps();
        let peaks = peak_picking(activations.values().view(), &self.frame_config(fps));
        let times: Vec<f64> = peaks
            .iter()
            .map(|&frame| frame as f64 / fps + self.config.delay)
            .collect();

        let combined = match self.config.combine_mode {
            CombineMode::KeepFirst => keep_first(&times, self.config.combine),
            CombineMode::Mean => combine_events(&times, self.config.combine),
        };
        tracing::debug!(
            num_peaks = peaks.len(),
            num_onsets = combined.len(),
            online = self.config.online,
            "onsets detected"
        );
        EventSequence::from_times(combined)
    }
}

/// Keeps the first event and every event more than `combine` seconds after
/// its predecessor in the uncombined list.
fn keep_first(times: &[f64], combine: f64) -> Vec<f64> {
    let Some(&first) = times.first() else {
        return Vec::new();
    };
    std::iter::once(first)
        .chain(
            times
                .windows(2)
                .filter(|w| w[1] - w[0] > combine)
                .map(|w| w[1]),
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx_eq::assert_approx_eq;
    use ndarray::array;

    #[test]
    fn test_peak_picking_reference_curve() {
        let act = array![0.0, 1.0, 3.0, 2.0, 0.0, 0.0, 5.0, 0.0];
        let config = PeakPickingConfig::new(0.0);
        assert_eq!(peak_picking(act.view(), &config), vec![2, 6]);
    }

    #[test]
    fn test_empty_and_silent_curves() {
        let config = PeakPickingConfig::new(0.0);
        assert!(peak_picking(Array1::<f64>::zeros(0).view(), &config).is_empty());
        assert!(peak_picking(Array1::<f64>::zeros(10).view(), &config).is_empty());
    }

    #[test]
    fn test_threshold_is_absolute_without_average() {
        let act = array![0.0, 0.5, 0.0, 2.0, 0.0];
        let config = PeakPickingConfig::new(1.0);
        assert_eq!(peak_picking(act.view(), &config), vec![3]);
    }

    #[test]
    fn test_moving_average_threshold() {
        // a constant floor is removed by the moving average
        let act = array![1.0, 1.0, 1.0, 3.0, 1.0, 1.0, 1.0];
        let config = PeakPickingConfig {
            pre_avg: 2,
            post_avg: 2,
            ..PeakPickingConfig::new(0.5)
        };
        assert_eq!(peak_picking(act.view(), &config), vec![3]);
    }

    #[test]
    fn test_moving_average_zero_padding() {
        let avg = moving_average(array![3.0, 3.0, 3.0].view(), 1, 1);
        assert_approx_eq!(avg[0], 2.0, 1e-12);
        assert_approx_eq!(avg[1], 3.0, 1e-12);
        assert_approx_eq!(avg[2], 2.0, 1e-12);
    }

    #[test]
    fn test_moving_maximum_zero_padding() {
        let max = moving_maximum(array![-1.0, -2.0, -3.0].view(), 1, 0);
        assert_eq!(max.to_vec(), vec![0.0, -1.0, -2.0]);
    }

    #[test]
    fn test_convolve_same_matches_numpy() {
        // np.convolve([1, 2, 3], [0, 1, 0.5], 'same') == [1, 2.5, 4]
        let out = convolve_same(array![1.0, 2.0, 3.0].view(), &[0.0, 1.0, 0.5]);
        assert_eq!(out.to_vec(), vec![1.0, 2.5, 4.0]);
        // even kernel: np.convolve([1, 2, 3], [1, 1], 'same') == [1, 3, 5]
        let out = convolve_same(array![1.0, 2.0, 3.0].view(), &[1.0, 1.0]);
        assert_eq!(out.to_vec(), vec![1.0, 3.0, 5.0]);
    }

    #[test]
    fn test_hamming_smoothing_width_one_is_identity() {
        let act = array![0.0, 1.0, 0.0];
        assert_eq!(smooth_activations(act.view(), &Smoothing::Hamming(1)), act);
        let smoothed = smooth_activations(act.view(), &Smoothing::Hamming(3));
        // hamming(3) = [0.08, 1, 0.08]
        assert_approx_eq!(smoothed[0], 0.08, 1e-12);
        assert_approx_eq!(smoothed[1], 1.0, 1e-12);
    }

    #[test]
    fn test_online_detection_uses_past_only() {
        let act = Activations::new(array![0.0, 2.0, 3.0, 0.0], 100.0).unwrap();
        let offline = OnsetDetector::new(OnsetDetectorConfig {
            threshold: 1.0,
            pre_avg: 0.0,
            post_avg: 0.0,
            pre_max: 0.01,
            post_max: 0.01,
            ..OnsetDetectorConfig::new()
        })
        .unwrap();
        let online = OnsetDetector::new(OnsetDetectorConfig {
            threshold: 1.0,
            pre_avg: 0.0,
            pre_max: 0.01,
            combine: 0.0,
            ..OnsetDetectorConfig::online()
        })
        .unwrap();
        assert_eq!(offline.detect(&act).unwrap().times(), &[0.02]);
        // without look-ahead, the rising frame 1 is already a peak
        assert_eq!(online.frame_config(100.0).post_max, 0);
        assert_eq!(online.detect(&act).unwrap().len(), 2);
    }

    #[test]
    fn test_delay_and_keep_first_combine() {
        let mut values = Array1::<f64>::zeros(100);
        for frame in [10, 12, 14, 50] {
            values[frame] = 2.0;
        }
        let act = Activations::new(values, 100.0).unwrap();
        let detector = OnsetDetector::new(OnsetDetectorConfig {
            threshold: 1.0,
            pre_avg: 0.0,
            post_avg: 0.0,
            pre_max: 0.01,
            post_max: 0.01,
            combine: 0.03,
            delay: 0.5,
            ..OnsetDetectorConfig::new()
        })
        .unwrap();
        let onsets = detector.detect(&act).unwrap();
        // 12 and 14 follow their predecessors within 30 ms
        assert_eq!(onsets.len(), 2);
        assert_approx_eq!(onsets.times()[0], 0.6, 1e-12);
        assert_approx_eq!(onsets.times()[1], 1.0, 1e-12);
    }

    #[test]
    fn test_mean_combine() {
        let mut values = Array1::<f64>::zeros(100);
        values[10] = 2.0;
        values[12] = 2.0;
        values[60] = 2.0;
        let act = Activations::new(values, 100.0).unwrap();
        let detector = OnsetDetector::new(OnsetDetectorConfig {
            threshold: 1.0,
            pre_avg: 0.0,
            post_avg: 0.0,
            pre_max: 0.01,
            post_max: 0.01,
            combine_mode: CombineMode::Mean,
            ..OnsetDetectorConfig::new()
        })
        .unwrap();
        let onsets = detector.detect(&act).unwrap();
        assert_eq!(onsets.len(), 2);
        assert_approx_eq!(onsets.times()[0], 0.11, 1e-12);
        assert_approx_eq!(onsets.times()[1], 0.6, 1e-12);
    }

    #[test]
    fn test_invalid_detector_config() {
        let config = OnsetDetectorConfig {
            pre_avg: -0.1,
            ..OnsetDetectorConfig::new()
        };
        assert!(OnsetDetector::new(config).is_err());
    }
}
