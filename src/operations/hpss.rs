//! Harmonic/Percussive Source Separation (HPSS) on magnitude spectrograms.
//!
//! This module implements the median filtering approach:
//!
//! 1. Apply a median filter along the time axis to enhance harmonic content
//!    (sustained partials are stable from frame to frame).
//! 2. Apply a median filter along the frequency axis to enhance percussive
//!    content (transients are broadband).
//! 3. Compare the two estimates bin by bin to build separation masks.
//! 4. Multiply the input by the masks to obtain the two components.
//!
//! Filter sizes are given as `(frames, bins)`. Borders are handled by
//! reflection including the edge sample (`d c b a | a b c d | d c b a`).
//!
//! ## References
//! - Fitzgerald, D. (2010). "Harmonic/percussive separation using median filtering"

use ndarray::{Array2, ArrayView2, Zip};

use crate::operations::types::{HpssConfig, MaskType};
use crate::{AudioEventResult, LayoutError};

/// Median filter estimates, masks and separated components.
#[derive(Debug, Clone, PartialEq)]
pub struct HpssComponents {
    /// Time-axis median filtered spectrogram.
    pub harmonic_estimate: Array2<f64>,
    /// Frequency-axis median filtered spectrogram.
    pub percussive_estimate: Array2<f64>,
    /// Mask selecting harmonic content.
    pub harmonic_mask: Array2<f64>,
    /// Mask selecting percussive content.
    pub percussive_mask: Array2<f64>,
    /// Harmonic component of the input.
    pub harmonic: Array2<f64>,
    /// Percussive component of the input.
    pub percussive: Array2<f64>,
}

/// Separates a `[num_frames × num_bins]` magnitude spectrogram into harmonic
/// and percussive components.
///
/// # Errors
/// Returns a parameter error for zero filter sizes or a non-positive mask
/// power.
pub fn separate(
    spectrogram: ArrayView2<'_, f64>,
    config: &HpssConfig,
) -> AudioEventResult<HpssComponents> {
    config.validate()?;
    let harmonic_estimate = median_filter(spectrogram, config.harmonic_filter);
    let percussive_estimate = median_filter(spectrogram, config.percussive_filter);
    let (harmonic_mask, percussive_mask) = separation_masks(
        harmonic_estimate.view(),
        percussive_estimate.view(),
        config.mask,
    )?;
    let harmonic = &spectrogram * &harmonic_mask;
    let percussive = &spectrogram * &percussive_mask;
    tracing::debug!(
        shape = ?spectrogram.dim(),
        mask = ?config.mask,
        "harmonic/percussive separation"
    );
    Ok(HpssComponents {
        harmonic_estimate,
        percussive_estimate,
        harmonic_mask,
        percussive_mask,
        harmonic,
        percussive,
    })
}

/// Two-dimensional median filter with a `(frames, bins)` kernel.
///
/// For even kernel sizes the upper of the two middle values is taken.
pub fn median_filter(spectrogram: ArrayView2<'_, f64>, size: (usize, usize)) -> Array2<f64> {
    let (num_frames, num_bins) = spectrogram.dim();
    let (size_t, size_f) = (size.0.max(1), size.1.max(1));
    if (size_t == 1 && size_f == 1) || num_frames == 0 || num_bins == 0 {
        return spectrogram.to_owned();
    }
    let (half_t, half_f) = ((size_t / 2) as i64, (size_f / 2) as i64);
    let mut window = Vec::with_capacity(size_t * size_f);

    Array2::from_shape_fn((num_frames, num_bins), |(t, f)| {
        window.clear();
        for dt in 0..size_t as i64 {
            let row = reflect(t as i64 + dt - half_t, num_frames);
            for df in 0..size_f as i64 {
                let col = reflect(f as i64 + df - half_f, num_bins);
                window.push(spectrogram[[row, col]]);
            }
        }
        let middle = window.len() / 2;
        let (_, median, _) = window.select_nth_unstable_by(middle, f64::total_cmp);
        *median
    })
}

/// Harmonic and percussive masks from the two median filter estimates.
///
/// Binary masks assign a bin to the harmonic component when its harmonic
/// estimate is strictly larger. Soft masks weight each bin by
/// `H^p / (H^p + P^p)`; bins where both estimates vanish are split evenly.
///
/// # Errors
/// Returns a layout error if the estimates differ in shape.
pub fn separation_masks(
    harmonic: ArrayView2<'_, f64>,
    percussive: ArrayView2<'_, f64>,
    mask: MaskType,
) -> AudioEventResult<(Array2<f64>, Array2<f64>)> {
    if harmonic.dim() != percussive.dim() {
        return Err(LayoutError::shape_mismatch(
            "separation_masks",
            harmonic.dim(),
            percussive.dim(),
        )
        .into());
    }
    let mut harmonic_mask = Array2::<f64>::zeros(harmonic.dim());
    let mut percussive_mask = Array2::<f64>::zeros(harmonic.dim());

    Zip::from(&mut harmonic_mask)
        .and(&mut percussive_mask)
        .and(harmonic)
        .and(percussive)
        .for_each(|hm, pm, &h, &p| match mask {
            MaskType::Binary => {
                let is_harmonic = h > p;
                *hm = if is_harmonic { 1.0 } else { 0.0 };
                *pm = if is_harmonic { 0.0 } else { 1.0 };
            }
            MaskType::Soft(power) => {
                let (hp, pp) = (h.powf(power), p.powf(power));
                let total = hp + pp;
                if total > 0.0 {
                    *hm = hp / total;
                    *pm = pp / total;
                } else {
                    *hm = 0.5;
                    *pm = 0.5;
                }
            }
        });

    Ok((harmonic_mask, percussive_mask))
}

/// Maps an out-of-range index back into `0..len` by edge-inclusive reflection.
fn reflect(mut index: i64, len: usize) -> usize {
    let len = len as i64;
    let period = 2 * len;
    index = index.rem_euclid(period);
    if index >= len {
        index = period - index - 1;
    }
    index as usize
}
