//! Spectral onset detection functions.
//!
//! Every function maps a `[num_frames × num_bins]` spectrogram (magnitude,
//! positive difference or phase) to one activation value per frame. Frames
//! without enough history produce 0.
//!
//! ## Mathematical Foundation
//!
//! ### Magnitude-based functions
//!
//! With `S` the magnitude spectrogram and `D⁺` its positive difference over a
//! lag of `L` frames:
//!
//! - **High frequency content**: `HFC[t] = mean_k(S[t,k] · k)`
//! - **Spectral diff**: `SD[t] = Σ_k D⁺[t,k]²`
//! - **Spectral flux**: `SF[t] = Σ_k D⁺[t,k]`
//! - **SuperFlux**: `Σ_k max(0, S[t,k] - max_j S[t-L, j])`, with `j` ranging
//!   over the `max_bins` bins around `k`
//! - **Modified Kullback-Leibler**: `MKL[t] = mean_k ln(1 + S[t,k] / (S[t-L,k] + ε))`
//!
//! ### Phase-based functions
//!
//! With `φ` the phase and `wrap(x) = ((x + π) mod 2π) - π`:
//!
//! - **Phase deviation**: `PD[t] = mean_k |wrap(φ[t,k] - 2φ[t-1,k] + φ[t-2,k])|`
//! - **Weighted phase deviation**: `WPD[t] = mean_k |wrap(…) · S[t,k]|`
//! - **Normalized WPD**: `WPD[t] / (mean_k S[t,k] + ε)`
//! - **Complex domain**: `CD[t] = Σ_k |S[t]e^{iφ[t]} - S[t-1]e^{iψ[t-1]}|` with
//!   the predicted phase `ψ[t] = 2φ[t] - φ[t-1]` and `ψ[0] = 0`
//! - **Rectified complex domain**: as CD, restricted to bins whose magnitude
//!   rises
//!
//! Phase-based functions require magnitude and phase of the same shape, which
//! rules out filtered spectrograms.
//!
//! ## References
//!
//! - Bello, J.P., et al. "On the use of phase and energy for musical onset
//!   detection in the complex domain." IEEE SPL 2004.
//! - Böck, S. and Widmer, G. "Maximum filter vibrato suppression for onset
//!   detection." DAFx 2013.
//! - Dixon, S. "Onset detection revisited." DAFx 2006.

use std::f64::consts::PI;

use ndarray::{Array1, Array2, ArrayView2, Axis, Zip, s};
use num_complex::Complex;

use crate::activations::Activations;
use crate::operations::spectrogram::Spectrogram;
use crate::operations::types::OnsetFunction;
use crate::{AudioEventResult, AudioSample, LayoutError};

/// Added before divisions.
pub const EPSILON: f64 = 1e-6;

/// Wraps a phase to `[-π, π)`.
pub fn wrap_to_pi(phase: f64) -> f64 {
    (phase + PI).rem_euclid(2.0 * PI) - PI
}

fn row_means(values: &Array2<f64>) -> Array1<f64> {
    if values.ncols() == 0 {
        return Array1::zeros(values.nrows());
    }
    values.sum_axis(Axis(1)) / values.ncols() as f64
}

fn ensure_same_shape(
    operation: &str,
    spectrogram: &ArrayView2<'_, f64>,
    phase: &ArrayView2<'_, f64>,
) -> AudioEventResult<()> {
    if spectrogram.dim() != phase.dim() {
        return Err(LayoutError::shape_mismatch(operation, spectrogram.dim(), phase.dim()).into());
    }
    Ok(())
}

/// High frequency content: the mean of the magnitudes weighted by bin index.
pub fn high_frequency_content(spectrogram: ArrayView2<'_, f64>) -> Array1<f64> {
    let weighted = Array2::from_shape_fn(spectrogram.dim(), |(t, k)| spectrogram[[t, k]] * k as f64);
    row_means(&weighted)
}

/// Sum of squared positive differences.
pub fn spectral_diff(positive_diff: ArrayView2<'_, f64>) -> Array1<f64> {
    positive_diff.map_axis(Axis(1), |row| row.iter().map(|d| d * d).sum())
}

/// Sum of positive differences.
pub fn spectral_flux(positive_diff: ArrayView2<'_, f64>) -> Array1<f64> {
    positive_diff.sum_axis(Axis(1))
}

/// SuperFlux: spectral flux against a frequency-maximum-filtered reference
/// `lag` frames back.
///
/// The maximum filter of `max_bins` bins is centered on each bin (the upper
/// neighbour wins for even sizes) and clipped at the spectrum edges.
pub fn superflux(spectrogram: ArrayView2<'_, f64>, lag: usize, max_bins: usize) -> Array1<f64> {
    let (num_frames, num_bins) = spectrogram.dim();
    let mut flux = Array1::<f64>::zeros(num_frames);
    if lag == 0 || lag >= num_frames {
        return flux;
    }
    let max_spec = maximum_filter_bins(spectrogram, max_bins.max(1));
    for t in lag..num_frames {
        flux[t] = (0..num_bins)
            .map(|k| (spectrogram[[t, k]] - max_spec[[t - lag, k]]).max(0.0))
            .sum();
    }
    flux
}

/// Maximum over `[k - size/2, k - size/2 + size)` within each frame.
fn maximum_filter_bins(spectrogram: ArrayView2<'_, f64>, size: usize) -> Array2<f64> {
    let num_bins = spectrogram.ncols();
    let half = size / 2;
    Array2::from_shape_fn(spectrogram.dim(), |(t, k)| {
        let lo = k.saturating_sub(half);
        let hi = (k + size - half).min(num_bins);
        spectrogram
            .slice(s![t, lo..hi])
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    })
}

/// Modified Kullback-Leibler divergence between each frame and the frame
/// `lag` frames back.
pub fn modified_kullback_leibler(spectrogram: ArrayView2<'_, f64>, lag: usize) -> Array1<f64> {
    let (num_frames, num_bins) = spectrogram.dim();
    let mut mkl = Array1::<f64>::zeros(num_frames);
    if lag == 0 || lag >= num_frames || num_bins == 0 {
        return mkl;
    }
    for t in lag..num_frames {
        let sum: f64 = (0..num_bins)
            .map(|k| (1.0 + spectrogram[[t, k]] / (spectrogram[[t - lag, k]] + EPSILON)).ln())
            .sum();
        mkl[t] = sum / num_bins as f64;
    }
    mkl
}

/// Wrapped second-order phase difference; the first two frames are zero.
fn phase_deviation_matrix(phase: ArrayView2<'_, f64>) -> Array2<f64> {
    let mut deviation = Array2::<f64>::zeros(phase.dim());
    let num_frames = phase.nrows();
    if num_frames > 2 {
        Zip::from(deviation.slice_mut(s![2.., ..]))
            .and(phase.slice(s![2.., ..]))
            .and(phase.slice(s![1..num_frames - 1, ..]))
            .and(phase.slice(s![..num_frames - 2, ..]))
            .for_each(|d, &p0, &p1, &p2| *d = wrap_to_pi(p0 - 2.0 * p1 + p2));
    }
    deviation
}

/// Phase deviation.
pub fn phase_deviation(phase: ArrayView2<'_, f64>) -> Array1<f64> {
    row_means(&phase_deviation_matrix(phase).mapv(f64::abs))
}

/// Phase deviation weighted by the magnitude.
///
/// # Errors
/// Returns a layout error if magnitude and phase differ in shape.
pub fn weighted_phase_deviation(
    spectrogram: ArrayView2<'_, f64>,
    phase: ArrayView2<'_, f64>,
) -> AudioEventResult<Array1<f64>> {
    ensure_same_shape("weighted_phase_deviation", &spectrogram, &phase)?;
    let weighted = (phase_deviation_matrix(phase) * spectrogram).mapv(f64::abs);
    Ok(row_means(&weighted))
}

/// Weighted phase deviation divided by the mean magnitude of each frame.
///
/// # Errors
/// Returns a layout error if magnitude and phase differ in shape.
pub fn normalized_weighted_phase_deviation(
    spectrogram: ArrayView2<'_, f64>,
    phase: ArrayView2<'_, f64>,
) -> AudioEventResult<Array1<f64>> {
    let wpd = weighted_phase_deviation(spectrogram, phase)?;
    let norm = row_means(&spectrogram.to_owned()) + EPSILON;
    Ok(wpd / norm)
}

/// Deviation of each bin from its magnitude and phase predicted by the
/// previous frames.
fn complex_deviation(spectrogram: ArrayView2<'_, f64>, phase: ArrayView2<'_, f64>) -> Array2<Complex<f64>> {
    let num_frames = spectrogram.nrows();
    let mut deviation = Zip::from(spectrogram)
        .and(phase)
        .map_collect(|&s, &p| Complex::from_polar(s, p));
    for t in 1..num_frames {
        for k in 0..spectrogram.ncols() {
            let predicted_phase = if t >= 2 {
                2.0 * phase[[t - 1, k]] - phase[[t - 2, k]]
            } else {
                0.0
            };
            deviation[[t, k]] -= Complex::from_polar(spectrogram[[t - 1, k]], predicted_phase);
        }
    }
    deviation
}

/// Complex domain onset detection.
///
/// # Errors
/// Returns a layout error if magnitude and phase differ in shape.
pub fn complex_domain(
    spectrogram: ArrayView2<'_, f64>,
    phase: ArrayView2<'_, f64>,
) -> AudioEventResult<Array1<f64>> {
    ensure_same_shape("complex_domain", &spectrogram, &phase)?;
    let deviation = complex_deviation(spectrogram, phase);
    Ok(deviation.map_axis(Axis(1), |row| row.iter().map(|c| c.norm()).sum()))
}

/// Complex domain onset detection over bins with rising magnitude only.
///
/// # Errors
/// Returns a layout error if magnitude and phase differ in shape.
pub fn rectified_complex_domain(
    spectrogram: ArrayView2<'_, f64>,
    phase: ArrayView2<'_, f64>,
) -> AudioEventResult<Array1<f64>> {
    ensure_same_shape("rectified_complex_domain", &spectrogram, &phase)?;
    let deviation = complex_deviation(spectrogram, phase);
    let num_frames = spectrogram.nrows();
    let mut rcd = Array1::<f64>::zeros(num_frames);
    for t in 1..num_frames {
        rcd[t] = (0..spectrogram.ncols())
            .filter(|&k| spectrogram[[t, k]] - spectrogram[[t - 1, k]] > 0.0)
            .map(|k| deviation[[t, k]].norm())
            .sum();
    }
    Ok(rcd)
}

/// Onset detection functions evaluated on a [`Spectrogram`].
#[derive(Debug)]
pub struct SpectralOnsetDetection<'s, 'a, T: AudioSample> {
    spectrogram: &'s Spectrogram<'a, T>,
}

impl<'s, 'a, T: AudioSample> SpectralOnsetDetection<'s, 'a, T> {
    /// Wraps a spectrogram; its caches are shared by all functions.
    pub const fn new(spectrogram: &'s Spectrogram<'a, T>) -> Self {
        Self { spectrogram }
    }

    /// The wrapped spectrogram.
    pub const fn spectrogram(&self) -> &'s Spectrogram<'a, T> {
        self.spectrogram
    }

    /// Evaluates `function` and tags the result with the spectrogram's frame rate.
    ///
    /// # Errors
    /// Returns a layout error if a phase-based function is evaluated on a
    /// filtered spectrogram.
    pub fn compute(&self, function: OnsetFunction) -> AudioEventResult<Activations> {
        let spec = self.spectrogram;
        if function.needs_phase() && spec.filterbank().is_some() {
            return Err(LayoutError::shape_mismatch(
                format!("{function:?}"),
                (spec.num_frames(), spec.num_fft_bins()),
                (spec.num_frames(), spec.num_bins()),
            )
            .into());
        }
        let values = match function {
            OnsetFunction::HighFrequencyContent => high_frequency_content(spec.magnitude()?.view()),
            OnsetFunction::SpectralDiff => spectral_diff(spec.positive_diff()?.view()),
            OnsetFunction::SpectralFlux => spectral_flux(spec.positive_diff()?.view()),
            OnsetFunction::SuperFlux { max_bins } => {
                superflux(spec.magnitude()?.view(), spec.diff_frames(), max_bins)
            }
            OnsetFunction::ModifiedKullbackLeibler => {
                modified_kullback_leibler(spec.magnitude()?.view(), spec.diff_frames())
            }
            OnsetFunction::PhaseDeviation => phase_deviation(spec.phase()?.view()),
            OnsetFunction::WeightedPhaseDeviation => {
                weighted_phase_deviation(spec.magnitude()?.view(), spec.phase()?.view())?
            }
            OnsetFunction::NormalizedWeightedPhaseDeviation => {
                normalized_weighted_phase_deviation(spec.magnitude()?.view(), spec.phase()?.view())?
            }
            OnsetFunction::ComplexDomain => {
                complex_domain(spec.magnitude()?.view(), spec.phase()?.view())?
            }
            OnsetFunction::RectifiedComplexDomain => {
                rectified_complex_domain(spec.magnitude()?.view(), spec.phase()?.view())?
            }
        };
        tracing::debug!(?function, num_frames = values.len(), "onset detection function");
        Activations::new(values, spec.fps())
    }
}
