//! Filterbanks mapping FFT bins to a smaller set of frequency bands.
//!
//! A [`Filterbank`] is a `[num_fft_bins × num_bands]` matrix of non-negative
//! weights. Multiplying a magnitude spectrogram `[num_frames × num_fft_bins]`
//! with it yields one value per band and frame.
//!
//! ## Construction
//!
//! 1. Generate band frequencies (mel, Bark, logarithmic, or an explicit list).
//! 2. Map each frequency to its nearest FFT bin:
//!    `bin = round(f / (sample_rate / 2 / num_fft_bins))`.
//!    Bins past the last FFT bin are dropped. Unless duplicates are requested,
//!    repeated bins (common at low frequencies) collapse into one.
//! 3. Every consecutive `(start, center, stop)` triple of bins forms one band.
//!    Non-overlapping banks move `start` and `stop` halfway towards the center.
//! 4. The band shape (triangular or rectangular) is placed at `start`,
//!    truncated at the spectrum edges. Overlapping contributions to the same
//!    band combine by elementwise maximum, which lets a harmonic bank collect
//!    several partials into a single band.
//! 5. With normalization, every non-empty band is scaled to sum to 1.
//!
//! At least three usable bins are needed to form a band.

use ndarray::{Array2, ArrayView2, Axis};

use crate::operations::types::{FilterShape, FilterbankConfig, FilterbankKind};
use crate::utils::audio_math::{
    bark_frequencies, fft_frequencies, frequencies_to_bins, hz_to_midi, log_frequencies,
    mel_frequencies, round_half_even, semitone_frequencies,
};
use crate::{AudioEventResult, ParameterError};

/// Weight of harmonic `h` (1 = fundamental).
fn harmonic_envelope(h: f64) -> f64 {
    (1.0 / h).sqrt()
}

/// Width in Hz of the filter for harmonic `h`.
fn harmonic_width(h: f64) -> f64 {
    50.0 * 1.1f64.powf(h)
}

/// A filter placed at a (possibly negative) start bin.
#[derive(Debug, Clone)]
struct Filter {
    weights: Vec<f64>,
    start: i64,
}

/// Triangular filter of `width` bins peaking at bin `center`.
///
/// The rising edge covers `center` bins starting from 0; the falling edge
/// starts at the peak. A normalized filter peaks at `2 / width`.
pub fn triangular_filter(width: usize, center: usize, normalize: bool) -> Vec<f64> {
    let height = if normalize && width > 0 { 2.0 / width as f64 } else { 1.0 };
    let center = center.min(width);
    let falling = width - center;
    let rise = (0..center).map(|i| height * i as f64 / center as f64);
    let fall = (0..falling).map(|i| height - height * i as f64 / falling as f64);
    rise.chain(fall).collect()
}

/// Rectangular filter of `width` bins.
pub fn rectangular_filter(width: usize, normalize: bool) -> Vec<f64> {
    let height = if normalize && width > 0 { 1.0 / width as f64 } else { 1.0 };
    vec![height; width]
}

impl FilterShape {
    fn build(self, width: usize, center: usize, normalize: bool) -> Vec<f64> {
        match self {
            Self::Triangular => triangular_filter(width, center, normalize),
            Self::Rectangular => rectangular_filter(width, normalize),
        }
    }
}

/// Start, center and stop bins of every band formed from `center_bins`.
///
/// # Errors
/// Returns a parameter error if fewer than three bins remain after removing
/// duplicates.
pub fn band_bins(
    center_bins: &[i64],
    duplicates: bool,
    overlap: bool,
) -> AudioEventResult<Vec<(i64, i64, i64)>> {
    let mut bins = center_bins.to_vec();
    if !duplicates {
        bins.sort_unstable();
        bins.dedup();
    }
    if bins.len() < 3 {
        return Err(ParameterError::invalid_value(
            "frequencies",
            format!(
                "at least 3 distinct usable FFT bins are needed to form a band, got {}",
                bins.len()
            ),
        )
        .into());
    }
    Ok(bins
        .windows(3)
        .map(|w| {
            let (mut start, mut center, mut stop) = (w[0], w[1], w[2]);
            if !overlap {
                start = round_half_even((center + start) as f64 / 2.0) as i64;
                stop = round_half_even((center + stop) as f64 / 2.0) as i64;
                // neighbouring bins can round onto the center
                stop = stop.max(start + 1);
            }
            if duplicates && stop - start < 2 {
                center = start;
                stop = start + 1;
            }
            (start, center, stop)
        })
        .collect())
}

/// Frequency weighting matrix of shape `[num_fft_bins × num_bands]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Filterbank {
    weights: Array2<f64>,
    sample_rate: f64,
    band_frequencies: Vec<f64>,
    normalized: bool,
}

impl Filterbank {
    /// Builds the filterbank described by `config`.
    ///
    /// # Errors
    /// Returns a parameter error for an invalid configuration or when the
    /// frequency range yields fewer than three usable bins.
    pub fn from_config(
        num_fft_bins: usize,
        sample_rate: f64,
        config: &FilterbankConfig,
    ) -> AudioEventResult<Self> {
        config.validate()?;
        match config.kind {
            FilterbankKind::Mel { num_bands } => {
                let frequencies = mel_frequencies(num_bands + 2, config.fmin, config.fmax);
                Self::from_frequencies(&frequencies, num_fft_bins, sample_rate, config)
            }
            FilterbankKind::Bark { double } => {
                let frequencies = bark_frequencies(config.fmin, config.fmax, double);
                Self::from_frequencies(&frequencies, num_fft_bins, sample_rate, config)
            }
            FilterbankKind::Logarithmic { bands_per_octave } => {
                let frequencies =
                    log_frequencies(bands_per_octave, config.fmin, config.fmax, config.a4);
                Self::from_frequencies(&frequencies, num_fft_bins, sample_rate, config)
            }
            FilterbankKind::Harmonic {
                num_harmonics,
                inharmonicity,
            } => {
                let fundamentals = semitone_frequencies(config.fmin, config.fmax, config.a4);
                Self::harmonic(
                    &fundamentals,
                    num_harmonics,
                    inharmonicity,
                    num_fft_bins,
                    sample_rate,
                    config.shape,
                )
            }
            FilterbankKind::Chroma => Self::chroma(num_fft_bins, sample_rate, config),
        }
    }

    /// Mel filterbank with default range and shape.
    ///
    /// # Errors
    /// See [`from_config`](Self::from_config).
    pub fn mel(num_fft_bins: usize, sample_rate: f64, num_bands: usize) -> AudioEventResult<Self> {
        Self::from_config(num_fft_bins, sample_rate, &FilterbankConfig::mel(num_bands))
    }

    /// Bark filterbank with default range and shape.
    ///
    /// # Errors
    /// See [`from_config`](Self::from_config).
    pub fn bark(num_fft_bins: usize, sample_rate: f64, double: bool) -> AudioEventResult<Self> {
        Self::from_config(num_fft_bins, sample_rate, &FilterbankConfig::bark(double))
    }

    /// Logarithmic filterbank with default range and shape.
    ///
    /// # Errors
    /// See [`from_config`](Self::from_config).
    pub fn logarithmic(
        num_fft_bins: usize,
        sample_rate: f64,
        bands_per_octave: usize,
    ) -> AudioEventResult<Self> {
        Self::from_config(
            num_fft_bins,
            sample_rate,
            &FilterbankConfig::logarithmic(bands_per_octave),
        )
    }

    /// Semitone filterbank over `[fmin, fmax]`.
    ///
    /// # Errors
    /// See [`from_config`](Self::from_config).
    pub fn semitone(
        num_fft_bins: usize,
        sample_rate: f64,
        fmin: f64,
        fmax: f64,
    ) -> AudioEventResult<Self> {
        let config = FilterbankConfig {
            fmin,
            fmax,
            ..FilterbankConfig::logarithmic(12)
        };
        Self::from_config(num_fft_bins, sample_rate, &config)
    }

    /// Builds one band per consecutive triple of `frequencies`.
    ///
    /// Only `shape`, `normalize`, `duplicates` and `overlap` of `config` are
    /// used. Frequencies must be non-negative and ascending; those that map
    /// past the last FFT bin are dropped.
    ///
    /// # Errors
    /// Returns a parameter error for negative, unordered or non-finite
    /// frequencies, a zero bin count or sample rate, or fewer than three
    /// usable bins.
    pub fn from_frequencies(
        frequencies: &[f64],
        num_fft_bins: usize,
        sample_rate: f64,
        config: &FilterbankConfig,
    ) -> AudioEventResult<Self> {
        validate_layout(num_fft_bins, sample_rate)?;
        if frequencies.iter().any(|f| !f.is_finite() || *f < 0.0) {
            return Err(ParameterError::invalid_value(
                "frequencies",
                "band frequencies must be finite and non-negative",
            )
            .into());
        }
        if frequencies.windows(2).any(|w| w[0] > w[1]) {
            return Err(ParameterError::invalid_value(
                "frequencies",
                "band frequencies must be in ascending order",
            )
            .into());
        }

        let bins: Vec<i64> = frequencies_to_bins(frequencies, num_fft_bins, sample_rate)
            .into_iter()
            .filter(|&bin| bin < num_fft_bins as i64)
            .collect();
        let bands = band_bins(&bins, config.duplicates, config.overlap)?;

        let filters: Vec<Vec<Filter>> = bands
            .iter()
            .map(|&(start, center, stop)| {
                let width = (stop - start).max(0) as usize;
                let center = (center - start).max(0) as usize;
                vec![Filter {
                    weights: config.shape.build(width, center, config.normalize),
                    start,
                }]
            })
            .collect();

        let bin_resolution = sample_rate / 2.0 / num_fft_bins as f64;
        let band_frequencies = bands
            .iter()
            .map(|&(_, center, _)| center as f64 * bin_resolution)
            .collect();
        Ok(Self::assemble(
            &filters,
            num_fft_bins,
            sample_rate,
            band_frequencies,
            config.normalize,
        ))
    }

    /// Builds a bank with one band per fundamental frequency.
    ///
    /// Each band collects `num_harmonics` partials (the fundamental included)
    /// at `h * sqrt(1 + h² * inharmonicity)` times the fundamental. Partial
    /// `h` is `50 * 1.1^h` Hz wide and weighted by `sqrt(1 / h)`. Bands are
    /// normalized to sum to 1.
    ///
    /// # Errors
    /// Returns a parameter error for an empty fundamental list or invalid
    /// layout.
    pub fn harmonic(
        fundamentals: &[f64],
        num_harmonics: usize,
        inharmonicity: f64,
        num_fft_bins: usize,
        sample_rate: f64,
        shape: FilterShape,
    ) -> AudioEventResult<Self> {
        validate_layout(num_fft_bins, sample_rate)?;
        if fundamentals.is_empty() || num_harmonics == 0 {
            return Err(ParameterError::invalid_value(
                "fundamentals",
                "a harmonic filterbank needs at least one fundamental and one harmonic",
            )
            .into());
        }
        let factor = sample_rate / 2.0 / num_fft_bins as f64;
        let to_bin = |f: f64| round_half_even(f / factor) as i64;

        let filters: Vec<Vec<Filter>> = fundamentals
            .iter()
            .map(|&f0| {
                (1..=num_harmonics)
                    .filter_map(|h| {
                        let h = h as f64;
                        let center_hz = f0 * h * (1.0 + h * h * inharmonicity).sqrt();
                        let half_width = harmonic_width(h) / 2.0;
                        let center = to_bin(center_hz);
                        let start = to_bin(center_hz - half_width).min(center - 1);
                        let stop = to_bin(center_hz + half_width).max(center + 1);
                        if start > num_fft_bins as i64 || stop < 0 {
                            return None;
                        }
                        let weight = harmonic_envelope(h);
                        let weights = shape
                            .build((stop - start) as usize, (center - start) as usize, false)
                            .into_iter()
                            .map(|w| w * weight)
                            .collect();
                        Some(Filter { weights, start })
                    })
                    .collect()
            })
            .collect();

        Ok(Self::assemble(
            &filters,
            num_fft_bins,
            sample_rate,
            fundamentals.to_vec(),
            true,
        ))
    }

    /// Folds a semitone bank over `[fmin, fmax]` onto the 12 pitch classes,
    /// starting at C.
    ///
    /// # Errors
    /// Returns a parameter error if the semitone bank cannot be built.
    pub fn chroma(
        num_fft_bins: usize,
        sample_rate: f64,
        config: &FilterbankConfig,
    ) -> AudioEventResult<Self> {
        let semitones = FilterbankConfig {
            kind: FilterbankKind::Logarithmic {
                bands_per_octave: 12,
            },
            ..*config
        };
        let frequencies = semitone_frequencies(config.fmin, config.fmax, config.a4);
        let bank = Self::from_frequencies(&frequencies, num_fft_bins, sample_rate, &semitones)?;

        let mut weights = Array2::<f64>::zeros((num_fft_bins, 12));
        for (band, &frequency) in bank.band_frequencies.iter().enumerate() {
            if frequency <= 0.0 {
                continue;
            }
            let pitch_class = (hz_to_midi(frequency, config.a4).round() as i64).rem_euclid(12);
            let mut column = weights.column_mut(pitch_class as usize);
            column += &bank.weights.column(band);
        }
        normalize_columns(&mut weights);

        let c4 = 261.625_565_300_598_6 * config.a4 / 440.0;
        let band_frequencies = (0..12).map(|k| c4 * 2f64.powf(k as f64 / 12.0)).collect();
        Ok(Self {
            weights,
            sample_rate,
            band_frequencies,
            normalized: true,
        })
    }

    fn assemble(
        bands: &[Vec<Filter>],
        num_fft_bins: usize,
        sample_rate: f64,
        band_frequencies: Vec<f64>,
        normalize: bool,
    ) -> Self {
        let mut weights = Array2::<f64>::zeros((num_fft_bins, bands.len()));
        for (band_id, filters) in bands.iter().enumerate() {
            let mut band = weights.column_mut(band_id);
            for filter in filters {
                for (offset, &w) in filter.weights.iter().enumerate() {
                    let bin = filter.start + offset as i64;
                    if bin < 0 || bin >= num_fft_bins as i64 {
                        continue;
                    }
                    let slot = &mut band[bin as usize];
                    *slot = slot.max(w);
                }
            }
        }
        if normalize {
            normalize_columns(&mut weights);
        }
        tracing::debug!(
            num_fft_bins,
            num_bands = bands.len(),
            normalize,
            "filterbank built"
        );
        Self {
            weights,
            sample_rate,
            band_frequencies,
            normalized: normalize,
        }
    }

    /// The `[num_fft_bins × num_bands]` weight matrix.
    pub fn weights(&self) -> ArrayView2<'_, f64> {
        self.weights.view()
    }

    /// Number of FFT bins the bank expects.
    pub fn num_fft_bins(&self) -> usize {
        self.weights.nrows()
    }

    /// Number of bands.
    pub fn num_bands(&self) -> usize {
        self.weights.ncols()
    }

    /// Sample rate the bins were mapped with.
    pub const fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Whether the bands were normalized to sum to 1.
    pub const fn is_normalized(&self) -> bool {
        self.normalized
    }

    /// Nominal center frequency of each band in Hz.
    pub fn band_frequencies(&self) -> &[f64] {
        &self.band_frequencies
    }

    /// Frequencies of the FFT bins.
    pub fn bin_frequencies(&self) -> Vec<f64> {
        fft_frequencies(self.num_fft_bins(), self.sample_rate)
    }

    /// Frequency of the lowest bin with a non-zero weight.
    pub fn fmin(&self) -> Option<f64> {
        self.active_bins().next().map(|bin| self.bin_frequencies()[bin])
    }

    /// Frequency of the highest bin with a non-zero weight.
    pub fn fmax(&self) -> Option<f64> {
        self.active_bins()
            .last()
            .map(|bin| self.bin_frequencies()[bin])
    }

    fn active_bins(&self) -> impl Iterator<Item = usize> + '_ {
        self.weights
            .axis_iter(Axis(0))
            .enumerate()
            .filter(|(_, row)| row.iter().any(|&w| w > 0.0))
            .map(|(bin, _)| bin)
    }
}

fn validate_layout(num_fft_bins: usize, sample_rate: f64) -> AudioEventResult<()> {
    if num_fft_bins == 0 {
        return Err(ParameterError::invalid_value("num_fft_bins", "must be greater than 0").into());
    }
    if !(sample_rate.is_finite() && sample_rate > 0.0) {
        return Err(ParameterError::invalid_value("sample_rate", "must be greater than 0").into());
    }
    Ok(())
}

fn normalize_columns(weights: &mut Array2<f64>) {
    for (band, mut column) in weights.axis_iter_mut(Axis(1)).enumerate() {
        let sum = column.sum();
        if sum > 0.0 {
            column /= sum;
        } else {
            tracing::warn!(band, "filterbank band has no weight inside the spectrum");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx_eq::assert_approx_eq;

    fn assert_columns_sum_to_one(bank: &Filterbank) {
        for column in bank.weights().axis_iter(Axis(1)) {
            assert_approx_eq!(column.sum(), 1.0, 1e-9);
        }
    }

    #[test]
    fn test_triangular_filter_shape() {
        let filter = triangular_filter(4, 2, false);
        assert_eq!(filter, vec![0.0, 0.5, 1.0, 0.5]);
        let normalized = triangular_filter(4, 2, true);
        assert_approx_eq!(normalized.iter().sum::<f64>(), 1.0, 1e-12);
        assert_eq!(triangular_filter(1, 0, true), vec![2.0]);
    }

    #[test]
    fn test_rectangular_filter() {
        assert_eq!(rectangular_filter(4, true), vec![0.25; 4]);
        assert_eq!(rectangular_filter(3, false), vec![1.0; 3]);
    }

    #[test]
    fn test_band_bins_overlap_and_duplicates() {
        let bands = band_bins(&[1, 3, 5, 9], false, true).unwrap();
        assert_eq!(bands, vec![(1, 3, 5), (3, 5, 9)]);

        let bands = band_bins(&[1, 3, 5, 9], false, false).unwrap();
        assert_eq!(bands, vec![(2, 3, 4), (4, 5, 7)]);

        let bands = band_bins(&[2, 2, 3, 8], true, true).unwrap();
        assert_eq!(bands[0], (2, 2, 3));

        assert!(band_bins(&[2, 2, 3], false, true).is_err());
    }

    #[test]
    fn test_fewer_than_three_frequencies_is_an_error() {
        let config = FilterbankConfig::new();
        assert!(Filterbank::from_frequencies(&[100.0, 200.0], 512, 44100.0, &config).is_err());
        assert!(Filterbank::from_frequencies(&[-1.0, 100.0, 200.0], 512, 44100.0, &config).is_err());
        assert!(Filterbank::from_frequencies(&[300.0, 100.0, 200.0], 512, 44100.0, &config).is_err());
    }

    #[test]
    fn test_normalized_columns_sum_to_one() {
        for config in [
            FilterbankConfig::new(),
            FilterbankConfig::logarithmic(24),
            FilterbankConfig::mel(40),
            FilterbankConfig::bark(false),
            FilterbankConfig::bark(true),
            FilterbankConfig {
                shape: FilterShape::Rectangular,
                overlap: false,
                ..FilterbankConfig::logarithmic(6)
            },
            FilterbankConfig {
                duplicates: true,
                ..FilterbankConfig::new()
            },
        ] {
            let bank = Filterbank::from_config(1024, 44100.0, &config).unwrap();
            assert_eq!(bank.num_fft_bins(), 1024);
            assert!(bank.num_bands() > 0);
            assert!(bank.is_normalized());
            assert!(bank.weights().iter().all(|&w| w >= 0.0));
            assert_columns_sum_to_one(&bank);
        }
    }

    #[test]
    fn test_out_of_range_frequencies_are_dropped() {
        // 12 bands per octave up to 17 kHz, but the spectrum ends at 500 Hz
        let bank = Filterbank::from_config(128, 1000.0, &FilterbankConfig::new()).unwrap();
        assert!(bank.fmax().unwrap() < 500.0);
        assert!(bank.fmin().unwrap() >= 0.0);
        assert_columns_sum_to_one(&bank);
    }

    #[test]
    fn test_unnormalized_triangles_peak_at_one() {
        let config = FilterbankConfig {
            normalize: false,
            ..FilterbankConfig::new()
        };
        let bank = Filterbank::from_frequencies(&[100.0, 200.0, 400.0], 512, 1024.0, &config)
            .unwrap();
        assert_eq!(bank.num_bands(), 1);
        assert!(!bank.is_normalized());
        // bins 100, 200, 400 at 1 Hz resolution
        assert_eq!(bank.weights()[[200, 0]], 1.0);
        assert_eq!(bank.weights()[[100, 0]], 0.0);
        assert_eq!(bank.weights()[[150, 0]], 0.5);
        assert_eq!(bank.weights()[[400, 0]], 0.0);
        assert_eq!(bank.band_frequencies(), &[200.0]);
    }

    #[test]
    fn test_harmonic_bank_combines_partials() {
        let bank = Filterbank::harmonic(
            &[200.0, 300.0],
            4,
            0.0,
            1024,
            2048.0,
            FilterShape::Triangular,
        )
        .unwrap();
        assert_eq!(bank.num_bands(), 2);
        assert_columns_sum_to_one(&bank);
        // the fundamental's partials carry weight at multiples of 200 Hz
        for partial in [200, 400, 600, 800] {
            assert!(bank.weights()[[partial, 0]] > 0.0);
        }
        assert!(bank.weights()[[200, 0]] > bank.weights()[[800, 0]]);
    }

    #[test]
    fn test_chroma_bank() {
        let bank = Filterbank::from_config(2048, 44100.0, &FilterbankConfig::chroma()).unwrap();
        assert_eq!(bank.num_bands(), 12);
        assert_columns_sum_to_one(&bank);
        assert_approx_eq!(bank.band_frequencies()[9], 440.0, 1e-9);
    }
}
