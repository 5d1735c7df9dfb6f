//! Supporting types and enums for the analysis and detection stages.
//!
//! This module contains the configuration structures used across the crate.
//! Every configuration offers a `const fn new()` with the reference defaults,
//! a handful of named presets where they make sense, and a `validate()` method
//! that rejects invalid values with a descriptive [`ParameterError`].
//!
//! All configurations derive serde's `Serialize` and `Deserialize`, so an
//! application can load a [`PipelineConfig`] from whatever format it prefers
//! and inject it at startup.

use serde::{Deserialize, Serialize};

use crate::{AudioEventResult, ParameterError};

fn ensure_positive(parameter: &str, value: f64) -> AudioEventResult<()> {
    if !(value.is_finite() && value > 0.0) {
        return Err(ParameterError::invalid_value(
            parameter,
            format!("must be a finite value greater than 0, got {value}"),
        )
        .into());
    }
    Ok(())
}

fn ensure_non_negative(parameter: &str, value: f64) -> AudioEventResult<()> {
    if !(value.is_finite() && value >= 0.0) {
        return Err(ParameterError::invalid_value(
            parameter,
            format!("must be a finite value of at least 0, got {value}"),
        )
        .into());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Signal and framing
// ---------------------------------------------------------------------------

/// One-time transforms applied when a [`Signal`](crate::Signal) is created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalOptions {
    /// Average all channels into one.
    pub downmix: bool,
    /// Scale the signal so that its peak reaches full scale.
    pub normalize: bool,
    /// Attenuation in dB, applied last. Zero disables it.
    pub attenuation_db: f64,
}

impl SignalOptions {
    /// No transforms.
    pub const fn new() -> Self {
        Self {
            downmix: false,
            normalize: false,
            attenuation_db: 0.0,
        }
    }

    /// Down-mix to mono, which every spectral stage expects.
    pub const fn mono() -> Self {
        Self {
            downmix: true,
            normalize: false,
            attenuation_db: 0.0,
        }
    }

    /// Validate the signal options.
    pub fn validate(&self) -> AudioEventResult<()> {
        if !self.attenuation_db.is_finite() {
            return Err(ParameterError::invalid_value("attenuation_db", "must be finite").into());
        }
        Ok(())
    }
}

impl Default for SignalOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Location of the frame window relative to its reference sample.
///
/// Positive offsets move the window towards the past, negative offsets
/// towards the future.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    /// The window is centered on the reference sample.
    Centered,
    /// The window ends at the reference sample; only past samples are used.
    Online,
    /// The window starts at the reference sample.
    Future,
    /// An explicit offset in samples.
    Offset(i64),
}

impl Origin {
    /// Resolves the origin to a sample offset for the given frame size.
    pub const fn offset(self, frame_size: usize) -> i64 {
        match self {
            Self::Centered => 0,
            Self::Online => (frame_size as i64 - 1) / 2,
            Self::Future => -(frame_size as i64 / 2),
            Self::Offset(offset) => offset,
        }
    }
}

/// How many frames a framed signal exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameCount {
    /// Frames are produced as long as any part of a frame overlaps the signal:
    /// `floor(len / hop) + 1`.
    Extend,
    /// Frames are produced while the reference sample lies inside the signal:
    /// `ceil(len / hop)`.
    Normal,
    /// A fixed number of frames.
    Fixed(usize),
}

/// Parameters for splitting a signal into frames.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameConfig {
    /// Frame length in samples.
    pub frame_size: usize,
    /// Distance between reference samples of adjacent frames; may be fractional.
    pub hop_size: f64,
    /// Window placement relative to the reference sample.
    pub origin: Origin,
    /// Sample position of the reference sample of frame 0.
    pub start: i64,
    /// Frame-count policy.
    pub num_frames: FrameCount,
}

impl FrameConfig {
    /// Default configuration: 2048-sample frames, hop of 441 samples
    /// (100 fps at 44.1 kHz), centered windows.
    pub const fn new() -> Self {
        Self {
            frame_size: 2048,
            hop_size: 441.0,
            origin: Origin::Centered,
            start: 0,
            num_frames: FrameCount::Extend,
        }
    }

    /// Frames of `frame_size` samples spaced `hop_size` samples apart.
    pub const fn with_hop(frame_size: usize, hop_size: f64) -> Self {
        Self {
            frame_size,
            hop_size,
            origin: Origin::Centered,
            start: 0,
            num_frames: FrameCount::Extend,
        }
    }

    /// Frames of `frame_size` samples at `fps` frames per second.
    pub fn with_fps(frame_size: usize, fps: f64, sample_rate: u32) -> Self {
        Self::with_hop(frame_size, f64::from(sample_rate) / fps)
    }

    /// Online configuration that only looks at past samples.
    pub const fn online(frame_size: usize, hop_size: f64) -> Self {
        Self {
            frame_size,
            hop_size,
            origin: Origin::Online,
            start: 0,
            num_frames: FrameCount::Extend,
        }
    }

    /// Validate the frame configuration.
    pub fn validate(&self) -> AudioEventResult<()> {
        if self.frame_size == 0 {
            return Err(ParameterError::invalid_value("frame_size", "must be greater than 0").into());
        }
        ensure_positive("hop_size", self.hop_size)
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Filterbanks
// ---------------------------------------------------------------------------

/// Window functions for spectral analysis and smoothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WindowType {
    /// Rectangular window (no tapering).
    Rectangular,
    /// Hann window, `0.5 - 0.5 cos(2πn / (N - 1))`.
    Hanning,
    /// Hamming window, `0.54 - 0.46 cos(2πn / (N - 1))`.
    Hamming,
    /// Blackman window.
    Blackman,
}

/// Shape of a single band in a filterbank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterShape {
    /// Linear rise to the center bin, then linear fall.
    Triangular,
    /// Constant weight across the band.
    Rectangular,
}

/// Frequency layout of a filterbank.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FilterbankKind {
    /// Bands equally spaced on the mel scale.
    Mel {
        /// Number of bands.
        num_bands: usize,
    },
    /// Bands at the critical band corner frequencies of the Bark scale.
    Bark {
        /// Use the double-resolution table with interleaved centers.
        double: bool,
    },
    /// Bands spaced logarithmically around `a4`.
    Logarithmic {
        /// Number of bands per octave.
        bands_per_octave: usize,
    },
    /// One band per fundamental, collecting weighted harmonic partials.
    Harmonic {
        /// Number of partials per fundamental, including the fundamental.
        num_harmonics: usize,
        /// Inharmonicity coefficient.
        inharmonicity: f64,
    },
    /// Semitone bands folded onto the 12 pitch classes.
    Chroma,
}

/// Parameters for building a [`Filterbank`](crate::operations::filterbank::Filterbank).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterbankConfig {
    /// Frequency layout.
    pub kind: FilterbankKind,
    /// Band shape.
    pub shape: FilterShape,
    /// Lowest frequency considered, in Hz.
    pub fmin: f64,
    /// Highest frequency considered, in Hz.
    pub fmax: f64,
    /// Tuning reference for logarithmic and semitone layouts, in Hz.
    pub a4: f64,
    /// Normalize each band so that its weights sum to 1.
    pub normalize: bool,
    /// Keep bands whose center frequencies map to the same FFT bin.
    pub duplicates: bool,
    /// Let neighbouring bands overlap up to the neighbour's center.
    pub overlap: bool,
}

impl FilterbankConfig {
    /// Logarithmic filterbank with 12 bands per octave between 30 Hz and 17 kHz.
    pub const fn new() -> Self {
        Self::logarithmic(12)
    }

    /// Logarithmic filterbank with the given resolution.
    pub const fn logarithmic(bands_per_octave: usize) -> Self {
        Self {
            kind: FilterbankKind::Logarithmic { bands_per_octave },
            shape: FilterShape::Triangular,
            fmin: 30.0,
            fmax: 17000.0,
            a4: 440.0,
            normalize: true,
            duplicates: false,
            overlap: true,
        }
    }

    /// Mel filterbank with the given number of bands.
    pub const fn mel(num_bands: usize) -> Self {
        Self {
            kind: FilterbankKind::Mel { num_bands },
            shape: FilterShape::Triangular,
            fmin: 20.0,
            fmax: 17000.0,
            a4: 440.0,
            normalize: true,
            duplicates: false,
            overlap: true,
        }
    }

    /// Bark filterbank.
    pub const fn bark(double: bool) -> Self {
        Self {
            kind: FilterbankKind::Bark { double },
            shape: FilterShape::Triangular,
            fmin: 20.0,
            fmax: 15500.0,
            a4: 440.0,
            normalize: true,
            duplicates: false,
            overlap: true,
        }
    }

    /// Harmonic filterbank over semitone fundamentals.
    pub const fn harmonic(num_harmonics: usize, inharmonicity: f64) -> Self {
        Self {
            kind: FilterbankKind::Harmonic {
                num_harmonics,
                inharmonicity,
            },
            shape: FilterShape::Triangular,
            fmin: 27.5,
            fmax: 4200.0,
            a4: 440.0,
            normalize: true,
            duplicates: false,
            overlap: true,
        }
    }

    /// Chroma filterbank.
    pub const fn chroma() -> Self {
        Self {
            kind: FilterbankKind::Chroma,
            shape: FilterShape::Triangular,
            fmin: 65.0,
            fmax: 2100.0,
            a4: 440.0,
            normalize: true,
            duplicates: false,
            overlap: true,
        }
    }

    /// Validate the filterbank configuration.
    pub fn validate(&self) -> AudioEventResult<()> {
        ensure_positive("fmin", self.fmin)?;
        ensure_positive("fmax", self.fmax)?;
        ensure_positive("a4", self.a4)?;
        if self.fmin >= self.fmax {
            return Err(ParameterError::invalid_value(
                "fmin",
                format!("must be below fmax ({} >= {})", self.fmin, self.fmax),
            )
            .into());
        }
        match self.kind {
            FilterbankKind::Mel { num_bands } if num_bands == 0 => Err(
                ParameterError::invalid_value("num_bands", "must be greater than 0").into(),
            ),
            FilterbankKind::Logarithmic { bands_per_octave } if bands_per_octave == 0 => Err(
                ParameterError::invalid_value("bands_per_octave", "must be greater than 0").into(),
            ),
            FilterbankKind::Harmonic {
                num_harmonics,
                inharmonicity,
            } => {
                if num_harmonics == 0 {
                    return Err(ParameterError::invalid_value(
                        "num_harmonics",
                        "must be greater than 0",
                    )
                    .into());
                }
                ensure_non_negative("inharmonicity", inharmonicity)
            }
            _ => Ok(()),
        }
    }
}

impl Default for FilterbankConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Spectrogram
// ---------------------------------------------------------------------------

/// Parameters of the `log10(mul * x + add)` magnitude compression.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogCompression {
    /// Multiplier applied before the logarithm.
    pub mul: f64,
    /// Offset added before the logarithm; keeps the argument positive.
    pub add: f64,
}

impl LogCompression {
    /// `log10(x + 1)`.
    pub const fn new() -> Self {
        Self { mul: 1.0, add: 1.0 }
    }

    /// Validate the compression parameters.
    pub fn validate(&self) -> AudioEventResult<()> {
        ensure_positive("mul", self.mul)?;
        ensure_positive("add", self.add)
    }
}

impl Default for LogCompression {
    fn default() -> Self {
        Self::new()
    }
}

/// Lag used for spectral differences.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DiffLag {
    /// Derive the lag from the window: the distance from the window's center
    /// to its first sample above `ratio` times the peak, in frames.
    Ratio(f64),
    /// Explicit lag in frames.
    Frames(usize),
}

/// Parameters for computing a spectrogram.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectrogramConfig {
    /// Analysis window.
    pub window: WindowType,
    /// Scale the window so that its samples sum to 1.
    pub normalize_window: bool,
    /// FFT length; defaults to the frame size. Larger values zero-pad.
    pub fft_size: Option<usize>,
    /// Logarithmic magnitude compression, applied after filtering.
    pub log: Option<LogCompression>,
    /// Lag for `diff` and `positive_diff`.
    pub diff: DiffLag,
    /// Number of frames transformed and filtered at once; `None` processes
    /// all frames in one block.
    pub block_size: Option<usize>,
}

impl SpectrogramConfig {
    /// Hann window, no compression, diff ratio 0.5.
    pub const fn new() -> Self {
        Self {
            window: WindowType::Hanning,
            normalize_window: false,
            fft_size: None,
            log: None,
            diff: DiffLag::Ratio(0.5),
            block_size: None,
        }
    }

    /// Same as [`new`](Self::new) with `log10(x + 1)` compression.
    pub const fn logarithmic() -> Self {
        Self {
            window: WindowType::Hanning,
            normalize_window: false,
            fft_size: None,
            log: Some(LogCompression::new()),
            diff: DiffLag::Ratio(0.5),
            block_size: None,
        }
    }

    /// Validate the spectrogram configuration against a frame size.
    pub fn validate(&self, frame_size: usize) -> AudioEventResult<()> {
        if let Some(fft_size) = self.fft_size {
            if fft_size < frame_size {
                return Err(ParameterError::invalid_value(
                    "fft_size",
                    format!("must be at least the frame size ({fft_size} < {frame_size})"),
                )
                .into());
            }
        }
        if frame_size < 2 && self.fft_size.is_none_or(|n| n < 2) {
            return Err(ParameterError::invalid_value(
                "fft_size",
                "spectral analysis needs at least 2 samples per transform",
            )
            .into());
        }
        if let Some(log) = &self.log {
            log.validate()?;
        }
        match self.diff {
            DiffLag::Ratio(ratio) if !(0.0..1.0).contains(&ratio) => {
                return Err(ParameterError::out_of_range(
                    "diff_ratio",
                    ratio,
                    0.0,
                    1.0,
                    "ratio of the window peak",
                )
                .into());
            }
            DiffLag::Frames(0) => {
                return Err(
                    ParameterError::invalid_value("diff_frames", "must be greater than 0").into(),
                );
            }
            _ => {}
        }
        if self.block_size == Some(0) {
            return Err(ParameterError::invalid_value("block_size", "must be greater than 0").into());
        }
        Ok(())
    }
}

impl Default for SpectrogramConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Parameters of adaptive whitening.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WhiteningConfig {
    /// Lower bound of the running peak estimate.
    pub floor: f64,
    /// Memory of the running peak estimate, in frames.
    pub relaxation: f64,
}

impl WhiteningConfig {
    /// Floor 0.5, relaxation of 10 frames.
    pub const fn new() -> Self {
        Self {
            floor: 0.5,
            relaxation: 10.0,
        }
    }

    /// Validate the whitening configuration.
    pub fn validate(&self) -> AudioEventResult<()> {
        ensure_positive("floor", self.floor)?;
        ensure_positive("relaxation", self.relaxation)
    }
}

impl Default for WhiteningConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Mask applied to separate harmonic and percussive content.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaskType {
    /// Each bin belongs entirely to the larger of the two estimates.
    Binary,
    /// Wiener-like soft mask `H^p / (H^p + P^p)` with the given power.
    Soft(f64),
}

/// Parameters for harmonic/percussive separation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HpssConfig {
    /// Median filter size `(frames, bins)` for the harmonic estimate.
    pub harmonic_filter: (usize, usize),
    /// Median filter size `(frames, bins)` for the percussive estimate.
    pub percussive_filter: (usize, usize),
    /// Mask type.
    pub mask: MaskType,
}

impl HpssConfig {
    /// Filters of 15 frames and 15 bins with a binary mask.
    pub const fn new() -> Self {
        Self {
            harmonic_filter: (15, 1),
            percussive_filter: (1, 15),
            mask: MaskType::Binary,
        }
    }

    /// Same filters with a soft mask of power 2.
    pub const fn soft() -> Self {
        Self {
            harmonic_filter: (15, 1),
            percussive_filter: (1, 15),
            mask: MaskType::Soft(2.0),
        }
    }

    /// Validate the separation configuration.
    pub fn validate(&self) -> AudioEventResult<()> {
        let sizes = [self.harmonic_filter, self.percussive_filter];
        if sizes.iter().any(|&(t, f)| t == 0 || f == 0) {
            return Err(ParameterError::invalid_value(
                "median_filter",
                "filter sizes must be greater than 0",
            )
            .into());
        }
        if let MaskType::Soft(power) = self.mask {
            ensure_positive("mask_power", power)?;
        }
        Ok(())
    }
}

impl Default for HpssConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Onset detection
// ---------------------------------------------------------------------------

/// Spectral onset detection functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OnsetFunction {
    /// High frequency content.
    HighFrequencyContent,
    /// Sum of squared positive differences.
    SpectralDiff,
    /// Sum of positive differences.
    SpectralFlux,
    /// Spectral flux against a frequency-maximum-filtered reference.
    SuperFlux {
        /// Width of the maximum filter in bins.
        max_bins: usize,
    },
    /// Modified Kullback-Leibler divergence.
    ModifiedKullbackLeibler,
    /// Phase deviation.
    PhaseDeviation,
    /// Magnitude-weighted phase deviation.
    WeightedPhaseDeviation,
    /// Weighted phase deviation normalized by the mean magnitude.
    NormalizedWeightedPhaseDeviation,
    /// Complex domain deviation.
    ComplexDomain,
    /// Complex domain deviation restricted to rising bins.
    RectifiedComplexDomain,
}

impl OnsetFunction {
    /// SuperFlux with a maximum filter of 3 bins.
    pub const fn superflux() -> Self {
        Self::SuperFlux { max_bins: 3 }
    }

    /// Whether the function needs phase information.
    pub const fn needs_phase(&self) -> bool {
        matches!(
            self,
            Self::PhaseDeviation
                | Self::WeightedPhaseDeviation
                | Self::NormalizedWeightedPhaseDeviation
                | Self::ComplexDomain
                | Self::RectifiedComplexDomain
        )
    }
}

impl Default for OnsetFunction {
    fn default() -> Self {
        Self::SpectralFlux
    }
}

/// Smoothing applied to an activation curve before peak picking.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Smoothing {
    /// No smoothing.
    #[default]
    None,
    /// Convolution with a Hamming window of the given width in frames.
    /// Widths of 0 and 1 disable smoothing.
    Hamming(usize),
    /// Convolution with an explicit kernel.
    Kernel(Vec<f64>),
}

/// Frame-level peak picking parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakPickingConfig {
    /// Amount a sample must exceed the moving average by.
    pub threshold: f64,
    /// Smoothing applied first.
    pub smoothing: Smoothing,
    /// Frames before the current one in the moving average.
    pub pre_avg: usize,
    /// Frames after the current one in the moving average.
    pub post_avg: usize,
    /// Frames before the current one in the moving maximum.
    pub pre_max: usize,
    /// Frames after the current one in the moving maximum.
    pub post_max: usize,
}

impl PeakPickingConfig {
    /// Threshold only, no averaging, local maxima over a single frame.
    pub const fn new(threshold: f64) -> Self {
        Self {
            threshold,
            smoothing: Smoothing::None,
            pre_avg: 0,
            post_avg: 0,
            pre_max: 1,
            post_max: 1,
        }
    }

    /// Online variant of this configuration: no look into the future.
    pub fn to_online(&self) -> Self {
        Self {
            smoothing: Smoothing::None,
            post_avg: 0,
            post_max: 0,
            ..self.clone()
        }
    }

    /// Validate the peak picking configuration.
    pub fn validate(&self) -> AudioEventResult<()> {
        if !self.threshold.is_finite() {
            return Err(ParameterError::invalid_value("threshold", "must be finite").into());
        }
        if let Smoothing::Kernel(kernel) = &self.smoothing {
            if kernel.is_empty() || kernel.iter().any(|k| !k.is_finite()) {
                return Err(ParameterError::invalid_value(
                    "smoothing",
                    "kernel must be non-empty and finite",
                )
                .into());
            }
        }
        Ok(())
    }
}

impl Default for PeakPickingConfig {
    fn default() -> Self {
        Self::new(1.25)
    }
}

/// How detections closer than the combine interval are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CombineMode {
    /// Drop every detection that follows its predecessor within the interval.
    #[default]
    KeepFirst,
    /// Replace runs of close detections by their running mean.
    Mean,
}

/// Time-level onset detection parameters; durations are in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OnsetDetectorConfig {
    /// Amount a sample must exceed the moving average by.
    pub threshold: f64,
    /// Width of the Hamming smoothing window.
    pub smooth: f64,
    /// Moving average look-back.
    pub pre_avg: f64,
    /// Moving average look-ahead.
    pub post_avg: f64,
    /// Moving maximum look-back.
    pub pre_max: f64,
    /// Moving maximum look-ahead.
    pub post_max: f64,
    /// Minimum distance between reported onsets.
    pub combine: f64,
    /// Constant shift added to every reported onset.
    pub delay: f64,
    /// Only use past information.
    pub online: bool,
    /// Policy for detections closer than `combine`.
    pub combine_mode: CombineMode,
}

impl OnsetDetectorConfig {
    /// Offline defaults: threshold 1.25, averaging over 100 ms before and
    /// 30 ms after, maxima over 30 ms before and 70 ms after, 30 ms combine.
    pub const fn new() -> Self {
        Self {
            threshold: 1.25,
            smooth: 0.0,
            pre_avg: 0.1,
            post_avg: 0.03,
            pre_max: 0.03,
            post_max: 0.07,
            combine: 0.03,
            delay: 0.0,
            online: false,
            combine_mode: CombineMode::KeepFirst,
        }
    }

    /// Online defaults: no smoothing and no look-ahead.
    pub const fn online() -> Self {
        Self {
            smooth: 0.0,
            post_avg: 0.0,
            post_max: 0.0,
            online: true,
            ..Self::new()
        }
    }

    /// Converts the durations to frames at `fps`.
    ///
    /// In online mode smoothing and the look-ahead windows are forced to zero.
    pub fn to_frames(&self, fps: f64) -> PeakPickingConfig {
        let frames = |seconds: f64| (fps * seconds).round().max(0.0) as usize;
        let config = PeakPickingConfig {
            threshold: self.threshold,
            smoothing: Smoothing::Hamming(frames(self.smooth)),
            pre_avg: frames(self.pre_avg),
            post_avg: frames(self.post_avg),
            pre_max: frames(self.pre_max),
            post_max: frames(self.post_max),
        };
        if self.online { config.to_online() } else { config }
    }

    /// Validate the onset detector configuration.
    pub fn validate(&self) -> AudioEventResult<()> {
        if !self.threshold.is_finite() {
            return Err(ParameterError::invalid_value("threshold", "must be finite").into());
        }
        ensure_non_negative("smooth", self.smooth)?;
        ensure_non_negative("pre_avg", self.pre_avg)?;
        ensure_non_negative("post_avg", self.post_avg)?;
        ensure_non_negative("pre_max", self.pre_max)?;
        ensure_non_negative("post_max", self.post_max)?;
        ensure_non_negative("combine", self.combine)?;
        if !self.delay.is_finite() {
            return Err(ParameterError::invalid_value("delay", "must be finite").into());
        }
        Ok(())
    }
}

impl Default for OnsetDetectorConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tempo and beats
// ---------------------------------------------------------------------------

/// Normalization of autocorrelation lags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AcfNormalization {
    /// Raw lag-product sums.
    #[default]
    None,
    /// Each lag divided by the number of overlapping frames.
    Unbiased,
}

/// Parameters of dominant-interval estimation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoConfig {
    /// Slowest tempo considered, in beats per minute.
    pub min_bpm: f64,
    /// Fastest tempo considered, in beats per minute.
    pub max_bpm: f64,
    /// Width of the Hamming window used to smooth activations, in seconds.
    pub smooth: f64,
    /// Autocorrelation normalization. [`AcfNormalization::Unbiased`] tends to
    /// pick a multiple of the period on sparse, impulse-like curves.
    pub normalization: AcfNormalization,
}

impl TempoConfig {
    /// 40 to 240 bpm, 90 ms smoothing, raw autocorrelation.
    pub const fn new() -> Self {
        Self {
            min_bpm: 40.0,
            max_bpm: 240.0,
            smooth: 0.09,
            normalization: AcfNormalization::None,
        }
    }

    /// Lag range `(min_tau, max_tau)` in frames for the given frame rate.
    pub fn lag_range(&self, fps: f64) -> (usize, usize) {
        let min_tau = ((60.0 * fps / self.max_bpm).floor() as usize).max(1);
        let max_tau = ((60.0 * fps / self.min_bpm).ceil() as usize).max(min_tau);
        (min_tau, max_tau)
    }

    /// Smoothing width in frames for the given frame rate.
    pub fn smooth_frames(&self, fps: f64) -> usize {
        (fps * self.smooth).round().max(0.0) as usize
    }

    /// Validate the tempo configuration.
    pub fn validate(&self) -> AudioEventResult<()> {
        ensure_positive("min_bpm", self.min_bpm)?;
        ensure_positive("max_bpm", self.max_bpm)?;
        ensure_non_negative("smooth", self.smooth)?;
        if self.min_bpm > self.max_bpm {
            return Err(ParameterError::invalid_value(
                "min_bpm",
                format!("must not exceed max_bpm ({} > {})", self.min_bpm, self.max_bpm),
            )
            .into());
        }
        Ok(())
    }
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Parameters of beat detection and tracking.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeatTrackingConfig {
    /// Interval estimation parameters.
    pub tempo: TempoConfig,
    /// Fraction of the interval searched on either side of a predicted beat.
    pub look_aside: f64,
    /// Half-width of the local tempo window in look-ahead tracking, in seconds.
    pub look_ahead: f64,
}

impl BeatTrackingConfig {
    /// Look-aside 0.2, look-ahead 4 s.
    pub const fn new() -> Self {
        Self {
            tempo: TempoConfig::new(),
            look_aside: 0.2,
            look_ahead: 4.0,
        }
    }

    /// Validate the beat tracking configuration.
    pub fn validate(&self) -> AudioEventResult<()> {
        self.tempo.validate()?;
        if !(0.0..0.5).contains(&self.look_aside) {
            return Err(ParameterError::out_of_range(
                "look_aside",
                self.look_aside,
                0.0,
                0.5,
                "fraction of the beat interval; must stay below half an interval",
            )
            .into());
        }
        ensure_positive("look_ahead", self.look_ahead)
    }
}

impl Default for BeatTrackingConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Persistence and pipeline
// ---------------------------------------------------------------------------

/// Layout of activations saved as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFormat {
    /// Separator between values on one line; `None` splits on whitespace when
    /// loading and writes one value per line.
    pub delimiter: Option<String>,
    /// Number of decimals written per value.
    pub precision: usize,
}

impl TextFormat {
    /// One value per line with 5 decimals.
    pub const fn new() -> Self {
        Self {
            delimiter: None,
            precision: 5,
        }
    }

    /// Validate the text format.
    pub fn validate(&self) -> AudioEventResult<()> {
        if matches!(&self.delimiter, Some(d) if d.is_empty() || d.contains('\n')) {
            return Err(ParameterError::invalid_value(
                "delimiter",
                "must be non-empty and must not contain newlines",
            )
            .into());
        }
        Ok(())
    }
}

impl Default for TextFormat {
    fn default() -> Self {
        Self::new()
    }
}

/// Complete onset and beat pipeline configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Transforms applied to the input signal.
    pub signal: SignalOptions,
    /// Framing parameters.
    pub frames: FrameConfig,
    /// Spectrogram parameters.
    pub spectrogram: SpectrogramConfig,
    /// Optional filterbank applied to the magnitudes.
    pub filterbank: Option<FilterbankConfig>,
    /// Onset detection function.
    pub onset_function: OnsetFunction,
    /// Onset peak picking.
    pub onsets: OnsetDetectorConfig,
    /// Beat detection and tracking.
    pub beats: BeatTrackingConfig,
}

impl PipelineConfig {
    /// Validate every stage.
    pub fn validate(&self) -> AudioEventResult<()> {
        self.signal.validate()?;
        self.frames.validate()?;
        self.spectrogram.validate(self.frames.frame_size)?;
        if let Some(filterbank) = &self.filterbank {
            filterbank.validate()?;
        }
        self.onsets.validate()?;
        self.beats.validate()
    }
}
