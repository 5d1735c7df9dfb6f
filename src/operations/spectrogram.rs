//! Lazily computed spectrograms over a [`FramedSignal`].
//!
//! A [`Spectrogram`] owns nothing but its configuration and caches. Each
//! derived representation (complex STFT, magnitude, phase, local group delay,
//! differences, whitened magnitude, harmonic/percussive components) is
//! computed on first access and memoized in a [`OnceCell`]; it is never
//! recomputed or mutated afterwards.
//!
//! Frames are windowed and circularly shifted by half the FFT length before
//! the transform, so that phases refer to the frame center. Only the first
//! `fft_size / 2` bins are kept.
//!
//! The magnitude is projected onto the optional [`Filterbank`] and then
//! compressed logarithmically. Both steps run in blocks of `block_size` frames
//! so that the full complex STFT need not be held in memory.

use std::cell::OnceCell;
use std::f64::consts::PI;
use std::sync::Arc;

use ndarray::{Array1, Array2, ArrayView2, Axis, s};
use rustfft::{Fft, FftPlanner, num_complex::Complex};

use crate::frames::FramedSignal;
use crate::operations::filterbank::Filterbank;
use crate::operations::hpss::{self, HpssComponents};
use crate::operations::types::{DiffLag, HpssConfig, SpectrogramConfig, WhiteningConfig};
use crate::operations::window::generate_window;
use crate::{AudioEventResult, AudioSample, LayoutError};

/// Memoized spectral representations of a framed mono signal.
#[derive(Debug)]
pub struct Spectrogram<'a, T: AudioSample> {
    frames: FramedSignal<'a, T>,
    config: SpectrogramConfig,
    filterbank: Option<Filterbank>,
    whitening: WhiteningConfig,
    separation: HpssConfig,
    fft_window: Array1<f64>,
    fft_size: usize,
    diff_frames: usize,
    stft: OnceCell<Array2<Complex<f64>>>,
    magnitude: OnceCell<Array2<f64>>,
    phase: OnceCell<Array2<f64>>,
    local_group_delay: OnceCell<Array2<f64>>,
    diff: OnceCell<Array2<f64>>,
    positive_diff: OnceCell<Array2<f64>>,
    whitened: OnceCell<Array2<f64>>,
    components: OnceCell<HpssComponents>,
}

impl<'a, T: AudioSample> Spectrogram<'a, T> {
    /// Unfiltered spectrogram of `frames`.
    ///
    /// # Errors
    /// Returns a layout error for multi-channel signals and a parameter error
    /// for an invalid configuration.
    pub fn new(frames: FramedSignal<'a, T>, config: &SpectrogramConfig) -> AudioEventResult<Self> {
        Self::build(frames, config, None)
    }

    /// Spectrogram whose magnitudes are projected onto `filterbank`.
    ///
    /// # Errors
    /// In addition to the errors of [`new`](Self::new), returns a layout error
    /// if the filterbank does not expect `fft_size / 2` bins.
    pub fn with_filterbank(
        frames: FramedSignal<'a, T>,
        config: &SpectrogramConfig,
        filterbank: Filterbank,
    ) -> AudioEventResult<Self> {
        Self::build(frames, config, Some(filterbank))
    }

    fn build(
        frames: FramedSignal<'a, T>,
        config: &SpectrogramConfig,
        filterbank: Option<Filterbank>,
    ) -> AudioEventResult<Self> {
        frames.require_mono("spectrogram")?;
        config.validate(frames.frame_size())?;
        let fft_size = config.fft_size.unwrap_or(frames.frame_size());
        if let Some(filterbank) = &filterbank {
            if filterbank.num_fft_bins() != fft_size / 2 {
                return Err(LayoutError::shape_mismatch(
                    "spectrogram filterbank",
                    fft_size / 2,
                    filterbank.num_fft_bins(),
                )
                .into());
            }
        }

        let window = generate_window(frames.frame_size(), config.window);
        let diff_frames = match config.diff {
            DiffLag::Frames(frames) => frames,
            DiffLag::Ratio(ratio) => diff_frames_from_ratio(&window, ratio, frames.hop_size()),
        };
        let mut fft_window = window;
        if config.normalize_window {
            let area = fft_window.sum();
            if area > 0.0 {
                fft_window /= area;
            }
        }
        fft_window /= T::MAX_AMPLITUDE;

        Ok(Self {
            frames,
            config: *config,
            filterbank,
            whitening: WhiteningConfig::new(),
            separation: HpssConfig::new(),
            fft_window,
            fft_size,
            diff_frames,
            stft: OnceCell::new(),
            magnitude: OnceCell::new(),
            phase: OnceCell::new(),
            local_group_delay: OnceCell::new(),
            diff: OnceCell::new(),
            positive_diff: OnceCell::new(),
            whitened: OnceCell::new(),
            components: OnceCell::new(),
        })
    }

    /// Replaces the adaptive whitening parameters.
    ///
    /// # Errors
    /// Returns a parameter error for a non-positive floor or relaxation.
    pub fn with_whitening(mut self, whitening: WhiteningConfig) -> AudioEventResult<Self> {
        whitening.validate()?;
        self.whitening = whitening;
        self.whitened = OnceCell::new();
        Ok(self)
    }

    /// Replaces the harmonic/percussive separation parameters.
    ///
    /// # Errors
    /// Returns a parameter error for invalid filter sizes or mask power.
    pub fn with_hpss(mut self, separation: HpssConfig) -> AudioEventResult<Self> {
        separation.validate()?;
        self.separation = separation;
        self.components = OnceCell::new();
        Ok(self)
    }

    /// The framed signal this spectrogram is computed from.
    pub const fn frames(&self) -> &FramedSignal<'a, T> {
        &self.frames
    }

    /// The filterbank, if any.
    pub const fn filterbank(&self) -> Option<&Filterbank> {
        self.filterbank.as_ref()
    }

    /// Number of frames.
    pub const fn num_frames(&self) -> usize {
        self.frames.num_frames()
    }

    /// FFT length.
    pub const fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of FFT bins kept, `fft_size / 2`.
    pub const fn num_fft_bins(&self) -> usize {
        self.fft_size / 2
    }

    /// Number of magnitude bins: filterbank bands if filtered, FFT bins otherwise.
    pub fn num_bins(&self) -> usize {
        self.filterbank
            .as_ref()
            .map_or(self.num_fft_bins(), Filterbank::num_bands)
    }

    /// Frames per second.
    pub fn fps(&self) -> f64 {
        self.frames.fps()
    }

    /// Lag used by [`diff`](Self::diff), in frames.
    pub const fn diff_frames(&self) -> usize {
        self.diff_frames
    }

    /// The scaled analysis window.
    pub fn window(&self) -> &Array1<f64> {
        &self.fft_window
    }

    /// Complex STFT, `[num_frames × num_fft_bins]`.
    ///
    /// # Errors
    /// Returns a layout error if the signal is not mono.
    pub fn stft(&self) -> AudioEventResult<&Array2<Complex<f64>>> {
        if let Some(stft) = self.stft.get() {
            return Ok(stft);
        }
        let stft = self.transform_frames(0..self.num_frames())?;
        tracing::debug!(
            num_frames = self.num_frames(),
            num_fft_bins = self.num_fft_bins(),
            "stft computed"
        );
        Ok(self.stft.get_or_init(|| stft))
    }

    /// Magnitude spectrogram, filtered and compressed as configured,
    /// `[num_frames × num_bins]`.
    ///
    /// # Errors
    /// Returns a layout error if the signal is not mono.
    pub fn magnitude(&self) -> AudioEventResult<&Array2<f64>> {
        if let Some(magnitude) = self.magnitude.get() {
            return Ok(magnitude);
        }
        let num_frames = self.num_frames();
        let mut magnitude = Array2::<f64>::zeros((num_frames, self.num_bins()));
        let block_size = self.config.block_size.unwrap_or(num_frames).max(1);

        for block_start in (0..num_frames).step_by(block_size) {
            let block_end = (block_start + block_size).min(num_frames);
            let raw = match self.stft.get() {
                Some(stft) => stft.slice(s![block_start..block_end, ..]).mapv(Complex::norm),
                None => self.transform_frames(block_start..block_end)?.mapv(Complex::norm),
            };
            let block = self.process_magnitude(raw.view());
            magnitude
                .slice_mut(s![block_start..block_end, ..])
                .assign(&block);
            tracing::trace!(block_start, block_end, "magnitude block");
        }

        tracing::debug!(
            num_frames,
            num_bins = self.num_bins(),
            filtered = self.filterbank.is_some(),
            log = self.config.log.is_some(),
            "magnitude spectrogram computed"
        );
        Ok(self.magnitude.get_or_init(|| magnitude))
    }

    /// Phase of the STFT in radians.
    ///
    /// # Errors
    /// Returns a layout error if the signal is not mono.
    pub fn phase(&self) -> AudioEventResult<&Array2<f64>> {
        if let Some(phase) = self.phase.get() {
            return Ok(phase);
        }
        let phase = self.stft()?.mapv(|c| c.arg());
        Ok(self.phase.get_or_init(|| phase))
    }

    /// Local group delay: the negative derivative of the unwrapped phase over
    /// frequency. The last bin of every frame is zero.
    ///
    /// # Errors
    /// Returns a layout error if the signal is not mono.
    pub fn local_group_delay(&self) -> AudioEventResult<&Array2<f64>> {
        if let Some(lgd) = self.local_group_delay.get() {
            return Ok(lgd);
        }
        let phase = self.phase()?;
        let mut lgd = Array2::<f64>::zeros(phase.dim());
        for (row, mut out) in phase.axis_iter(Axis(0)).zip(lgd.axis_iter_mut(Axis(0))) {
            let unwrapped = unwrap_phase(&row.to_vec());
            for (k, pair) in unwrapped.windows(2).enumerate() {
                out[k] = pair[0] - pair[1];
            }
        }
        Ok(self.local_group_delay.get_or_init(|| lgd))
    }

    /// Magnitude difference over [`diff_frames`](Self::diff_frames); the first
    /// `diff_frames` rows are zero.
    ///
    /// # Errors
    /// Returns a layout error if the signal is not mono.
    pub fn diff(&self) -> AudioEventResult<&Array2<f64>> {
        if let Some(diff) = self.diff.get() {
            return Ok(diff);
        }
        let diff = spectral_difference(self.magnitude()?.view(), self.diff_frames);
        Ok(self.diff.get_or_init(|| diff))
    }

    /// Positive part of [`diff`](Self::diff).
    ///
    /// # Errors
    /// Returns a layout error if the signal is not mono.
    pub fn positive_diff(&self) -> AudioEventResult<&Array2<f64>> {
        if let Some(positive) = self.positive_diff.get() {
            return Ok(positive);
        }
        let positive = self.diff()?.mapv(|d| d.max(0.0));
        Ok(self.positive_diff.get_or_init(|| positive))
    }

    /// Adaptively whitened magnitude spectrogram.
    ///
    /// # Errors
    /// Returns a layout error if the signal is not mono.
    pub fn whitened(&self) -> AudioEventResult<&Array2<f64>> {
        if let Some(whitened) = self.whitened.get() {
            return Ok(whitened);
        }
        let whitened = adaptive_whitening(self.magnitude()?.view(), self.fps(), &self.whitening);
        Ok(self.whitened.get_or_init(|| whitened))
    }

    /// Harmonic/percussive separation of the magnitude spectrogram.
    ///
    /// # Errors
    /// Returns a layout error if the signal is not mono.
    pub fn hpss(&self) -> AudioEventResult<&HpssComponents> {
        if let Some(components) = self.components.get() {
            return Ok(components);
        }
        let components = hpss::separate(self.magnitude()?.view(), &self.separation)?;
        Ok(self.components.get_or_init(|| components))
    }

    /// Harmonic component of the magnitude spectrogram.
    ///
    /// # Errors
    /// Returns a layout error if the signal is not mono.
    pub fn harmonic(&self) -> AudioEventResult<&Array2<f64>> {
        Ok(&self.hpss()?.harmonic)
    }

    /// Percussive component of the magnitude spectrogram.
    ///
    /// # Errors
    /// Returns a layout error if the signal is not mono.
    pub fn percussive(&self) -> AudioEventResult<&Array2<f64>> {
        Ok(&self.hpss()?.percussive)
    }

    /// Windowed, shifted FFTs of the frames in `range`.
    fn transform_frames(
        &self,
        range: std::ops::Range<usize>,
    ) -> AudioEventResult<Array2<Complex<f64>>> {
        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(self.fft_size);
        let num_fft_bins = self.num_fft_bins();
        let mut out = Array2::<Complex<f64>>::zeros((range.len(), num_fft_bins));
        let mut buffer = vec![Complex::new(0.0, 0.0); self.fft_size];

        for (row, index) in range.enumerate() {
            let frame = self.frames.mono_frame(index as i64)?;
            self.transform_frame(&fft, &frame, &mut buffer);
            out.row_mut(row)
                .iter_mut()
                .zip(&buffer[..num_fft_bins])
                .for_each(|(dst, &src)| *dst = src);
        }
        Ok(out)
    }

    fn transform_frame(
        &self,
        fft: &Arc<dyn Fft<f64>>,
        frame: &Array1<T>,
        buffer: &mut [Complex<f64>],
    ) {
        let frame_size = frame.len();
        buffer.fill(Complex::new(0.0, 0.0));
        for ((dst, &sample), &w) in buffer.iter_mut().zip(frame).zip(&self.fft_window) {
            *dst = Complex::new(sample.as_f64() * w, 0.0);
        }
        // rotate the frame center to the start, then zero-pad
        buffer[..frame_size].rotate_left(self.num_fft_bins().min(frame_size));
        fft.process(buffer);
    }

    fn process_magnitude(&self, raw: ArrayView2<'_, f64>) -> Array2<f64> {
        let mut magnitude = match &self.filterbank {
            Some(filterbank) => raw.dot(&filterbank.weights()),
            None => raw.to_owned(),
        };
        if let Some(log) = self.config.log {
            magnitude.mapv_inplace(|x| (log.mul * x + log.add).log10());
        }
        magnitude
    }
}

/// Lag in frames derived from a window: the distance between the window's
/// center and its first sample above `ratio` times the peak, at least 1.
pub fn diff_frames_from_ratio(window: &Array1<f64>, ratio: f64, hop_size: f64) -> usize {
    let peak = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let sample = window
        .iter()
        .position(|&w| w > ratio * peak)
        .unwrap_or(0);
    let diff_samples = (window.len() / 2) as f64 - sample as f64;
    ((diff_samples / hop_size).round().max(1.0)) as usize
}

/// `spec[t] - spec[t - lag]` for `t >= lag`, zero before.
pub fn spectral_difference(spectrogram: ArrayView2<'_, f64>, lag: usize) -> Array2<f64> {
    let mut diff = Array2::<f64>::zeros(spectrogram.dim());
    let num_frames = spectrogram.nrows();
    if lag > 0 && lag < num_frames {
        let current = spectrogram.slice(s![lag.., ..]);
        let previous = spectrogram.slice(s![..num_frames - lag, ..]);
        diff.slice_mut(s![lag.., ..]).assign(&(&current - &previous));
    }
    diff
}

/// Adaptive whitening: every bin is divided by a running peak estimate
/// `p[t] = max(spec[t], floor, r * p[t-1])` with `r = 10^(-6 * relaxation / fps)`.
pub fn adaptive_whitening(
    spectrogram: ArrayView2<'_, f64>,
    fps: f64,
    config: &WhiteningConfig,
) -> Array2<f64> {
    let decay = 10f64.powf(-6.0 * config.relaxation / fps);
    let mut peak = Array1::<f64>::zeros(spectrogram.ncols());
    let mut whitened = Array2::<f64>::zeros(spectrogram.dim());
    for (frame, mut out) in spectrogram
        .axis_iter(Axis(0))
        .zip(whitened.axis_iter_mut(Axis(0)))
    {
        for ((p, &x), o) in peak.iter_mut().zip(frame).zip(out.iter_mut()) {
            *p = x.max(config.floor).max(decay * *p);
            *o = x / *p;
        }
    }
    whitened
}

/// Unwraps a phase sequence so that consecutive values differ by less than π.
pub fn unwrap_phase(phase: &[f64]) -> Vec<f64> {
    let mut unwrapped = Vec::with_capacity(phase.len());
    let mut correction = 0.0;
    for (k, &value) in phase.iter().enumerate() {
        if k > 0 {
            let delta = value - phase[k - 1];
            let mut wrapped = (delta + PI).rem_euclid(2.0 * PI) - PI;
            if wrapped == -PI && delta > 0.0 {
                wrapped = PI;
            }
            if delta.abs() >= PI {
                correction += wrapped - delta;
            }
        }
        unwrapped.push(value + correction);
    }
    unwrapped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Signal;
    use crate::operations::types::{FilterbankConfig, FrameConfig, LogCompression};
    use approx_eq::assert_approx_eq;
    use ndarray::array;

    fn sine(frequency: f64, len: usize, sample_rate: u32) -> Signal<f64> {
        let samples = Array1::from_shape_fn(len, |i| {
            (2.0 * PI * frequency * i as f64 / f64::from(sample_rate)).sin()
        });
        Signal::new_mono(samples, sample_rate).unwrap()
    }

    #[test]
    fn test_sine_peaks_in_expected_bin() {
        // 1000 Hz at 8 kHz with 256-point frames: bin 32
        let signal = sine(1000.0, 4096, 8000);
        let frames = FramedSignal::new(&signal, &FrameConfig::with_hop(256, 128.0)).unwrap();
        let spec = Spectrogram::new(frames, &SpectrogramConfig::new()).unwrap();
        let magnitude = spec.magnitude().unwrap();
        assert_eq!(magnitude.ncols(), 128);
        let row = magnitude.row(10);
        let peak = row
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(k, _)| k)
            .unwrap();
        assert_eq!(peak, 32);
    }

    #[test]
    fn test_magnitude_matches_stft_and_is_cached() {
        let signal = sine(440.0, 2000, 8000);
        let frames = FramedSignal::new(&signal, &FrameConfig::with_hop(128, 64.0)).unwrap();
        let spec = Spectrogram::new(frames, &SpectrogramConfig::new()).unwrap();
        let first = spec.magnitude().unwrap() as *const Array2<f64>;
        let second = spec.magnitude().unwrap() as *const Array2<f64>;
        assert_eq!(first, second);

        let from_stft = spec.stft().unwrap().mapv(Complex::norm);
        let magnitude = spec.magnitude().unwrap();
        for (a, b) in from_stft.iter().zip(magnitude.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_blocked_projection_matches_single_block() {
        let signal = sine(700.0, 3000, 8000);
        let frames = FramedSignal::new(&signal, &FrameConfig::with_hop(256, 80.0)).unwrap();
        let bank = Filterbank::from_config(128, 8000.0, &FilterbankConfig::new()).unwrap();
        let config = SpectrogramConfig::logarithmic();
        let whole = Spectrogram::with_filterbank(frames, &config, bank.clone()).unwrap();
        let blocked = Spectrogram::with_filterbank(
            frames,
            &SpectrogramConfig {
                block_size: Some(7),
                ..config
            },
            bank,
        )
        .unwrap();
        let a = whole.magnitude().unwrap();
        let b = blocked.magnitude().unwrap();
        assert_eq!(a.dim(), b.dim());
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-12);
        }
    }

    #[test]
    fn test_filterbank_size_mismatch_is_rejected() {
        let signal = sine(440.0, 1000, 8000);
        let frames = FramedSignal::new(&signal, &FrameConfig::with_hop(256, 80.0)).unwrap();
        let bank = Filterbank::from_config(256, 8000.0, &FilterbankConfig::new()).unwrap();
        assert!(Spectrogram::with_filterbank(frames, &SpectrogramConfig::new(), bank).is_err());
    }

    #[test]
    fn test_multichannel_signal_is_rejected() {
        let signal = Signal::new(Array2::<f64>::zeros((2, 1000)), 8000).unwrap();
        let frames = FramedSignal::new(&signal, &FrameConfig::with_hop(256, 80.0)).unwrap();
        assert!(Spectrogram::new(frames, &SpectrogramConfig::new()).is_err());
    }

    #[test]
    fn test_integer_samples_are_scaled_to_unit_range() {
        let float = sine(1000.0, 2048, 8000);
        let int = Signal::new_mono(
            float.mono().unwrap().mapv(|x| i16::from_f64(x * 0.5 * i16::MAX_AMPLITUDE)),
            8000,
        )
        .unwrap();
        let config = FrameConfig::with_hop(256, 128.0);
        let spectrogram = SpectrogramConfig::new();
        let spec_f =
            Spectrogram::new(FramedSignal::new(&float, &config).unwrap(), &spectrogram).unwrap();
        let spec_i =
            Spectrogram::new(FramedSignal::new(&int, &config).unwrap(), &spectrogram).unwrap();
        let peak_f = spec_f.magnitude().unwrap()[[5, 32]];
        let peak_i = spec_i.magnitude().unwrap()[[5, 32]];
        assert_approx_eq!(peak_i / peak_f, 0.5, 1e-3);
    }

    #[test]
    fn test_log_compression() {
        let signal = Signal::new_mono(Array1::<f64>::zeros(512), 8000).unwrap();
        let frames = FramedSignal::new(&signal, &FrameConfig::with_hop(128, 64.0)).unwrap();
        let config = SpectrogramConfig {
            log: Some(LogCompression { mul: 1.0, add: 10.0 }),
            ..SpectrogramConfig::new()
        };
        let spec = Spectrogram::new(frames, &config).unwrap();
        assert!(spec.magnitude().unwrap().iter().all(|&x| (x - 1.0).abs() < 1e-12));
    }

    #[test]
    fn test_diff_frames_from_ratio() {
        let window = generate_window(2048, crate::operations::types::WindowType::Hanning);
        // the Hann window first exceeds half its peak at a quarter of its length
        let lag = diff_frames_from_ratio(&window, 0.5, 441.0);
        assert_eq!(lag, 1);
        let lag = diff_frames_from_ratio(&window, 0.5, 100.0);
        assert_eq!(lag, 5);
        assert_eq!(diff_frames_from_ratio(&window, 0.5, 100_000.0), 1);
    }

    #[test]
    fn test_spectral_difference() {
        let spec = array![[1.0, 2.0], [3.0, 1.0], [3.0, 5.0]];
        let diff = spectral_difference(spec.view(), 1);
        assert_eq!(diff, array![[0.0, 0.0], [2.0, -1.0], [0.0, 4.0]]);
        let diff = spectral_difference(spec.view(), 2);
        assert_eq!(diff, array![[0.0, 0.0], [0.0, 0.0], [2.0, 3.0]]);
        assert_eq!(spectral_difference(spec.view(), 5), Array2::<f64>::zeros((3, 2)));
    }

    #[test]
    fn test_positive_diff_is_non_negative() {
        let signal = sine(500.0, 3000, 8000);
        let frames = FramedSignal::new(&signal, &FrameConfig::with_hop(256, 100.0)).unwrap();
        let spec = Spectrogram::new(frames, &SpectrogramConfig::new()).unwrap();
        assert!(spec.positive_diff().unwrap().iter().all(|&d| d >= 0.0));
        assert_eq!(spec.diff().unwrap().dim(), spec.magnitude().unwrap().dim());
    }

    #[test]
    fn test_adaptive_whitening() {
        let spec = array![[2.0, 0.1], [1.0, 0.1]];
        let config = WhiteningConfig::new();
        // relaxation of 10 frames at 60 fps decays the peak by a factor of 10
        let whitened = adaptive_whitening(spec.view(), 60.0, &config);
        assert_approx_eq!(whitened[[0, 0]], 1.0, 1e-12);
        assert_approx_eq!(whitened[[0, 1]], 0.2, 1e-12);
        assert_approx_eq!(whitened[[1, 0]], 1.0, 1e-12);
        assert_approx_eq!(whitened[[1, 1]], 0.2, 1e-12);

        let slow = adaptive_whitening(spec.view(), 6000.0, &config);
        assert!(slow[[1, 0]] < 1.0);
    }

    #[test]
    fn test_unwrap_phase() {
        let phase = [0.0, 3.0, -3.0, -0.5];
        let unwrapped = unwrap_phase(&phase);
        assert_approx_eq!(unwrapped[1], 3.0, 1e-12);
        assert_approx_eq!(unwrapped[2], 2.0 * PI - 3.0, 1e-12);
        assert_approx_eq!(unwrapped[3], 2.0 * PI - 0.5, 1e-12);
    }

    #[test]
    fn test_local_group_delay_last_bin_is_zero() {
        let signal = sine(1000.0, 2048, 8000);
        let frames = FramedSignal::new(&signal, &FrameConfig::with_hop(256, 128.0)).unwrap();
        let spec = Spectrogram::new(frames, &SpectrogramConfig::new()).unwrap();
        let lgd = spec.local_group_delay().unwrap();
        assert_eq!(lgd.dim(), spec.phase().unwrap().dim());
        assert!(lgd.column(lgd.ncols() - 1).iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_hpss_components() {
        let signal = sine(1000.0, 4096, 8000);
        let frames = FramedSignal::new(&signal, &FrameConfig::with_hop(256, 128.0)).unwrap();
        let spec = Spectrogram::new(frames, &SpectrogramConfig::new())
            .unwrap()
            .with_hpss(HpssConfig::soft())
            .unwrap();
        let magnitude = spec.magnitude().unwrap().clone();
        let total = spec.harmonic().unwrap() + spec.percussive().unwrap();
        for (a, b) in total.iter().zip(magnitude.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
        // a steady tone is harmonic
        assert!(spec.harmonic().unwrap()[[10, 32]] > spec.percussive().unwrap()[[10, 32]]);
    }
}
