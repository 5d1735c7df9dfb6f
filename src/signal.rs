//! Immutable sample buffers tagged with a sample rate.
//!
//! A [`Signal`] owns its samples in a `(num_channels, num_samples)` array and
//! is never mutated after construction. The one-time transforms described by
//! [`SignalOptions`] (down-mix, normalization, attenuation) each produce a new
//! signal. Every later stage borrows the result read-only.

use std::fmt::Display;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, s};

use crate::operations::types::SignalOptions;
use crate::{AudioEventResult, AudioSample, LayoutError, ParameterError};

/// Sampled audio with its sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal<T: AudioSample> {
    data: Array2<T>,
    sample_rate: u32,
}

impl<T: AudioSample> Signal<T> {
    /// Creates a signal from a `(num_channels, num_samples)` array.
    ///
    /// # Errors
    /// Returns a parameter error if `sample_rate` is zero or the array has no
    /// channels.
    pub fn new(data: Array2<T>, sample_rate: u32) -> AudioEventResult<Self> {
        if sample_rate == 0 {
            return Err(ParameterError::invalid_value("sample_rate", "must be greater than 0").into());
        }
        if data.nrows() == 0 {
            return Err(ParameterError::invalid_value(
                "data",
                "a signal needs at least one channel",
            )
            .into());
        }
        Ok(Self { data, sample_rate })
    }

    /// Creates a mono signal.
    ///
    /// # Errors
    /// Returns a parameter error if `sample_rate` is zero.
    pub fn new_mono(data: Array1<T>, sample_rate: u32) -> AudioEventResult<Self> {
        Self::new(data.insert_axis(Axis(0)), sample_rate)
    }

    /// Creates a signal and applies the one-time transforms in `options`.
    ///
    /// Down-mixing runs first, then normalization, then attenuation.
    pub fn with_options(
        data: Array2<T>,
        sample_rate: u32,
        options: &SignalOptions,
    ) -> AudioEventResult<Self> {
        options.validate()?;
        let mut signal = Self::new(data, sample_rate)?;
        if options.downmix && !signal.is_mono() {
            signal = signal.downmix();
        }
        if options.normalize {
            signal = signal.normalize();
        }
        if options.attenuation_db != 0.0 {
            signal = signal.attenuate(options.attenuation_db);
        }
        Ok(signal)
    }

    /// Sample rate in Hz.
    #[inline]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of channels.
    #[inline]
    pub fn num_channels(&self) -> usize {
        self.data.nrows()
    }

    /// Number of samples per channel.
    #[inline]
    pub fn num_samples(&self) -> usize {
        self.data.ncols()
    }

    /// Returns true if the signal holds no samples.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_samples() == 0
    }

    /// Returns true if the signal has exactly one channel.
    #[inline]
    pub fn is_mono(&self) -> bool {
        self.num_channels() == 1
    }

    /// Duration in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.num_samples() as f64 / f64::from(self.sample_rate)
    }

    /// Borrowed view of the `(num_channels, num_samples)` buffer.
    pub fn data(&self) -> ArrayView2<'_, T> {
        self.data.view()
    }

    /// Borrowed view of one channel.
    ///
    /// # Errors
    /// Returns a parameter error if `channel` does not exist.
    pub fn channel(&self, channel: usize) -> AudioEventResult<ArrayView1<'_, T>> {
        if channel >= self.num_channels() {
            return Err(ParameterError::out_of_range(
                "channel",
                channel,
                0,
                self.num_channels().saturating_sub(1),
                "channel index must exist",
            )
            .into());
        }
        Ok(self.data.row(channel))
    }

    /// Borrowed view of the only channel of a mono signal.
    ///
    /// # Errors
    /// Returns a layout error for multi-channel signals.
    pub fn mono(&self) -> AudioEventResult<ArrayView1<'_, T>> {
        if !self.is_mono() {
            return Err(LayoutError::unsupported_channels("mono view", self.num_channels()).into());
        }
        Ok(self.data.row(0))
    }

    /// Averages all channels into a single channel.
    pub fn downmix(&self) -> Self {
        let channels = self.num_channels() as f64;
        let mixed = self
            .data
            .map(|&x| x.as_f64())
            .sum_axis(Axis(0))
            .mapv(|sum| T::from_f64(sum / channels));
        Self {
            data: mixed.insert_axis(Axis(0)),
            sample_rate: self.sample_rate,
        }
    }

    /// Scales the signal so that its peak reaches full scale.
    ///
    /// A silent signal is returned unchanged.
    pub fn normalize(&self) -> Self {
        let peak = self
            .data
            .iter()
            .fold(0.0_f64, |acc, &x| acc.max(x.as_f64().abs()));
        if peak == 0.0 {
            return self.clone();
        }
        let gain = T::MAX_AMPLITUDE / peak;
        self.map_f64(|x| x * gain)
    }

    /// Attenuates the signal by `attenuation_db` decibels.
    pub fn attenuate(&self, attenuation_db: f64) -> Self {
        let gain = 10f64.powf(-attenuation_db / 20.0);
        self.map_f64(|x| x * gain)
    }

    /// Strips leading and trailing samples that are zero in every channel.
    pub fn trim(&self) -> Self {
        let is_silent = |i: usize| self.data.column(i).iter().all(|x| x.is_zero());
        let n = self.num_samples();
        let first = (0..n).find(|&i| !is_silent(i)).unwrap_or(n);
        let last = (first..n).rev().find(|&i| !is_silent(i)).map_or(first, |i| i + 1);
        Self {
            data: self.data.slice(s![.., first..last]).to_owned(),
            sample_rate: self.sample_rate,
        }
    }

    /// Root mean square over all samples, in raw sample units.
    ///
    /// An empty signal has an RMS of zero.
    pub fn root_mean_square(&self) -> f64 {
        let count = self.data.len();
        if count == 0 {
            return 0.0;
        }
        let energy: f64 = self.data.iter().map(|&x| x.as_f64().powi(2)).sum();
        (energy / count as f64).sqrt()
    }

    /// Sound pressure level in dB relative to `p_ref`.
    ///
    /// A silent signal yields `-f64::MAX` rather than negative infinity.
    pub fn sound_pressure_level(&self, p_ref: f64) -> f64 {
        let rms = self.root_mean_square();
        if rms == 0.0 {
            return -f64::MAX;
        }
        20.0 * (rms / p_ref).log10()
    }

    fn map_f64(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            data: self.data.mapv(|x| T::from_f64(f(x.as_f64()))),
            sample_rate: self.sample_rate,
        }
    }
}

impl<T: AudioSample> Display for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Signal<{}>: {} ch × {} samples @ {} Hz ({:.3} s)",
            std::any::type_name::<T>(),
            self.num_channels(),
            self.num_samples(),
            self.sample_rate,
            self.duration_seconds()
        )
    }
}
