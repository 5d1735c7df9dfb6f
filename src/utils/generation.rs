//! Synthetic test signals.
//!
//! Impulse trains and sinusoids with known event positions, used to exercise
//! the onset and beat pipelines end to end.

use std::f64::consts::PI;
use std::time::Duration;

use ndarray::Array1;

use crate::{AudioEventResult, AudioSample, ParameterError, Signal};

fn num_samples(duration: Duration, sample_rate: u32) -> usize {
    (duration.as_secs_f64() * f64::from(sample_rate)).round() as usize
}

/// Unit impulses of height `amplitude` at the given times (in seconds).
///
/// Times outside the signal are ignored.
///
/// # Errors
/// Returns a parameter error if `sample_rate` is zero.
pub fn impulses<T: AudioSample>(
    times: &[f64],
    duration: Duration,
    sample_rate: u32,
    amplitude: f64,
) -> AudioEventResult<Signal<T>> {
    if sample_rate == 0 {
        return Err(ParameterError::invalid_value("sample_rate", "must be greater than 0").into());
    }
    let len = num_samples(duration, sample_rate);
    let mut samples = Array1::from_elem(len, T::zero());
    let value = T::from_f64(amplitude * T::MAX_AMPLITUDE);
    for &t in times {
        let index = (t * f64::from(sample_rate)).round();
        if index >= 0.0 && (index as usize) < len {
            samples[index as usize] = value;
        }
    }
    Signal::new_mono(samples, sample_rate)
}

/// Impulses every `interval` seconds, starting at `interval`.
///
/// # Errors
/// Returns a parameter error if `sample_rate` is zero or `interval` is not
/// positive.
pub fn impulse_train<T: AudioSample>(
    interval: f64,
    duration: Duration,
    sample_rate: u32,
    amplitude: f64,
) -> AudioEventResult<Signal<T>> {
    if !(interval.is_finite() && interval > 0.0) {
        return Err(ParameterError::invalid_value("interval", "must be greater than 0").into());
    }
    let count = (duration.as_secs_f64() / interval).floor() as usize;
    let times: Vec<f64> = (1..=count).map(|k| k as f64 * interval).collect();
    impulses(&times, duration, sample_rate, amplitude)
}

/// A sine wave of `frequency` Hz.
///
/// # Errors
/// Returns a parameter error if `sample_rate` is zero.
pub fn sine_wave<T: AudioSample>(
    frequency: f64,
    duration: Duration,
    sample_rate: u32,
    amplitude: f64,
) -> AudioEventResult<Signal<T>> {
    if sample_rate == 0 {
        return Err(ParameterError::invalid_value("sample_rate", "must be greater than 0").into());
    }
    let rate = f64::from(sample_rate);
    let samples = Array1::from_shape_fn(num_samples(duration, sample_rate), |i| {
        let phase = 2.0 * PI * frequency * i as f64 / rate;
        T::from_f64(amplitude * T::MAX_AMPLITUDE * phase.sin())
    });
    Signal::new_mono(samples, sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_impulse_train_positions() {
        let signal: Signal<f32> =
            impulse_train(0.5, Duration::from_millis(2100), 1000, 1.0).unwrap();
        let data = signal.mono().unwrap();
        assert_eq!(data.len(), 2100);
        let positions: Vec<usize> = data
            .iter()
            .enumerate()
            .filter(|&(_, &x)| x != 0.0)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(positions, vec![500, 1000, 1500, 2000]);
    }

    #[test]
    fn test_integer_impulses_use_full_scale() {
        let signal: Signal<i16> = impulses(&[0.01, 5.0], Duration::from_millis(100), 1000, 0.5).unwrap();
        let data = signal.mono().unwrap();
        assert_eq!(data[10], 16384);
        assert_eq!(data.iter().filter(|&&x| x != 0).count(), 1);
    }

    #[test]
    fn test_sine_wave_peak() {
        let signal: Signal<f64> = sine_wave(250.0, Duration::from_millis(8), 1000, 0.5).unwrap();
        let data = signal.mono().unwrap();
        assert!((data[1] - 0.5).abs() < 1e-12);
        assert!(data.iter().all(|x| x.abs() <= 0.5 + 1e-12));
    }
}
