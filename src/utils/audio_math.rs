//! Frequency scale and time conversion helpers.
//!
//! These functions generate the band-center frequencies consumed by
//! [`Filterbank`](crate::operations::filterbank::Filterbank) and convert
//! between frames, seconds and FFT bins.
//!
//! # Examples
//!
//! ```rust
//! use audio_events::utils::audio_math::{hz_to_mel, mel_to_hz, semitone_frequencies};
//!
//! let mel = hz_to_mel(1000.0);
//! assert!((mel_to_hz(mel) - 1000.0).abs() < 1e-9);
//!
//! let notes = semitone_frequencies(430.0, 450.0, 440.0);
//! assert_eq!(notes, vec![440.0]);
//! ```

/// Tuning frequency of A4 in Hz.
pub const A4: f64 = 440.0;

const MEL_FACTOR: f64 = 1127.01048;

const BARK_CORNERS: [f64; 25] = [
    20.0, 100.0, 200.0, 300.0, 400.0, 510.0, 630.0, 770.0, 920.0, 1080.0, 1270.0, 1480.0, 1720.0,
    2000.0, 2320.0, 2700.0, 3150.0, 3700.0, 4400.0, 5300.0, 6400.0, 7700.0, 9500.0, 12000.0,
    15500.0,
];

const BARK_DOUBLE: [f64; 49] = [
    20.0, 50.0, 100.0, 150.0, 200.0, 250.0, 300.0, 350.0, 400.0, 450.0, 510.0, 570.0, 630.0,
    700.0, 770.0, 840.0, 920.0, 1000.0, 1080.0, 1170.0, 1270.0, 1370.0, 1480.0, 1600.0, 1720.0,
    1850.0, 2000.0, 2150.0, 2320.0, 2500.0, 2700.0, 2900.0, 3150.0, 3400.0, 3700.0, 4000.0,
    4400.0, 4800.0, 5300.0, 5800.0, 6400.0, 7000.0, 7700.0, 8500.0, 9500.0, 10500.0, 12000.0,
    13500.0, 15500.0,
];

// =============================================================================
// FREQUENCY SCALES
// =============================================================================

/// Converts a frequency in Hz to mel, `1127.01048 * ln(1 + f / 700)`.
pub fn hz_to_mel(freq_hz: f64) -> f64 {
    MEL_FACTOR * (freq_hz / 700.0 + 1.0).ln()
}

/// Converts mel back to Hz.
pub fn mel_to_hz(mel: f64) -> f64 {
    700.0 * ((mel / MEL_FACTOR).exp() - 1.0)
}

/// `num` frequencies equally spaced on the mel scale between `fmin` and `fmax`,
/// both included.
pub fn mel_frequencies(num: usize, fmin: f64, fmax: f64) -> Vec<f64> {
    linspace(hz_to_mel(fmin), hz_to_mel(fmax), num)
        .into_iter()
        .map(mel_to_hz)
        .collect()
}

/// Converts a frequency in Hz to Bark.
pub fn hz_to_bark(freq_hz: f64) -> f64 {
    26.81 / (1.0 + 1960.0 / freq_hz) - 0.53
}

/// Converts Bark back to Hz.
pub fn bark_to_hz(bark: f64) -> f64 {
    1960.0 / (26.81 / (bark + 0.53) - 1.0)
}

/// Critical band corner frequencies within `[fmin, fmax]`.
///
/// With `double`, the centers between neighbouring corners are included too.
pub fn bark_frequencies(fmin: f64, fmax: f64, double: bool) -> Vec<f64> {
    let table: &[f64] = if double { &BARK_DOUBLE } else { &BARK_CORNERS };
    within(table.iter().copied(), fmin, fmax)
}

/// Frequencies spaced `bands_per_octave` per octave around `a4`, limited to
/// `[fmin, fmax]`.
///
/// With 12 bands per octave and `a4 = 440` these are the MIDI note frequencies.
pub fn log_frequencies(bands_per_octave: usize, fmin: f64, fmax: f64, a4: f64) -> Vec<f64> {
    let bpo = bands_per_octave as f64;
    let left = ((fmin / a4).log2() * bpo).floor() as i64;
    let right = ((fmax / a4).log2() * bpo).ceil() as i64;
    within(
        (left..right).map(|k| a4 * 2f64.powf(k as f64 / bpo)),
        fmin,
        fmax,
    )
}

/// Semitone frequencies within `[fmin, fmax]`.
pub fn semitone_frequencies(fmin: f64, fmax: f64, a4: f64) -> Vec<f64> {
    log_frequencies(12, fmin, fmax, a4)
}

/// Converts a (fractional) MIDI note number to Hz.
pub fn midi_to_hz(midi_note: f64, a4: f64) -> f64 {
    2f64.powf((midi_note - 69.0) / 12.0) * a4
}

/// Converts a frequency in Hz to a fractional MIDI note number.
pub fn hz_to_midi(freq_hz: f64, a4: f64) -> f64 {
    12.0 * (freq_hz / a4).log2() + 69.0
}

/// Converts a frequency in Hz to the ERB scale.
pub fn hz_to_erb(freq_hz: f64) -> f64 {
    21.4 * (1.0 + 4.37 * freq_hz / 1000.0).log10()
}

/// Converts an ERB-scaled frequency back to Hz.
pub fn erb_to_hz(erb: f64) -> f64 {
    (10f64.powf(erb / 21.4) - 1.0) * 1000.0 / 4.37
}

// =============================================================================
// FFT BINS
// =============================================================================

/// Center frequencies of the `num_fft_bins` retained FFT bins.
pub fn fft_frequencies(num_fft_bins: usize, sample_rate: f64) -> Vec<f64> {
    let resolution = sample_rate / 2.0 / num_fft_bins as f64;
    (0..num_fft_bins).map(|i| i as f64 * resolution).collect()
}

/// Maps frequencies to the nearest FFT bin, rounding halves to even.
pub fn frequencies_to_bins(frequencies: &[f64], num_fft_bins: usize, sample_rate: f64) -> Vec<i64> {
    let factor = sample_rate / 2.0 / num_fft_bins as f64;
    frequencies
        .iter()
        .map(|&f| round_half_even(f / factor) as i64)
        .collect()
}

/// Rounds to the nearest integer, resolving ties towards the even neighbour.
pub fn round_half_even(x: f64) -> f64 {
    let rounded = x.round();
    if (x - x.trunc()).abs() == 0.5 {
        2.0 * (x / 2.0).round()
    } else {
        rounded
    }
}

// =============================================================================
// TIME CONVERSIONS
// =============================================================================

/// Converts a frame index to seconds.
pub fn frames_to_time(frame: usize, fps: f64) -> f64 {
    frame as f64 / fps
}

/// Converts seconds to the nearest frame index; negative times map to 0.
pub fn time_to_frames(seconds: f64, fps: f64) -> usize {
    (seconds * fps).round().max(0.0) as usize
}

fn within(frequencies: impl Iterator<Item = f64>, fmin: f64, fmax: f64) -> Vec<f64> {
    frequencies.filter(|&f| f >= fmin && f <= fmax).collect()
}

/// `num` linearly spaced values from `start` to `end`, both included.
pub(crate) fn linspace(start: f64, end: f64, num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (num - 1) as f64;
            (0..num).map(|i| start + i as f64 * step).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx_eq::assert_approx_eq;

    #[test]
    fn test_mel_round_trip() {
        for f in [20.0, 440.0, 1000.0, 8000.0] {
            assert_approx_eq!(mel_to_hz(hz_to_mel(f)), f, 1e-9);
        }
        let freqs = mel_frequencies(5, 100.0, 5000.0);
        assert_eq!(freqs.len(), 5);
        assert_approx_eq!(freqs[0], 100.0, 1e-9);
        assert_approx_eq!(freqs[4], 5000.0, 1e-9);
    }

    #[test]
    fn test_log_frequencies_are_within_range() {
        let freqs = log_frequencies(12, 30.0, 17000.0, A4);
        assert!(freqs.iter().all(|&f| (30.0..=17000.0).contains(&f)));
        assert!(freqs.windows(2).all(|w| w[0] < w[1]));
        assert!(freqs.iter().any(|&f| (f - 440.0).abs() < 1e-9));
        // one octave holds 12 bands
        let octave = log_frequencies(12, 440.0, 879.0, A4);
        assert_eq!(octave.len(), 12);
    }

    #[test]
    fn test_bark_tables() {
        assert_eq!(bark_frequencies(20.0, 15500.0, false).len(), 25);
        assert_eq!(bark_frequencies(20.0, 15500.0, true).len(), 49);
        assert_eq!(bark_frequencies(100.0, 400.0, false), vec![100.0, 200.0, 300.0, 400.0]);
        assert_approx_eq!(bark_to_hz(hz_to_bark(1000.0)), 1000.0, 1e-9);
    }

    #[test]
    fn test_midi_conversions() {
        assert_approx_eq!(midi_to_hz(69.0, A4), 440.0, 1e-12);
        assert_approx_eq!(hz_to_midi(880.0, A4), 81.0, 1e-12);
        assert_approx_eq!(erb_to_hz(hz_to_erb(500.0)), 500.0, 1e-9);
    }

    #[test]
    fn test_bins_round_half_to_even() {
        assert_eq!(round_half_even(2.5), 2.0);
        assert_eq!(round_half_even(3.5), 4.0);
        assert_eq!(round_half_even(-2.5), -2.0);
        assert_eq!(round_half_even(2.4), 2.0);
        // 10 Hz bins: 25 Hz lies exactly between bins 2 and 3
        assert_eq!(frequencies_to_bins(&[25.0, 36.0], 50, 1000.0), vec![2, 4]);
    }

    #[test]
    fn test_time_conversions() {
        assert_eq!(frames_to_time(50, 100.0), 0.5);
        assert_eq!(time_to_frames(0.504, 100.0), 50);
        assert_eq!(time_to_frames(-1.0, 100.0), 0);
        assert_eq!(fft_frequencies(4, 8.0), vec![0.0, 1.0, 2.0, 3.0]);
    }
}
