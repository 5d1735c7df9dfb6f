//! Sample type abstraction shared by signals, frames and spectrograms.
//!
//! Analysis always runs in `f64`; the sample type only determines how raw
//! buffers are stored and how the analysis window is scaled so that integer
//! and floating-point inputs produce comparable spectra.

use std::fmt::{Debug, Display};

use bytemuck::NoUninit;
use num_traits::{NumCast, ToPrimitive, Zero};

/// Core trait defining the interface for audio sample types.
///
/// # Supported Types
/// - `i16`: 16-bit signed integer samples
/// - `i32`: 32-bit signed integer samples
/// - `f32`: 32-bit floating-point samples (nominally -1.0 to 1.0)
/// - `f64`: 64-bit floating-point samples
pub trait AudioSample:
    Copy
    + Default
    + Display
    + Debug
    + Send
    + Sync
    + PartialEq
    + PartialOrd
    + NoUninit
    + NumCast
    + ToPrimitive
    + Zero
    + 'static
{
    /// Magnitude of a full-scale sample.
    ///
    /// Windows are divided by this value before the transform, so an `i16`
    /// full-scale sine and an `f32` full-scale sine yield the same spectrum.
    const MAX_AMPLITUDE: f64;

    /// Converts the sample to `f64` without rescaling.
    #[inline]
    fn as_f64(self) -> f64 {
        self.to_f64().unwrap_or(0.0)
    }

    /// Converts an `f64` back to the sample type.
    ///
    /// Integer types round to the nearest value and saturate at their bounds.
    fn from_f64(value: f64) -> Self;
}

impl AudioSample for i16 {
    const MAX_AMPLITUDE: f64 = i16::MAX as f64;

    #[inline]
    fn from_f64(value: f64) -> Self {
        value.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16
    }
}

impl AudioSample for i32 {
    const MAX_AMPLITUDE: f64 = i32::MAX as f64;

    #[inline]
    fn from_f64(value: f64) -> Self {
        value.round().clamp(i32::MIN as f64, i32::MAX as f64) as i32
    }
}

impl AudioSample for f32 {
    const MAX_AMPLITUDE: f64 = 1.0;

    #[inline]
    fn from_f64(value: f64) -> Self {
        value as f32
    }
}

impl AudioSample for f64 {
    const MAX_AMPLITUDE: f64 = 1.0;

    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_conversion_saturates() {
        assert_eq!(i16::from_f64(40000.0), i16::MAX);
        assert_eq!(i16::from_f64(-40000.0), i16::MIN);
        assert_eq!(i16::from_f64(12.6), 13);
        assert_eq!(i32::from_f64(-2.4), -2);
    }

    #[test]
    fn test_float_round_trip() {
        assert_eq!(f32::from_f64(0.25).as_f64(), 0.25);
        assert_eq!(f64::from_f64(-0.5), -0.5);
        assert_eq!(<f32 as AudioSample>::MAX_AMPLITUDE, 1.0);
        assert_eq!(<i16 as AudioSample>::MAX_AMPLITUDE, 32767.0);
    }
}
