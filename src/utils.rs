//! Frequency scale conversions and synthetic signal generators.

pub mod audio_math;
pub mod generation;

pub use audio_math::*;
