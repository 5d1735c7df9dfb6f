// Correctness and logic
#![warn(clippy::unit_cmp)] // Detects comparing unit types
#![warn(clippy::match_same_arms)]
// Duplicate match arms

// Performance-focused
#![warn(clippy::inefficient_to_string)] // `format!("{}", x)` vs `x.to_string()`
#![warn(clippy::map_clone)] // Cloning inside `map()` unnecessarily
#![warn(clippy::unnecessary_to_owned)] // Detects redundant `.to_owned()` or `.clone()`
#![warn(clippy::large_stack_arrays)] // Helps avoid stack overflows
#![warn(clippy::needless_collect)] // Avoids `.collect().iter()` chains

// Style and idiomatic Rust
#![warn(clippy::redundant_clone)] // Detects unnecessary `.clone()`
#![warn(clippy::identity_op)] // e.g., `x + 0`, `x * 1`
#![warn(clippy::needless_return)] // Avoids `return` at the end of functions
#![warn(clippy::let_unit_value)] // Avoids binding `()` to variables
#![warn(clippy::manual_map)] // Use `.map()` instead of manual `match`
#![warn(clippy::unwrap_used)] // Avoids using `unwrap()`

// Maintainability
#![warn(clippy::missing_panics_doc)] // Docs for functions that might panic
#![warn(clippy::missing_const_for_fn)] // Suggests making eligible functions `const`
#![deny(missing_docs)] // Documentation is a must for release

//! # AudioEvents
//!
//! Onset and beat extraction for Rust: signals are cut into frames, turned
//! into (optionally filtered) magnitude spectrograms, reduced to onset
//! detection functions, and finally converted into event times by peak
//! picking or tempo-aware beat alignment.
//!
//! ## Installation
//!
//! ```toml
//! [dependencies]
//! audio_events = "0.1.0"
//! ```
//!
//! ## Features
//!
//! - `batch-processing`: ensembles of external activation models (on by default)
//! - `parallel-processing`: rayon thread pools for batches and for the
//!   per-phase beat search (on by default, implies `batch-processing`)
//!
//! ## Pipeline
//!
//! | Stage | Type |
//! |-------|------|
//! | samples | [`Signal`] |
//! | frames | [`FramedSignal`] |
//! | spectra | [`operations::Spectrogram`], [`operations::Filterbank`] |
//! | onset detection function | [`operations::SpectralOnsetDetection`] → [`Activations`] |
//! | events | [`operations::OnsetDetector`], [`operations::BeatTracker`] → [`EventSequence`] |
//!
//! Every stage borrows the previous one and caches what it computes, so
//! asking a spectrogram for its positive difference twice runs the FFT once.
//!
//! ## Error Handling
//!
//! ```rust
//! use audio_events::{AudioEventError, AudioEventResult, ParameterError};
//!
//! let result: AudioEventResult<()> = Err(AudioEventError::Parameter(
//!     ParameterError::invalid_value("frame_size", "must be greater than 0"),
//! ));
//!
//! match result {
//!     Ok(()) => {}
//!     Err(AudioEventError::Parameter(err)) => eprintln!("Invalid parameter: {err}"),
//!     Err(other_err) => eprintln!("Other error: {other_err}"),
//! }
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use std::time::Duration;
//!
//! use audio_events::operations::{FilterbankConfig, FrameConfig, PipelineConfig, SpectrogramConfig};
//! use audio_events::{OnsetPipeline, Signal, impulse_train};
//!
//! # fn main() -> Result<(), audio_events::AudioEventError> {
//! let signal: Signal<f32> = impulse_train(0.5, Duration::from_secs(3), 8000, 1.0)?;
//! let pipeline = OnsetPipeline::new(PipelineConfig {
//!     frames: FrameConfig::with_fps(1024, 100.0, 8000),
//!     spectrogram: SpectrogramConfig::logarithmic(),
//!     filterbank: Some(FilterbankConfig {
//!         fmax: 4000.0,
//!         ..FilterbankConfig::logarithmic(12)
//!     }),
//!     ..PipelineConfig::default()
//! })?;
//!
//! for onset in &pipeline.onsets(&signal)? {
//!     println!("onset at {onset:.3} s");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! No logging subscriber is installed; events are emitted through `tracing`.

mod error;
mod signal;

pub mod activations;
pub mod frames;
pub mod operations;
pub mod pipeline;
/// Core traits for audio processing.
pub mod traits;
pub mod utils;

#[cfg(feature = "batch-processing")]
pub mod batch;

pub use crate::activations::{
    Activations, EventSequence, combine_events, load_events, load_events_file, quantize_events,
    write_events, write_events_file,
};
pub use crate::error::{AudioEventError, AudioEventResult, LayoutError, ParameterError};
pub use crate::frames::{FrameIter, FramedSignal};
pub use crate::pipeline::OnsetPipeline;
pub use crate::signal::Signal;
pub use crate::traits::AudioSample;
pub use crate::utils::{
    audio_math::{
        fft_frequencies, frames_to_time, hz_to_bark, hz_to_mel, hz_to_midi, mel_to_hz, midi_to_hz,
        time_to_frames,
    },
    generation::{impulse_train, impulses, sine_wave},
};

#[cfg(feature = "batch-processing")]
pub use crate::batch::{ActivationModel, BatchError, Executor};
