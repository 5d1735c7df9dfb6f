//! Spectral analysis and event detection stages.
//!
//! Each stage is a focused module that consumes the output of the previous
//! one. Configuration structs for every stage live in [`types`].
//!
//! ## Module Organization
//!
//! - [`types`] - Configuration structs and enums
//! - [`window`] - Window functions
//! - [`filterbank`] - Frequency filterbanks
//! - [`spectrogram`] - STFT, magnitudes, phases and their derivatives
//! - [`hpss`] - Harmonic/percussive separation
//! - [`onset_detection`] - Onset detection functions
//! - [`peak_picking`] - Peak picking and onset detection in seconds
//! - [`tempo`] - Dominant interval estimation
//! - [`beats`] - Beat detection and tracking
//!
//! ## Quick Start
//!
//! ```rust
//! use audio_events::operations::{PeakPickingConfig, peak_picking};
//! use ndarray::array;
//!
//! let activations = array![0.0, 1.0, 3.0, 2.0, 0.0, 0.0, 5.0, 0.0];
//! let peaks = peak_picking(activations.view(), &PeakPickingConfig::new(0.0));
//! assert_eq!(peaks, vec![2, 6]);
//! ```

pub mod types;
pub mod window;

pub mod beats;
pub mod filterbank;
pub mod hpss;
pub mod onset_detection;
pub mod peak_picking;
pub mod spectrogram;
pub mod tempo;

pub use beats::{BeatTracker, detect_beats};
pub use filterbank::Filterbank;
pub use hpss::HpssComponents;
pub use onset_detection::SpectralOnsetDetection;
pub use peak_picking::{OnsetDetector, peak_picking};
pub use spectrogram::Spectrogram;
pub use tempo::TempoEstimator;

// Re-export supporting types
pub use types::{
    AcfNormalization, BeatTrackingConfig, CombineMode, DiffLag, FilterShape, FilterbankConfig,
    FilterbankKind, FrameConfig, FrameCount, HpssConfig, LogCompression, MaskType,
    OnsetDetectorConfig, OnsetFunction, Origin, PeakPickingConfig, PipelineConfig, SignalOptions,
    Smoothing, SpectrogramConfig, TempoConfig, TextFormat, WhiteningConfig, WindowType,
};
