//! Signal to events in one call.
//!
//! [`OnsetPipeline`] wires the stages together according to a
//! [`PipelineConfig`]: framing, an optionally filtered spectrogram, an onset
//! detection function, and then peak picking or beat detection on the
//! resulting activation curve.

use ndarray::Array2;

use crate::operations::types::PipelineConfig;
use crate::operations::{
    BeatTracker, Filterbank, OnsetDetector, SpectralOnsetDetection, Spectrogram,
};
use crate::{Activations, AudioEventResult, AudioSample, EventSequence, FramedSignal, Signal};

/// Onset and beat extraction with a fixed configuration.
#[derive(Debug, Clone)]
pub struct OnsetPipeline {
    config: PipelineConfig,
    detector: OnsetDetector,
    tracker: BeatTracker,
}

impl OnsetPipeline {
    /// Validates every stage of `config` and builds the pipeline.
    ///
    /// # Errors
    /// Returns the first parameter error found in any stage.
    pub fn new(config: PipelineConfig) -> AudioEventResult<Self> {
        config.validate()?;
        Ok(Self {
            detector: OnsetDetector::new(config.onsets)?,
            tracker: BeatTracker::new(config.beats)?,
            config,
        })
    }

    /// The pipeline configuration.
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Wraps raw `(num_channels, num_samples)` data in a signal, applying the
    /// configured signal options.
    pub fn prepare<T: AudioSample>(
        &self,
        data: Array2<T>,
        sample_rate: u32,
    ) -> AudioEventResult<Signal<T>> {
        Signal::with_options(data, sample_rate, &self.config.signal)
    }

    /// Onset detection function of `signal`.
    ///
    /// # Errors
    /// Returns a layout error for multi-channel signals and for phase-based
    /// functions combined with a filterbank.
    pub fn activations<T: AudioSample>(&self, signal: &Signal<T>) -> AudioEventResult<Activations> {
        let frames = FramedSignal::new(signal, &self.config.frames)?;
        let spectrogram = match &self.config.filterbank {
            Some(filterbank) => {
                let fft_size = self
                    .config
                    .spectrogram
                    .fft_size
                    .unwrap_or(frames.frame_size());
                let filterbank = Filterbank::from_config(
                    fft_size / 2,
                    f64::from(signal.sample_rate()),
                    filterbank,
                )?;
                Spectrogram::with_filterbank(frames, &self.config.spectrogram, filterbank)?
            }
            None => Spectrogram::new(frames, &self.config.spectrogram)?,
        };
        SpectralOnsetDetection::new(&spectrogram).compute(self.config.onset_function)
    }

    /// Onset times of `signal` in seconds.
    pub fn onsets<T: AudioSample>(&self, signal: &Signal<T>) -> AudioEventResult<EventSequence> {
        self.detector.detect(&self.activations(signal)?)
    }

    /// Beat times of `signal` in seconds, aligned to the global tempo.
    pub fn beats<T: AudioSample>(&self, signal: &Signal<T>) -> AudioEventResult<EventSequence> {
        self.tracker.detect(&self.activations(signal)?)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::operations::types::{
        FilterbankConfig, FrameConfig, OnsetDetectorConfig, OnsetFunction, SpectrogramConfig,
    };
    use crate::utils::generation::{impulse_train, sine_wave};

    fn click_config() -> PipelineConfig {
        PipelineConfig {
            frames: FrameConfig::with_fps(256, 100.0, 1000),
            spectrogram: SpectrogramConfig::logarithmic(),
            filterbank: Some(FilterbankConfig {
                fmin: 30.0,
                fmax: 480.0,
                ..FilterbankConfig::logarithmic(12)
            }),
            onset_function: OnsetFunction::SpectralFlux,
            onsets: OnsetDetectorConfig {
                threshold: 1.0,
                pre_avg: 0.0,
                post_avg: 0.0,
                pre_max: 0.03,
                post_max: 0.03,
                combine: 0.03,
                ..OnsetDetectorConfig::new()
            },
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_clicks_are_detected_near_their_positions() {
        let signal: Signal<f64> =
            impulse_train(0.5, Duration::from_secs_f64(2.5), 1000, 1.0).unwrap();
        let pipeline = OnsetPipeline::new(click_config()).unwrap();

        let activations = pipeline.activations(&signal).unwrap();
        assert_eq!(activations.fps(), 100.0);
        assert!(activations.values().iter().all(|&v| v >= 0.0));

        let onsets = pipeline.onsets(&signal).unwrap();
        assert_eq!(onsets.len(), 4);
        for (k, &t) in onsets.iter().enumerate() {
            let click = 0.5 * (k + 1) as f64;
            assert!((t - click).abs() < 0.06, "onset {t} too far from {click}");
        }
        assert!(onsets.intervals().iter().all(|&gap| gap > 0.01));
    }

    #[test]
    fn test_default_peak_picking_on_clicks() {
        let signal: Signal<f64> =
            impulse_train(0.5, Duration::from_secs_f64(5.0), 1000, 1.0).unwrap();
        let pipeline = OnsetPipeline::new(PipelineConfig {
            frames: FrameConfig::with_fps(256, 100.0, 1000),
            spectrogram: SpectrogramConfig::logarithmic(),
            filterbank: Some(FilterbankConfig::new()),
            onset_function: OnsetFunction::SpectralFlux,
            onsets: OnsetDetectorConfig::default(),
            ..PipelineConfig::default()
        })
        .unwrap();

        let onsets = pipeline.onsets(&signal).unwrap();
        // the click at 5.0 s lies one sample past the end
        assert_eq!(onsets.len(), 9);
        for (k, &t) in onsets.iter().enumerate() {
            let click = 0.5 * (k + 1) as f64;
            assert!((t - click).abs() <= 0.05, "onset {t} too far from {click}");
        }
    }

    #[test]
    fn test_integer_samples_give_the_same_onsets() {
        let float: Signal<f64> =
            impulse_train(0.5, Duration::from_secs_f64(2.5), 1000, 0.5).unwrap();
        let int: Signal<i16> =
            impulse_train(0.5, Duration::from_secs_f64(2.5), 1000, 0.5).unwrap();
        let pipeline = OnsetPipeline::new(click_config()).unwrap();
        assert_eq!(
            pipeline.onsets(&float).unwrap().len(),
            pipeline.onsets(&int).unwrap().len()
        );
    }

    #[test]
    fn test_steady_tone_has_no_onsets_after_attack() {
        let signal: Signal<f32> =
            sine_wave(220.0, Duration::from_secs_f64(2.0), 1000, 0.5).unwrap();
        let pipeline = OnsetPipeline::new(click_config()).unwrap();
        let onsets = pipeline.onsets(&signal).unwrap();
        assert!(onsets.iter().all(|&t| t < 0.2));
    }

    #[test]
    fn test_phase_function_rejects_filterbank() {
        let signal: Signal<f64> =
            impulse_train(0.5, Duration::from_secs_f64(1.0), 1000, 1.0).unwrap();
        let pipeline = OnsetPipeline::new(PipelineConfig {
            onset_function: OnsetFunction::ComplexDomain,
            ..click_config()
        })
        .unwrap();
        assert!(pipeline.activations(&signal).is_err());
    }

    #[test]
    fn test_multichannel_input_needs_downmix() {
        let data = Array2::<f64>::zeros((2, 1000));
        let pipeline = OnsetPipeline::new(click_config()).unwrap();
        let stereo = pipeline.prepare(data.clone(), 1000).unwrap();
        assert!(pipeline.activations(&stereo).is_err());

        let mut config = click_config();
        config.signal.downmix = true;
        let pipeline = OnsetPipeline::new(config).unwrap();
        let mono = pipeline.prepare(data, 1000).unwrap();
        assert!(pipeline.onsets(&mono).unwrap().is_empty());
    }

    #[test]
    fn test_click_track_beats() {
        let signal: Signal<f64> =
            impulse_train(0.5, Duration::from_secs_f64(10.0), 1000, 1.0).unwrap();
        let pipeline = OnsetPipeline::new(click_config()).unwrap();
        let beats = pipeline.beats(&signal).unwrap();
        assert!(beats.len() >= 15);
        for gap in beats.intervals() {
            assert!((gap - 0.5).abs() <= 0.1 + 1e-9, "irregular beat gap {gap}");
        }
    }

    #[test]
    fn test_invalid_stage_is_rejected() {
        let config = PipelineConfig {
            frames: FrameConfig::with_hop(0, 10.0),
            ..PipelineConfig::default()
        };
        assert!(OnsetPipeline::new(config).is_err());
    }
}
