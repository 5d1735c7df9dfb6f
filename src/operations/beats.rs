//! Beat detection by interval-driven alignment of activation peaks.
//!
//! Given a dominant interval `τ`, every starting phase in `0..τ` seeds a chain
//! of beats: each beat is searched in a Hamming-weighted window around the
//! previous beat plus `τ`. The phase whose chain collects the most activation
//! wins. [`BeatTracker::track`] repeats this locally, re-estimating the
//! interval in a window around the current position.

use ndarray::{Array1, ArrayView1};
#[cfg(feature = "parallel-processing")]
use rayon::prelude::*;

use crate::activations::{Activations, EventSequence};
use crate::operations::tempo::TempoEstimator;
use crate::operations::types::BeatTrackingConfig;
use crate::operations::window::hamming;
use crate::AudioEventResult;

/// Search state shared by all phases of one beat detection run.
struct BeatChain<'a> {
    activations: ArrayView1<'a, f64>,
    interval: usize,
    look_aside: usize,
    weights: Array1<f64>,
}

impl BeatChain<'_> {
    /// Walks the chain seeded at `phase`, reporting every beat to `visit`,
    /// and returns the summed activation at the beats.
    fn run(&self, phase: usize, mut visit: impl FnMut(usize)) -> f64 {
        let n = self.activations.len();
        let mut score = 0.0;
        let mut previous: Option<usize> = None;
        let mut center = phase;

        while center < n {
            let start = center as i64 - self.look_aside as i64;
            let lower = previous.map_or(0, |p| p as i64 + 1).max(0);
            let mut best: Option<usize> = None;
            let mut best_value = 0.0;
            for (k, &weight) in self.weights.iter().enumerate() {
                let index = start + k as i64;
                if index < lower || index >= n as i64 {
                    continue;
                }
                let value = self.activations[index as usize] * weight;
                if value > best_value {
                    best_value = value;
                    best = Some(index as usize);
                }
            }
            let position = best.unwrap_or(center);
            score += self.activations[position];
            visit(position);
            previous = Some(position);
            center = position + self.interval;
        }
        score
    }

    fn score(&self, phase: usize) -> f64 {
        self.run(phase, |_| {})
    }

    #[cfg(feature = "parallel-processing")]
    fn phase_scores(&self) -> Vec<f64> {
        (0..self.interval)
            .into_par_iter()
            .map(|phase| self.score(phase))
            .collect()
    }

    #[cfg(not(feature = "parallel-processing"))]
    fn phase_scores(&self) -> Vec<f64> {
        (0..self.interval).map(|phase| self.score(phase)).collect()
    }
}

/// Frame positions of the beats in `activations` for a fixed `interval`.
///
/// `look_aside` is the fraction of the interval searched on either side of a
/// predicted beat, truncated to whole frames but at least one frame.
/// Positions are strictly increasing.
pub fn detect_beats(activations: ArrayView1<'_, f64>, interval: usize, look_aside: f64) -> Vec<usize> {
    if activations.is_empty() || interval == 0 {
        return Vec::new();
    }
    let look_aside = ((look_aside * interval as f64).floor() as usize).max(1);
    let chain = BeatChain {
        activations,
        interval,
        look_aside,
        weights: hamming(2 * look_aside),
    };

    let scores = chain.phase_scores();
    let mut best_phase = 0;
    for (phase, &score) in scores.iter().enumerate() {
        if score > scores[best_phase] {
            best_phase = phase;
        }
    }

    let mut positions = Vec::with_capacity(activations.len() / interval + 1);
    chain.run(best_phase, |position| positions.push(position));
    tracing::trace!(interval, best_phase, num_beats = positions.len(), "beat chain");
    positions
}

/// Beat detection and tracking on beat activation curves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatTracker {
    config: BeatTrackingConfig,
    tempo: TempoEstimator,
}

impl BeatTracker {
    /// Creates a tracker.
    ///
    /// # Errors
    /// Returns a parameter error for invalid tempo limits, a look-aside
    /// outside `[0, 0.5)` or a non-positive look-ahead.
    pub fn new(config: BeatTrackingConfig) -> AudioEventResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            tempo: TempoEstimator::new(config.tempo)?,
        })
    }

    /// The tracker configuration.
    pub const fn config(&self) -> &BeatTrackingConfig {
        &self.config
    }

    /// Beats aligned to a single interval estimated over the whole curve.
    ///
    /// The smoothed curve drives the interval estimate; beats are placed on
    /// the raw curve. Silent or too short curves yield no beats.
    pub fn detect(&self, activations: &Activations) -> AudioEventResult<EventSequence> {
        let fps = activations.fps();
        let Some(interval) = self.tempo.estimate_interval(activations.values().view(), fps) else {
            tracing::warn!(num_frames = activations.len(), "no dominant interval, no beats");
            return Ok(EventSequence::new());
        };
        let positions = detect_beats(activations.values().view(), interval, self.config.look_aside);
        tracing::debug!(
            interval,
            bpm = 60.0 * fps / interval as f64,
            num_beats = positions.len(),
            "beats detected"
        );
        to_events(&positions, fps)
    }

    /// Beats tracked with a local interval estimated `look_ahead` seconds
    /// around each position.
    pub fn track(&self, activations: &Activations) -> AudioEventResult<EventSequence> {
        let fps = activations.fps();
        let values = activations.values();
        let n = values.len() as i64;
        let half_window = (self.config.look_ahead * fps).round().max(0.0) as i64;
        let mut window = Array1::<f64>::zeros((2 * half_window) as usize);

        let mut beats: Vec<usize> = Vec::new();
        let mut position: i64 = 0;
        while position < n {
            let start = position - half_window;
            window.indexed_iter_mut().for_each(|(k, slot)| {
                let index = start + k as i64;
                *slot = if (0..n).contains(&index) { values[index as usize] } else { 0.0 };
            });

            let Some(interval) = self.tempo.estimate_interval(window.view(), fps) else {
                tracing::warn!(position, "silent tracking window skipped");
                position += half_window.max(1);
                continue;
            };
            let nearest = detect_beats(window.view(), interval, self.config.look_aside)
                .into_iter()
                .map(|p| p as i64 + start)
                .min_by_key(|&p| (p - position).abs());
            let Some(candidate) = nearest else {
                position += half_window.max(1);
                continue;
            };

            if (0..n).contains(&candidate) && beats.last().is_none_or(|&last| candidate > last as i64) {
                beats.push(candidate as usize);
            }
            position = (candidate + interval as i64).max(position + 1);
        }
        tracing::debug!(num_beats = beats.len(), "beats tracked");
        to_events(&beats, fps)
    }
}

/// Converts increasing frame positions to seconds, dropping non-positive times.
fn to_events(positions: &[usize], fps: f64) -> AudioEventResult<EventSequence> {
    let times = positions
        .iter()
        .map(|&p| p as f64 / fps)
        .filter(|&t| t > 0.0)
        .collect();
    EventSequence::from_times(times)
}
