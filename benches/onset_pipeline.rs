//! Timing benchmark for the onset pipeline.
//!
//! Measures activation computation, onset detection and beat detection on
//! click tracks of increasing length at 44.1 kHz.

use audio_events::operations::{
    FilterbankConfig, FrameConfig, OnsetFunction, PipelineConfig, SpectrogramConfig,
};
use audio_events::{OnsetPipeline, Signal, impulse_train};
use std::time::{Duration, Instant};

const SAMPLE_RATE: u32 = 44100;

fn pipeline() -> OnsetPipeline {
    let config = PipelineConfig {
        frames: FrameConfig::with_fps(2048, 100.0, SAMPLE_RATE),
        spectrogram: SpectrogramConfig::logarithmic(),
        filterbank: Some(FilterbankConfig::logarithmic(12)),
        onset_function: OnsetFunction::superflux(),
        ..PipelineConfig::default()
    };
    match OnsetPipeline::new(config) {
        Ok(pipeline) => pipeline,
        Err(e) => panic!("invalid benchmark configuration: {e}"),
    }
}

/// Runs `f` a few times after a warm-up and prints timing statistics.
fn time_runs<R>(label: &str, mut f: impl FnMut() -> R) {
    for _ in 0..2 {
        let _ = f();
    }

    let num_runs = 10;
    let mut times: Vec<f64> = (0..num_runs)
        .map(|_| {
            let start = Instant::now();
            let _ = f();
            start.elapsed().as_secs_f64() * 1000.0
        })
        .collect();

    times.sort_by(f64::total_cmp);
    let mean = times.iter().sum::<f64>() / times.len() as f64;
    let std = (times.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / times.len() as f64).sqrt();
    println!(
        "  {label:<12} {mean:8.2}ms ± {std:.2}ms (median: {:.2}ms, range: {:.2}-{:.2}ms)",
        times[times.len() / 2],
        times[0],
        times[times.len() - 1]
    );
}

fn benchmark_duration(pipeline: &OnsetPipeline, seconds: f64) {
    let signal: Signal<f32> =
        match impulse_train(0.5, Duration::from_secs_f64(seconds), SAMPLE_RATE, 0.8) {
            Ok(signal) => signal,
            Err(e) => panic!("signal generation failed: {e}"),
        };
    println!("{seconds:.1}s click track, {} samples", signal.num_samples());

    time_runs("activations", || pipeline.activations(&signal));
    time_runs("onsets", || pipeline.onsets(&signal));
    time_runs("beats", || pipeline.beats(&signal));

    if let Ok(onsets) = pipeline.onsets(&signal) {
        println!("  {} onsets detected", onsets.len());
    }
    println!();
}

fn main() {
    println!("Onset Pipeline Benchmark");
    println!("========================");
    if cfg!(feature = "parallel-processing") {
        println!("Parallel beat phase search enabled");
    }
    println!();

    let pipeline = pipeline();
    for seconds in [1.0, 10.0, 30.0] {
        benchmark_duration(&pipeline, seconds);
    }
}
