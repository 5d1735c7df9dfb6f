//! Activation curves, detected events and their persisted formats.
//!
//! [`Activations`] is the interchange artifact between the analysis stages and
//! the decision stages (peak picking, tempo estimation, beat alignment). It is
//! also what external models produce. [`EventSequence`] is the terminal output:
//! a strictly increasing list of timestamps in seconds.
//!
//! # Formats
//!
//! - Binary activations are the raw native-endian `f64` values, nothing else.
//!   The frame rate is not stored and must be supplied when loading.
//! - Text activations hold the values with a fixed number of decimals, either
//!   one per line or joined by a delimiter.
//! - Event files hold one timestamp per line. When loading, only the first
//!   whitespace-separated column of every non-empty line is read.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use ndarray::Array1;

use crate::operations::types::TextFormat;
use crate::{AudioEventError, AudioEventResult, LayoutError, ParameterError};

/// An activation curve sampled at `fps` frames per second.
#[derive(Debug, Clone, PartialEq)]
pub struct Activations {
    values: Array1<f64>,
    fps: f64,
}

impl Activations {
    /// Creates an activation curve.
    ///
    /// # Errors
    /// Returns a parameter error if `fps` is not a positive finite number.
    pub fn new(values: Array1<f64>, fps: f64) -> AudioEventResult<Self> {
        if !(fps.is_finite() && fps > 0.0) {
            return Err(ParameterError::invalid_value(
                "fps",
                format!("must be a finite value greater than 0, got {fps}"),
            )
            .into());
        }
        Ok(Self { values, fps })
    }

    /// The activation values.
    pub fn values(&self) -> &Array1<f64> {
        &self.values
    }

    /// Consumes the curve and returns its values.
    pub fn into_values(self) -> Array1<f64> {
        self.values
    }

    /// Frame rate in frames per second.
    pub const fn fps(&self) -> f64 {
        self.fps
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the curve has no frames.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Duration covered by the curve in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.values.len() as f64 / self.fps
    }

    /// Writes the values as raw native-endian `f64` bytes.
    ///
    /// # Errors
    /// Returns an I/O error if writing fails.
    pub fn save_binary<W: Write>(&self, mut writer: W) -> AudioEventResult<()> {
        let values = self.values.to_vec();
        writer.write_all(bytemuck::cast_slice(&values))?;
        writer.flush()?;
        Ok(())
    }

    /// Reads raw native-endian `f64` bytes until the end of `reader`.
    ///
    /// # Errors
    /// Returns an I/O error if reading fails, a layout error if the byte count
    /// is not a multiple of 8, or a parameter error for an invalid `fps`.
    pub fn load_binary<R: Read>(mut reader: R, fps: f64) -> AudioEventResult<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let width = size_of::<f64>();
        if bytes.len() % width != 0 {
            return Err(LayoutError::shape_mismatch(
                "load_binary",
                format!("a multiple of {width} bytes"),
                bytes.len(),
            )
            .into());
        }
        let mut values = vec![0.0f64; bytes.len() / width];
        bytemuck::cast_slice_mut::<f64, u8>(&mut values).copy_from_slice(&bytes);
        Self::new(Array1::from(values), fps)
    }

    /// Writes the values as text.
    ///
    /// # Errors
    /// Returns a parameter error for an invalid format or an I/O error if
    /// writing fails.
    pub fn save_text<W: Write>(&self, mut writer: W, format: &TextFormat) -> AudioEventResult<()> {
        format.validate()?;
        let precision = format.precision;
        match &format.delimiter {
            None => {
                for value in &self.values {
                    writeln!(writer, "{value:.precision$}")?;
                }
            }
            Some(delimiter) => {
                let line = self
                    .values
                    .iter()
                    .map(|value| format!("{value:.precision$}"))
                    .collect::<Vec<_>>()
                    .join(delimiter);
                writeln!(writer, "{line}")?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    /// Reads text values; every value on every non-empty line is appended in
    /// order.
    ///
    /// # Errors
    /// Returns a parse error naming the offending line, an I/O error if
    /// reading fails, or a parameter error for an invalid format or `fps`.
    pub fn load_text<R: BufRead>(reader: R, fps: f64, format: &TextFormat) -> AudioEventResult<Self> {
        format.validate()?;
        let mut values = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let tokens: Vec<&str> = match &format.delimiter {
                Some(delimiter) => line.split(delimiter.as_str()).map(str::trim).collect(),
                None => line.split_whitespace().collect(),
            };
            for token in tokens.into_iter().filter(|t| !t.is_empty()) {
                values.push(parse_value(token, index + 1)?);
            }
        }
        Self::new(Array1::from(values), fps)
    }

    /// Saves binary activations to `path`.
    ///
    /// # Errors
    /// See [`save_binary`](Self::save_binary).
    pub fn save_binary_file(&self, path: impl AsRef<Path>) -> AudioEventResult<()> {
        self.save_binary(BufWriter::new(File::create(path)?))
    }

    /// Loads binary activations from `path`.
    ///
    /// # Errors
    /// See [`load_binary`](Self::load_binary).
    pub fn load_binary_file(path: impl AsRef<Path>, fps: f64) -> AudioEventResult<Self> {
        Self::load_binary(BufReader::new(File::open(path)?), fps)
    }

    /// Saves text activations to `path`.
    ///
    /// # Errors
    /// See [`save_text`](Self::save_text).
    pub fn save_text_file(&self, path: impl AsRef<Path>, format: &TextFormat) -> AudioEventResult<()> {
        self.save_text(BufWriter::new(File::create(path)?), format)
    }

    /// Loads text activations from `path`.
    ///
    /// # Errors
    /// See [`load_text`](Self::load_text).
    pub fn load_text_file(
        path: impl AsRef<Path>,
        fps: f64,
        format: &TextFormat,
    ) -> AudioEventResult<Self> {
        Self::load_text(BufReader::new(File::open(path)?), fps, format)
    }
}

fn parse_value(token: &str, line: usize) -> AudioEventResult<f64> {
    token
        .parse::<f64>()
        .map_err(|e| AudioEventError::parse(line, format!("invalid number '{token}': {e}")))
}

/// Strictly increasing event timestamps in seconds.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventSequence {
    times: Vec<f64>,
}

impl EventSequence {
    /// An empty sequence.
    pub const fn new() -> Self {
        Self { times: Vec::new() }
    }

    /// Builds a sequence from timestamps that must already be strictly
    /// increasing and finite.
    ///
    /// # Errors
    /// Returns a parameter error for unordered, duplicate or non-finite
    /// timestamps.
    pub fn from_times(times: Vec<f64>) -> AudioEventResult<Self> {
        if times.iter().any(|t| !t.is_finite()) {
            return Err(ParameterError::invalid_value("times", "timestamps must be finite").into());
        }
        if times.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ParameterError::invalid_value(
                "times",
                "timestamps must be strictly increasing",
            )
            .into());
        }
        Ok(Self { times })
    }

    /// Builds a sequence from arbitrary timestamps by sorting them and
    /// dropping duplicates and non-finite values.
    pub fn from_unsorted(mut times: Vec<f64>) -> Self {
        times.retain(|t| t.is_finite());
        times.sort_by(f64::total_cmp);
        times.dedup();
        Self { times }
    }

    /// The timestamps.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Consumes the sequence and returns its timestamps.
    pub fn into_times(self) -> Vec<f64> {
        self.times
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Returns true if there are no events.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Iterates over the timestamps.
    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.times.iter()
    }

    /// Intervals between consecutive events.
    pub fn intervals(&self) -> Vec<f64> {
        self.times.windows(2).map(|w| w[1] - w[0]).collect()
    }
}

impl<'a> IntoIterator for &'a EventSequence {
    type Item = &'a f64;
    type IntoIter = std::slice::Iter<'a, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.times.iter()
    }
}

/// Merges events closer than `delta` seconds into their running mean.
///
/// Each event within `delta` of the current (possibly already merged) event
/// replaces it by the average of the two.
pub fn combine_events(events: &[f64], delta: f64) -> Vec<f64> {
    let delta = delta + 1e-12;
    let Some((&first, rest)) = events.split_first() else {
        return Vec::new();
    };
    let mut combined = vec![first];
    for &right in rest {
        match combined.last_mut() {
            Some(left) if right - *left <= delta => *left = 0.5 * (right + *left),
            _ => combined.push(right),
        }
    }
    combined
}

/// Quantizes events to a frame grid: frames holding an event are 1, all
/// others 0.
///
/// Without `length` the grid ends at the last event. Events outside the grid
/// are ignored.
pub fn quantize_events(events: &[f64], fps: f64, length: Option<usize>) -> Array1<f64> {
    let frame = |t: f64| (t * fps).round();
    let length = length.unwrap_or_else(|| {
        events
            .iter()
            .copied()
            .reduce(f64::max)
            .map_or(0, |last| (frame(last) + 1.0).max(0.0) as usize)
    });
    let mut quantized = Array1::<f64>::zeros(length);
    for &event in events {
        let index = frame(event);
        if index >= 0.0 && (index as usize) < length {
            quantized[index as usize] = 1.0;
        }
    }
    quantized
}

/// Writes one timestamp per line with the given number of decimals.
///
/// # Errors
/// Returns an I/O error if writing fails.
pub fn write_events<W: Write>(
    mut writer: W,
    events: &EventSequence,
    precision: usize,
) -> AudioEventResult<()> {
    for time in events {
        writeln!(writer, "{time:.precision$}")?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads the first column of every non-empty line as a timestamp.
///
/// The result is sorted and free of duplicates.
///
/// # Errors
/// Returns a parse error naming the offending line or an I/O error if
/// reading fails.
pub fn load_events<R: BufRead>(reader: R) -> AudioEventResult<EventSequence> {
    let mut times = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if let Some(token) = line.split_whitespace().next() {
            times.push(parse_value(token, index + 1)?);
        }
    }
    Ok(EventSequence::from_unsorted(times))
}

/// Writes events to `path`.
///
/// # Errors
/// See [`write_events`].
pub fn write_events_file(
    path: impl AsRef<Path>,
    events: &EventSequence,
    precision: usize,
) -> AudioEventResult<()> {
    write_events(BufWriter::new(File::create(path)?), events, precision)
}

/// Loads events from `path`.
///
/// # Errors
/// See [`load_events`].
pub fn load_events_file(path: impl AsRef<Path>) -> AudioEventResult<EventSequence> {
    load_events(BufReader::new(File::open(path)?))
}
