//! Fixed-length, possibly overlapping frames over a borrowed [`Signal`].
//!
//! A [`FramedSignal`] never copies the underlying samples. Frames are cut out
//! on demand: frame `i` is centered (modulo the [`Origin`] offset) on the
//! reference sample `round(i * hop_size) + start`, and the portions of the
//! window that fall outside the signal are filled with zeros. Negative indices
//! and indices past the end are valid and simply yield more padding, which is
//! what overlapping analyses need at the signal edges.

use std::ops::Range;

use ndarray::{Array1, Array2, s};

use crate::operations::types::{FrameConfig, FrameCount, Origin};
use crate::{AudioEventResult, AudioSample, LayoutError, Signal};

/// Indexable sequence of frames over a borrowed signal.
#[derive(Debug, Clone, Copy)]
pub struct FramedSignal<'a, T: AudioSample> {
    signal: &'a Signal<T>,
    frame_size: usize,
    hop_size: f64,
    origin: i64,
    start: i64,
    first_frame: i64,
    num_frames: usize,
}

impl<'a, T: AudioSample> FramedSignal<'a, T> {
    /// Frames `signal` according to `config`.
    ///
    /// # Errors
    /// Returns a parameter error for a zero frame size or a non-positive hop size.
    pub fn new(signal: &'a Signal<T>, config: &FrameConfig) -> AudioEventResult<Self> {
        config.validate()?;
        let len = signal.num_samples() as f64;
        let num_frames = match config.num_frames {
            FrameCount::Extend => (len / config.hop_size + 1.0).floor() as usize,
            FrameCount::Normal => (len / config.hop_size).ceil() as usize,
            FrameCount::Fixed(n) => n,
        };
        tracing::debug!(
            frame_size = config.frame_size,
            hop_size = config.hop_size,
            num_frames,
            "framed signal"
        );
        Ok(Self {
            signal,
            frame_size: config.frame_size,
            hop_size: config.hop_size,
            origin: config.origin.offset(config.frame_size),
            start: config.start,
            first_frame: 0,
            num_frames,
        })
    }

    /// The underlying signal.
    pub const fn signal(&self) -> &'a Signal<T> {
        self.signal
    }

    /// Frame length in samples.
    pub const fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Hop size in samples.
    pub const fn hop_size(&self) -> f64 {
        self.hop_size
    }

    /// Resolved origin offset in samples.
    pub const fn origin(&self) -> i64 {
        self.origin
    }

    /// Number of frames exposed by [`iter`](Self::iter).
    pub const fn num_frames(&self) -> usize {
        self.num_frames
    }

    /// Same as [`num_frames`](Self::num_frames).
    pub const fn len(&self) -> usize {
        self.num_frames
    }

    /// Returns true if no frames are exposed.
    pub const fn is_empty(&self) -> bool {
        self.num_frames == 0
    }

    /// Frames per second.
    pub fn fps(&self) -> f64 {
        f64::from(self.signal.sample_rate()) / self.hop_size
    }

    /// Fraction of each frame shared with the next one.
    pub fn overlap_factor(&self) -> f64 {
        1.0 - self.hop_size / self.frame_size as f64
    }

    /// First sample covered by frame `index`; may be negative or past the end.
    pub fn frame_start(&self, index: i64) -> i64 {
        // float to int casts saturate, so far-out indices stay far outside
        let reference =
            (index.saturating_add(self.first_frame) as f64 * self.hop_size).round() as i64;
        reference
            .saturating_sub((self.frame_size / 2) as i64)
            .saturating_sub(self.origin)
            .saturating_add(self.start)
    }

    /// Frame `index` as a `(num_channels, frame_size)` array.
    pub fn frame(&self, index: i64) -> Array2<T> {
        let mut frame = Array2::zeros((self.signal.num_channels(), self.frame_size));
        if let Some((src, dst)) = self.overlap(index) {
            frame
                .slice_mut(s![.., dst])
                .assign(&self.signal.data().slice(s![.., src]));
        }
        frame
    }

    /// Frame `index` of a mono signal.
    ///
    /// # Errors
    /// Returns a layout error if the signal has more than one channel.
    pub fn mono_frame(&self, index: i64) -> AudioEventResult<Array1<T>> {
        let samples = self.signal.mono()?;
        let mut frame = Array1::zeros(self.frame_size);
        if let Some((src, dst)) = self.overlap(index) {
            frame.slice_mut(s![dst]).assign(&samples.slice(s![src]));
        }
        Ok(frame)
    }

    /// A view over the frames in `range`, sharing the same signal.
    ///
    /// Frame `j` of the result is frame `range.start + j` of `self`.
    pub fn slice(&self, range: Range<i64>) -> Self {
        Self {
            first_frame: self.first_frame.saturating_add(range.start),
            num_frames: range.end.saturating_sub(range.start).max(0) as usize,
            ..*self
        }
    }

    /// Iterates over the exposed frames.
    pub fn iter(&self) -> FrameIter<'_, 'a, T> {
        FrameIter {
            frames: self,
            index: 0,
        }
    }

    /// Ensures the signal is mono, as spectral analysis requires.
    pub(crate) fn require_mono(&self, operation: &str) -> AudioEventResult<()> {
        if !self.signal.is_mono() {
            return Err(
                LayoutError::unsupported_channels(operation, self.signal.num_channels()).into(),
            );
        }
        Ok(())
    }

    /// Source and destination ranges of the part of frame `index` that lies
    /// inside the signal, or `None` if the frame is entirely outside.
    fn overlap(&self, index: i64) -> Option<(Range<usize>, Range<usize>)> {
        let start = self.frame_start(index);
        let stop = start.saturating_add(self.frame_size as i64);
        let len = self.signal.num_samples() as i64;
        let from = start.max(0);
        let to = stop.min(len);
        if from >= to {
            return None;
        }
        let src = from as usize..to as usize;
        let dst = (from - start) as usize..(to - start) as usize;
        Some((src, dst))
    }
}

impl<T: AudioSample> FramedSignal<'_, T> {
    /// Origin preset describing this view, if it matches one.
    pub fn origin_preset(&self) -> Origin {
        match self.origin {
            0 => Origin::Centered,
            o if o == Origin::Online.offset(self.frame_size) => Origin::Online,
            o if o == Origin::Future.offset(self.frame_size) => Origin::Future,
            o => Origin::Offset(o),
        }
    }
}

/// Iterator over the frames of a [`FramedSignal`].
pub struct FrameIter<'f, 'a, T: AudioSample> {
    frames: &'f FramedSignal<'a, T>,
    index: usize,
}

impl<T: AudioSample> Iterator for FrameIter<'_, '_, T> {
    type Item = Array2<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.frames.num_frames {
            return None;
        }
        let frame = self.frames.frame(self.index as i64);
        self.index += 1;
        Some(frame)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.frames.num_frames.saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl<T: AudioSample> ExactSizeIterator for FrameIter<'_, '_, T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, array};

    fn ramp(len: usize) -> Signal<f64> {
        Signal::new_mono(Array1::from_iter((1..=len).map(|x| x as f64)), 100).unwrap()
    }

    #[test]
    fn test_every_frame_has_frame_size_samples() {
        let signal = ramp(37);
        for &(frame_size, hop_size) in &[(1, 1.0), (4, 2.0), (7, 3.5), (16, 0.75), (64, 10.0)] {
            let frames = FramedSignal::new(&signal, &FrameConfig::with_hop(frame_size, hop_size))
                .unwrap();
            for index in [-1000, -5, -1, 0, 1, 3, 36, 100, 1_000_000] {
                assert_eq!(frames.frame(index).dim(), (1, frame_size));
                assert_eq!(frames.mono_frame(index).unwrap().len(), frame_size);
            }
        }
    }

    #[test]
    fn test_extreme_indices_give_silent_frames() {
        let signal = ramp(10);
        for config in [
            FrameConfig::with_hop(4, 2.0),
            FrameConfig::online(4, 2.0),
            FrameConfig {
                origin: Origin::Future,
                ..FrameConfig::with_hop(4, 2.5)
            },
        ] {
            let frames = FramedSignal::new(&signal, &config).unwrap();
            for index in [i64::MIN, i64::MIN + 1, -(1 << 60), 1 << 60, i64::MAX - 1, i64::MAX] {
                assert_eq!(frames.frame(index), Array2::<f64>::zeros((1, 4)));
                assert_eq!(frames.mono_frame(index).unwrap().to_vec(), vec![0.0; 4]);
            }
            let shifted = frames.slice(i64::MAX - 2..i64::MAX);
            assert_eq!(shifted.num_frames(), 2);
            assert_eq!(shifted.frame(i64::MAX), Array2::<f64>::zeros((1, 4)));
            assert_eq!(shifted.frame(i64::MIN), Array2::<f64>::zeros((1, 4)));
        }
    }

    #[test]
    fn test_centered_frames_pad_both_edges() {
        let signal = ramp(10);
        let frames = FramedSignal::new(&signal, &FrameConfig::with_hop(4, 2.0)).unwrap();
        assert_eq!(frames.mono_frame(0).unwrap().to_vec(), vec![0.0, 0.0, 1.0, 2.0]);
        assert_eq!(frames.mono_frame(1).unwrap().to_vec(), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(frames.mono_frame(5).unwrap().to_vec(), vec![9.0, 10.0, 0.0, 0.0]);
        assert_eq!(frames.mono_frame(-1).unwrap().to_vec(), vec![0.0; 4]);
        assert_eq!(frames.mono_frame(9).unwrap().to_vec(), vec![0.0; 4]);
    }

    #[test]
    fn test_origin_presets_shift_the_window() {
        let signal = ramp(10);
        let online = FrameConfig::online(4, 2.0);
        let frames = FramedSignal::new(&signal, &online).unwrap();
        // window ends at the reference sample (index 2 for frame 1)
        assert_eq!(frames.mono_frame(1).unwrap().to_vec(), vec![0.0, 1.0, 2.0, 3.0]);

        let future = FrameConfig {
            origin: Origin::Future,
            ..FrameConfig::with_hop(4, 2.0)
        };
        let frames = FramedSignal::new(&signal, &future).unwrap();
        assert_eq!(frames.mono_frame(1).unwrap().to_vec(), vec![3.0, 4.0, 5.0, 6.0]);
        assert_eq!(frames.origin_preset(), Origin::Future);
    }

    #[test]
    fn test_frame_count_policies() {
        let signal = ramp(10);
        let extend = FramedSignal::new(&signal, &FrameConfig::with_hop(4, 3.0)).unwrap();
        assert_eq!(extend.num_frames(), 4);

        let normal = FrameConfig {
            num_frames: FrameCount::Normal,
            ..FrameConfig::with_hop(4, 3.0)
        };
        assert_eq!(FramedSignal::new(&signal, &normal).unwrap().num_frames(), 4);

        let normal_exact = FrameConfig {
            num_frames: FrameCount::Normal,
            ..FrameConfig::with_hop(4, 2.0)
        };
        assert_eq!(FramedSignal::new(&signal, &normal_exact).unwrap().num_frames(), 5);
        assert_eq!(
            FramedSignal::new(&signal, &FrameConfig::with_hop(4, 2.0))
                .unwrap()
                .num_frames(),
            6
        );
    }

    #[test]
    fn test_fractional_hop_rounds_reference() {
        let signal = ramp(20);
        let frames = FramedSignal::new(&signal, &FrameConfig::with_hop(2, 1.5)).unwrap();
        // frame 3: reference round(4.5) = 5, window [4, 6)
        assert_eq!(frames.mono_frame(3).unwrap().to_vec(), vec![5.0, 6.0]);
        assert_eq!(frames.fps(), 100.0 / 1.5);
    }

    #[test]
    fn test_slice_shares_signal_and_offsets_indices() {
        let signal = ramp(20);
        let frames = FramedSignal::new(&signal, &FrameConfig::with_hop(4, 2.0)).unwrap();
        let sliced = frames.slice(3..7);
        assert_eq!(sliced.num_frames(), 4);
        assert!(std::ptr::eq(sliced.signal(), frames.signal()));
        for j in -2..6 {
            assert_eq!(sliced.frame(j), frames.frame(j + 3));
        }
        assert_eq!(sliced.iter().count(), 4);
    }

    #[test]
    fn test_multichannel_frames() {
        let signal = Signal::new(array![[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0]], 10).unwrap();
        let frames = FramedSignal::new(&signal, &FrameConfig::with_hop(2, 1.0)).unwrap();
        assert_eq!(frames.frame(1), array![[1.0, 2.0], [4.0, 5.0]]);
        assert!(frames.mono_frame(1).is_err());
        assert!(frames.require_mono("test").is_err());
    }
}
