//! Immutable sample buffers for playback.

use crate::frame::Frame;

pub const DEFAULT_SAMPLE_RATE: f32 = 44100.0;
/// Pitch the recording is assumed to sound at when played back unchanged.
pub const DEFAULT_BASE: f32 = 440.0;

/// A recorded sound: frames plus the rate they were captured at and their
/// base pitch.
///
/// Reads outside the buffer yield silence, so interpolation kernels may
/// overhang either end.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer<const CH: usize> {
    frames: Box<[Frame<CH>]>,
    sample_rate: f32,
    base: f32,
}

impl<const CH: usize> SampleBuffer<CH> {
    /// # Panics
    ///
    /// If `frames` is empty.
    pub fn new(frames: Vec<Frame<CH>>) -> Self {
        assert!(!frames.is_empty(), "sample buffer needs at least one frame");
        Self {
            frames: frames.into_boxed_slice(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            base: DEFAULT_BASE,
        }
    }

    /// Build a buffer of `len` frames from a function of the frame index.
    pub fn from_fn<F: FnMut(usize) -> Frame<CH>>(len: usize, f: F) -> Self {
        Self::new((0..len).map(f).collect())
    }

    pub fn with_sample_rate(mut self, sample_rate: f32) -> Self {
        assert!(
            sample_rate.is_finite() && sample_rate > 0.0,
            "sample rate must be positive, got {}",
            sample_rate
        );
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_base(mut self, base: f32) -> Self {
        assert!(
            base.is_finite() && base > 0.0,
            "base pitch must be positive, got {}",
            base
        );
        self.base = base;
        self
    }

    /// Frame at `index`, or silence outside `[0, len)`.
    #[inline]
    pub fn frame(&self, index: i64) -> Frame<CH> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.frames.get(i))
            .copied()
            .unwrap_or_default()
    }

    pub fn frames(&self) -> &[Frame<CH>] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn base(&self) -> f32 {
        self.base
    }

    /// Length in seconds at the native rate.
    pub fn duration(&self) -> f32 {
        self.len() as f32 / self.sample_rate
    }
}
