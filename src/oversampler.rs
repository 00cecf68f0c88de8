//! FIR Oversampling
//!
//! Nonlinear stages such as the filter emulation and the bit-combined
//! waveforms generate harmonics far above Nyquist. [`FirOversampler`] runs an
//! inner sampler at `RATIO` times the output rate and decimates its output
//! through a windowed-sinc low-pass, so that energy is removed instead of
//! folding back as aliasing.
//!
//! The decimation kernel spans `ZERO_CROSSINGS` lobes on each side of its
//! centre. Every `RATIO`-th tap of a sinc with cutoff `1/RATIO` is zero, so
//! the stored half-kernel omits those taps and the convolution skips the
//! matching ring slots:
//!
//! ```text
//!  ring (oldest → newest), RATIO = 4, ZERO_CROSSINGS = 2
//!
//!  [ . h6 h5 h4 _ h3 h2 h1 _ h0 ... C ... h0 _ h1 h2 h3 _ h4 h5 h6 ]
//!                                   │
//!                             centre tap (1.0)
//! ```
//!
//! The output is divided by the kernel's DC gain, so a constant input comes
//! out unchanged.

use crate::frame::Signal;
use crate::sampler::Sampler;
use crate::tables::{TableCache, Window};
use std::sync::Arc;

pub struct FirOversampler<S: Sampler, const RATIO: usize, const ZERO_CROSSINGS: usize> {
    inner: S,
    buffer: Box<[S::Frame]>,
    /// Next write position, which is also the oldest sample.
    index: usize,
    fir: Arc<[f32]>,
    norm: f32,
}

impl<S: Sampler, const RATIO: usize, const ZERO_CROSSINGS: usize>
    FirOversampler<S, RATIO, ZERO_CROSSINGS>
{
    pub const BUFFER_SIZE: usize = RATIO * ZERO_CROSSINGS * 2 + 1;
    const BUFFER_MID: usize = RATIO * ZERO_CROSSINGS;
    const FIR_SIZE: usize = RATIO * ZERO_CROSSINGS - ZERO_CROSSINGS;

    /// Wrap `inner` with a Kaiser-Bessel windowed decimator.
    pub fn new(inner: S, tables: &mut TableCache) -> Self {
        Self::with_window(inner, tables, Window::KaiserBessel)
    }

    pub fn with_window(inner: S, tables: &mut TableCache, window: Window) -> Self {
        let fir = tables.compact_downsampler_fir(RATIO, ZERO_CROSSINGS, window);
        debug_assert_eq!(fir.len(), Self::FIR_SIZE);
        let dc_gain = 1.0 + 2.0 * fir.iter().map(|&c| c as f64).sum::<f64>();
        Self {
            inner,
            buffer: vec![S::Frame::default(); Self::BUFFER_SIZE].into_boxed_slice(),
            index: 0,
            fir,
            norm: (1.0 / dc_gain) as f32,
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    #[inline]
    fn push(&mut self, value: S::Frame) {
        self.buffer[self.index] = value;
        self.index += 1;
        if self.index >= Self::BUFFER_SIZE {
            self.index = 0;
        }
    }

    #[inline]
    fn step(&self, i: usize, idx: &mut usize, n: &mut usize, signal: &mut S::Frame) {
        if *idx >= Self::BUFFER_SIZE {
            *idx -= Self::BUFFER_SIZE;
        }
        signal.accumulate(self.buffer[*idx].scale(self.fir[i]));
        *idx += 1;
        *n -= 1;
        if *n == 0 {
            // zero crossing
            *idx += 1;
            *n = RATIO - 1;
        }
    }

    /// Convolve the ring with the mirrored half-kernel around its centre.
    #[inline]
    fn decimate(&self) -> S::Frame {
        let mut idx = self.index + Self::BUFFER_MID;
        if idx >= Self::BUFFER_SIZE {
            idx -= Self::BUFFER_SIZE;
        }
        let mut signal = self.buffer[idx];

        let mut idx = self.index + 1;
        let mut n = RATIO - 1;
        for i in (0..Self::FIR_SIZE).rev() {
            self.step(i, &mut idx, &mut n, &mut signal);
        }
        for i in 0..Self::FIR_SIZE {
            self.step(i, &mut idx, &mut n, &mut signal);
        }

        signal.scale(self.norm)
    }
}

impl<S: Sampler, const RATIO: usize, const ZERO_CROSSINGS: usize> Sampler
    for FirOversampler<S, RATIO, ZERO_CROSSINGS>
{
    type Frame = S::Frame;

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.inner.set_sample_rate(sample_rate * RATIO as f32);
    }

    #[inline]
    fn sample(&mut self) -> S::Frame {
        for _ in 0..RATIO {
            let v = self.inner.sample();
            self.push(v);
        }
        self.decimate()
    }
}
