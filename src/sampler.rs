//! # The Sampler Capability
//!
//! Every sound source in the engine is a [`Sampler`]: something that can be
//! told its output rate and then pulled one frame at a time. The oscillator
//! bank, the polyphase resampler and the FIR oversampler all implement it, and
//! the oversampler is itself generic over any inner `Sampler`, so a chain such
//! as
//!
//! ```text
//! FirOversampler<OscillatorBank<2>, 16, 2>
//! ```
//!
//! monomorphizes into one tight loop with no dynamic dispatch and no
//! allocation on the audio path.
//!
//! ## Combinators
//!
//! [`SamplerExt`] adds a couple of zero-cost adapters that hosts commonly need
//! around an engine: a fixed output [`Gain`] and an arbitrary per-frame
//! [`Map`] (for example a stereo-to-mono mixdown).
//!
//! ```rust,ignore
//! let voice = bank.oversample::<16, 2>(&mut tables).gain(0.05);
//! ```

use crate::frame::Signal;
use crate::oversampler::FirOversampler;
use crate::tables::TableCache;

/// A pull-driven source of audio frames.
///
/// # Thread Safety
///
/// Samplers must be `Send` so that a host can build the engine on one thread
/// and hand it to the audio callback thread.
pub trait Sampler: Send {
    /// The frame type produced per tick (`f32` or a [`Frame`](crate::frame::Frame)).
    type Frame: Signal;

    /// Configure the rate at which [`sample`](Sampler::sample) will be called.
    fn set_sample_rate(&mut self, sample_rate: f32);

    /// Produce the next frame, advancing internal state by one tick.
    fn sample(&mut self) -> Self::Frame;

    /// Fill `out` with consecutive frames.
    fn sample_into(&mut self, out: &mut [Self::Frame]) {
        for o in out.iter_mut() {
            *o = self.sample();
        }
    }
}

/// Extension trait providing combinator methods for all samplers
pub trait SamplerExt: Sampler + Sized {
    /// Multiply every output frame by a constant.
    fn gain(self, gain: f32) -> Gain<Self> {
        Gain {
            sampler: self,
            gain,
        }
    }

    /// Transform every output frame with a pure function.
    fn map<F, U>(self, f: F) -> Map<Self, F>
    where
        F: Fn(Self::Frame) -> U + Send,
        U: Signal,
    {
        Map { sampler: self, f }
    }

    /// Run this sampler at `RATIO` times the output rate and decimate through
    /// a Kaiser-windowed sinc low-pass.
    fn oversample<const RATIO: usize, const ZERO_CROSSINGS: usize>(
        self,
        tables: &mut TableCache,
    ) -> FirOversampler<Self, RATIO, ZERO_CROSSINGS> {
        FirOversampler::new(self, tables)
    }
}

impl<S: Sampler> SamplerExt for S {}

/// Fixed output gain around a sampler
pub struct Gain<S> {
    pub sampler: S,
    pub gain: f32,
}

impl<S: Sampler> Sampler for Gain<S> {
    type Frame = S::Frame;

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sampler.set_sample_rate(sample_rate);
    }

    #[inline]
    fn sample(&mut self) -> Self::Frame {
        self.sampler.sample().scale(self.gain)
    }
}

/// Per-frame transformation of a sampler's output
pub struct Map<S, F> {
    pub sampler: S,
    f: F,
}

impl<S, F, U> Sampler for Map<S, F>
where
    S: Sampler,
    F: Fn(S::Frame) -> U + Send,
    U: Signal,
{
    type Frame = U;

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sampler.set_sample_rate(sample_rate);
    }

    #[inline]
    fn sample(&mut self) -> U {
        (self.f)(self.sampler.sample())
    }
}
