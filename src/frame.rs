//! Sample Frames
//!
//! A [`Frame`] holds one sample per channel. Samplers produce either a bare
//! `f32` (mono engines such as the oscillator bank) or a `Frame<CH>` (sample
//! playback); the [`Signal`] trait gives both the small amount of arithmetic
//! the decimation filter and the combinators need.

use core::ops::{AddAssign, Index, IndexMut, Mul};

/// Arithmetic shared by everything a [`Sampler`](crate::sampler::Sampler) can emit.
pub trait Signal: Copy + Default + Send {
    /// Add `other` into `self`, channel by channel.
    fn accumulate(&mut self, other: Self);

    /// Multiply every channel by `k`.
    fn scale(self, k: f32) -> Self;

    /// Write this value into one interleaved output frame.
    ///
    /// When `out` has more channels than the signal, channels repeat
    /// (a mono signal fills every output channel).
    fn write_interleaved(self, out: &mut [f32]);
}

impl Signal for f32 {
    #[inline]
    fn accumulate(&mut self, other: Self) {
        *self += other;
    }

    #[inline]
    fn scale(self, k: f32) -> Self {
        self * k
    }

    #[inline]
    fn write_interleaved(self, out: &mut [f32]) {
        out.fill(self);
    }
}

/// A multi-channel sample frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame<const CH: usize>(pub [f32; CH]);

/// Single-channel frame.
pub type Mono = Frame<1>;
/// Two-channel frame.
pub type Stereo = Frame<2>;

impl<const CH: usize> Frame<CH> {
    /// Number of channels.
    pub const CHANNELS: usize = CH;

    /// The all-zero frame.
    pub const fn silence() -> Self {
        Self([0.0; CH])
    }

    /// A frame with the same value in every channel.
    pub const fn splat(value: f32) -> Self {
        Self([value; CH])
    }

    /// Sum of all channels.
    pub fn sum(&self) -> f32 {
        self.0.iter().sum()
    }

    pub fn channels(&self) -> &[f32; CH] {
        &self.0
    }
}

impl<const CH: usize> Default for Frame<CH> {
    fn default() -> Self {
        Self::silence()
    }
}

impl<const CH: usize> Signal for Frame<CH> {
    #[inline]
    fn accumulate(&mut self, other: Self) {
        for (a, b) in self.0.iter_mut().zip(other.0) {
            *a += b;
        }
    }

    #[inline]
    fn scale(self, k: f32) -> Self {
        Self(self.0.map(|v| v * k))
    }

    #[inline]
    fn write_interleaved(self, out: &mut [f32]) {
        if CH == 0 {
            out.fill(0.0);
            return;
        }
        for (i, o) in out.iter_mut().enumerate() {
            *o = self.0[i % CH];
        }
    }
}

impl<const CH: usize> Index<usize> for Frame<CH> {
    type Output = f32;

    fn index(&self, channel: usize) -> &f32 {
        &self.0[channel]
    }
}

impl<const CH: usize> IndexMut<usize> for Frame<CH> {
    fn index_mut(&mut self, channel: usize) -> &mut f32 {
        &mut self.0[channel]
    }
}

impl<const CH: usize> Mul<f32> for Frame<CH> {
    type Output = Self;

    fn mul(self, k: f32) -> Self {
        self.scale(k)
    }
}

impl<const CH: usize> AddAssign for Frame<CH> {
    fn add_assign(&mut self, other: Self) {
        self.accumulate(other);
    }
}

impl From<f32> for Mono {
    fn from(value: f32) -> Self {
        Self([value])
    }
}

impl<const CH: usize> From<[f32; CH]> for Frame<CH> {
    fn from(values: [f32; CH]) -> Self {
        Self(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_arithmetic() {
        let mut a = Stereo::from([1.0, -2.0]);
        a += Stereo::from([0.5, 0.5]);
        assert_eq!(a, Stereo::from([1.5, -1.5]));

        let b = a * 2.0;
        assert_eq!(b[0], 3.0);
        assert_eq!(b[1], -3.0);
        assert_eq!(b.sum(), 0.0);
    }

    #[test]
    fn test_default_is_silence() {
        assert_eq!(Frame::<3>::default(), Frame::<3>::silence());
        assert_eq!(f32::default(), 0.0);
    }

    #[test]
    fn test_write_interleaved_repeats_channels() {
        let mut out = [9.0f32; 4];
        0.25f32.write_interleaved(&mut out);
        assert_eq!(out, [0.25; 4]);

        Stereo::from([1.0, 2.0]).write_interleaved(&mut out);
        assert_eq!(out, [1.0, 2.0, 1.0, 2.0]);

        let mut mono_out = [0.0f32; 1];
        Stereo::from([1.0, 2.0]).write_interleaved(&mut mono_out);
        assert_eq!(mono_out, [1.0]);
    }

    #[test]
    fn test_index_mut() {
        let mut f = Mono::from(0.0);
        f[0] = 4.0;
        assert_eq!(f.channels(), &[4.0]);
    }
}
