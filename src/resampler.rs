//! Polyphase Sample Playback
//!
//! [`PolyphaseResampler`] plays a [`SampleBuffer`] at an arbitrary pitch. The
//! read cursor is a fixed-point frame position with 20 fractional bits; the top
//! 12 of those select one of 4096 precomputed 8-tap sinc kernels, and the
//! output is the dot product of that kernel with the 8 frames around the
//! cursor. No interpolation math runs per sample beyond the multiply-adds.
//!
//! When the cursor moves faster than one frame per output sample the sinc must
//! be narrowed to avoid aliasing, so three kernel banks are kept:
//!
//! | increment      | kernel          | beta   | low-pass |
//! |----------------|-----------------|--------|----------|
//! | up to ~1.19    | sharp           | 9.6377 | 0.97     |
//! | ~1.19 to ~1.56 | 1.333x down     | 8.5    | 0.5      |
//! | beyond         | 2x down         | 2.7625 | 0.425    |
//!
//! The resampler borrows its buffer, so a buffer cannot be dropped while a
//! voice is still playing it.

use crate::frame::{Frame, Signal};
use crate::sample::SampleBuffer;
use crate::sampler::Sampler;
use crate::tables::TableCache;
use std::sync::Arc;

pub const FRAC_EXP: u32 = 20;
pub const SINC_WIDTH_EXP: u32 = 3;
pub const SINC_PHASES_EXP: u32 = 12;
pub const SINC_WIDTH: usize = 1 << SINC_WIDTH_EXP;
pub const SINC_PHASES: usize = 1 << SINC_PHASES_EXP;

const SINC_MASK: i64 = SINC_PHASES as i64 - 1;
const HALF_WIDTH: i64 = (SINC_WIDTH >> 1) as i64;
/// First frame of the kernel window relative to the cursor.
const OFFSET: i64 = -HALF_WIDTH + 1;
/// Cursor positions outside `[POS_MIN, len + POS_MAX_OFFSET]` are silent.
const POS_MIN: i64 = -HALF_WIDTH - 1;
const POS_MAX_OFFSET: i64 = HALF_WIDTH - 1;

/// Kernel bank chosen for the current increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kernel {
    Sharp,
    Down1_333x,
    Down2x,
}

impl Kernel {
    /// (beta, low-pass factor) of the bank.
    pub fn params(self) -> (f64, f64) {
        match self {
            Kernel::Sharp => (9.6377, 0.97),
            Kernel::Down1_333x => (8.5, 0.5),
            Kernel::Down2x => (2.7625, 0.425),
        }
    }

    /// Pick a bank from a fixed-point increment.
    pub fn for_increment(inc_fx: i32) -> Self {
        let d = (inc_fx >> (FRAC_EXP - 4)).abs();
        if d > 0x18 {
            Kernel::Down2x
        } else if d > 0x12 {
            Kernel::Down1_333x
        } else {
            Kernel::Sharp
        }
    }
}

pub struct PolyphaseResampler<'a, const CH: usize> {
    buffer: &'a SampleBuffer<CH>,
    sample_rate: f32,
    inc_fx: i32,
    pos_fx: i64,
    sharp: Arc<[f32]>,
    down1_333x: Arc<[f32]>,
    down2x: Arc<[f32]>,
}

impl<'a, const CH: usize> PolyphaseResampler<'a, CH> {
    /// A stopped resampler at the start of `buffer`. Fetches (and on first use
    /// generates) the three kernel banks from `tables`.
    pub fn new(buffer: &'a SampleBuffer<CH>, tables: &mut TableCache) -> Self {
        let mut bank = |kernel: Kernel| {
            let (beta, lowpass) = kernel.params();
            tables.phased_sinc(beta, lowpass, SINC_WIDTH_EXP, SINC_PHASES_EXP)
        };
        Self {
            sharp: bank(Kernel::Sharp),
            down1_333x: bank(Kernel::Down1_333x),
            down2x: bank(Kernel::Down2x),
            buffer,
            sample_rate: buffer.sample_rate(),
            inc_fx: 0,
            pos_fx: 0,
        }
    }

    pub fn buffer(&self) -> &'a SampleBuffer<CH> {
        self.buffer
    }

    /// Play so that the buffer's base pitch sounds at `hz`. Negative values
    /// play backwards.
    pub fn set_hz(&mut self, hz: f32) {
        let inc = hz / self.buffer.base() * self.buffer.sample_rate() / self.sample_rate;
        self.inc_fx = (inc * (1i32 << FRAC_EXP) as f32) as i32;
    }

    /// Move the cursor to a (possibly fractional or negative) frame position.
    pub fn set_pos(&mut self, frames: f64) {
        self.pos_fx = (frames * (1i64 << FRAC_EXP) as f64) as i64;
    }

    /// Integer frame under the cursor.
    pub fn pos(&self) -> i64 {
        self.pos_fx >> FRAC_EXP
    }

    /// Cursor advance per output sample, in frames.
    pub fn increment(&self) -> f64 {
        self.inc_fx as f64 / (1i64 << FRAC_EXP) as f64
    }

    pub fn kernel(&self) -> Kernel {
        Kernel::for_increment(self.inc_fx)
    }

    /// True once the cursor has left the buffer and its guard band.
    pub fn is_finished(&self) -> bool {
        let p = self.pos();
        p < POS_MIN || p > self.buffer.len() as i64 + POS_MAX_OFFSET
    }

    #[inline]
    fn advance(&mut self) {
        self.pos_fx += self.inc_fx as i64;
    }
}

impl<'a, const CH: usize> Sampler for PolyphaseResampler<'a, CH> {
    type Frame = Frame<CH>;

    fn set_sample_rate(&mut self, sample_rate: f32) {
        assert!(
            sample_rate.is_finite() && sample_rate > 0.0,
            "sample rate must be positive, got {}",
            sample_rate
        );
        self.sample_rate = sample_rate;
    }

    #[inline]
    fn sample(&mut self) -> Frame<CH> {
        if self.is_finished() {
            self.advance();
            return Frame::silence();
        }

        let p = self.pos();
        let table = match self.kernel() {
            Kernel::Sharp => &self.sharp,
            Kernel::Down1_333x => &self.down1_333x,
            Kernel::Down2x => &self.down2x,
        };
        let row = ((self.pos_fx >> (FRAC_EXP - SINC_PHASES_EXP)) & SINC_MASK) as usize * SINC_WIDTH;
        let lut = &table[row..row + SINC_WIDTH];

        let mut value = Frame::silence();
        for (i, &k) in lut.iter().enumerate() {
            value.accumulate(self.buffer.frame(p + i as i64 + OFFSET).scale(k));
        }
        self.advance();
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Mono, Stereo};
    use std::f32::consts::PI;

    fn sine(len: usize, hz: f32) -> SampleBuffer<1> {
        SampleBuffer::from_fn(len, |i| Mono::from((2.0 * PI * hz * i as f32 / 44100.0).sin()))
    }

    #[test]
    fn test_native_pitch_reproduces_buffer() {
        let buf = sine(4410, 441.0);
        let mut tables = TableCache::new();
        let mut r = PolyphaseResampler::new(&buf, &mut tables);
        r.set_sample_rate(44100.0);
        r.set_hz(440.0);
        assert_eq!(r.increment(), 1.0);
        assert_eq!(r.kernel(), Kernel::Sharp);

        for i in 0..4400 {
            let out = r.sample()[0];
            if i >= 8 {
                let expected = buf.frame(i as i64)[0];
                assert!(
                    (out - expected).abs() < 1e-3,
                    "frame {}: {} vs {}",
                    i,
                    out,
                    expected
                );
            }
        }
    }

    #[test]
    fn test_fractional_rate_interpolates() {
        let buf = sine(4410, 441.0);
        let mut tables = TableCache::new();
        let mut r = PolyphaseResampler::new(&buf, &mut tables);
        r.set_sample_rate(44100.0);
        r.set_hz(440.0 * 0.37);
        let inc = r.increment();

        for n in 0..8000 {
            let out = r.sample()[0];
            if n >= 30 {
                let t = n as f64 * inc;
                let expected = (2.0 * std::f64::consts::PI * 441.0 * t / 44100.0).sin() as f32;
                assert!((out - expected).abs() < 1e-3, "sample {}: {} vs {}", n, out, expected);
            }
        }
    }

    #[test]
    fn test_silent_outside_guard_band() {
        let buf = SampleBuffer::from_fn(16, |_| Stereo::splat(1.0));
        let mut tables = TableCache::new();
        let mut r = PolyphaseResampler::new(&buf, &mut tables);
        r.set_sample_rate(44100.0);
        r.set_hz(440.0);

        r.set_pos(-6.0);
        assert_eq!(r.sample(), Stereo::silence());
        // The cursor keeps moving while silent
        assert_eq!(r.pos(), -5);

        r.set_pos(16.0 + 4.0);
        assert_eq!(r.sample(), Stereo::silence());
        assert!(r.is_finished());

        r.set_pos(8.0);
        let mid = r.sample();
        assert!((mid[0] - 1.0).abs() < 1e-3);
        assert_eq!(mid[0], mid[1]);
    }

    #[test]
    fn test_kernel_selection() {
        assert_eq!(Kernel::for_increment(1 << FRAC_EXP), Kernel::Sharp);
        assert_eq!(Kernel::for_increment(18 << 16), Kernel::Sharp);
        assert_eq!(Kernel::for_increment(19 << 16), Kernel::Down1_333x);
        assert_eq!(Kernel::for_increment(24 << 16), Kernel::Down1_333x);
        assert_eq!(Kernel::for_increment(25 << 16), Kernel::Down2x);
        assert_eq!(Kernel::for_increment(-(2 << FRAC_EXP)), Kernel::Down2x);
    }

    #[test]
    fn test_shares_tables() {
        let buf = sine(64, 441.0);
        let mut tables = TableCache::new();
        let _a = PolyphaseResampler::new(&buf, &mut tables);
        let _b = PolyphaseResampler::new(&buf, &mut tables);
        assert_eq!(tables.len(), 3);
    }

    #[test]
    fn test_rate_ratio() {
        let buf = sine(64, 441.0).with_sample_rate(22050.0);
        let mut tables = TableCache::new();
        let mut r = PolyphaseResampler::new(&buf, &mut tables);
        r.set_sample_rate(44100.0);
        r.set_hz(440.0);
        assert_eq!(r.increment(), 0.5);
    }
}
