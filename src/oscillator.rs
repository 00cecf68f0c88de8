//! Phase-Accumulator Oscillator
//!
//! A 28-bit fixed-point phase accumulator in the style of classic sound chips.
//! Every enabled waveform is computed as an unsigned value over the phase
//! domain and the results are combined with a bitwise AND, which is how the
//! emulated hardware mixes them (a saw+triangle patch produces the familiar
//! "combined waveform" timbres rather than a sum).
//!
//! Noise comes from a 23-bit LFSR clocked on edges of phase bit 23, and the
//! optional wavetable is indexed by the top eight phase bits.
//!
//! Hard sync needs two oscillators at once, so it is driven by the owning
//! [`OscillatorBank`](crate::bank::OscillatorBank) through
//! [`Oscillator::apply_hard_sync`].

use crate::envelope::Envelope;
use crate::sampler::Sampler;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

pub const PERIOD_EXP: u32 = 28;
pub const PERIOD: u32 = 1 << PERIOD_EXP;
pub const PERIOD_MASK: u32 = PERIOD - 1;
/// Top bit of the phase domain; set during the second half of each cycle.
pub const MSB: u32 = PERIOD >> 1;

pub const WAVETABLE_SIZE_EXP: u32 = 8;
pub const WAVETABLE_SIZE: usize = 1 << WAVETABLE_SIZE_EXP;

const LFSR_MASK: u32 = (1 << 23) - 1;
const NOISE_CLOCK_BIT: u32 = PERIOD_EXP - 5;

/// Which waveforms an oscillator produces, plus the sync and mute switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Waveforms {
    pub saw: bool,
    pub square: bool,
    pub triangle: bool,
    pub noise: bool,
    pub wavetable: bool,
    /// Reset phase whenever the sync source crosses mid-cycle.
    pub sync: bool,
    /// Output silence without advancing the envelope.
    pub mute: bool,
}

impl Waveforms {
    pub const NONE: Waveforms = Waveforms {
        saw: false,
        square: false,
        triangle: false,
        noise: false,
        wavetable: false,
        sync: false,
        mute: false,
    };
    pub const SAW: Waveforms = Waveforms {
        saw: true,
        ..Self::NONE
    };
    pub const SQUARE: Waveforms = Waveforms {
        square: true,
        ..Self::NONE
    };
    pub const TRIANGLE: Waveforms = Waveforms {
        triangle: true,
        ..Self::NONE
    };
    pub const NOISE: Waveforms = Waveforms {
        noise: true,
        ..Self::NONE
    };
    pub const WAVETABLE: Waveforms = Waveforms {
        wavetable: true,
        ..Self::NONE
    };

    pub fn with_sync(mut self) -> Self {
        self.sync = true;
        self
    }

    pub fn with_mute(mut self) -> Self {
        self.mute = true;
        self
    }

    fn is_empty(&self) -> bool {
        !(self.saw || self.square || self.triangle || self.noise || self.wavetable || self.sync)
    }
}

/// One voice: phase accumulator, waveform generator and envelope.
#[derive(Debug, Clone)]
pub struct Oscillator {
    sample_rate: f32,
    pub waveforms: Waveforms,
    phase: u32,
    inc: u32,
    shift: i32,
    lfsr: u32,
    lfsr_latch: bool,
    /// Set while this oscillator, acting as a sync source, is in the upper
    /// half of its cycle.
    sync_latch: bool,
    wavetable: Option<Box<[i16; WAVETABLE_SIZE]>>,
    /// Level into the direct (unfiltered) bus.
    pub gain: f32,
    /// Level into the filter bus.
    pub filter_gain: f32,
    pub envelope: Envelope,
}

impl Oscillator {
    pub fn new(sample_rate: f32) -> Self {
        let mut osc = Self {
            sample_rate,
            waveforms: Waveforms::NONE,
            phase: 0,
            inc: 0,
            shift: 0,
            lfsr: 1,
            lfsr_latch: false,
            sync_latch: false,
            wavetable: None,
            gain: 1.0,
            filter_gain: 0.0,
            envelope: Envelope::new(sample_rate),
        };
        osc.set_sample_rate(sample_rate);
        osc
    }

    /// Set the pitch. The increment is truncated to whole phase units.
    pub fn set_hz(&mut self, hz: f32) {
        self.inc = (PERIOD as f32 * hz / self.sample_rate) as u32;
    }

    /// Offset the phase by `shift` periods, clamped to `[-1, 1]`.
    ///
    /// The shifted phase saturates at the cycle boundaries rather than
    /// wrapping, which narrows the pulse of a square wave.
    pub fn set_shift(&mut self, shift: f32) {
        self.shift = (shift.clamp(-1.0, 1.0) * PERIOD as f32) as i32;
    }

    pub fn set_waveforms(&mut self, waveforms: Waveforms) {
        self.waveforms = waveforms;
    }

    pub fn set_wavetable(&mut self, table: &[i16; WAVETABLE_SIZE]) {
        self.wavetable = Some(Box::new(*table));
    }

    /// Fill the wavetable from a function of angle in `[0, 2π)`.
    pub fn wavetable_fn<F: Fn(f32) -> f32>(&mut self, f: F) {
        let mut table = [0i16; WAVETABLE_SIZE];
        for (i, slot) in table.iter_mut().enumerate() {
            let x = i as f32 * (1.0 / WAVETABLE_SIZE as f32) * PI * 2.0;
            let v = f(x).clamp(-1.0, 1.0);
            *slot = (v * 32767.0) as i16;
        }
        self.wavetable = Some(Box::new(table));
    }

    pub fn wavetable(&self) -> Option<&[i16; WAVETABLE_SIZE]> {
        self.wavetable.as_deref()
    }

    pub fn phase(&self) -> u32 {
        self.phase
    }

    pub fn increment(&self) -> u32 {
        self.inc
    }

    pub fn lfsr(&self) -> u32 {
        self.lfsr
    }

    /// Edge-detect `master` crossing mid-cycle and zero this oscillator's
    /// phase on the rising edge. No-op unless `sync` is enabled.
    ///
    /// The latch lives on the master so that several slaves can follow it.
    #[inline]
    pub fn apply_hard_sync(&mut self, master: &mut Oscillator) {
        if self.waveforms.sync {
            let high = master.phase & MSB != 0;
            if !master.sync_latch && high {
                master.sync_latch = true;
                self.phase = 0;
            } else if !high {
                master.sync_latch = false;
            }
        }
    }

    /// Sync against this oscillator's own phase (a bank of one).
    #[inline]
    pub(crate) fn apply_self_sync(&mut self) {
        if self.waveforms.sync {
            let high = self.phase & MSB != 0;
            if !self.sync_latch && high {
                self.sync_latch = true;
                self.phase = 0;
            } else if !high {
                self.sync_latch = false;
            }
        }
    }

    /// Advance the phase and return the raw combined waveform in `[0, PERIOD)`.
    #[inline]
    pub fn sample_raw(&mut self) -> u32 {
        self.phase = self.phase.wrapping_add(self.inc) & PERIOD_MASK;

        if self.waveforms.is_empty() && !self.sync_latch && !self.lfsr_latch {
            return MSB;
        }

        let x = (self.phase as i32)
            .saturating_add(self.shift)
            .clamp(0, PERIOD_MASK as i32) as u32;

        if self.waveforms.square && x & MSB != 0 {
            return 0;
        }

        let mut out = PERIOD_MASK;

        if self.waveforms.saw {
            out &= x;
        }

        if self.waveforms.triangle {
            out &= if x & MSB != 0 {
                (x << 1) ^ PERIOD_MASK
            } else {
                x << 1
            };
        }

        if self.waveforms.noise {
            let clock = (x >> NOISE_CLOCK_BIT) & 1 != 0;
            if clock != self.lfsr_latch {
                let lsb = ((self.lfsr >> 17) ^ (self.lfsr >> 22)) & 1;
                self.lfsr = ((self.lfsr << 1) | lsb) & LFSR_MASK;
                self.lfsr_latch = !self.lfsr_latch;
            }
            out &= self.lfsr << 1;
        }

        if self.waveforms.wavetable {
            if let Some(table) = &self.wavetable {
                let i = (x >> (PERIOD_EXP - WAVETABLE_SIZE_EXP)) as usize;
                out &= ((table[i] as i32 + 32768) as u32) << (PERIOD_EXP - 16);
            }
        }

        out
    }
}

impl Default for Oscillator {
    fn default() -> Self {
        Self::new(44100.0)
    }
}

impl Sampler for Oscillator {
    type Frame = f32;

    fn set_sample_rate(&mut self, sample_rate: f32) {
        assert!(
            sample_rate.is_finite() && sample_rate > 0.0,
            "sample rate must be positive, got {}",
            sample_rate
        );
        self.sample_rate = sample_rate;
        self.envelope.set_sample_rate(sample_rate);
    }

    #[inline]
    fn sample(&mut self) -> f32 {
        if self.waveforms.mute {
            return 0.0;
        }
        let raw = self.sample_raw();
        (raw as f32 / PERIOD as f32 - 0.5) * self.envelope.sample()
    }
}
