//! Oscillator bank: a fixed set of voices mixed through one filter.
//!
//! Each oscillator contributes to two buses, the direct bus (`gain`) and the
//! filter bus (`filter_gain`), and the filter combines both. Hard sync is
//! resolved here because it couples pairs of oscillators: oscillator `i`
//! follows `sync_sources[i]`, which defaults to its predecessor in the array
//! (the first oscillator follows the last).
//!
//! Per tick, every sync check runs in array order before any oscillator
//! advances. The filter output then passes a [`DcBlocker`] so a bank whose
//! voices are all silent settles to zero.

use crate::filter::{DcBlocker, ResonantFilter};
use crate::oscillator::Oscillator;
use crate::sampler::Sampler;

/// Corner of the highpass after the filter, well below the audio band.
pub const DC_CUTOFF: f32 = 10.0;

pub struct OscillatorBank<const N: usize> {
    pub oscillators: [Oscillator; N],
    pub filter: ResonantFilter,
    /// Output gain applied after the filter.
    pub gain: f32,
    sync_sources: [usize; N],
    dc_blocker: DcBlocker,
}

impl<const N: usize> OscillatorBank<N> {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            oscillators: core::array::from_fn(|_| Oscillator::new(sample_rate)),
            filter: ResonantFilter::new(sample_rate),
            gain: 1.0,
            sync_sources: core::array::from_fn(|i| Self::default_sync_source(i)),
            dc_blocker: DcBlocker::new(DC_CUTOFF, sample_rate),
        }
    }

    /// Wiring used when nothing else is configured: the predecessor,
    /// wrapping from the first oscillator to the last.
    pub fn default_sync_source(slave: usize) -> usize {
        (slave + N - 1) % N
    }

    /// Make oscillator `slave` follow oscillator `master` when sync is enabled.
    ///
    /// # Panics
    ///
    /// If either index is out of range.
    pub fn set_sync_source(&mut self, slave: usize, master: usize) {
        assert!(slave < N, "sync slave {} out of range for {} oscillators", slave, N);
        assert!(
            master < N,
            "sync source {} out of range for {} oscillators",
            master,
            N
        );
        self.sync_sources[slave] = master;
    }

    pub fn sync_source(&self, slave: usize) -> usize {
        self.sync_sources[slave]
    }

    pub fn oscillator(&self, index: usize) -> &Oscillator {
        &self.oscillators[index]
    }

    pub fn oscillator_mut(&mut self, index: usize) -> &mut Oscillator {
        &mut self.oscillators[index]
    }

    #[inline]
    fn apply_hard_sync(&mut self) {
        for slave in 0..N {
            let master = self.sync_sources[slave];
            if slave == master {
                self.oscillators[slave].apply_self_sync();
            } else if slave < master {
                let (lo, hi) = self.oscillators.split_at_mut(master);
                lo[slave].apply_hard_sync(&mut hi[0]);
            } else {
                let (lo, hi) = self.oscillators.split_at_mut(slave);
                hi[0].apply_hard_sync(&mut lo[master]);
            }
        }
    }
}

impl<const N: usize> Default for OscillatorBank<N> {
    fn default() -> Self {
        Self::new(44100.0)
    }
}

impl<const N: usize> Sampler for OscillatorBank<N> {
    type Frame = f32;

    fn set_sample_rate(&mut self, sample_rate: f32) {
        for osc in self.oscillators.iter_mut() {
            osc.set_sample_rate(sample_rate);
        }
        self.filter.set_sample_rate(sample_rate);
        self.dc_blocker.set_sample_rate(sample_rate);
    }

    #[inline]
    fn sample(&mut self) -> f32 {
        self.apply_hard_sync();

        let mut direct = 0.0;
        let mut filtered = 0.0;
        for osc in self.oscillators.iter_mut() {
            let v = osc.sample();
            direct += v * osc.gain;
            filtered += v * osc.filter_gain;
        }

        let out = self.filter.sample(direct, filtered);
        self.dc_blocker.sample(out) * self.gain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oscillator::Waveforms;

    const RATE: f32 = 705_600.0;

    #[test]
    fn test_default_sync_sources_wrap() {
        let bank = OscillatorBank::<3>::default();
        assert_eq!(bank.sync_source(0), 2);
        assert_eq!(bank.sync_source(1), 0);
        assert_eq!(bank.sync_source(2), 1);

        let single = OscillatorBank::<1>::default();
        assert_eq!(single.sync_source(0), 0);
    }

    #[test]
    fn test_sync_checks_run_before_sampling() {
        // Mutual sync: each oscillator follows the other
        let mut bank = OscillatorBank::<2>::new(RATE);
        let hz = [3000.0, 4700.0];
        for (osc, &f) in bank.oscillators.iter_mut().zip(&hz) {
            osc.set_waveforms(Waveforms::SAW.with_sync());
            osc.set_hz(f);
            osc.envelope.on();
        }

        let mut a = bank.oscillators[0].clone();
        let mut b = bank.oscillators[1].clone();
        for _ in 0..5000 {
            bank.sample();

            a.apply_hard_sync(&mut b);
            b.apply_hard_sync(&mut a);
            a.sample();
            b.sample();

            assert_eq!(bank.oscillators[0].phase(), a.phase());
            assert_eq!(bank.oscillators[1].phase(), b.phase());
        }
    }

    #[test]
    fn test_custom_sync_source() {
        let mut bank = OscillatorBank::<3>::new(RATE);
        bank.set_sync_source(0, 1);
        bank.oscillators[1].set_hz(1000.0);
        bank.oscillators[0].set_waveforms(Waveforms::SAW.with_sync());
        bank.oscillators[0].set_hz(1733.0);

        bank.sample();
        let mut resets = 0;
        for _ in 1..(RATE as usize / 100) {
            bank.sample();
            // Zeroed before advancing once
            let slave = &bank.oscillators[0];
            if slave.phase() == slave.increment() {
                resets += 1;
            }
        }
        // 10 ms at 1 kHz
        assert_eq!(resets, 10);
    }

    #[test]
    fn test_silent_bank_matches_bare_filter() {
        let mut bank = OscillatorBank::<2>::new(RATE);
        bank.filter.set_fc(900.0);
        bank.filter.lowpass_gain = 1.0;
        bank.gain = 0.5;

        let mut filter = bank.filter.clone();
        let mut blocker = DcBlocker::new(DC_CUTOFF, RATE);
        for _ in 0..1000 {
            assert_eq!(bank.sample(), blocker.sample(filter.sample(0.0, 0.0)) * 0.5);
        }
    }

    #[test]
    fn test_silent_bank_settles_to_zero() {
        let mut bank = OscillatorBank::<2>::new(RATE);
        bank.filter.set_fc(1148.0);
        bank.filter.set_q(0.4);
        bank.filter.lowpass_gain = 1.0;
        bank.filter.highpass_gain = 0.3;

        // The bare filter rests well away from zero
        let mut filter = bank.filter.clone();
        let mut out = 0.0;
        for _ in 0..400_000 {
            filter.sample(0.0, 0.0);
            out = bank.sample();
        }
        assert!(filter.sample(0.0, 0.0).abs() > 0.1);
        assert!(out.abs() < 1e-6, "bank rests at {}", out);
    }

    #[test]
    fn test_mixes_both_buses() {
        let mut bank = OscillatorBank::<1>::new(RATE);
        let osc = &mut bank.oscillators[0];
        osc.set_waveforms(Waveforms::SQUARE);
        osc.set_hz(440.0);
        osc.gain = 0.3;
        osc.filter_gain = 0.7;
        osc.envelope.on();
        bank.filter.set_fc(1148.0);
        bank.filter.lowpass_gain = 1.0;

        let mut osc = bank.oscillators[0].clone();
        let mut filter = bank.filter.clone();
        let mut blocker = DcBlocker::new(DC_CUTOFF, RATE);
        for _ in 0..2000 {
            let v = osc.sample();
            assert_eq!(bank.sample(), blocker.sample(filter.sample(v * 0.3, v * 0.7)));
        }
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_rejects_bad_sync_source() {
        OscillatorBank::<2>::default().set_sync_source(0, 2);
    }
}
