//! Nonlinear resonant filter
//!
//! An emulation of a classic sound chip's state-variable filter. Signals are
//! mapped into the chip's internal voltage range, soft-clipped above a
//! saturation threshold and pushed through three running taps (low, band and
//! high). The low and band taps lose a share of their value through a
//! FET-resistance "distortion" term that depends exponentially on the tap
//! voltage and the cutoff register, which gives the filter its gritty,
//! level-dependent character.
//!
//! The recurrence is nonlinear and sensitive to rounding, so every update
//! happens in a fixed order in single precision. Changing cutoff or resonance
//! never touches the taps, and there is no reset.
//!
//! The circuit constants assume an oversampled rate. The distortion term grows
//! as the sample rate falls, and around plain audio rates (44.1 kHz) the taps
//! can run away to infinity. Run the filter inside a
//! [`FirOversampler`](crate::oversampler::FirOversampler), as the bank
//! normally is, at 4x or more.

use serde::{Deserialize, Serialize};

/// Circuit constants of the emulated filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterModel {
    /// Internal voltage corresponding to an input of -1.
    pub map_neg: f32,
    /// Internal voltage corresponding to an input of +1.
    pub map_pos: f32,
    pub saturation_threshold: f32,
    /// Fraction of the overshoot removed above the threshold.
    pub saturation_slope: f32,
    pub distortion_rate: f32,
    pub distortion_cf_threshold: f32,
    pub steepness: f32,
    /// Cutoff register value where the distortion offset crosses zero.
    pub distortion_point: f32,
    pub min_fet_resistance: f32,
    pub base_resistance: f32,
    pub output_difference: f32,
    pub offset: f32,
    /// Integrator capacitance in farads.
    pub capacitance: f32,
}

impl Default for FilterModel {
    fn default() -> Self {
        Self {
            map_neg: 293760.0,
            map_pos: 13382400.0,
            saturation_threshold: 3.2e6,
            saturation_slope: 0.4,
            distortion_rate: 0.5,
            distortion_cf_threshold: 1.2e-4,
            steepness: 1.0065,
            distortion_point: 2048.0,
            min_fet_resistance: 1.6e4,
            base_resistance: 1.37e6,
            output_difference: 1.5,
            offset: 4.5e8,
            capacitance: 470e-12,
        }
    }
}

impl FilterModel {
    pub fn log_steepness(&self) -> f32 {
        -libm::logf(self.steepness) / 256.0
    }

    /// Unit range to internal voltage.
    #[inline]
    pub fn map(&self, x: f32) -> f32 {
        self.map_neg + (x + 1.0) * ((self.map_pos - self.map_neg) / 2.0)
    }

    /// Internal voltage back to unit scale (no offset removal).
    #[inline]
    pub fn unmap(&self, x: f32) -> f32 {
        x * (2.0 / (self.map_pos - self.map_neg))
    }
}

#[derive(Debug, Clone)]
pub struct ResonantFilter {
    model: FilterModel,
    log_steepness: f32,
    sample_rate: f32,

    pub lowpass_gain: f32,
    pub bandpass_gain: f32,
    pub highpass_gain: f32,

    fc: f32,
    q: f32,

    vlp: f32,
    vbp: f32,
    vhp: f32,

    distortion_ct: f32,
    fc_exp: f32,
    fc_distortion_offset: f32,
    rq: f32,
}

impl ResonantFilter {
    pub fn new(sample_rate: f32) -> Self {
        Self::with_model(FilterModel::default(), sample_rate)
    }

    pub fn with_model(model: FilterModel, sample_rate: f32) -> Self {
        let mut filter = Self {
            log_steepness: model.log_steepness(),
            model,
            sample_rate,
            lowpass_gain: 0.0,
            bandpass_gain: 0.0,
            highpass_gain: 0.0,
            fc: 0.0,
            q: 0.0,
            vlp: 0.0,
            vbp: 0.0,
            vhp: 0.0,
            distortion_ct: 0.0,
            fc_exp: 0.0,
            fc_distortion_offset: 0.0,
            rq: 0.0,
        };
        filter.set_sample_rate(sample_rate);
        filter.set_fc(0.0);
        filter.set_q(0.0);
        filter
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        assert!(
            sample_rate.is_finite() && sample_rate > 0.0,
            "sample rate must be positive, got {}",
            sample_rate
        );
        self.sample_rate = sample_rate;
        self.distortion_ct = 1.0 / (self.model.capacitance * sample_rate);
    }

    /// Swap the circuit constants, keeping the taps, cutoff and resonance.
    pub fn set_model(&mut self, model: FilterModel) {
        self.model = model;
        self.log_steepness = model.log_steepness();
        self.set_sample_rate(self.sample_rate);
        self.set_fc(self.fc);
    }

    /// Set the cutoff register (nominally 0..2047).
    pub fn set_fc(&mut self, fc: f32) {
        self.fc = fc;
        self.fc_exp = self.model.offset * libm::expf(fc * self.log_steepness * 256.0);
        self.fc_distortion_offset =
            (self.model.distortion_point - fc) * 256.0 * self.model.distortion_rate;
    }

    pub fn set_q(&mut self, q: f32) {
        self.q = q;
        self.rq = 1.0 / (0.707 + q);
    }

    pub fn fc(&self) -> f32 {
        self.fc
    }

    pub fn q(&self) -> f32 {
        self.q
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn model(&self) -> &FilterModel {
        &self.model
    }

    /// Current (low, band, high) tap voltages.
    pub fn taps(&self) -> (f32, f32, f32) {
        (self.vlp, self.vbp, self.vhp)
    }

    fn distortion(&self, v: f32) -> f32 {
        let dist = v - self.fc_distortion_offset;
        let mut fet_resistance = self.fc_exp;
        if dist > 0.0 {
            fet_resistance *= libm::expf(dist * self.log_steepness);
        }
        let dynamic_resistance = self.model.min_fet_resistance + fet_resistance;
        let one_div_resistance = (self.model.base_resistance + dynamic_resistance)
            / (self.model.base_resistance * dynamic_resistance);
        self.distortion_ct * one_div_resistance
    }

    /// Run one sample. `direct` bypasses the taps' inputs, `filtered` feeds
    /// them. Returns the output node in unit scale, which carries the tap
    /// feedback and rests at a nonzero level; see [`DcBlocker`].
    #[inline]
    pub fn sample(&mut self, direct: f32, filtered: f32) -> f32 {
        let m = self.model;
        let vi = m.map(filtered);
        let mut vf = m.map(direct);

        vf += self.vlp * self.lowpass_gain;
        vf += self.vbp * self.bandpass_gain;
        vf += self.vhp * self.highpass_gain;

        if vf > m.saturation_threshold {
            vf -= (vf - m.saturation_threshold) * m.saturation_slope;
        }

        vf -= (vi * m.distortion_rate + self.vhp + self.vlp - self.vbp * self.rq)
            * 0.5
            * self.bandpass_gain;
        self.vbp += (vf - self.vbp) * m.distortion_cf_threshold * self.bandpass_gain;
        self.vlp += (vf - self.vlp) * m.distortion_cf_threshold * self.lowpass_gain;
        self.vhp += (vf - self.vhp) * m.distortion_cf_threshold * self.highpass_gain;
        self.vlp -= self.vbp * self.distortion(self.vbp) * m.output_difference;
        self.vbp -= self.vhp * self.distortion(self.vhp);
        self.vhp = self.vbp * self.rq
            - (self.vlp * (1.0 / m.output_difference))
            - vi * m.distortion_rate;

        m.unmap(vf)
    }
}

impl Default for ResonantFilter {
    fn default() -> Self {
        Self::new(44100.0)
    }
}

/// First-order highpass that removes a constant offset.
///
/// The output node of [`ResonantFilter`] rests at a level set by its circuit
/// constants and cutoff, not at zero. Placing a blocker after it lets a silent
/// voice decay to silence. Coefficients come from the bilinear transform of a
/// single RC stage: `y = b0·(x - x₁) + a1·y₁`.
#[derive(Debug, Clone)]
pub struct DcBlocker {
    cutoff: f32,
    a1: f32,
    b0: f32,
    x_prev: f32,
    y_prev: f32,
}

impl DcBlocker {
    pub fn new(cutoff: f32, sample_rate: f32) -> Self {
        assert!(
            cutoff.is_finite() && cutoff > 0.0,
            "blocker cutoff must be positive, got {}",
            cutoff
        );
        let mut blocker = Self {
            cutoff,
            a1: 0.0,
            b0: 0.0,
            x_prev: 0.0,
            y_prev: 0.0,
        };
        blocker.set_sample_rate(sample_rate);
        blocker
    }

    /// Recompute the coefficients; the stored history is kept.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        assert!(
            sample_rate.is_finite() && sample_rate > 0.0,
            "sample rate must be positive, got {}",
            sample_rate
        );
        let w = libm::tan(core::f64::consts::PI * self.cutoff as f64 / sample_rate as f64);
        self.a1 = ((1.0 - w) / (1.0 + w)) as f32;
        self.b0 = (1.0 / (1.0 + w)) as f32;
    }

    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    #[inline]
    pub fn sample(&mut self, x: f32) -> f32 {
        let y = self.b0 * (x - self.x_prev) + self.a1 * self.y_prev;
        self.x_prev = x;
        self.y_prev = y;
        y
    }
}
