//! Patch Configuration
//!
//! Serializable description of an [`OscillatorBank`] patch: per-voice
//! waveforms, pitch, gains and envelope shape, plus the filter settings.
//! Patches are stored as JSON.
//!
//! [`BankConfig::apply`] validates the whole patch before touching the bank,
//! so a rejected patch leaves the bank exactly as it was.

use crate::bank::OscillatorBank;
use crate::error::ConfigError;
use crate::filter::FilterModel;
use crate::oscillator::{Waveforms, WAVETABLE_SIZE};
use serde::{Deserialize, Serialize};

/// One envelope stage: duration in seconds and curvature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    pub time: f32,
    pub slope: f32,
}

impl StageConfig {
    pub fn new(time: f32, slope: f32) -> Self {
        Self { time, slope }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeConfig {
    pub attack: StageConfig,
    pub decay: StageConfig,
    pub sustain: f32,
    pub release: StageConfig,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            attack: StageConfig::new(0.01, 0.01),
            decay: StageConfig::new(0.1, 1.0),
            sustain: 1.0,
            release: StageConfig::new(0.5, 1.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OscillatorConfig {
    pub waveforms: Waveforms,
    pub hz: f32,
    pub shift: f32,
    pub gain: f32,
    pub filter_gain: f32,
    pub envelope: EnvelopeConfig,
    /// Oscillator this one follows when `waveforms.sync` is set. When absent,
    /// `apply` rewires it to the predecessor.
    pub sync_source: Option<usize>,
    pub wavetable: Option<Vec<i16>>,
}

impl Default for OscillatorConfig {
    fn default() -> Self {
        Self {
            waveforms: Waveforms::NONE,
            hz: 440.0,
            shift: 0.0,
            gain: 1.0,
            filter_gain: 0.0,
            envelope: EnvelopeConfig::default(),
            sync_source: None,
            wavetable: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub fc: f32,
    pub q: f32,
    pub lowpass_gain: f32,
    pub bandpass_gain: f32,
    pub highpass_gain: f32,
    /// Circuit constants; the stock model when absent.
    pub model: Option<FilterModel>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            fc: 1024.0,
            q: 0.0,
            lowpass_gain: 1.0,
            bandpass_gain: 0.0,
            highpass_gain: 0.0,
            model: None,
        }
    }
}

/// A complete bank patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankConfig {
    /// Schema version for forward compatibility
    pub version: u32,
    pub name: String,
    pub gain: f32,
    pub oscillators: Vec<OscillatorConfig>,
    #[serde(default)]
    pub filter: FilterConfig,
}

impl BankConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: 1,
            name: name.into(),
            gain: 1.0,
            oscillators: vec![],
            filter: FilterConfig::default(),
        }
    }

    pub fn with_oscillator(mut self, oscillator: OscillatorConfig) -> Self {
        self.oscillators.push(oscillator);
        self
    }

    pub fn with_filter(mut self, filter: FilterConfig) -> Self {
        self.filter = filter;
        self
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check the patch against a bank of `n` oscillators.
    pub fn validate(&self, n: usize) -> Result<(), ConfigError> {
        if self.oscillators.len() != n {
            return Err(ConfigError::OscillatorCount {
                expected: n,
                found: self.oscillators.len(),
            });
        }
        finite("bank gain", self.gain)?;

        for (index, osc) in self.oscillators.iter().enumerate() {
            non_negative("frequency", osc.hz)?;
            finite("phase shift", osc.shift)?;
            finite("gain", osc.gain)?;
            finite("filter gain", osc.filter_gain)?;

            let env = &osc.envelope;
            for (stage, s) in [
                ("attack", env.attack),
                ("decay", env.decay),
                ("release", env.release),
            ] {
                if !(s.slope.is_finite() && s.slope > 0.0) {
                    return Err(ConfigError::InvalidSlope {
                        index,
                        stage,
                        slope: s.slope,
                    });
                }
                non_negative("envelope time", s.time)?;
            }
            unit("sustain level", env.sustain)?;

            if let Some(source) = osc.sync_source {
                if source >= n {
                    return Err(ConfigError::SyncSource {
                        index,
                        source_index: source,
                    });
                }
            }
            if let Some(table) = &osc.wavetable {
                if table.len() != WAVETABLE_SIZE {
                    return Err(ConfigError::WavetableSize {
                        index,
                        len: table.len(),
                        expected: WAVETABLE_SIZE,
                    });
                }
            }
        }

        let f = &self.filter;
        finite("cutoff", f.fc)?;
        finite("resonance", f.q)?;
        finite("lowpass gain", f.lowpass_gain)?;
        finite("bandpass gain", f.bandpass_gain)?;
        finite("highpass gain", f.highpass_gain)?;
        Ok(())
    }

    /// Validate, then configure every voice and the filter of `bank`.
    ///
    /// Envelopes are reshaped but not triggered, and filter taps are kept.
    pub fn apply<const N: usize>(&self, bank: &mut OscillatorBank<N>) -> Result<(), ConfigError> {
        self.validate(N)?;

        bank.gain = self.gain;
        for (index, cfg) in self.oscillators.iter().enumerate() {
            let source = cfg
                .sync_source
                .unwrap_or_else(|| OscillatorBank::<N>::default_sync_source(index));
            bank.set_sync_source(index, source);

            let osc = bank.oscillator_mut(index);
            osc.set_waveforms(cfg.waveforms);
            osc.set_hz(cfg.hz);
            osc.set_shift(cfg.shift);
            osc.gain = cfg.gain;
            osc.filter_gain = cfg.filter_gain;
            if let Some(table) = &cfg.wavetable {
                let mut entries = [0i16; WAVETABLE_SIZE];
                entries.copy_from_slice(table);
                osc.set_wavetable(&entries);
            }

            let env = &mut osc.envelope;
            let e = &cfg.envelope;
            env.set_sustain(e.sustain);
            env.set_attack(e.attack.time, e.attack.slope);
            env.set_decay(e.decay.time, e.decay.slope);
            env.set_release(e.release.time, e.release.slope);
        }

        let filter = &mut bank.filter;
        if let Some(model) = self.filter.model {
            filter.set_model(model);
        }
        filter.set_fc(self.filter.fc);
        filter.set_q(self.filter.q);
        filter.lowpass_gain = self.filter.lowpass_gain;
        filter.bandpass_gain = self.filter.bandpass_gain;
        filter.highpass_gain = self.filter.highpass_gain;

        log::debug!(
            "applied patch '{}' to a bank of {} oscillator(s)",
            self.name,
            N
        );
        Ok(())
    }

    /// Build a bank at `sample_rate` configured with this patch.
    pub fn build<const N: usize>(&self, sample_rate: f32) -> Result<OscillatorBank<N>, ConfigError> {
        let mut bank = OscillatorBank::new(sample_rate);
        self.apply(&mut bank)?;
        Ok(bank)
    }
}

impl Default for BankConfig {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

fn finite(what: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue { what, value })
    }
}

fn unit(what: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue { what, value })
    }
}

fn non_negative(what: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue { what, value })
    }
}
