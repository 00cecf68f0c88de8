//! Exponential ADSR envelope.
//!
//! Each stage runs the one-pole recurrence `value = base + value * coef`, aimed
//! a little past its target so the curve crosses it in roughly the configured
//! time. The stage ends on the sample that reaches or crosses the target; the
//! value is clamped there and the next state begins.
//!
//! ```text
//!         on()                       off()
//!  Idle ───────► Attack ──► Decay ──► Sustain ───────► Release ──► Idle
//!                 ▲  value ≥ 1   value < sustain        value ≤ 0
//!                 └── on() from any state (value kept)
//! ```

use crate::math::slope_coef;
use crate::sampler::Sampler;

/// Envelope state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvelopeState {
    #[default]
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// Time constant and curvature of one stage, plus the derived recurrence.
#[derive(Debug, Clone, Copy)]
struct Stage {
    time: f32,
    slope: f32,
    coef: f32,
    base: f32,
}

impl Stage {
    fn new(time: f32, slope: f32) -> Self {
        Self {
            time,
            slope,
            coef: 0.0,
            base: 0.0,
        }
    }

    #[inline]
    fn step(&self, value: f32) -> f32 {
        self.base + value * self.coef
    }
}

fn check_stage(stage: &str, time: f32, slope: f32) {
    assert!(
        time.is_finite() && time >= 0.0,
        "{} time must be finite and non-negative, got {}",
        stage,
        time
    );
    assert!(
        slope.is_finite() && slope > 0.0,
        "{} slope must be positive, got {}",
        stage,
        slope
    );
}

/// Per-voice attack/decay/sustain/release generator.
#[derive(Debug, Clone)]
pub struct Envelope {
    sample_rate: f32,
    value: f32,
    state: EnvelopeState,
    attack: Stage,
    decay: Stage,
    sustain: f32,
    release: Stage,
}

impl Envelope {
    pub fn new(sample_rate: f32) -> Self {
        let mut env = Self {
            sample_rate: 44100.0,
            value: 0.0,
            state: EnvelopeState::Idle,
            attack: Stage::new(0.01, 0.01),
            decay: Stage::new(0.1, 1.0),
            sustain: 1.0,
            release: Stage::new(0.5, 1.0),
        };
        env.set_sample_rate(sample_rate);
        env
    }

    /// Start (or restart) the attack stage from the current value.
    pub fn on(&mut self) {
        self.state = EnvelopeState::Attack;
    }

    /// Enter the release stage. Ignored while idle.
    pub fn off(&mut self) {
        if self.state != EnvelopeState::Idle {
            self.state = EnvelopeState::Release;
        }
    }

    /// Attack time in seconds and curvature.
    pub fn set_attack(&mut self, time: f32, slope: f32) {
        check_stage("attack", time, slope);
        self.attack = Stage::new(time, slope);
        self.update_attack();
    }

    pub fn set_decay(&mut self, time: f32, slope: f32) {
        check_stage("decay", time, slope);
        self.decay = Stage::new(time, slope);
        self.update_decay();
    }

    /// Sustain level in `[0, 1]`.
    pub fn set_sustain(&mut self, level: f32) {
        assert!(
            (0.0..=1.0).contains(&level),
            "sustain level must be within 0..=1, got {}",
            level
        );
        self.sustain = level;
        self.update_decay();
    }

    pub fn set_release(&mut self, time: f32, slope: f32) {
        check_stage("release", time, slope);
        self.release = Stage::new(time, slope);
        self.update_release();
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn state(&self) -> EnvelopeState {
        self.state
    }

    pub fn sustain(&self) -> f32 {
        self.sustain
    }

    /// True unless idle.
    pub fn is_active(&self) -> bool {
        self.state != EnvelopeState::Idle
    }

    fn update_attack(&mut self) {
        let a = &mut self.attack;
        a.coef = slope_coef(a.time * self.sample_rate, a.slope);
        a.base = (1.0 + a.slope) * (1.0 - a.coef);
    }

    fn update_decay(&mut self) {
        let d = &mut self.decay;
        d.coef = slope_coef(d.time * self.sample_rate, d.slope);
        d.base = (self.sustain - d.slope) * (1.0 - d.coef);
    }

    fn update_release(&mut self) {
        let r = &mut self.release;
        r.coef = slope_coef(r.time * self.sample_rate, r.slope);
        r.base = -r.slope * (1.0 - r.coef);
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new(44100.0)
    }
}

impl Sampler for Envelope {
    type Frame = f32;

    fn set_sample_rate(&mut self, sample_rate: f32) {
        assert!(
            sample_rate.is_finite() && sample_rate > 0.0,
            "sample rate must be positive, got {}",
            sample_rate
        );
        self.sample_rate = sample_rate;
        self.update_attack();
        self.update_decay();
        self.update_release();
    }

    #[inline]
    fn sample(&mut self) -> f32 {
        match self.state {
            EnvelopeState::Idle | EnvelopeState::Sustain => {}
            EnvelopeState::Attack => {
                self.value = self.attack.step(self.value);
                if self.value >= 1.0 {
                    self.value = 1.0;
                    self.state = EnvelopeState::Decay;
                }
            }
            EnvelopeState::Decay => {
                self.value = self.decay.step(self.value);
                if self.value < self.sustain {
                    self.value = self.sustain;
                    self.state = EnvelopeState::Sustain;
                }
            }
            EnvelopeState::Release => {
                self.value = self.release.step(self.value);
                if self.value <= 0.0 {
                    self.value = 0.0;
                    self.state = EnvelopeState::Idle;
                }
            }
        }
        self.value
    }
}
