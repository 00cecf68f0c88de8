//! # Tickwave: Sample-Accurate Synthesis Engine
//!
//! `tickwave` is a small real-time synthesis library built around one idea:
//! every sound source is a [`Sampler`](sampler::Sampler) that is pulled one
//! frame at a time, and every parameter change is an event that lands on an
//! exact sample.
//!
//! ## Architecture
//!
//! - **Voices** - phase-accumulator [`Oscillator`](oscillator::Oscillator)s
//!   with bit-combined waveforms, noise, wavetables and hard sync, each shaped
//!   by an exponential [`Envelope`](envelope::Envelope)
//! - **Bank** - an [`OscillatorBank`](bank::OscillatorBank) mixes its voices
//!   into a direct bus and a filter bus feeding a
//!   [`ResonantFilter`](filter::ResonantFilter)
//! - **Sample playback** - a [`PolyphaseResampler`](resampler::PolyphaseResampler)
//!   plays [`SampleBuffer`](sample::SampleBuffer)s, usually loaded with
//!   [`wav::load`]
//! - **Anti-aliasing** - a [`FirOversampler`](oversampler::FirOversampler)
//!   runs any sampler at a multiple of the output rate and decimates it
//! - **Scheduling** - a [`Sequencer`](scheduler::Sequencer) fires callbacks
//!   on exact ticks while rendering
//!
//! Kernel tables are generated once and shared through a
//! [`TableCache`](tables::TableCache).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tickwave::prelude::*;
//!
//! struct Song {
//!     voice: FirOversampler<OscillatorBank<1>, 16, 2>,
//! }
//!
//! impl Sampler for Song {
//!     type Frame = f32;
//!
//!     fn set_sample_rate(&mut self, sample_rate: f32) {
//!         self.voice.set_sample_rate(sample_rate);
//!     }
//!
//!     fn sample(&mut self) -> f32 {
//!         self.voice.sample()
//!     }
//! }
//!
//! fn note_on(seq: &mut Sequencer<Song>) {
//!     let osc = seq.state_mut().voice.inner_mut().oscillator_mut(0);
//!     osc.set_hz(220.0);
//!     osc.envelope.on();
//! }
//!
//! let mut tables = TableCache::new();
//! let mut bank = OscillatorBank::<1>::default();
//! bank.oscillators[0].set_waveforms(Waveforms::SAW);
//!
//! let mut song = Song {
//!     voice: bank.oversample::<16, 2>(&mut tables),
//! };
//! song.set_sample_rate(44100.0);
//!
//! let mut seq = Sequencer::new(song);
//! seq.schedule(0, note_on);
//!
//! let mut out = vec![0.0f32; 512];
//! seq.render(&mut out);
//! ```

pub mod bank;
pub mod config;
pub mod envelope;
pub mod error;
pub mod filter;
pub mod frame;
pub mod math;
pub mod oscillator;
pub mod oversampler;
pub mod resampler;
pub mod sample;
pub mod sampler;
pub mod scheduler;
pub mod tables;
pub mod wav;

/// Prelude module for convenient imports
pub mod prelude {
    // Core capability
    pub use crate::frame::{Frame, Mono, Signal, Stereo};
    pub use crate::sampler::{Gain, Map, Sampler, SamplerExt};

    // Voices
    pub use crate::bank::OscillatorBank;
    pub use crate::envelope::{Envelope, EnvelopeState};
    pub use crate::filter::{FilterModel, ResonantFilter};
    pub use crate::oscillator::{Oscillator, Waveforms};

    // Samples
    pub use crate::resampler::PolyphaseResampler;
    pub use crate::sample::SampleBuffer;
    pub use crate::wav;

    // Infrastructure
    pub use crate::config::{
        BankConfig, EnvelopeConfig, FilterConfig, OscillatorConfig, StageConfig,
    };
    pub use crate::error::{ConfigError, LoadError};
    pub use crate::math::note_to_hz;
    pub use crate::oversampler::FirOversampler;
    pub use crate::scheduler::{EventQueue, Sequencer};
    pub use crate::tables::{TableCache, Window};
}
