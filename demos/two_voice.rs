//! Demo: Two-Voice Song
//!
//! A square lead and a saw bass share one resonant filter inside a 16x
//! oversampled bank. A step pattern triggers the notes every 10000 samples
//! while a slower event sweeps the cutoff and the lead's pulse width.
//!
//! Run with: cargo run --example two_voice [-- out.wav]

use tickwave::prelude::*;

const SAMPLE_RATE: u32 = 44100;
const SECONDS: usize = 12;
const STEP: u64 = 10_000;
const MOTION: u64 = 1_000;

#[derive(Clone, Copy)]
enum Step {
    Note(i32),
    Off,
    Hold,
}

use Step::{Hold, Note, Off};

const LEAD: [Step; 16] = [
    Note(0),
    Note(3),
    Note(7),
    Note(12),
    Off,
    Note(10),
    Note(3),
    Note(7),
    Note(-2),
    Off,
    Note(2),
    Note(3),
    Note(5),
    Hold,
    Off,
    Hold,
];

const BASS: [Step; 16] = [
    Note(0),
    Note(0),
    Note(3),
    Note(3),
    Off,
    Note(3),
    Note(3),
    Note(5),
    Hold,
    Note(-5),
    Off,
    Note(7),
    Note(-2),
    Note(-2),
    Note(5),
    Note(7),
];

struct Song {
    bank: FirOversampler<OscillatorBank<2>, 16, 2>,
    step: usize,
    t2: f32,
}

impl Sampler for Song {
    type Frame = f32;

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.bank.set_sample_rate(sample_rate);
    }

    fn sample(&mut self) -> f32 {
        self.bank.sample()
    }
}

fn play(osc: &mut Oscillator, base_hz: f32, step: Step) {
    match step {
        Note(n) => {
            osc.set_hz(note_to_hz(base_hz, n as f32));
            osc.envelope.on();
        }
        Off => osc.envelope.off(),
        Hold => {}
    }
}

fn song_tick(seq: &mut Sequencer<Song>) {
    let song = seq.state_mut();
    let step = song.step % LEAD.len();
    song.step += 1;

    let bank = song.bank.inner_mut();
    play(&mut bank.oscillators[0], 200.0, LEAD[step]);
    play(&mut bank.oscillators[1], 100.0, BASS[step]);

    seq.schedule(STEP, song_tick);
}

fn motion_tick(seq: &mut Sequencer<Song>) {
    let song = seq.state_mut();
    let t2 = song.t2;
    let bank = song.bank.inner_mut();
    bank.oscillators[0].set_shift(t2.sin() * 0.48);
    bank.filter.set_fc((t2 * 1.3).sin() * 1000.0 + 1000.0);
    song.t2 += 0.006;

    seq.schedule(MOTION, motion_tick);
}

fn voice(
    waveforms: Waveforms,
    gain: f32,
    filter_gain: f32,
    attack: f32,
    decay: f32,
    sustain: f32,
) -> OscillatorConfig {
    OscillatorConfig {
        waveforms,
        gain,
        filter_gain,
        envelope: EnvelopeConfig {
            attack: StageConfig::new(attack, 0.01),
            decay: StageConfig::new(decay, 1.0),
            sustain,
            release: StageConfig::new(0.5, 1.0),
        },
        ..OscillatorConfig::default()
    }
}

fn main() {
    let path = std::env::args().nth(1);

    let patch = BankConfig {
        gain: 0.8,
        ..BankConfig::new("two voice")
    }
    .with_oscillator(voice(Waveforms::SQUARE, 0.1, 1.0, 0.01, 0.1, 0.1))
    .with_oscillator(voice(Waveforms::SAW, 0.01, 0.5, 0.1, 0.2, 0.3))
    .with_filter(FilterConfig {
        fc: 2048.0 - 900.0,
        q: 0.4,
        lowpass_gain: 1.0,
        highpass_gain: 0.3,
        ..FilterConfig::default()
    });

    println!("=== Two-Voice Song ===\n");
    match patch.to_json() {
        Ok(json) => println!("Patch:\n{}\n", json),
        Err(e) => eprintln!("could not serialize patch: {}", e),
    }

    let bank = match patch.build::<2>(SAMPLE_RATE as f32) {
        Ok(bank) => bank,
        Err(e) => {
            eprintln!("invalid patch: {}", e);
            std::process::exit(1);
        }
    };

    let mut tables = TableCache::new();
    let mut song = Song {
        bank: bank.oversample::<16, 2>(&mut tables),
        step: 0,
        t2: 0.0,
    };
    song.set_sample_rate(SAMPLE_RATE as f32);

    let mut seq = Sequencer::with_capacity(song, 8);
    seq.schedule(0, song_tick);
    seq.schedule(0, motion_tick);

    // Render in host-sized blocks, the way an audio callback would
    let mut stereo = vec![0.0f32; SECONDS * SAMPLE_RATE as usize * 2];
    for block in stereo.chunks_mut(512) {
        seq.render_interleaved(block, 2);
    }

    let peak = stereo.iter().fold(0.0f32, |m, v| m.max(v.abs()));
    let mean = stereo.iter().sum::<f32>() / stereo.len() as f32;
    println!("Rendered {} s, {} steps", SECONDS, seq.state().step);
    println!("Peak: {:.3}  DC offset: {:.3}", peak, mean);

    if let Some(path) = path {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let result = hound::WavWriter::create(&path, spec).and_then(|mut writer| {
            for &s in stereo.iter() {
                writer.write_sample(s)?;
            }
            writer.finalize()
        });
        match result {
            Ok(()) => println!("Wrote {}", path),
            Err(e) => eprintln!("could not write {}: {}", path, e),
        }
    }
}
