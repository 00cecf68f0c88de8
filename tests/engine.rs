use tickwave::prelude::*;

const RATE: f32 = 44100.0;
const NOTE_OFF: u64 = 10_000;

struct Song {
    voice: FirOversampler<OscillatorBank<2>, 16, 2>,
    t2: f32,
}

impl Sampler for Song {
    type Frame = f32;

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.voice.set_sample_rate(sample_rate);
    }

    fn sample(&mut self) -> f32 {
        self.voice.sample()
    }
}

fn patch() -> BankConfig {
    BankConfig {
        gain: 0.8,
        ..BankConfig::new("lead and bass")
    }
    .with_oscillator(OscillatorConfig {
        waveforms: Waveforms::SQUARE,
        gain: 0.1,
        filter_gain: 1.0,
        envelope: EnvelopeConfig {
            attack: StageConfig::new(0.01, 0.01),
            decay: StageConfig::new(0.1, 1.0),
            sustain: 0.1,
            release: StageConfig::new(0.5, 1.0),
        },
        ..OscillatorConfig::default()
    })
    .with_oscillator(OscillatorConfig {
        waveforms: Waveforms::SAW,
        gain: 0.01,
        filter_gain: 0.5,
        envelope: EnvelopeConfig {
            attack: StageConfig::new(0.1, 0.01),
            decay: StageConfig::new(0.2, 1.0),
            sustain: 0.3,
            release: StageConfig::new(0.5, 1.0),
        },
        ..OscillatorConfig::default()
    })
    .with_filter(FilterConfig {
        fc: 1148.0,
        q: 0.4,
        lowpass_gain: 1.0,
        highpass_gain: 0.3,
        ..FilterConfig::default()
    })
}

fn note_on(seq: &mut Sequencer<Song>) {
    let bank = seq.state_mut().voice.inner_mut();
    bank.oscillators[0].set_hz(note_to_hz(200.0, 0.0));
    bank.oscillators[0].envelope.on();
    bank.oscillators[1].set_hz(note_to_hz(100.0, 0.0));
    bank.oscillators[1].envelope.on();
    seq.schedule(NOTE_OFF, note_off);
}

fn note_off(seq: &mut Sequencer<Song>) {
    for osc in seq.state_mut().voice.inner_mut().oscillators.iter_mut() {
        osc.envelope.off();
    }
}

fn motion(seq: &mut Sequencer<Song>) {
    let song = seq.state_mut();
    let t2 = song.t2;
    let bank = song.voice.inner_mut();
    bank.oscillators[0].set_shift(t2.sin() * 0.48);
    bank.filter.set_fc((t2 * 1.3).sin() * 1000.0 + 1000.0);
    song.t2 += 0.006;

    if seq.now() + 1000 < NOTE_OFF {
        seq.schedule(1000, motion);
    }
}

fn sequencer() -> Sequencer<Song> {
    let mut tables = TableCache::new();
    let bank = patch().build::<2>(RATE).unwrap();
    let mut song = Song {
        voice: bank.oversample::<16, 2>(&mut tables),
        t2: 0.0,
    };
    song.set_sample_rate(RATE);

    let mut seq = Sequencer::with_capacity(song, 8);
    seq.schedule(0, note_on);
    seq.schedule(0, motion);
    seq
}

#[test]
fn note_plays_and_decays_to_silence() {
    let mut seq = sequencer();
    let mut out = vec![0.0f32; 36_000];
    for block in out.chunks_mut(256) {
        seq.render(block);
    }

    assert!(out.iter().all(|v| v.is_finite()));
    assert!(out.iter().all(|v| v.abs() < 1.5));

    let held = &out[1000..NOTE_OFF as usize];
    let (lo, hi) = min_max(held);
    assert!(hi - lo > 0.1, "held note is nearly silent: {}..{}", lo, hi);

    for osc in seq.state().voice.inner().oscillators.iter() {
        assert_eq!(osc.envelope.state(), EnvelopeState::Idle);
    }
    assert_eq!(seq.pending(), 0);

    // Release is 0.5 s
    let rest = NOTE_OFF as usize + (0.5 * RATE) as usize;
    let loudest = out[rest..].iter().fold(0.0f32, |m, v| m.max(v.abs()));
    assert!(loudest < 1e-5, "still sounding after release: {}", loudest);
}

#[test]
fn waveform_has_no_jumps() {
    let mut seq = sequencer();
    let mut out = vec![0.0f32; 36_000];
    seq.render(&mut out);

    let step = |t: usize| (out[t] - out[t - 1]).abs();
    let widest = |ticks: std::ops::Range<usize>| ticks.map(step).fold(0.0f32, f32::max);

    // Square edges are the steepest thing the patch makes
    assert!(widest(1..out.len()) < 0.5);

    let off = NOTE_OFF as usize;
    assert!(widest(off - 2..off + 3) < 0.02, "click at note off");

    for t in (1000..off).step_by(1000) {
        assert!(widest(t - 2..t + 3) < 0.1, "click at cutoff change {}", t);
    }

    // Release is smooth
    assert!(widest(off + 3..out.len()) < 0.05);
}

#[test]
fn block_rendering_matches_ticking() {
    let mut a = sequencer();
    let mut b = sequencer();

    let mut blocks = vec![0.0f32; 3000];
    for block in blocks.chunks_mut(100) {
        a.render(block);
    }
    let ticked: Vec<f32> = (0..3000).map(|_| b.tick()).collect();
    assert_eq!(blocks, ticked);
}

#[test]
fn wav_file_plays_back_at_native_pitch() {
    let path = std::env::temp_dir().join(format!("tickwave-engine-{}.wav", std::process::id()));
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 44100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for i in 0..4410 {
        let v = (2.0 * std::f32::consts::PI * 441.0 * i as f32 / 44100.0).sin();
        writer.write_sample((v * 32767.0) as i16).unwrap();
    }
    writer.finalize().unwrap();

    let buffer = wav::load::<1, _>(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(buffer.len(), 4410);
    assert_eq!(buffer.sample_rate(), 44100.0);

    let mut tables = TableCache::new();
    let mut voice = PolyphaseResampler::new(&buffer, &mut tables).oversample::<10, 2>(&mut tables);
    voice.set_sample_rate(RATE);
    voice.inner_mut().set_hz(440.0);
    assert!((voice.inner().increment() - 0.1).abs() < 1e-6);

    let out: Vec<f32> = (0..4600).map(|_| voice.sample()[0]).collect();

    let (lo, hi) = min_max(&out[100..4000]);
    assert!(hi > 0.95 && hi < 1.02, "peak {}", hi);
    assert!(lo < -0.95 && lo > -1.02, "trough {}", lo);

    assert!(voice.inner().is_finished());
    assert!(out[4500..].iter().all(|&v| v == 0.0));
}

#[test]
fn malformed_wav_is_reported() {
    let err = wav::decode::<1>(b"RIFF\x04\x00\x00\x00WAVE").unwrap_err();
    assert!(matches!(err, LoadError::MissingChunk(_)));

    let missing = std::env::temp_dir().join("tickwave-does-not-exist.wav");
    assert!(matches!(
        wav::load::<1, _>(&missing),
        Err(LoadError::Io { .. })
    ));
}

fn min_max(values: &[f32]) -> (f32, f32) {
    values
        .iter()
        .fold((f32::MAX, f32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}
