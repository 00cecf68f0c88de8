//! Demo: Sample Sweep
//!
//! Plays a long buffer of gated noise through the polyphase resampler while
//! the playback pitch climbs by 1% every 1000 samples, from 4 Hz until the
//! cursor skips dozens of frames per output sample. The resampler switches to
//! narrower kernels as the step grows, and a 10x oversampler cleans up what
//! is left.
//!
//! Run with: cargo run --release --example sample_sweep [-- out.wav]

use rand::SeedableRng;
use tickwave::math::randf;
use tickwave::prelude::*;
use tickwave::resampler::Kernel;

const SAMPLE_RATE: u32 = 44100;
const SECONDS: usize = 20;
const FRAMES: usize = 10_000_000;

struct Sweep<'a> {
    player: FirOversampler<PolyphaseResampler<'a, 1>, 10, 2>,
    hz: f32,
    kernels: Vec<(u64, Kernel)>,
}

impl<'a> Sampler for Sweep<'a> {
    type Frame = f32;

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.player.set_sample_rate(sample_rate);
    }

    fn sample(&mut self) -> f32 {
        self.player.sample().sum() * 0.3
    }
}

fn sweep_tick(seq: &mut Sequencer<Sweep<'_>>) {
    let now = seq.now();
    let sweep = seq.state_mut();
    let hz = sweep.hz;
    sweep.player.inner_mut().set_hz(hz);
    sweep.hz *= 1.01;

    let kernel = sweep.player.inner().kernel();
    if sweep.kernels.last().map(|&(_, k)| k) != Some(kernel) {
        sweep.kernels.push((now, kernel));
    }

    seq.schedule(1000, sweep_tick);
}

fn main() {
    let path = std::env::args().nth(1);

    // Noise under a sawtooth gate, so the sweep has an audible pulse
    let mut rng = rand::rngs::StdRng::seed_from_u64(0x5eed);
    let buffer = SampleBuffer::from_fn(FRAMES, |i| {
        Mono::from(randf(&mut rng, -1.0, 1.0) * (i & 255) as f32 / 256.0)
    });

    let mut tables = TableCache::new();
    let player = PolyphaseResampler::new(&buffer, &mut tables).oversample::<10, 2>(&mut tables);
    println!("=== Sample Sweep ===\n");
    println!("Kernel tables generated: {}", tables.len());

    let mut sweep = Sweep {
        player,
        hz: 4.0,
        kernels: Vec::new(),
    };
    sweep.set_sample_rate(SAMPLE_RATE as f32);

    let mut seq = Sequencer::new(sweep);
    seq.schedule(0, sweep_tick);

    let mut out = vec![0.0f32; SECONDS * SAMPLE_RATE as usize];
    for block in out.chunks_mut(256) {
        seq.render(block);
    }

    let sweep = seq.state();
    for (t, kernel) in sweep.kernels.iter() {
        println!(
            "{:>7.3} s  {:?}",
            *t as f32 / SAMPLE_RATE as f32,
            kernel
        );
    }
    println!(
        "Final pitch {:.1} Hz, cursor at frame {} of {}",
        sweep.hz,
        sweep.player.inner().pos(),
        FRAMES
    );
    let peak = out.iter().fold(0.0f32, |m, v| m.max(v.abs()));
    println!("Peak: {:.3}", peak);

    if let Some(path) = path {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let result = hound::WavWriter::create(&path, spec).and_then(|mut writer| {
            for &s in out.iter() {
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
