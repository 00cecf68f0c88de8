//! Numeric Utilities
//!
//! Pure functions shared by the table generators and the per-sample code:
//! the modified Bessel function of the first kind, the Kaiser window, the
//! exponential slope coefficient used by the envelopes, and pitch helpers.
//!
//! Transcendentals go through `libm` so that generated tables and envelope
//! curves are identical on every platform.

use rand::Rng;

/// Modified Bessel function of the first kind, order zero.
///
/// Power series summed until the next term falls below `1e-7` of the total.
pub fn bessel_i0(x: f64) -> f64 {
    let mut d = 0.0;
    let mut ds = 1.0;
    let mut s = 1.0;
    loop {
        d += 2.0;
        ds *= (x * x) / (d * d);
        s += ds;
        if ds <= s * 1e-7 {
            break;
        }
    }
    s
}

/// Kaiser window for 40 dB of stopband attenuation, evaluated at `x ∈ [-1, 1]`.
pub fn kaiser_bessel(x: f64) -> f64 {
    let att = 40.0_f64;
    let mut alpha = 0.0;
    if att > 50.0 {
        alpha = 0.1102_f32 as f64 * (att - 8.7_f32 as f64);
    } else if att > 20.0 {
        alpha = 0.5842_f32 as f64 * libm::pow(att - 21.0, 0.4_f32 as f64)
            + 0.07886_f32 as f64 * (att - 21.0);
    }
    bessel_i0(alpha * libm::sqrt(1.0 - x * x)) / bessel_i0(alpha)
}

/// Per-sample multiplier of an exponential segment lasting `rate` samples.
///
/// `slope` sets the curvature: the segment aims `slope` past its target, so
/// small slopes give sharply bent curves and large slopes nearly straight ones.
#[inline]
pub fn slope_coef(rate: f32, slope: f32) -> f32 {
    libm::expf(-libm::logf((1.0 + slope) / slope) / rate)
}

/// Equal-tempered pitch `note` semitones away from `base_hz`.
#[inline]
pub fn note_to_hz(base_hz: f32, note: f32) -> f32 {
    base_hz * libm::powf(2.0, note / 12.0)
}

/// Uniform random value in `[min, max]`.
#[inline]
pub fn randf<R: Rng + ?Sized>(rng: &mut R, min: f32, max: f32) -> f32 {
    let r: f32 = rng.gen();
    min + r * (max - min)
}
