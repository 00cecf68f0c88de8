//! Coefficient Tables
//!
//! FIR taps and banks of fractional-delay kernels are expensive to generate
//! and identical for every voice that uses the same parameters. A
//! [`TableCache`] generates each distinct table once and hands out shared,
//! immutable references to it.
//!
//! The cache is an explicit context object rather than a global: the host
//! creates one during initialization and passes it to every constructor that
//! needs tables. Construction is where lookups happen, so building all voices
//! up front keeps table generation off the audio thread.
//!
//! ## Table layouts
//!
//! **Compact downsampler FIR.** One half of a symmetric windowed-sinc
//! low-pass with cutoff at `1/ratio` of the input rate. Every `ratio`-th tap of
//! such a filter falls on a zero of the sinc and is omitted, leaving
//! `ratio * zero_crossings - zero_crossings` stored taps. The centre tap (1.0)
//! is implicit.
//!
//! ```text
//!  l:     1   2   3  [4]  5   6   7  [8]  ...     (ratio = 4)
//!  tap:   0   1   2       3   4   5       ...
//! ```
//!
//! **Phased sinc.** `phases` rows of `width` taps each, row-major by phase.
//! Row `p` holds the Kaiser-windowed sinc sampled at offsets
//! `k - p / phases` so that a resampler can pick a row from the fractional
//! part of its cursor and convolve directly.

use crate::math::{bessel_i0, kaiser_bessel};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::Arc;

/// Window functions available to the FIR generators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Window {
    /// Kaiser window tuned for 40 dB stopband attenuation.
    #[default]
    KaiserBessel,
}

impl Window {
    /// Evaluate the window at `x ∈ [-1, 1]`.
    #[inline]
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Window::KaiserBessel => kaiser_bessel(x),
        }
    }
}

/// Identifies one generated table.
///
/// Floating-point parameters are stored by bit pattern so keys hash exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKey {
    CompactDownsampler {
        ratio: usize,
        zero_crossings: usize,
        window: Window,
    },
    PhasedSinc {
        beta: u64,
        lowpass_factor: u64,
        width_exp: u32,
        phases_exp: u32,
    },
}

impl TableKey {
    pub fn compact_downsampler(ratio: usize, zero_crossings: usize, window: Window) -> Self {
        TableKey::CompactDownsampler {
            ratio,
            zero_crossings,
            window,
        }
    }

    pub fn phased_sinc(beta: f64, lowpass_factor: f64, width_exp: u32, phases_exp: u32) -> Self {
        TableKey::PhasedSinc {
            beta: beta.to_bits(),
            lowpass_factor: lowpass_factor.to_bits(),
            width_exp,
            phases_exp,
        }
    }

    /// Run the generator this key describes.
    pub fn generate(&self) -> Vec<f32> {
        match *self {
            TableKey::CompactDownsampler {
                ratio,
                zero_crossings,
                window,
            } => compact_downsampler_fir(ratio, zero_crossings, window),
            TableKey::PhasedSinc {
                beta,
                lowpass_factor,
                width_exp,
                phases_exp,
            } => phased_sinc(
                f64::from_bits(beta),
                f64::from_bits(lowpass_factor),
                width_exp,
                phases_exp,
            ),
        }
    }
}

/// Memoizing store of generated coefficient tables.
#[derive(Debug, Default)]
pub struct TableCache {
    tables: HashMap<TableKey, Arc<[f32]>>,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a table, generating it on first use.
    pub fn get(&mut self, key: TableKey) -> Arc<[f32]> {
        if let Some(table) = self.tables.get(&key) {
            return Arc::clone(table);
        }
        let table: Arc<[f32]> = key.generate().into();
        log::debug!("generated table {:?} ({} taps)", key, table.len());
        self.tables.insert(key, Arc::clone(&table));
        table
    }

    pub fn compact_downsampler_fir(
        &mut self,
        ratio: usize,
        zero_crossings: usize,
        window: Window,
    ) -> Arc<[f32]> {
        self.get(TableKey::compact_downsampler(ratio, zero_crossings, window))
    }

    pub fn phased_sinc(
        &mut self,
        beta: f64,
        lowpass_factor: f64,
        width_exp: u32,
        phases_exp: u32,
    ) -> Arc<[f32]> {
        self.get(TableKey::phased_sinc(beta, lowpass_factor, width_exp, phases_exp))
    }

    /// Number of tables generated so far.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn contains(&self, key: &TableKey) -> bool {
        self.tables.contains_key(key)
    }
}

/// Generate one half of a windowed-sinc decimation filter, zero-crossing taps omitted.
///
/// # Panics
///
/// If `ratio < 2` or `zero_crossings == 0`.
pub fn compact_downsampler_fir(ratio: usize, zero_crossings: usize, window: Window) -> Vec<f32> {
    assert!(ratio >= 2, "downsampler ratio must be at least 2, got {}", ratio);
    assert!(zero_crossings > 0, "downsampler needs at least one zero crossing");

    let real_fir_size = ratio * zero_crossings;
    let fir_size = real_fir_size - zero_crossings;
    let mut table = Vec::with_capacity(fir_size);

    let mut l = 1.0f64;
    let mut n = ratio - 1;
    for _ in 0..fir_size {
        let x = (l * PI) / ratio as f64;
        let sinc = libm::sin(x) / x;
        let w = window.apply(l / real_fir_size as f64);
        table.push((sinc * w) as f32);
        l += 1.0;
        n -= 1;
        if n == 0 {
            // zero crossing
            l += 1.0;
            n = ratio - 1;
        }
    }

    table
}

/// Generate a bank of Kaiser-windowed fractional-delay sinc kernels.
///
/// `lowpass_factor` scales the sinc's cutoff (and gain) below Nyquist; the
/// kernel spans `2^width_exp` taps and the bank holds `2^phases_exp` phases.
///
/// # Panics
///
/// On a non-positive or non-finite `beta`/`lowpass_factor`, a width below two
/// taps, or an exponent large enough to overflow the table size.
pub fn phased_sinc(beta: f64, lowpass_factor: f64, width_exp: u32, phases_exp: u32) -> Vec<f32> {
    assert!(
        beta.is_finite() && beta > 0.0,
        "phased sinc beta must be positive, got {}",
        beta
    );
    assert!(
        lowpass_factor.is_finite() && lowpass_factor > 0.0,
        "phased sinc low-pass factor must be positive, got {}",
        lowpass_factor
    );
    assert!(width_exp >= 1, "phased sinc needs at least two taps");
    assert!(
        width_exp + phases_exp < 28,
        "phased sinc table of 2^{} entries is too large",
        width_exp + phases_exp
    );

    let width = 1i64 << width_exp;
    let width_mask = width - 1;
    let phases = 1i64 << phases_exp;
    let half = width >> 1;
    let centre = half * phases;
    let inv_half_sq = 1.0 / (half * half) as f64;
    let i0_beta = bessel_i0(beta);
    let k_pi = 4.0 * libm::atan(1.0) * lowpass_factor;

    let mut table = Vec::with_capacity((width * phases) as usize);
    for isrc in 0..width * phases {
        let ix = (width_mask - (isrc & width_mask)) * phases + (isrc >> width_exp);
        let fsinc = if ix == centre {
            1.0
        } else {
            let x = (ix - centre) as f64 * (1.0 / phases as f64);
            libm::sin(x * k_pi) * bessel_i0(beta * libm::sqrt(1.0 - x * x * inv_half_sq))
                / (i0_beta * x * k_pi)
        };
        table.push((fsinc * lowpass_factor) as f32);
    }

    table
}
