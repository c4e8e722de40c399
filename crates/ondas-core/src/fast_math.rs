//! Fast math approximations and small DSP conversions.
//!
//! The approximations trade IEEE 754 precision for speed in places the
//! engine calls every sample: mip-level selection (`fast_log2`), pitch
//! and cutoff modulation (`fast_exp2`), filter coefficients (`fast_tan`)
//! and saturation (`fast_tanh`). Each documents its error bound and the
//! input range it is valid over.
//!
//! | Function | Replaces | Hot-path use | Max error |
//! |----------|----------|--------------|-----------|
//! | [`fast_log2`] | `libm::log2f` | mip selection | < 0.001 |
//! | [`fast_exp2`] | `libm::exp2f` | pitch/cutoff ratios | < 0.6% |
//! | [`fast_tan`] | `libm::tanf` | SVF coefficient | < 0.2% (f < 7.6 kHz) |
//! | [`fast_tanh`] | `libm::tanhf` | ladder saturation | exact (libm) |
//!
//! Control-rate code with no budget pressure should prefer `libm`.

use libm::{floorf, tanhf};

/// Fast base-2 logarithm via IEEE 754 decomposition.
///
/// The exponent comes straight out of the float bits; a 3rd-order
/// minimax polynomial covers the mantissa in `[1, 2)`. Absolute error
/// stays below 0.001, which is far finer than the audible threshold for
/// mip crossfade weights.
///
/// # Arguments
///
/// * `x` - Input value. Must be > 0; the result is meaningless otherwise.
///
/// # Examples
///
/// ```
/// use ondas_core::fast_math::fast_log2;
///
/// assert!((fast_log2(1.0) - 0.0).abs() < 0.01);
/// assert!((fast_log2(8.0) - 3.0).abs() < 0.01);
/// ```
#[inline]
pub fn fast_log2(x: f32) -> f32 {
    let bits = x.to_bits();
    let exponent = ((bits >> 23) & 0xFF) as i32 - 127;
    // Mantissa rebuilt in [1.0, 2.0)
    let m = f32::from_bits((bits & 0x007F_FFFF) | 0x3F80_0000);
    // Minimax cubic for log2(m) on [1, 2), Remez coefficients
    exponent as f32 + (m * (m * (m * 0.155_351_5 - 1.038_728_7) + 3.028_535_4) - 2.144_404_2)
}

/// Fast base-2 exponential.
///
/// Splits `x` into integer and fractional parts; the integer power of
/// two is assembled exactly through the exponent bits, the fraction goes
/// through a 3rd-order polynomial. Relative error < 0.6% over the
/// clamped domain `[-126, 126]`, worst near the top of each octave.
///
/// # Examples
///
/// ```
/// use ondas_core::fast_math::fast_exp2;
///
/// assert!((fast_exp2(1.0) - 2.0).abs() < 0.01);
/// assert!((fast_exp2(-2.0) - 0.25).abs() < 0.01);
/// ```
#[inline]
pub fn fast_exp2(x: f32) -> f32 {
    let x = x.clamp(-126.0, 126.0);
    let i = floorf(x) as i32;
    let f = x - i as f32;
    // Cubic for 2^f on [0, 1)
    let p = 1.0 + f * (core::f32::consts::LN_2 + f * (0.240_226 + f * 0.055_504_1));
    f32::from_bits(((i + 127) as u32) << 23) * p
}

/// Fast tangent for filter coefficient computation.
///
/// Padé \[2/1\] rational approximant, matching the Taylor series through
/// the x⁵ term:
///   `tan(x) ≈ x · (15 − x²) / (15 − 6x²)`
///
/// Relative error < 0.2% for `x < 0.5` (cutoffs below ~7.6 kHz at
/// 48 kHz). Callers switch to `libm::tanf` above that.
#[inline]
pub fn fast_tan(x: f32) -> f32 {
    let x2 = x * x;
    x * (15.0 - x2) / (15.0 - 6.0 * x2)
}

/// Hyperbolic tangent for drive saturation.
///
/// Delegates to libm; the name marks the saturation call sites so a
/// cheaper approximant can be swapped in for embedded targets.
#[inline]
pub fn fast_tanh(x: f32) -> f32 {
    tanhf(x)
}

/// Flush subnormal floats to zero.
///
/// Subnormal arithmetic is 10-100x slower on common desktop and
/// embedded FPUs. Filter feedback paths decay toward zero indefinitely,
/// so their states are flushed every sample; the 1e-20 threshold leaves
/// margin above the actual subnormal range.
#[allow(clippy::inline_always)]
#[inline(always)]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}

/// Linear interpolation between two values.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Convert milliseconds to a sample count at a given rate.
#[inline]
pub fn ms_to_samples(ms: f32, sample_rate: f32) -> f32 {
    ms * sample_rate / 1000.0
}

/// Convert a MIDI note number to frequency in Hz (A4 = 69 = 440 Hz).
///
/// # Examples
///
/// ```
/// use ondas_core::fast_math::midi_to_freq;
///
/// assert!((midi_to_freq(69) - 440.0).abs() < 0.01);
/// assert!((midi_to_freq(60) - 261.63).abs() < 0.01);
/// ```
#[inline]
pub fn midi_to_freq(note: u8) -> f32 {
    440.0 * libm::exp2f((f32::from(note) - 69.0) / 12.0)
}

/// Frequency ratio for a pitch offset in semitones.
///
/// Uses [`fast_exp2`]; suitable for per-sample pitch modulation.
#[inline]
pub fn semitones_to_ratio(semitones: f32) -> f32 {
    fast_exp2(semitones / 12.0)
}
