//! Fixed-point phase accumulation for wavetable playback.
//!
//! A [`Phase`] packs a table index and an intra-sample fraction into a
//! single `u32`: the top bits address a sample in a table of
//! [`TABLE_SIZE`] entries, the low [`PHASE_SHIFT`] bits hold the
//! fractional position between that sample and the next. Advancing the
//! phase is a single wrapping add, and wraparound at the end of the
//! table falls out of integer overflow for free. No branches, no float
//! rounding drift over long renders.
//!
//! # Layout
//!
//! ```text
//! bit 31                                bit 0
//! +-----------+-------------------------+
//! | index: 11 | fraction: 21            |
//! +-----------+-------------------------+
//! ```

/// Number of samples in one wavetable cycle. Must be a power of two.
pub const TABLE_SIZE: usize = 2048;

/// Bitmask for wrapping a table index.
pub const TABLE_MASK: usize = TABLE_SIZE - 1;

/// Bits below the table index holding the interpolation fraction.
/// Equal to `32 - log2(TABLE_SIZE)`.
pub const PHASE_SHIFT: u32 = 21;

/// Mask isolating the fractional bits of a phase word.
pub const FRAC_MASK: u32 = (1 << PHASE_SHIFT) - 1;

/// Scale factor converting fractional bits to a float in [0, 1).
pub const FRAC_SCALE: f32 = 1.0 / (1u32 << PHASE_SHIFT) as f32;

/// Fixed-point phase position within a wavetable cycle.
///
/// The full `u32` range maps to exactly one cycle, so phase arithmetic
/// wraps naturally and two's-complement addition makes negative offsets
/// (FM below the carrier) work without special cases.
///
/// # Example
///
/// ```rust
/// use ondas_core::phase::{Phase, table_increment, to_fixed_increment};
///
/// let inc = to_fixed_increment(table_increment(440.0, 48000.0));
/// let mut phase = Phase::ZERO;
/// phase = phase.advance(inc);
/// assert!(phase.index() < 2048);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Phase(pub u32);

impl Phase {
    /// Phase at the start of the cycle.
    pub const ZERO: Self = Self(0);

    /// Advance by a fixed-point increment, wrapping at the cycle end.
    #[inline]
    #[must_use]
    pub fn advance(self, fixed_inc: u32) -> Self {
        Self(self.0.wrapping_add(fixed_inc))
    }

    /// Apply a phase offset without consuming it.
    ///
    /// Offsets are `u32` in the same fixed-point units; a negative
    /// offset is passed as its two's-complement bit pattern
    /// (`(x as i32) as u32`), which wraps correctly.
    #[inline]
    #[must_use]
    pub fn offset(self, fixed_offset: u32) -> Self {
        Self(self.0.wrapping_add(fixed_offset))
    }

    /// Integer table index in `[0, TABLE_SIZE)`.
    #[inline]
    pub fn index(self) -> usize {
        (self.0 >> PHASE_SHIFT) as usize & TABLE_MASK
    }

    /// Fractional position between `index` and `index + 1`, in `[0, 1)`.
    #[inline]
    pub fn fraction(self) -> f32 {
        (self.0 & FRAC_MASK) as f32 * FRAC_SCALE
    }
}

/// Table-space phase increment for a frequency at a sample rate.
///
/// Units are table positions per sample: an increment of 1.0 steps
/// through one table sample per output sample, 2.0 skips every other
/// sample, and so on.
#[inline]
pub fn table_increment(freq_hz: f32, sample_rate: f32) -> f32 {
    TABLE_SIZE as f32 * freq_hz / sample_rate
}

/// Convert a table-space increment to fixed-point phase units.
///
/// Goes through `f64` so the 21 fractional bits survive the conversion;
/// a 0.01-cent tuning error from `f32` rounding is audible as beating on
/// long sustained notes. Cheap enough for per-sample use after pitch
/// modulation: `2^32 / TABLE_SIZE` is a constant, so this compiles to
/// one multiply and a cast.
#[inline]
pub fn to_fixed_increment(table_inc: f32) -> u32 {
    let cycles_per_sample = f64::from(table_inc) / TABLE_SIZE as f64;
    (cycles_per_sample * (u32::MAX as f64 + 1.0)) as u32
}

/// Read a table at a fixed-point phase with linear interpolation.
///
/// `table` must hold at least [`TABLE_SIZE`] samples; the index is
/// masked so the read between the last and first sample wraps
/// seamlessly.
#[inline]
pub fn read_linear(table: &[f32], phase: Phase) -> f32 {
    let ia = phase.index();
    let ib = (ia + 1) & TABLE_MASK;
    let frac = phase.fraction();
    let a = table[ia];
    let b = table[ib];
    a + (b - a) * frac
}
