//! Wavetable oscillator configuration and table reading.
//!
//! An [`OscConfig`] is the shared, per-slot half of an oscillator: which
//! bank it plays, where in the bank it scans, its pitch offsets, mix
//! level, and FM routing. The per-voice half (a phase accumulator and a
//! cached base increment) lives in the voice, so sixteen voices playing
//! the same patch share one config.
//!
//! Reading blends up to four table lookups: two adjacent mip levels
//! against aliasing, two adjacent frames for scan-position morphing.
//! Single-frame banks skip the frame blend and do two reads.

use alloc::sync::Arc;

use libm::exp2f;
use ondas_core::fast_math::{fast_log2, lerp, midi_to_freq};
use ondas_core::phase::{Phase, read_linear, table_increment};
use ondas_core::wavetable::{MAX_MIPS, WavetableBank};
use thiserror::Error;

/// Oscillator configuration errors, raised at the setter boundary.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OscConfigError {
    /// A parameter value fell outside its legal range.
    #[error("parameter '{param}' value {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Parameter name.
        param: &'static str,
        /// The rejected value.
        value: f32,
        /// Lower bound (inclusive).
        min: f32,
        /// Upper bound (inclusive).
        max: f32,
    },
}

/// Which slot's output phase-modulates this oscillator.
///
/// The modulating sample is the source slot's output from the previous
/// sample, one sample of feedback delay, so slots can modulate each
/// other in any order (including themselves).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FmSource {
    /// No frequency modulation.
    #[default]
    None,
    /// Oscillator slot 1.
    Osc1,
    /// Oscillator slot 2.
    Osc2,
    /// Oscillator slot 3.
    Osc3,
}

impl FmSource {
    /// Slot index of the modulator, if any.
    #[inline]
    pub fn slot_index(self) -> Option<usize> {
        match self {
            FmSource::None => None,
            FmSource::Osc1 => Some(0),
            FmSource::Osc2 => Some(1),
            FmSource::Osc3 => Some(2),
        }
    }
}

/// Shared per-slot oscillator configuration.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use ondas_core::wavetable::WavetableBank;
/// use ondas_synth::oscillator::OscConfig;
///
/// let mut cfg = OscConfig::default();
/// cfg.set_bank(Some(Arc::new(WavetableBank::sine("sine"))));
/// cfg.set_mix(0.8).unwrap();
/// cfg.set_enabled(true);
///
/// let inc = cfg.base_increment(69, 48000.0);
/// assert!((inc - 2048.0 * 440.0 / 48000.0).abs() < 0.01);
/// ```
#[derive(Clone, Debug)]
pub struct OscConfig {
    bank: Option<Arc<WavetableBank>>,
    scan: f32,
    mix: f32,
    fm_depth: f32,
    fm_source: FmSource,
    octave: i8,
    detune_cents: f32,
    enabled: bool,
}

impl Default for OscConfig {
    /// Disabled slot with no bank, full mix, no pitch offsets.
    fn default() -> Self {
        Self {
            bank: None,
            scan: 0.0,
            mix: 1.0,
            fm_depth: 0.0,
            fm_source: FmSource::None,
            octave: 0,
            detune_cents: 0.0,
            enabled: false,
        }
    }
}

impl OscConfig {
    /// Assign (or clear) the wavetable bank. A slot with no bank is
    /// silent even when enabled.
    pub fn set_bank(&mut self, bank: Option<Arc<WavetableBank>>) {
        self.bank = bank;
    }

    /// Set the scan position across the bank's frames, `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Rejects values outside the range; prior value is kept.
    pub fn set_scan(&mut self, scan: f32) -> Result<(), OscConfigError> {
        Self::check_unit("scan", scan)?;
        self.scan = scan;
        Ok(())
    }

    /// Set the output mix level, `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Rejects values outside the range; prior value is kept.
    pub fn set_mix(&mut self, mix: f32) -> Result<(), OscConfigError> {
        Self::check_unit("mix", mix)?;
        self.mix = mix;
        Ok(())
    }

    /// Set the FM depth, `[0, 1]`. Full depth swings the read phase by
    /// half a cycle at modulator peaks.
    ///
    /// # Errors
    ///
    /// Rejects values outside the range; prior value is kept.
    pub fn set_fm_depth(&mut self, depth: f32) -> Result<(), OscConfigError> {
        Self::check_unit("fm_depth", depth)?;
        self.fm_depth = depth;
        Ok(())
    }

    /// Select which slot phase-modulates this one.
    pub fn set_fm_source(&mut self, source: FmSource) {
        self.fm_source = source;
    }

    /// Set the octave offset, `[-4, 4]`.
    ///
    /// # Errors
    ///
    /// Rejects values outside the range; prior value is kept.
    pub fn set_octave(&mut self, octave: i8) -> Result<(), OscConfigError> {
        if !(-4..=4).contains(&octave) {
            return Err(OscConfigError::OutOfRange {
                param: "octave",
                value: f32::from(octave),
                min: -4.0,
                max: 4.0,
            });
        }
        self.octave = octave;
        Ok(())
    }

    /// Set the fine detune in cents, `[-100, 100]`.
    ///
    /// # Errors
    ///
    /// Rejects values outside the range; prior value is kept.
    pub fn set_detune_cents(&mut self, cents: f32) -> Result<(), OscConfigError> {
        if !(-100.0..=100.0).contains(&cents) {
            return Err(OscConfigError::OutOfRange {
                param: "detune_cents",
                value: cents,
                min: -100.0,
                max: 100.0,
            });
        }
        self.detune_cents = cents;
        Ok(())
    }

    /// Enable or disable this slot. Disabled slots contribute silence
    /// and advance nothing.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Current bank handle.
    pub fn bank(&self) -> Option<&Arc<WavetableBank>> {
        self.bank.as_ref()
    }

    /// Current scan position.
    pub fn scan(&self) -> f32 {
        self.scan
    }

    /// Current mix level.
    pub fn mix(&self) -> f32 {
        self.mix
    }

    /// Current FM depth.
    pub fn fm_depth(&self) -> f32 {
        self.fm_depth
    }

    /// Current FM source.
    pub fn fm_source(&self) -> FmSource {
        self.fm_source
    }

    /// Current octave offset.
    pub fn octave(&self) -> i8 {
        self.octave
    }

    /// Current detune in cents.
    pub fn detune_cents(&self) -> f32 {
        self.detune_cents
    }

    /// Whether the slot is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Table-space phase increment for a MIDI note, including the
    /// slot's octave and detune offsets. Computed at note-on, not in
    /// the per-sample path, so it uses full-precision `exp2f`.
    pub fn base_increment(&self, note: u8, sample_rate: f32) -> f32 {
        let ratio = exp2f(f32::from(self.octave) + self.detune_cents / 1200.0);
        table_increment(midi_to_freq(note) * ratio, sample_rate)
    }

    /// Read the wavetable at a phase with mip crossfade, frame scan,
    /// and FM offset applied.
    ///
    /// `mip_pos` must already be clamped (see [`mip_position`]); `scan`
    /// is the modulated scan value for this sample; `fm_offset` is a
    /// fixed-point phase offset (see [`fm_phase_offset`]). The base
    /// phase accumulator is not advanced by FM, only the read position
    /// shifts.
    #[inline]
    pub fn read(&self, phase: Phase, mip_pos: f32, scan: f32, fm_offset: u32) -> f32 {
        let Some(bank) = &self.bank else {
            return 0.0;
        };
        let read_phase = phase.offset(fm_offset);
        let mip_a = mip_pos as usize;
        let mip_frac = mip_pos - mip_a as f32;

        let frame_count = bank.frame_count();
        if frame_count == 1 {
            let frame = bank.frame(0);
            let a = read_linear(frame.mip(mip_a), read_phase);
            let b = read_linear(frame.mip(mip_a + 1), read_phase);
            return lerp(a, b, mip_frac);
        }

        let scan_f = scan.clamp(0.0, 1.0) * (frame_count - 1) as f32;
        let frame_a = (scan_f as usize).min(frame_count - 2);
        let frame_frac = scan_f - frame_a as f32;
        let fa = bank.frame(frame_a);
        let fb = bank.frame(frame_a + 1);

        // Blend frames first, then mips
        let low = lerp(
            read_linear(fa.mip(mip_a), read_phase),
            read_linear(fb.mip(mip_a), read_phase),
            frame_frac,
        );
        let high = lerp(
            read_linear(fa.mip(mip_a + 1), read_phase),
            read_linear(fb.mip(mip_a + 1), read_phase),
            frame_frac,
        );
        lerp(low, high, mip_frac)
    }

    fn check_unit(param: &'static str, value: f32) -> Result<(), OscConfigError> {
        if (0.0..=1.0).contains(&value) {
            Ok(())
        } else {
            Err(OscConfigError::OutOfRange {
                param,
                value,
                min: 0.0,
                max: 1.0,
            })
        }
    }
}

/// Fractional mip position for a table-space phase increment.
///
/// Increments at or below one table step need no band-limiting and read
/// mip 0 with no crossfade. Above that, the position is the log2 of the
/// increment, clamped so mip B (`position + 1`) stays in range.
#[inline]
pub fn mip_position(table_inc: f32) -> f32 {
    if table_inc <= 1.0 {
        0.0
    } else {
        fast_log2(table_inc).clamp(0.0, (MAX_MIPS - 2) as f32)
    }
}

/// Fixed-point phase offset for an FM modulator sample.
///
/// `depth * modulator` in `[-1, 1]` maps to plus or minus half a cycle;
/// the two's-complement cast makes negative offsets wrap correctly when
/// added to a phase.
#[inline]
pub fn fm_phase_offset(depth: f32, modulator: f32) -> u32 {
    ((depth * modulator) * i32::MAX as f32) as i32 as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use ondas_core::phase::{TABLE_SIZE, to_fixed_increment};

    fn sine_config() -> OscConfig {
        let mut cfg = OscConfig::default();
        cfg.set_bank(Some(Arc::new(WavetableBank::sine("sine"))));
        cfg.set_enabled(true);
        cfg
    }

    #[test]
    fn test_mip_position_low_increments() {
        assert_eq!(mip_position(0.5), 0.0);
        assert_eq!(mip_position(1.0), 0.0);
    }

    #[test]
    fn test_mip_position_monotonic_and_clamped() {
        let mut last = 0.0;
        for i in 1..200 {
            let inc = i as f32 * 10.0;
            let pos = mip_position(inc);
            assert!(pos >= last, "mip position not monotonic at inc {inc}");
            last = pos;
        }
        assert!(last <= (MAX_MIPS - 2) as f32, "mip position exceeds clamp");
        assert_eq!(mip_position(1e9), (MAX_MIPS - 2) as f32);
    }

    #[test]
    fn test_mip_position_at_powers_of_two() {
        assert!((mip_position(2.0) - 1.0).abs() < 0.01);
        assert!((mip_position(8.0) - 3.0).abs() < 0.01);
    }

    #[test]
    fn test_base_increment_a440() {
        let cfg = sine_config();
        let inc = cfg.base_increment(69, 48000.0);
        let expected = TABLE_SIZE as f32 * 440.0 / 48000.0;
        assert!((inc - expected).abs() < 1e-3, "{inc} vs {expected}");
    }

    #[test]
    fn test_octave_doubles_increment() {
        let mut cfg = sine_config();
        let base = cfg.base_increment(60, 48000.0);
        cfg.set_octave(1).unwrap();
        let up = cfg.base_increment(60, 48000.0);
        assert!((up / base - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_detune_cents_ratio() {
        let mut cfg = sine_config();
        let base = cfg.base_increment(60, 48000.0);
        cfg.set_detune_cents(100.0).unwrap();
        let up = cfg.base_increment(60, 48000.0);
        // 100 cents = one semitone
        let semitone = exp2f(1.0 / 12.0);
        assert!((up / base - semitone).abs() < 1e-4);
    }

    #[test]
    fn test_read_sine_matches_reference() {
        let cfg = sine_config();
        let inc = to_fixed_increment(cfg.base_increment(69, 48000.0));
        let mut phase = Phase::ZERO;
        for i in 0..1000 {
            let sample = cfg.read(phase, 0.0, 0.0, 0);
            let expected = libm::sin(
                2.0 * core::f64::consts::PI * f64::from(phase.0) / 4294967296.0,
            ) as f32;
            assert!(
                (sample - expected).abs() < 0.01,
                "sample {i}: {sample} vs {expected}"
            );
            phase = phase.advance(inc);
        }
    }

    #[test]
    fn test_read_without_bank_is_silent() {
        let mut cfg = OscConfig::default();
        cfg.set_enabled(true);
        assert_eq!(cfg.read(Phase::ZERO, 0.0, 0.0, 0), 0.0);
    }

    #[test]
    fn test_fm_offset_shifts_read_position() {
        let cfg = sine_config();
        let unmodulated = cfg.read(Phase::ZERO, 0.0, 0.0, 0);
        // Quarter-cycle offset lands on the sine peak
        let offset = fm_phase_offset(0.5, 1.0);
        let modulated = cfg.read(Phase::ZERO, 0.0, 0.0, offset);
        assert!(unmodulated.abs() < 0.01);
        assert!((modulated - 1.0).abs() < 0.01, "expected peak, got {modulated}");
    }

    #[test]
    fn test_fm_zero_depth_is_identity() {
        let cfg = sine_config();
        let offset = fm_phase_offset(0.0, 0.73);
        assert_eq!(offset, 0);
        let phase = Phase(12345 << 10);
        assert_eq!(cfg.read(phase, 0.0, 0.0, offset), cfg.read(phase, 0.0, 0.0, 0));
    }

    #[test]
    fn test_negative_fm_offset_wraps() {
        let cfg = sine_config();
        // Quarter cycle backwards from zero lands on the sine trough
        let offset = fm_phase_offset(0.5, -1.0);
        let sample = cfg.read(Phase::ZERO, 0.0, 0.0, offset);
        assert!((sample + 1.0).abs() < 0.01, "expected trough, got {sample}");
    }

    #[test]
    fn test_multi_frame_scan_endpoints() {
        let bank = Arc::new(WavetableBank::saw_square_morph("morph", 8).unwrap());
        let mut cfg = OscConfig::default();
        cfg.set_bank(Some(Arc::clone(&bank)));
        cfg.set_enabled(true);

        // At scan 0 the read matches frame 0; at scan 1, the last frame
        let phase = Phase(5 << 21 | 1 << 20);
        let at_zero = cfg.read(phase, 0.0, 0.0, 0);
        let frame0 = read_linear(bank.frame(0).mip(0), phase);
        assert!((at_zero - frame0).abs() < 1e-6);

        let at_one = cfg.read(phase, 0.0, 1.0, 0);
        let frame_last = read_linear(bank.frame(7).mip(0), phase);
        assert!((at_one - frame_last).abs() < 1e-6);
    }

    #[test]
    fn test_scan_midpoint_blends() {
        let bank = Arc::new(WavetableBank::saw_square_morph("morph", 2).unwrap());
        let mut cfg = OscConfig::default();
        cfg.set_bank(Some(Arc::clone(&bank)));
        cfg.set_enabled(true);

        let phase = Phase(100 << 21);
        let a = read_linear(bank.frame(0).mip(0), phase);
        let b = read_linear(bank.frame(1).mip(0), phase);
        let mid = cfg.read(phase, 0.0, 0.5, 0);
        assert!(
            (mid - (a + b) * 0.5).abs() < 1e-6,
            "midpoint scan should average frames: {mid} vs {}",
            (a + b) * 0.5
        );
    }

    #[test]
    fn test_setters_reject_out_of_range() {
        let mut cfg = OscConfig::default();
        assert!(cfg.set_scan(1.5).is_err());
        assert!(cfg.set_mix(-0.1).is_err());
        assert!(cfg.set_fm_depth(f32::NAN).is_err());
        assert!(cfg.set_octave(5).is_err());
        assert!(cfg.set_detune_cents(101.0).is_err());
        assert_eq!(cfg.scan(), 0.0);
        assert_eq!(cfg.octave(), 0);
    }
}
