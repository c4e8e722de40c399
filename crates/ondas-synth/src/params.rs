//! Stable parameter identifiers and value ranges.
//!
//! Control surfaces speak normalized values in `[0, 1]`; the engine
//! owns the mapping to plain values. Each [`ParamId`] carries a
//! [`ParamRange`] so denormalization happens exactly once, at the
//! engine boundary, and the component setters downstream only ever see
//! in-range plain values.
//!
//! Frequency-like parameters (filter cutoffs, LFO rates, envelope
//! times) use a logarithmic curve so a knob sweep feels even across
//! octaves instead of spending most of its travel above 10 kHz.

use libm::powf;

/// Oscillator slot selector for per-slot parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OscSlot {
    /// First oscillator slot.
    #[default]
    Osc1,
    /// Second oscillator slot.
    Osc2,
    /// Third oscillator slot.
    Osc3,
}

impl OscSlot {
    /// Zero-based slot index.
    pub const fn index(self) -> usize {
        match self {
            OscSlot::Osc1 => 0,
            OscSlot::Osc2 => 1,
            OscSlot::Osc3 => 2,
        }
    }
}

/// Stable identifier for every engine parameter.
///
/// Once shipped these identities must not change meaning; presets and
/// host automation refer to them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ParamId {
    /// Oscillator slot on/off (>= 0.5 enables).
    OscEnabled(OscSlot),
    /// Wavetable scan position, 0 to 1 across the bank's frames.
    OscScan(OscSlot),
    /// Slot output level in the voice mix.
    OscMix(OscSlot),
    /// Octave offset, -4 to +4 (rounded to the nearest integer).
    OscOctave(OscSlot),
    /// Fine detune in cents, -100 to +100.
    OscDetune(OscSlot),
    /// Phase modulation depth from the slot's FM source.
    OscFmDepth(OscSlot),
    /// Envelope attack time in milliseconds.
    EnvAttack(OscSlot),
    /// Envelope decay time in milliseconds.
    EnvDecay(OscSlot),
    /// Envelope sustain level, 0 to 1.
    EnvSustain(OscSlot),
    /// Envelope release time in milliseconds.
    EnvRelease(OscSlot),
    /// State-variable filter on/off.
    SvfEnabled,
    /// State-variable filter cutoff in Hz.
    SvfCutoff,
    /// State-variable filter resonance, 0 to 1.
    SvfResonance,
    /// State-variable filter mode (0 lowpass, 1 highpass, 2 bandpass,
    /// 3 notch).
    SvfMode,
    /// Ladder filter on/off.
    LadderEnabled,
    /// Ladder filter cutoff in Hz.
    LadderCutoff,
    /// Ladder filter resonance, 0 to 1.
    LadderResonance,
    /// Ladder input drive, 1 (clean) to 10.
    LadderDrive,
    /// First LFO rate in Hz.
    Lfo1Rate,
    /// Second LFO rate in Hz.
    Lfo2Rate,
    /// Final output gain, 0 to 2.
    #[default]
    MasterGain,
}

/// Normalization curve for a parameter range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ParamScale {
    /// Equal resolution across the range.
    #[default]
    Linear,
    /// More resolution at low values; requires `min > 0`.
    Logarithmic,
}

/// Plain-value range and curve for one parameter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParamRange {
    /// Minimum plain value.
    pub min: f32,
    /// Maximum plain value.
    pub max: f32,
    /// Mapping curve from normalized to plain.
    pub scale: ParamScale,
}

impl ParamRange {
    const fn linear(min: f32, max: f32) -> Self {
        Self {
            min,
            max,
            scale: ParamScale::Linear,
        }
    }

    const fn log(min: f32, max: f32) -> Self {
        Self {
            min,
            max,
            scale: ParamScale::Logarithmic,
        }
    }

    /// Map a normalized value to the plain range.
    ///
    /// The input is clamped to `[0, 1]` first, so the result is always
    /// in `[min, max]` and safe to hand to a validating setter.
    pub fn denormalize(&self, normalized: f32) -> f32 {
        let norm = if normalized.is_finite() {
            normalized.clamp(0.0, 1.0)
        } else {
            0.0
        };
        match self.scale {
            ParamScale::Linear => self.min + (self.max - self.min) * norm,
            ParamScale::Logarithmic => self.min * powf(self.max / self.min, norm),
        }
    }
}

impl ParamId {
    /// The plain-value range for this parameter.
    pub fn range(self) -> ParamRange {
        match self {
            ParamId::OscEnabled(_)
            | ParamId::OscScan(_)
            | ParamId::OscMix(_)
            | ParamId::OscFmDepth(_)
            | ParamId::EnvSustain(_)
            | ParamId::SvfEnabled
            | ParamId::SvfResonance
            | ParamId::LadderEnabled
            | ParamId::LadderResonance => ParamRange::linear(0.0, 1.0),
            ParamId::OscOctave(_) => ParamRange::linear(-4.0, 4.0),
            ParamId::OscDetune(_) => ParamRange::linear(-100.0, 100.0),
            ParamId::EnvAttack(_) | ParamId::EnvDecay(_) | ParamId::EnvRelease(_) => {
                ParamRange::log(0.1, 10_000.0)
            }
            ParamId::SvfCutoff | ParamId::LadderCutoff => ParamRange::log(20.0, 20_000.0),
            ParamId::SvfMode => ParamRange::linear(0.0, 3.0),
            ParamId::LadderDrive => ParamRange::linear(1.0, 10.0),
            ParamId::Lfo1Rate | ParamId::Lfo2Rate => ParamRange::log(0.01, 40.0),
            ParamId::MasterGain => ParamRange::linear(0.0, 2.0),
        }
    }

    /// Denormalize through this parameter's range.
    pub fn denormalize(self, normalized: f32) -> f32 {
        self.range().denormalize(normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_endpoints() {
        let range = ParamId::OscDetune(OscSlot::Osc1).range();
        assert_eq!(range.denormalize(0.0), -100.0);
        assert_eq!(range.denormalize(1.0), 100.0);
        assert_eq!(range.denormalize(0.5), 0.0);
    }

    #[test]
    fn test_log_endpoints() {
        let range = ParamId::SvfCutoff.range();
        assert!((range.denormalize(0.0) - 20.0).abs() < 1e-3);
        assert!((range.denormalize(1.0) - 20_000.0).abs() < 1.0);
        // Log midpoint is the geometric mean, sqrt(20 * 20000) = ~632 Hz
        let mid = range.denormalize(0.5);
        assert!((mid - 632.45).abs() < 1.0, "log midpoint {mid}");
    }

    #[test]
    fn test_denormalize_clamps_input() {
        let range = ParamId::MasterGain.range();
        assert_eq!(range.denormalize(-1.0), 0.0);
        assert_eq!(range.denormalize(2.0), 2.0);
        assert_eq!(range.denormalize(f32::NAN), 0.0);
        assert_eq!(range.denormalize(f32::INFINITY), 0.0);
    }

    #[test]
    fn test_log_is_monotonic() {
        let range = ParamId::Lfo1Rate.range();
        let mut prev = 0.0;
        for i in 0..=100 {
            let v = range.denormalize(i as f32 / 100.0);
            assert!(v > prev, "log curve must be strictly increasing");
            prev = v;
        }
    }

    #[test]
    fn test_slot_indices() {
        assert_eq!(OscSlot::Osc1.index(), 0);
        assert_eq!(OscSlot::Osc2.index(), 1);
        assert_eq!(OscSlot::Osc3.index(), 2);
    }

    #[test]
    fn test_every_range_is_well_formed() {
        let ids = [
            ParamId::OscEnabled(OscSlot::Osc2),
            ParamId::OscScan(OscSlot::Osc3),
            ParamId::EnvAttack(OscSlot::Osc1),
            ParamId::SvfCutoff,
            ParamId::LadderDrive,
            ParamId::Lfo2Rate,
            ParamId::MasterGain,
        ];
        for id in ids {
            let range = id.range();
            assert!(range.min < range.max, "{id:?}");
            if range.scale == ParamScale::Logarithmic {
                assert!(range.min > 0.0, "{id:?} log range needs positive min");
            }
        }
    }
}
