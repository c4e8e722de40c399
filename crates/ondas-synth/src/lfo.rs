//! Block-rate low frequency oscillators.
//!
//! LFO outputs feed the modulation matrix, which already interpolates
//! destination values linearly across each block. Evaluating the LFO
//! once per block is therefore free smoothing: the matrix turns the
//! block-rate staircase into a per-sample ramp.

use core::f32::consts::TAU;
use libm::sinf;

/// LFO waveform type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LfoWaveform {
    /// Smooth sinusoidal modulation.
    #[default]
    Sine,
    /// Linear up/down ramps.
    Triangle,
    /// Rising ramp with abrupt reset.
    Saw,
    /// Binary on/off.
    Square,
}

/// Low frequency oscillator evaluated once per audio block.
///
/// # Example
///
/// ```rust
/// use ondas_synth::lfo::BlockLfo;
///
/// let mut lfo = BlockLfo::new(48000.0, 2.0);
/// let value = lfo.next_block(512);
/// assert!((-1.0..=1.0).contains(&value));
/// ```
#[derive(Clone, Debug)]
pub struct BlockLfo {
    /// Phase in [0, 1).
    phase: f32,
    /// Phase increment per sample.
    phase_inc: f32,
    sample_rate: f32,
    waveform: LfoWaveform,
}

impl BlockLfo {
    /// Create an LFO at the given rate in Hz.
    pub fn new(sample_rate: f32, freq_hz: f32) -> Self {
        let mut lfo = Self {
            phase: 0.0,
            phase_inc: 0.0,
            sample_rate,
            waveform: LfoWaveform::Sine,
        };
        lfo.set_frequency(freq_hz);
        lfo
    }

    /// Set the rate in Hz, clamped to `[0, 40]`. Modulation-rate input
    /// is clamped rather than rejected; it arrives pre-ranged from the
    /// parameter table.
    pub fn set_frequency(&mut self, freq_hz: f32) {
        self.phase_inc = freq_hz.clamp(0.0, 40.0) / self.sample_rate;
    }

    /// Current rate in Hz.
    pub fn frequency(&self) -> f32 {
        self.phase_inc * self.sample_rate
    }

    /// Select the waveform.
    pub fn set_waveform(&mut self, waveform: LfoWaveform) {
        self.waveform = waveform;
    }

    /// Current waveform.
    pub fn waveform(&self) -> LfoWaveform {
        self.waveform
    }

    /// Reset phase to the cycle start.
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    /// Bipolar value at the current phase, then advance by `block_len`
    /// samples.
    pub fn next_block(&mut self, block_len: usize) -> f32 {
        let output = match self.waveform {
            LfoWaveform::Sine => sinf(self.phase * TAU),
            LfoWaveform::Triangle => {
                if self.phase < 0.5 {
                    4.0 * self.phase - 1.0
                } else {
                    3.0 - 4.0 * self.phase
                }
            }
            LfoWaveform::Saw => 2.0 * self.phase - 1.0,
            LfoWaveform::Square => {
                if self.phase < 0.5 { 1.0 } else { -1.0 }
            }
        };

        self.phase += self.phase_inc * block_len as f32;
        self.phase -= libm::floorf(self.phase);
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_cycle_per_second() {
        let mut lfo = BlockLfo::new(48000.0, 1.0);
        // 93 blocks of 512 = 47616 samples, just under one cycle
        for _ in 0..93 {
            lfo.next_block(512);
        }
        assert!(lfo.phase < 1.0 && lfo.phase > 0.99, "phase {}", lfo.phase);
    }

    #[test]
    fn test_output_range_all_waveforms() {
        for waveform in [
            LfoWaveform::Sine,
            LfoWaveform::Triangle,
            LfoWaveform::Saw,
            LfoWaveform::Square,
        ] {
            let mut lfo = BlockLfo::new(48000.0, 7.3);
            lfo.set_waveform(waveform);
            for _ in 0..500 {
                let v = lfo.next_block(64);
                assert!(
                    (-1.0..=1.0).contains(&v),
                    "{waveform:?} out of range: {v}"
                );
            }
        }
    }

    #[test]
    fn test_rate_clamped() {
        let mut lfo = BlockLfo::new(48000.0, 500.0);
        assert!((lfo.frequency() - 40.0).abs() < 1e-4);
        lfo.set_frequency(-3.0);
        assert_eq!(lfo.frequency(), 0.0);
    }

    #[test]
    fn test_phase_wraps() {
        let mut lfo = BlockLfo::new(48000.0, 40.0);
        for _ in 0..10_000 {
            lfo.next_block(1024);
            assert!((0.0..1.0).contains(&lfo.phase), "phase {}", lfo.phase);
        }
    }
}
