//! Four-stage ladder filter with shared coefficient and per-voice state.
//!
//! A transistor-ladder model: four cascaded one-pole lowpass stages with
//! global feedback from the last stage. The stage coefficient
//! `2·sin(pi·fc/sr)` is cached in the shared [`LadderFilter`] config;
//! each voice keeps its own [`LadderState`]. Resonance in `[0, 1]` maps
//! to a feedback gain of `0..4`, self-oscillating near the top.
//!
//! Drive engages a tanh saturator in front of the cascade, but only
//! when it exceeds unity by more than a hair; at `drive = 1` the filter
//! runs the straight linear path with no transcendental per sample.

use core::f32::consts::PI;
use libm::sinf;

use crate::fast_math::{fast_tanh, flush_denormal};
use crate::svf::FilterConfigError;

/// Drive above this engages the saturating path.
const DRIVE_LINEAR_LIMIT: f32 = 1.001;

/// Relative change in cutoff or resonance below which the modulated
/// path reuses the cached coefficient.
const MOD_EPSILON: f32 = 0.001;

/// Per-voice cascade state.
#[derive(Clone, Copy, Debug, Default)]
pub struct LadderState {
    stages: [f32; 4],
}

impl LadderState {
    /// Clear all four stages.
    pub fn reset(&mut self) {
        self.stages = [0.0; 4];
    }
}

/// Ladder filter configuration shared across a voice pool.
///
/// # Example
///
/// ```rust
/// use ondas_core::ladder::{LadderFilter, LadderState};
///
/// let mut filter = LadderFilter::new(48000.0);
/// filter.set_cutoff(1500.0).unwrap();
/// filter.set_resonance(0.6).unwrap();
/// filter.set_enabled(true);
///
/// let mut state = LadderState::default();
/// let out = filter.process(&mut state, 0.25);
/// assert!(out.is_finite());
/// ```
#[derive(Clone, Debug)]
pub struct LadderFilter {
    coeff: f32,
    feedback: f32,
    sample_rate: f32,
    cutoff: f32,
    resonance: f32,
    drive: f32,
    enabled: bool,
}

impl Default for LadderFilter {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl LadderFilter {
    /// Create a disabled filter at 1 kHz cutoff, zero resonance,
    /// unity drive.
    pub fn new(sample_rate: f32) -> Self {
        let cutoff = 1000.0;
        Self {
            coeff: stage_coeff(cutoff, sample_rate),
            feedback: 0.0,
            sample_rate,
            cutoff,
            resonance: 0.0,
            drive: 1.0,
            enabled: false,
        }
    }

    /// Set the cutoff frequency in Hz.
    ///
    /// # Errors
    ///
    /// Rejects values outside `(0, Nyquist)`; prior state is kept.
    pub fn set_cutoff(&mut self, cutoff: f32) -> Result<(), FilterConfigError> {
        let nyquist = self.sample_rate * 0.5;
        if !(cutoff > 0.0 && cutoff < nyquist) {
            return Err(FilterConfigError::CutoffOutOfRange { cutoff, nyquist });
        }
        self.cutoff = cutoff;
        self.coeff = stage_coeff(cutoff, self.sample_rate);
        Ok(())
    }

    /// Set the resonance in `[0, 1]` (feedback gain 0..4).
    ///
    /// # Errors
    ///
    /// Rejects values outside `[0, 1]`.
    pub fn set_resonance(&mut self, resonance: f32) -> Result<(), FilterConfigError> {
        if !(0.0..=1.0).contains(&resonance) {
            return Err(FilterConfigError::ResonanceOutOfRange { resonance });
        }
        self.resonance = resonance;
        self.feedback = resonance * 4.0;
        Ok(())
    }

    /// Set the input drive, `>= 1`.
    ///
    /// # Errors
    ///
    /// Rejects values below 1 (and NaN).
    pub fn set_drive(&mut self, drive: f32) -> Result<(), FilterConfigError> {
        if drive.is_nan() || drive < 1.0 {
            return Err(FilterConfigError::DriveOutOfRange { drive });
        }
        self.drive = drive;
        Ok(())
    }

    /// Enable or disable the filter.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Current cutoff in Hz.
    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    /// Current resonance in `[0, 1]`.
    pub fn resonance(&self) -> f32 {
        self.resonance
    }

    /// Current drive.
    pub fn drive(&self) -> f32 {
        self.drive
    }

    /// Whether the filter is in the signal path.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Process one sample with the cached coefficient.
    #[inline]
    pub fn process(&self, state: &mut LadderState, input: f32) -> f32 {
        if !self.enabled {
            return input;
        }
        self.tick(self.coeff, self.feedback, state, input)
    }

    /// Process one sample under cutoff/resonance modulation.
    ///
    /// Same epsilon contract as the SVF: the stage coefficient is
    /// recomputed only when the modulated cutoff strays more than 0.1%
    /// from the cached baseline. Modulated values are clamped, never
    /// rejected.
    #[inline]
    pub fn process_mod(
        &self,
        state: &mut LadderState,
        input: f32,
        cutoff: f32,
        resonance: f32,
    ) -> f32 {
        if !self.enabled {
            return input;
        }
        let cutoff = cutoff.clamp(10.0, self.sample_rate * 0.45);
        let resonance = resonance.clamp(0.0, 1.0);
        let coeff = if (cutoff - self.cutoff).abs() > self.cutoff * MOD_EPSILON {
            stage_coeff(cutoff, self.sample_rate)
        } else {
            self.coeff
        };
        let feedback = if (resonance - self.resonance).abs() > MOD_EPSILON {
            resonance * 4.0
        } else {
            self.feedback
        };
        self.tick(coeff, feedback, state, input)
    }

    #[inline]
    fn tick(&self, coeff: f32, feedback: f32, state: &mut LadderState, input: f32) -> f32 {
        let fed = input - feedback * state.stages[3];
        // tanh(x·d)/d keeps small-signal gain at unity, so the
        // saturating path meets the linear path continuously at d = 1
        let mut x = if self.drive > DRIVE_LINEAR_LIMIT {
            fast_tanh(fed * self.drive) / self.drive
        } else {
            fed
        };
        for stage in &mut state.stages {
            *stage = flush_denormal(*stage + coeff * (x - *stage));
            x = *stage;
        }
        state.stages[3]
    }
}

/// One-pole stage coefficient, `2·sin(pi·fc/sr)`, in `(0, 2)`.
#[inline]
fn stage_coeff(cutoff: f32, sample_rate: f32) -> f32 {
    2.0 * sinf(PI * cutoff / sample_rate)
}
