//! Linear ADSR envelope generator.
//!
//! Counter-based and exactly linear in every phase: attack ramps 0 to 1
//! over the attack time, decay ramps 1 to the sustain level, release
//! ramps from wherever the envelope was when the gate dropped down to
//! zero. Phase lengths are cached as sample counts when a setter
//! accepts a new time, so the per-sample step is one counter increment
//! and one divide-free multiply.
//!
//! [`AdsrEnvelope::release`] captures the current output level from any
//! stage, so a note released mid-attack ramps down from its mid-attack
//! level instead of snapping to the sustain level first.

use ondas_core::fast_math::ms_to_samples;
use thiserror::Error;

/// Envelope configuration errors, raised at the setter boundary.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EnvelopeConfigError {
    /// Phase times must be finite and non-negative.
    #[error("{phase} time {ms} ms is invalid (must be >= 0)")]
    InvalidTime {
        /// Which phase the rejected value was for.
        phase: &'static str,
        /// The rejected time in milliseconds.
        ms: f32,
    },
    /// Sustain must be in `[0, 1]`.
    #[error("sustain level {level} outside [0, 1]")]
    SustainOutOfRange {
        /// The rejected sustain level.
        level: f32,
    },
}

/// Envelope stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnvStage {
    /// Silent; the owning voice slot is free.
    #[default]
    Idle,
    /// Ramping 0 to 1.
    Attack,
    /// Ramping 1 down to the sustain level.
    Decay,
    /// Holding the sustain level until release.
    Sustain,
    /// Ramping the captured level down to 0.
    Release,
}

/// ADSR parameter set, applied atomically via
/// [`AdsrEnvelope::set_params`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdsrParams {
    /// Attack time in milliseconds.
    pub attack_ms: f32,
    /// Decay time in milliseconds.
    pub decay_ms: f32,
    /// Sustain level in `[0, 1]`.
    pub sustain: f32,
    /// Release time in milliseconds.
    pub release_ms: f32,
}

impl Default for AdsrParams {
    fn default() -> Self {
        Self {
            attack_ms: 10.0,
            decay_ms: 100.0,
            sustain: 0.7,
            release_ms: 200.0,
        }
    }
}

/// Linear counter-based ADSR envelope.
///
/// # Example
///
/// ```rust
/// use ondas_synth::envelope::{AdsrEnvelope, EnvStage};
///
/// let mut env = AdsrEnvelope::new(48000.0);
/// env.set_attack_ms(10.0).unwrap();
/// env.set_sustain(0.5).unwrap();
///
/// env.trigger();
/// let level = env.advance();
/// assert!(level > 0.0);
/// assert_eq!(env.stage(), EnvStage::Attack);
/// ```
#[derive(Clone, Debug)]
pub struct AdsrEnvelope {
    stage: EnvStage,
    /// Samples elapsed in the current stage.
    t: u32,
    release_start: f32,

    attack_samples: u32,
    decay_samples: u32,
    release_samples: u32,
    sustain: f32,

    attack_ms: f32,
    decay_ms: f32,
    release_ms: f32,
    sample_rate: f32,
}

impl Default for AdsrEnvelope {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl AdsrEnvelope {
    /// Create an idle envelope with default ADSR parameters.
    pub fn new(sample_rate: f32) -> Self {
        let params = AdsrParams::default();
        let mut env = Self {
            stage: EnvStage::Idle,
            t: 0,
            release_start: 0.0,
            attack_samples: 0,
            decay_samples: 0,
            release_samples: 0,
            sustain: params.sustain,
            attack_ms: params.attack_ms,
            decay_ms: params.decay_ms,
            release_ms: params.release_ms,
            sample_rate,
        };
        env.recompute_counts();
        env
    }

    /// Set the attack time in milliseconds. Zero means instantaneous.
    ///
    /// # Errors
    ///
    /// Rejects negative or non-finite times; prior value is kept.
    pub fn set_attack_ms(&mut self, ms: f32) -> Result<(), EnvelopeConfigError> {
        Self::check_time("attack", ms)?;
        self.attack_ms = ms;
        self.recompute_counts();
        Ok(())
    }

    /// Set the decay time in milliseconds. Zero means instantaneous.
    ///
    /// # Errors
    ///
    /// Rejects negative or non-finite times; prior value is kept.
    pub fn set_decay_ms(&mut self, ms: f32) -> Result<(), EnvelopeConfigError> {
        Self::check_time("decay", ms)?;
        self.decay_ms = ms;
        self.recompute_counts();
        Ok(())
    }

    /// Set the sustain level in `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Rejects values outside the range; prior value is kept.
    pub fn set_sustain(&mut self, level: f32) -> Result<(), EnvelopeConfigError> {
        if !(0.0..=1.0).contains(&level) {
            return Err(EnvelopeConfigError::SustainOutOfRange { level });
        }
        self.sustain = level;
        Ok(())
    }

    /// Set the release time in milliseconds. Zero means instantaneous.
    ///
    /// # Errors
    ///
    /// Rejects negative or non-finite times; prior value is kept.
    pub fn set_release_ms(&mut self, ms: f32) -> Result<(), EnvelopeConfigError> {
        Self::check_time("release", ms)?;
        self.release_ms = ms;
        self.recompute_counts();
        Ok(())
    }

    /// Apply a full parameter set atomically: all four values are
    /// validated before any of them take effect.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure; the envelope is unchanged.
    pub fn set_params(&mut self, params: &AdsrParams) -> Result<(), EnvelopeConfigError> {
        Self::check_time("attack", params.attack_ms)?;
        Self::check_time("decay", params.decay_ms)?;
        Self::check_time("release", params.release_ms)?;
        if !(0.0..=1.0).contains(&params.sustain) {
            return Err(EnvelopeConfigError::SustainOutOfRange {
                level: params.sustain,
            });
        }
        self.attack_ms = params.attack_ms;
        self.decay_ms = params.decay_ms;
        self.release_ms = params.release_ms;
        self.sustain = params.sustain;
        self.recompute_counts();
        Ok(())
    }

    /// Start the attack phase from the beginning. Retriggering a
    /// sounding envelope restarts the attack ramp from zero.
    pub fn trigger(&mut self) {
        self.stage = EnvStage::Attack;
        self.t = 0;
    }

    /// Begin the release phase, capturing the current level as the ramp
    /// start. Works from any stage, including mid-attack. A no-op when
    /// idle.
    pub fn release(&mut self) {
        if self.stage == EnvStage::Idle {
            return;
        }
        self.release_start = self.level();
        self.stage = EnvStage::Release;
        self.t = 0;
    }

    /// Force the envelope back to idle without a release ramp.
    pub fn reset(&mut self) {
        self.stage = EnvStage::Idle;
        self.t = 0;
        self.release_start = 0.0;
    }

    /// Current output level without advancing time.
    ///
    /// This is what [`release`](Self::release) captures; a zero-length
    /// phase reads as its terminal value.
    pub fn level(&self) -> f32 {
        match self.stage {
            EnvStage::Idle => 0.0,
            EnvStage::Attack => {
                if self.attack_samples == 0 {
                    1.0
                } else {
                    self.t as f32 / self.attack_samples as f32
                }
            }
            EnvStage::Decay => {
                if self.decay_samples == 0 {
                    self.sustain
                } else {
                    let progress = self.t as f32 / self.decay_samples as f32;
                    1.0 - progress * (1.0 - self.sustain)
                }
            }
            EnvStage::Sustain => self.sustain,
            EnvStage::Release => {
                if self.release_samples == 0 {
                    0.0
                } else {
                    let progress = self.t as f32 / self.release_samples as f32;
                    self.release_start * (1.0 - progress)
                }
            }
        }
    }

    /// Advance one sample and return the level.
    ///
    /// Zero-length phases are skipped within the same call, so an
    /// envelope with a 0 ms attack outputs 1.0 on its first sample
    /// after a trigger.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        loop {
            match self.stage {
                EnvStage::Idle => return 0.0,
                EnvStage::Attack => {
                    if self.attack_samples == 0 {
                        self.stage = EnvStage::Decay;
                        self.t = 0;
                        continue;
                    }
                    self.t += 1;
                    let level = (self.t as f32 / self.attack_samples as f32).min(1.0);
                    if self.t >= self.attack_samples {
                        self.stage = EnvStage::Decay;
                        self.t = 0;
                    }
                    return level;
                }
                EnvStage::Decay => {
                    if self.decay_samples == 0 {
                        self.stage = EnvStage::Sustain;
                        self.t = 0;
                        continue;
                    }
                    self.t += 1;
                    let progress = self.t as f32 / self.decay_samples as f32;
                    let level = 1.0 - progress * (1.0 - self.sustain);
                    if self.t >= self.decay_samples {
                        self.stage = EnvStage::Sustain;
                        self.t = 0;
                    }
                    return level;
                }
                EnvStage::Sustain => return self.sustain,
                EnvStage::Release => {
                    if self.release_samples == 0 {
                        self.stage = EnvStage::Idle;
                        self.t = 0;
                        return 0.0;
                    }
                    self.t += 1;
                    let progress = self.t as f32 / self.release_samples as f32;
                    let level = self.release_start * (1.0 - progress);
                    if self.t >= self.release_samples {
                        self.stage = EnvStage::Idle;
                        self.t = 0;
                    }
                    return level;
                }
            }
        }
    }

    /// Current stage.
    pub fn stage(&self) -> EnvStage {
        self.stage
    }

    /// Whether the envelope is idle (its voice slot is free).
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.stage == EnvStage::Idle
    }

    fn check_time(phase: &'static str, ms: f32) -> Result<(), EnvelopeConfigError> {
        if ms.is_finite() && ms >= 0.0 {
            Ok(())
        } else {
            Err(EnvelopeConfigError::InvalidTime { phase, ms })
        }
    }

    fn recompute_counts(&mut self) {
        self.attack_samples = ms_to_samples(self.attack_ms, self.sample_rate) as u32;
        self.decay_samples = ms_to_samples(self.decay_ms, self.sample_rate) as u32;
        self.release_samples = ms_to_samples(self.release_ms, self.sample_rate) as u32;
    }
}
