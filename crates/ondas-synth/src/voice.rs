//! Polyphonic voice pool with oldest-note stealing.
//!
//! A [`Voice`] holds only per-note state: phase accumulators, envelope
//! instances, filter states, a noise generator, and identity (note,
//! velocity, trigger serial). Everything configurable is shared on the
//! [`VoicePool`] and read by every voice, so a parameter change touches
//! one place and sixteen voices follow.
//!
//! Allocation never fails: a free voice (all envelopes idle) is taken
//! first, otherwise the voice with the oldest trigger serial is stolen.
//! A voice only becomes free again once every envelope it triggered has
//! ramped down to idle, so releases are never cut off by pool
//! bookkeeping, only by stealing.

use ondas_core::fast_math::{fast_exp2, semitones_to_ratio};
use ondas_core::ladder::{LadderFilter, LadderState};
use ondas_core::phase::{Phase, to_fixed_increment};
use ondas_core::svf::{SvFilter, SvfState};

use crate::envelope::{AdsrEnvelope, AdsrParams, EnvStage, EnvelopeConfigError};
use crate::mod_matrix::{ModDest, ModMatrix, ModSourceBlock};
use crate::noise::{NoiseConfig, NoiseState};
use crate::oscillator::{OscConfig, fm_phase_offset, mip_position};

/// Number of voices in the pool.
pub const MAX_VOICES: usize = 16;

/// Oscillator slots per voice.
pub const NUM_OSCS: usize = 3;

const PITCH_DESTS: [ModDest; NUM_OSCS] =
    [ModDest::Osc1Pitch, ModDest::Osc2Pitch, ModDest::Osc3Pitch];
const SCAN_DESTS: [ModDest; NUM_OSCS] =
    [ModDest::Osc1Scan, ModDest::Osc2Scan, ModDest::Osc3Scan];

/// Per-note state for one voice.
#[derive(Clone, Debug)]
pub struct Voice {
    phases: [Phase; NUM_OSCS],
    base_incs: [f32; NUM_OSCS],
    /// Previous-sample slot outputs, the FM feedback taps.
    last_out: [f32; NUM_OSCS],
    envelopes: [AdsrEnvelope; NUM_OSCS],
    svf_state: SvfState,
    ladder_state: LadderState,
    noise: NoiseState,
    note: u8,
    velocity: f32,
    serial: u64,
    active: bool,
}

impl Voice {
    fn new(sample_rate: f32, noise_seed: u32) -> Self {
        Self {
            phases: [Phase::ZERO; NUM_OSCS],
            base_incs: [0.0; NUM_OSCS],
            last_out: [0.0; NUM_OSCS],
            envelopes: core::array::from_fn(|_| AdsrEnvelope::new(sample_rate)),
            svf_state: SvfState::default(),
            ladder_state: LadderState::default(),
            noise: NoiseState::new(noise_seed),
            note: 0,
            velocity: 0.0,
            serial: 0,
            active: false,
        }
    }

    /// MIDI note this voice is (or was last) playing.
    pub fn note(&self) -> u8 {
        self.note
    }

    /// Whether the voice is currently sounding.
    pub fn is_active(&self) -> bool {
        self.active
    }

    fn is_releasing(&self) -> bool {
        self.envelopes.iter().any(|e| e.stage() == EnvStage::Release)
    }

    fn all_idle(&self) -> bool {
        self.envelopes.iter().all(AdsrEnvelope::is_idle)
    }
}

/// Fixed pool of [`MAX_VOICES`] voices sharing one configuration.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use ondas_core::wavetable::WavetableBank;
/// use ondas_synth::mod_matrix::ModMatrix;
/// use ondas_synth::voice::VoicePool;
///
/// let mut pool = VoicePool::new(48000.0);
/// let slot = pool.osc_config_mut(0);
/// slot.set_bank(Some(Arc::new(WavetableBank::sine("sine"))));
/// slot.set_enabled(true);
///
/// let matrix: ModMatrix<16> = ModMatrix::new();
/// pool.note_on(69, 100);
/// let sample = pool.process_sample(&matrix);
/// assert!(sample.is_finite());
/// ```
pub struct VoicePool {
    voices: [Voice; MAX_VOICES],
    osc_configs: [OscConfig; NUM_OSCS],
    env_params: [AdsrParams; NUM_OSCS],
    noise: NoiseConfig,
    svf: SvFilter,
    ladder: LadderFilter,
    sample_rate: f32,
    next_serial: u64,
}

impl VoicePool {
    /// Create a pool with all slots disabled and both filters bypassed.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            // Distinct noise seeds so unison voices decorrelate
            voices: core::array::from_fn(|i| {
                Voice::new(sample_rate, 0x9E37_79B9u32.wrapping_mul(i as u32 + 1))
            }),
            osc_configs: core::array::from_fn(|_| OscConfig::default()),
            env_params: [AdsrParams::default(); NUM_OSCS],
            noise: NoiseConfig::default(),
            svf: SvFilter::new(sample_rate),
            ladder: LadderFilter::new(sample_rate),
            sample_rate,
            next_serial: 0,
        }
    }

    /// Shared config for an oscillator slot.
    pub fn osc_config(&self, slot: usize) -> &OscConfig {
        &self.osc_configs[slot]
    }

    /// Mutable shared config for an oscillator slot.
    ///
    /// Mutations take effect for newly triggered voices (pitch offsets)
    /// or from the next sample (scan, mix, FM); callers mutate only at
    /// block boundaries so a block sees one consistent config.
    pub fn osc_config_mut(&mut self, slot: usize) -> &mut OscConfig {
        &mut self.osc_configs[slot]
    }

    /// Envelope parameters for a slot.
    pub fn env_params(&self, slot: usize) -> AdsrParams {
        self.env_params[slot]
    }

    /// Apply envelope parameters to a slot across every voice.
    ///
    /// # Errors
    ///
    /// Validation failures leave every voice and the stored parameters
    /// unchanged.
    pub fn set_env_params(
        &mut self,
        slot: usize,
        params: AdsrParams,
    ) -> Result<(), EnvelopeConfigError> {
        // set_params validates atomically; probe on the first voice,
        // then the rest cannot fail
        self.voices[0].envelopes[slot].set_params(&params)?;
        for voice in &mut self.voices[1..] {
            let _ = voice.envelopes[slot].set_params(&params);
        }
        self.env_params[slot] = params;
        Ok(())
    }

    /// Shared noise tap configuration.
    ///
    /// The noise signal rides slot 0's envelope, so it sounds only
    /// while slot 0 is enabled and gated.
    pub fn noise_config_mut(&mut self) -> &mut NoiseConfig {
        &mut self.noise
    }

    /// Shared SVF configuration (read-only; use the pool setters).
    pub fn svf(&self) -> &SvFilter {
        &self.svf
    }

    /// Shared ladder configuration (read-only; use the pool setters).
    pub fn ladder(&self) -> &LadderFilter {
        &self.ladder
    }

    /// Mutable SVF configuration for cutoff/resonance/mode changes.
    pub fn svf_mut(&mut self) -> &mut SvFilter {
        &mut self.svf
    }

    /// Mutable ladder configuration for cutoff/resonance/drive changes.
    pub fn ladder_mut(&mut self) -> &mut LadderFilter {
        &mut self.ladder
    }

    /// Enable or disable the SVF. Enabling clears every voice's filter
    /// state so old integrator charge is not replayed.
    pub fn set_svf_enabled(&mut self, enabled: bool) {
        if enabled && !self.svf.is_enabled() {
            for voice in &mut self.voices {
                voice.svf_state.reset();
            }
        }
        self.svf.set_enabled(enabled);
    }

    /// Enable or disable the ladder. Enabling clears every voice's
    /// filter state.
    pub fn set_ladder_enabled(&mut self, enabled: bool) {
        if enabled && !self.ladder.is_enabled() {
            for voice in &mut self.voices {
                voice.ladder_state.reset();
            }
        }
        self.ladder.set_enabled(enabled);
    }

    /// Pick the voice for the next note: the first free slot, or with
    /// the pool full, the voice holding the oldest trigger serial.
    fn allocate(&self) -> usize {
        if let Some(index) = self.voices.iter().position(|v| !v.active) {
            return index;
        }
        self.voices
            .iter()
            .enumerate()
            .min_by_key(|(_, v)| v.serial)
            .map_or(0, |(index, _)| index)
    }

    /// Trigger a note. Never fails: steals the oldest voice when the
    /// pool is full.
    pub fn note_on(&mut self, note: u8, velocity: u8) {
        let index = self.allocate();
        let serial = self.next_serial;
        self.next_serial += 1;

        let configs = &self.osc_configs;
        let voice = &mut self.voices[index];
        voice.note = note;
        voice.velocity = f32::from(velocity.min(127)) / 127.0;
        voice.serial = serial;
        voice.active = true;
        voice.last_out = [0.0; NUM_OSCS];
        voice.svf_state.reset();
        voice.ladder_state.reset();
        for slot in 0..NUM_OSCS {
            voice.phases[slot] = Phase::ZERO;
            voice.base_incs[slot] = configs[slot].base_increment(note, self.sample_rate);
            if configs[slot].is_enabled() {
                voice.envelopes[slot].trigger();
            } else {
                voice.envelopes[slot].reset();
            }
        }
    }

    /// Release a note. Finds the active, not-yet-releasing voice
    /// holding it; an unknown note is a no-op.
    pub fn note_off(&mut self, note: u8) {
        if let Some(voice) = self
            .voices
            .iter_mut()
            .find(|v| v.active && v.note == note && !v.is_releasing())
        {
            for env in &mut voice.envelopes {
                env.release();
            }
        }
    }

    /// Release every active voice.
    pub fn all_notes_off(&mut self) {
        for voice in &mut self.voices {
            if voice.active {
                for env in &mut voice.envelopes {
                    env.release();
                }
            }
        }
    }

    /// Snapshot per-voice modulation sources into `sources`.
    pub fn fill_sources(&self, sources: &mut ModSourceBlock) {
        for (i, voice) in self.voices.iter().enumerate() {
            sources.velocity[i] = voice.velocity;
            // -1 at MIDI 0, 0 at middle C, ~+1 at the top of the keyboard
            sources.key_track[i] = ((f32::from(voice.note) - 60.0) / 64.0).clamp(-1.0, 1.0);
        }
    }

    /// Number of currently sounding voices.
    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| v.active).count()
    }

    /// Whether at least one voice is free for immediate allocation.
    pub fn has_free_voice(&self) -> bool {
        self.voices.iter().any(|v| !v.active)
    }

    /// Render and sum one sample from every active voice.
    ///
    /// The hot path: no allocation, no locks, no panics. A voice whose
    /// oscillator mix goes non-finite contributes silence for that
    /// sample instead of poisoning the filters.
    pub fn process_sample(&mut self, matrix: &ModMatrix<{ crate::MAX_ROUTES }>) -> f32 {
        let Self {
            voices,
            osc_configs,
            noise,
            svf,
            ladder,
            ..
        } = self;

        let mut sum = 0.0;
        for (vi, voice) in voices.iter_mut().enumerate() {
            if !voice.active {
                continue;
            }

            let mut mixed = 0.0;
            let mut new_out = [0.0f32; NUM_OSCS];
            for slot in 0..NUM_OSCS {
                let cfg = &osc_configs[slot];
                let env = &mut voice.envelopes[slot];
                if !cfg.is_enabled() {
                    // A slot disabled mid-note must not keep holding the
                    // voice hostage in sustain
                    if !env.is_idle() {
                        env.reset();
                    }
                    continue;
                }
                if env.is_idle() {
                    continue;
                }

                let pitch = matrix.value(PITCH_DESTS[slot], vi);
                let inc = voice.base_incs[slot] * semitones_to_ratio(pitch);
                let fm_offset = match cfg.fm_source().slot_index() {
                    Some(src) => fm_phase_offset(cfg.fm_depth(), voice.last_out[src]),
                    None => 0,
                };
                let scan = cfg.scan() + matrix.value(SCAN_DESTS[slot], vi);
                let raw = cfg.read(voice.phases[slot], mip_position(inc), scan, fm_offset);
                voice.phases[slot] = voice.phases[slot].advance(to_fixed_increment(inc));
                new_out[slot] = raw;
                mixed += raw * env.advance() * cfg.mix();
            }
            voice.last_out = new_out;

            if noise.enabled {
                let level = voice.envelopes[0].level();
                mixed += voice.noise.next_bipolar() * noise.mix.clamp(0.0, 1.0) * level;
            }

            if !mixed.is_finite() {
                mixed = 0.0;
            }

            let svf_cutoff = svf.cutoff() * fast_exp2(matrix.value(ModDest::SvfCutoff, vi));
            let svf_res = svf.resonance() + matrix.value(ModDest::SvfResonance, vi);
            let filtered = svf.process_mod(&mut voice.svf_state, mixed, svf_cutoff, svf_res);

            let lad_cutoff =
                ladder.cutoff() * fast_exp2(matrix.value(ModDest::LadderCutoff, vi));
            let lad_res = ladder.resonance() + matrix.value(ModDest::LadderResonance, vi);
            let shaped = ladder.process_mod(&mut voice.ladder_state, filtered, lad_cutoff, lad_res);

            let amp = (1.0 + matrix.value(ModDest::Amp, vi)).max(0.0);
            sum += shaped * amp * voice.velocity;

            if voice.all_idle() {
                voice.active = false;
            }
        }
        sum
    }
}
