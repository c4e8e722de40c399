//! Top-level synthesis engine.
//!
//! [`Engine`] owns the voice pool, the modulation matrix, two global
//! LFOs, and the consuming ends of the note and parameter queues.
//! [`EngineInputs`] carries the producing ends and is handed to the
//! control thread; after that split, the engine side is safe to move
//! into an audio callback.
//!
//! Every block follows the same rhythm: drain the parameter queue,
//! drain the note queue, then render. Parameters land first so a note
//! pushed in the same block triggers against the configuration the
//! sender just set up; configuration mutates only in the drain phase,
//! so the render loop sees one consistent setup per chunk and needs no
//! synchronization of its own.
//!
//! # Example
//!
//! ```rust
//! use ondas_core::wavetable::BankRegistry;
//! use ondas_synth::engine::Engine;
//! use ondas_synth::events::NoteEvent;
//!
//! let (mut engine, mut inputs) = Engine::new(48000.0, BankRegistry::with_standard_banks());
//! engine.set_osc_bank(0, "saw").unwrap();
//! engine.osc_config_mut(0).set_enabled(true);
//!
//! inputs.note_tx.push(NoteEvent::on(60, 100));
//! let mut block = [0.0f32; 256];
//! engine.process_block(&mut block);
//! assert!(block.iter().any(|s| *s != 0.0));
//! ```

use alloc::string::String;
use thiserror::Error;

use ondas_core::wavetable::BankRegistry;

use crate::MAX_ROUTES;
use crate::envelope::{AdsrParams, EnvelopeConfigError};
use crate::events::{NoteEvent, NoteKind, ParamEvent};
use crate::lfo::BlockLfo;
use crate::mod_matrix::{ModMatrix, ModRoute, ModSourceBlock};
use crate::oscillator::OscConfig;
use crate::params::ParamId;
use crate::queue::{Consumer, Producer, event_queue};
use crate::voice::VoicePool;

/// Maximum frames rendered per chunk; longer output slices are split.
pub const MAX_BLOCK: usize = 1024;

/// Capacity of each event queue.
const QUEUE_CAPACITY: usize = 256;

/// Errors from the engine's direct control surface.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// No bank with this name exists in the registry.
    #[error("unknown wavetable bank `{0}`")]
    UnknownBank(String),
}

/// Producer ends of the engine's event queues, for the control thread.
pub struct EngineInputs {
    /// Note on/off events.
    pub note_tx: Producer<NoteEvent>,
    /// Normalized parameter changes.
    pub param_tx: Producer<ParamEvent>,
}

/// The real-time synthesis engine.
pub struct Engine {
    pool: VoicePool,
    matrix: ModMatrix<MAX_ROUTES>,
    lfo1: BlockLfo,
    lfo2: BlockLfo,
    registry: BankRegistry,
    note_rx: Consumer<NoteEvent>,
    param_rx: Consumer<ParamEvent>,
    sample_rate: f32,
    mod_wheel: f32,
    master_gain: f32,
}

impl Engine {
    /// Build an engine and the control-thread handles to feed it.
    pub fn new(sample_rate: f32, registry: BankRegistry) -> (Self, EngineInputs) {
        let (note_tx, note_rx) = event_queue(QUEUE_CAPACITY);
        let (param_tx, param_rx) = event_queue(QUEUE_CAPACITY);
        let engine = Self {
            pool: VoicePool::new(sample_rate),
            matrix: ModMatrix::new(),
            lfo1: BlockLfo::new(sample_rate, 1.0),
            lfo2: BlockLfo::new(sample_rate, 0.25),
            registry,
            note_rx,
            param_rx,
            sample_rate,
            mod_wheel: 0.0,
            master_gain: 1.0,
        };
        (engine, EngineInputs { note_tx, param_tx })
    }

    /// Render a mono block. Drains the parameter queue, then the note
    /// queue, then renders in chunks of at most [`MAX_BLOCK`] frames.
    /// Parameters apply before notes so a note-on sent alongside a
    /// configuration change triggers the freshly configured slots.
    pub fn process_block(&mut self, out: &mut [f32]) {
        self.drain_params();
        self.drain_notes();
        for chunk in out.chunks_mut(MAX_BLOCK) {
            self.render_chunk(chunk);
        }
    }

    /// Render one block into both channels of a non-interleaved stereo
    /// pair. Both channels carry the same mono sum; slices must be the
    /// same length.
    pub fn process_stereo(&mut self, left: &mut [f32], right: &mut [f32]) {
        let frames = left.len().min(right.len());
        self.process_block(&mut left[..frames]);
        right[..frames].copy_from_slice(&left[..frames]);
    }

    fn drain_notes(&mut self) {
        while let Some(event) = self.note_rx.pop() {
            match event.kind {
                NoteKind::On => self.pool.note_on(event.note, event.velocity),
                NoteKind::Off => self.pool.note_off(event.note),
            }
        }
    }

    fn drain_params(&mut self) {
        while let Some(event) = self.param_rx.pop() {
            self.apply_param(event);
        }
    }

    /// Apply one parameter event. Denormalized values land inside
    /// every setter's accepted range, so rejections indicate a wiring
    /// bug; they are logged and skipped, never escalated, because this
    /// runs on the audio thread. Cutoff ranges reach 20 kHz, above
    /// Nyquist at low sample rates, so they are capped to the filter's
    /// usable band before the setter sees them.
    fn apply_param(&mut self, event: ParamEvent) {
        let value = event.id.denormalize(event.value);
        let rejected = match event.id {
            ParamId::OscEnabled(slot) => {
                self.pool
                    .osc_config_mut(slot.index())
                    .set_enabled(value >= 0.5);
                false
            }
            ParamId::OscScan(slot) => self
                .pool
                .osc_config_mut(slot.index())
                .set_scan(value)
                .is_err(),
            ParamId::OscMix(slot) => self
                .pool
                .osc_config_mut(slot.index())
                .set_mix(value)
                .is_err(),
            ParamId::OscOctave(slot) => {
                let octave = libm::roundf(value) as i8;
                self.pool
                    .osc_config_mut(slot.index())
                    .set_octave(octave)
                    .is_err()
            }
            ParamId::OscDetune(slot) => self
                .pool
                .osc_config_mut(slot.index())
                .set_detune_cents(value)
                .is_err(),
            ParamId::OscFmDepth(slot) => self
                .pool
                .osc_config_mut(slot.index())
                .set_fm_depth(value)
                .is_err(),
            ParamId::EnvAttack(slot) => self
                .update_env(slot.index(), |p| p.attack_ms = value)
                .is_err(),
            ParamId::EnvDecay(slot) => self
                .update_env(slot.index(), |p| p.decay_ms = value)
                .is_err(),
            ParamId::EnvSustain(slot) => self
                .update_env(slot.index(), |p| p.sustain = value)
                .is_err(),
            ParamId::EnvRelease(slot) => self
                .update_env(slot.index(), |p| p.release_ms = value)
                .is_err(),
            ParamId::SvfEnabled => {
                self.pool.set_svf_enabled(value >= 0.5);
                false
            }
            ParamId::SvfCutoff => {
                let cutoff = value.min(self.sample_rate * 0.45);
                self.pool.svf_mut().set_cutoff(cutoff).is_err()
            }
            ParamId::SvfResonance => self.pool.svf_mut().set_resonance(value).is_err(),
            ParamId::SvfMode => {
                self.pool.svf_mut().set_mode(svf_mode_from_index(value));
                false
            }
            ParamId::LadderEnabled => {
                self.pool.set_ladder_enabled(value >= 0.5);
                false
            }
            ParamId::LadderCutoff => {
                let cutoff = value.min(self.sample_rate * 0.45);
                self.pool.ladder_mut().set_cutoff(cutoff).is_err()
            }
            ParamId::LadderResonance => self.pool.ladder_mut().set_resonance(value).is_err(),
            ParamId::LadderDrive => self.pool.ladder_mut().set_drive(value).is_err(),
            ParamId::Lfo1Rate => {
                self.lfo1.set_frequency(value);
                false
            }
            ParamId::Lfo2Rate => {
                self.lfo2.set_frequency(value);
                false
            }
            ParamId::MasterGain => {
                self.master_gain = value;
                false
            }
        };
        if rejected {
            #[cfg(feature = "tracing")]
            tracing::warn!("param event rejected: {:?}", event.id);
        }
    }

    fn update_env(
        &mut self,
        slot: usize,
        edit: impl FnOnce(&mut AdsrParams),
    ) -> Result<(), EnvelopeConfigError> {
        let mut params = self.pool.env_params(slot);
        edit(&mut params);
        self.pool.set_env_params(slot, params)
    }

    fn render_chunk(&mut self, out: &mut [f32]) {
        if out.is_empty() {
            return;
        }
        let mut sources = ModSourceBlock {
            lfo1: self.lfo1.next_block(out.len()),
            lfo2: self.lfo2.next_block(out.len()),
            mod_wheel: self.mod_wheel,
            ..ModSourceBlock::default()
        };
        self.pool.fill_sources(&mut sources);
        self.matrix.begin_block(&sources, out.len());
        for sample in out.iter_mut() {
            self.matrix.advance();
            *sample = self.pool.process_sample(&self.matrix) * self.master_gain;
        }
    }

    /// Point an oscillator slot at a registered bank.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownBank`] when no bank carries `name`; the
    /// slot keeps its previous bank.
    pub fn set_osc_bank(&mut self, slot: usize, name: &str) -> Result<(), EngineError> {
        let bank = self
            .registry
            .get(name)
            .ok_or_else(|| EngineError::UnknownBank(String::from(name)))?;
        self.pool.osc_config_mut(slot).set_bank(Some(bank));
        Ok(())
    }

    /// Direct access to a slot's oscillator config, for setup and
    /// offline control.
    pub fn osc_config_mut(&mut self, slot: usize) -> &mut OscConfig {
        self.pool.osc_config_mut(slot)
    }

    /// The voice pool, for setup and inspection.
    pub fn pool(&self) -> &VoicePool {
        &self.pool
    }

    /// Mutable voice pool access, for setup and offline control.
    pub fn pool_mut(&mut self) -> &mut VoicePool {
        &mut self.pool
    }

    /// Add a modulation route. Returns `false` when the table is full.
    pub fn add_mod_route(&mut self, route: ModRoute) -> bool {
        self.matrix.add_route(route)
    }

    /// Remove a modulation route by index.
    pub fn remove_mod_route(&mut self, index: usize) -> Option<ModRoute> {
        self.matrix.remove_route(index)
    }

    /// Set the mod wheel position, clamped to `[0, 1]`.
    pub fn set_mod_wheel(&mut self, value: f32) {
        self.mod_wheel = value.clamp(0.0, 1.0);
    }

    /// Set the final output gain, clamped to `[0, 2]`.
    pub fn set_master_gain(&mut self, gain: f32) {
        self.master_gain = gain.clamp(0.0, 2.0);
    }

    /// Current master gain.
    pub fn master_gain(&self) -> f32 {
        self.master_gain
    }

    /// The bank registry this engine resolves names against.
    pub fn registry(&self) -> &BankRegistry {
        &self.registry
    }

    /// Global LFO 1, for rate and waveform setup.
    pub fn lfo1_mut(&mut self) -> &mut BlockLfo {
        &mut self.lfo1
    }

    /// Global LFO 2, for rate and waveform setup.
    pub fn lfo2_mut(&mut self) -> &mut BlockLfo {
        &mut self.lfo2
    }
}

fn svf_mode_from_index(value: f32) -> ondas_core::svf::SvfMode {
    use ondas_core::svf::SvfMode;
    match libm::roundf(value) as i32 {
        1 => SvfMode::Highpass,
        2 => SvfMode::Bandpass,
        3 => SvfMode::Notch,
        _ => SvfMode::Lowpass,
    }
}
