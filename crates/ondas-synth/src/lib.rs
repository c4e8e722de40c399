//! Ondas Synth - the real-time wavetable synthesis engine
//!
//! Everything above the DSP primitives: a sixteen-voice pool with
//! oldest-note stealing, three wavetable oscillator slots per voice
//! with FM between them, per-slot ADSR envelopes, a modulation matrix
//! with per-block smoothing, lock-free event queues, and the engine
//! that ties them to an audio callback.
//!
//! # Core Components
//!
//! ## Engine
//!
//! [`engine::Engine`] is the usual entry point. It splits into an
//! audio-thread half and a control-thread half at construction:
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
//! // Control thread side
//! inputs.note_tx.push(NoteEvent::on(60, 100));
//!
//! // Audio thread side
//! let mut block = [0.0f32; 512];
//! engine.process_block(&mut block);
//! ```
//!
//! ## Voices
//!
//! - [`voice::VoicePool`] - fixed pool, shared config, never-failing
//!   allocation
//! - [`envelope::AdsrEnvelope`] - linear ADSR with exact sample timing
//! - [`oscillator::OscConfig`] - per-slot wavetable, scan, mix, FM and
//!   pitch settings
//!
//! ## Modulation
//!
//! - [`mod_matrix::ModMatrix`] - bounded route table, per-block target
//!   computation, per-sample linear smoothing
//! - [`lfo::BlockLfo`] - block-rate LFOs feeding the matrix
//!
//! ## Control plumbing
//!
//! - [`queue`] - single-producer single-consumer lock-free rings
//! - [`events`] / [`params`] - wire events and the normalized
//!   parameter table
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible (it needs `alloc` for banks and
//! queue storage). Disable the default `std` feature:
//!
//! ```toml
//! [dependencies]
//! ondas-synth = { version = "0.1", default-features = false }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod engine;
pub mod envelope;
pub mod events;
pub mod lfo;
pub mod mod_matrix;
pub mod noise;
pub mod oscillator;
pub mod params;
pub mod queue;
pub mod voice;

/// Capacity of the engine's modulation route table.
pub const MAX_ROUTES: usize = 16;

// Re-export main types at crate root
pub use engine::{Engine, EngineError, EngineInputs, MAX_BLOCK};
pub use envelope::{AdsrEnvelope, AdsrParams, EnvStage, EnvelopeConfigError};
pub use events::{NoteEvent, NoteKind, ParamEvent};
pub use lfo::{BlockLfo, LfoWaveform};
pub use mod_matrix::{ModDest, ModMatrix, ModRoute, ModSource, ModSourceBlock};
pub use noise::{NoiseConfig, NoiseState};
pub use oscillator::{FmSource, OscConfig, OscConfigError};
pub use params::{OscSlot, ParamId, ParamRange, ParamScale};
pub use queue::{Consumer, Producer, event_queue};
pub use voice::{MAX_VOICES, NUM_OSCS, Voice, VoicePool};
