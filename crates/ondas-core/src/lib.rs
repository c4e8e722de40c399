//! Ondas Core - wavetable and filter DSP primitives
//!
//! Allocation-light building blocks for the ondas wavetable synthesizer:
//! fixed-point phase math, mip-mapped wavetable storage, fast
//! transcendental approximations, and the two voice filters. Everything
//! here is deterministic and panic-free on the audio path; allocation
//! happens only when banks are built or registered.
//!
//! # Components
//!
//! ## Phase and wavetables
//!
//! - [`phase::Phase`] - fixed-point phase accumulator (`u32`, wrapping)
//! - [`wavetable::WavetableBank`] - mip-mapped frames with band-limited
//!   builders
//! - [`wavetable::BankRegistry`] - owned, name-keyed bank store
//!
//! ```rust
//! use ondas_core::phase::{Phase, read_linear, table_increment, to_fixed_increment};
//! use ondas_core::wavetable::WavetableBank;
//!
//! let bank = WavetableBank::sine("sine");
//! let inc = to_fixed_increment(table_increment(440.0, 48000.0));
//! let mut phase = Phase::ZERO;
//! let sample = read_linear(bank.frame(0).mip(0), phase);
//! phase = phase.advance(inc);
//! # let _ = sample;
//! ```
//!
//! ## Filters
//!
//! Shared configuration, per-voice state:
//!
//! - [`svf::SvFilter`] / [`svf::SvfState`] - TPT state variable filter
//!   (lowpass, highpass, bandpass, notch)
//! - [`ladder::LadderFilter`] / [`ladder::LadderState`] - four-stage
//!   ladder with drive saturation
//!
//! Both expose a `process_mod` path that recomputes coefficients only
//! when modulation moves the cutoff or resonance beyond an epsilon.
//!
//! ## Fast math
//!
//! [`fast_math`] holds the approximations the hot path leans on:
//! `fast_log2` (mip selection), `fast_exp2` (pitch and cutoff ratios),
//! `fast_tan` (SVF coefficients), `fast_tanh` (saturation).
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible (it needs `alloc` for bank
//! storage). Disable the default `std` feature:
//!
//! ```toml
//! [dependencies]
//! ondas-core = { version = "0.1", default-features = false }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod fast_math;
pub mod ladder;
pub mod phase;
pub mod svf;
pub mod wavetable;

// Re-export main types at crate root
pub use fast_math::{fast_exp2, fast_log2, fast_tan, fast_tanh, flush_denormal, midi_to_freq};
pub use ladder::{LadderFilter, LadderState};
pub use phase::{Phase, TABLE_SIZE, read_linear, table_increment, to_fixed_increment};
pub use svf::{FilterConfigError, SvFilter, SvfMode, SvfState};
pub use wavetable::{BankError, BankRegistry, MAX_FRAMES, MAX_MIPS, WavetableBank, WavetableFrame};
