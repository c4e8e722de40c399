//! Integration tests for ondas-synth.
//!
//! Tests cover the full engine path: queue-driven note and parameter
//! events, envelope timing through rendered audio, voice stealing,
//! modulation routing, and filter behavior on the mixed output.

use ondas_core::wavetable::BankRegistry;
use ondas_synth::engine::Engine;
use ondas_synth::envelope::AdsrParams;
use ondas_synth::events::{NoteEvent, ParamEvent};
use ondas_synth::mod_matrix::{ModDest, ModRoute, ModSource};
use ondas_synth::params::{OscSlot, ParamId};
use ondas_synth::voice::MAX_VOICES;

const SR: f32 = 48000.0;

/// Engine with slot 0 on the sine bank and a 10/10/0.5/100 ms envelope.
fn test_engine() -> (Engine, ondas_synth::engine::EngineInputs) {
    let (mut engine, inputs) = Engine::new(SR, BankRegistry::with_standard_banks());
    engine.set_osc_bank(0, "sine").unwrap();
    engine.osc_config_mut(0).set_enabled(true);
    engine
        .pool_mut()
        .set_env_params(
            0,
            AdsrParams {
                attack_ms: 10.0,
                decay_ms: 10.0,
                sustain: 0.5,
                release_ms: 100.0,
            },
        )
        .unwrap();
    (engine, inputs)
}

fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |m, s| m.max(s.abs()))
}

// ---------------------------------------------------------------------------
// 1. End-to-end note lifecycle
// ---------------------------------------------------------------------------

#[test]
fn note_lifecycle_follows_envelope_timing() {
    let (mut engine, mut inputs) = test_engine();
    assert!(inputs.note_tx.push(NoteEvent::on(69, 127)));

    // Render to the note-off point in one call
    let mut head = vec![0.0f32; 2000];
    engine.process_block(&mut head);

    // 10 ms attack = 480 samples; one 440 Hz period after that the
    // output peak sits at full envelope level
    let attack_peak = peak(&head[480..600]);
    assert!(
        attack_peak > 0.8,
        "peak after attack should be near 1.0, got {attack_peak}"
    );

    // 10 ms decay lands on sustain 0.5 by sample 960
    let sustain_peak = peak(&head[1200..2000]);
    assert!(
        (0.4..=0.6).contains(&sustain_peak),
        "sustain peak should be near 0.5, got {sustain_peak}"
    );

    // Note off at sample 2000; 100 ms release = 4800 samples
    assert!(inputs.note_tx.push(NoteEvent::off(69)));
    let mut tail = vec![0.0f32; 6000];
    engine.process_block(&mut tail);

    let released = peak(&tail[5000..]);
    assert_eq!(released, 0.0, "output must reach zero after release");
    assert_eq!(engine.pool().active_voices(), 0);
    assert!(engine.pool().has_free_voice());
}

#[test]
fn release_ramps_down_monotonically_in_amplitude() {
    let (mut engine, mut inputs) = test_engine();
    inputs.note_tx.push(NoteEvent::on(69, 127));
    let mut head = vec![0.0f32; 2000];
    engine.process_block(&mut head);

    inputs.note_tx.push(NoteEvent::off(69));
    let mut tail = vec![0.0f32; 4800];
    engine.process_block(&mut tail);

    // Per-period peaks shrink across the release (440 Hz, 109-sample
    // period; use 200-sample windows)
    let early = peak(&tail[0..200]);
    let mid = peak(&tail[2300..2500]);
    let late = peak(&tail[4400..4600]);
    assert!(early > mid && mid > late, "{early} > {mid} > {late}");
}

// ---------------------------------------------------------------------------
// 2. Polyphony and stealing through the engine
// ---------------------------------------------------------------------------

#[test]
fn chord_sums_voices() {
    let (mut engine, mut inputs) = test_engine();
    inputs.note_tx.push(NoteEvent::on(60, 127));
    let mut solo = vec![0.0f32; 1500];
    engine.process_block(&mut solo);

    let (mut engine, mut inputs) = test_engine();
    inputs.note_tx.push(NoteEvent::on(60, 127));
    inputs.note_tx.push(NoteEvent::on(64, 127));
    inputs.note_tx.push(NoteEvent::on(67, 127));
    let mut chord = vec![0.0f32; 1500];
    engine.process_block(&mut chord);

    assert_eq!(engine.pool().active_voices(), 3);
    assert!(
        peak(&chord) > peak(&solo) * 1.3,
        "three voices should sum louder than one"
    );
}

#[test]
fn seventeenth_note_steals_oldest_voice() {
    let (mut engine, mut inputs) = test_engine();
    for note in 0..MAX_VOICES as u8 {
        inputs.note_tx.push(NoteEvent::on(40 + note, 100));
    }
    let mut block = vec![0.0f32; 64];
    engine.process_block(&mut block);
    assert_eq!(engine.pool().active_voices(), MAX_VOICES);

    inputs.note_tx.push(NoteEvent::on(100, 100));
    engine.process_block(&mut block);
    assert_eq!(engine.pool().active_voices(), MAX_VOICES);
}

#[test]
fn note_off_for_unknown_note_changes_nothing() {
    let (mut engine, mut inputs) = test_engine();
    inputs.note_tx.push(NoteEvent::on(60, 100));
    inputs.note_tx.push(NoteEvent::off(72));
    let mut block = vec![0.0f32; 2000];
    engine.process_block(&mut block);
    assert_eq!(engine.pool().active_voices(), 1);
    // Still sustaining, not releasing
    assert!(peak(&block[1500..]) > 0.3);
}

// ---------------------------------------------------------------------------
// 3. Parameter events
// ---------------------------------------------------------------------------

#[test]
fn filter_cutoff_param_darkens_output() {
    let (mut engine, mut inputs) = test_engine();
    inputs.note_tx.push(NoteEvent::on(96, 127)); // ~2093 Hz
    let mut open = vec![0.0f32; 2000];
    engine.process_block(&mut open);
    let open_peak = peak(&open[1000..]);

    let (mut engine, mut inputs) = test_engine();
    engine.pool_mut().set_svf_enabled(true);
    // Normalized 0.0 over the log 20..20000 range is 20 Hz
    inputs.param_tx.push(ParamEvent::new(ParamId::SvfCutoff, 0.0));
    inputs.note_tx.push(NoteEvent::on(96, 127));
    let mut dark = vec![0.0f32; 2000];
    engine.process_block(&mut dark);
    let dark_peak = peak(&dark[1000..]);

    assert!(
        dark_peak < open_peak * 0.1,
        "20 Hz lowpass should crush a 2 kHz tone: {dark_peak} vs {open_peak}"
    );
}

#[test]
fn envelope_params_apply_through_queue() {
    let (mut engine, mut inputs) = test_engine();
    // 100 ms attack instead of 10: normalized for log 0.1..10000 is
    // ln(100/0.1)/ln(10000/0.1) = 0.6
    inputs
        .param_tx
        .push(ParamEvent::new(ParamId::EnvAttack(OscSlot::Osc1), 0.6));
    inputs.note_tx.push(NoteEvent::on(69, 127));
    let mut block = vec![0.0f32; 1000];
    engine.process_block(&mut block);
    // At sample 1000 of a 4800-sample attack the level is near 0.2
    let early = peak(&block[800..]);
    assert!(
        early < 0.35,
        "long attack should still be quiet at 20 ms, got {early}"
    );
    let params = engine.pool().env_params(0);
    assert!((params.attack_ms - 100.0).abs() < 1.0, "{}", params.attack_ms);
}

#[test]
fn detune_param_shifts_beat_frequency() {
    let (mut engine, mut inputs) = test_engine();
    // Full positive detune, +100 cents, one semitone up
    inputs
        .param_tx
        .push(ParamEvent::new(ParamId::OscDetune(OscSlot::Osc1), 1.0));
    let mut block = vec![0.0f32; 64];
    engine.process_block(&mut block);
    let cents = engine.pool().osc_config(0).detune_cents();
    assert!((cents - 100.0).abs() < 1e-3);
}

// ---------------------------------------------------------------------------
// 4. Modulation through the engine
// ---------------------------------------------------------------------------

#[test]
fn lfo_pitch_route_produces_vibrato() {
    let (mut engine, mut inputs) = test_engine();
    engine.lfo1_mut().set_frequency(5.0);
    assert!(engine.add_mod_route(ModRoute::new(
        ModSource::Lfo1,
        ModDest::Osc1Pitch,
        1.0
    )));
    inputs.note_tx.push(NoteEvent::on(69, 127));

    // Render several 256-sample blocks; zero-crossing spacing should
    // vary as the LFO bends pitch up and down
    let mut out = vec![0.0f32; 9600];
    for chunk in out.chunks_mut(256) {
        engine.process_block(chunk);
    }
    let mut periods = Vec::new();
    let mut last_cross = None;
    for i in 1..out.len() {
        if out[i - 1] <= 0.0 && out[i] > 0.0 {
            if let Some(prev) = last_cross {
                periods.push(i - prev);
            }
            last_cross = Some(i);
        }
    }
    // Skip the attack, look at the settled portion
    let settled = &periods[periods.len() / 2..];
    let min = settled.iter().min().unwrap();
    let max = settled.iter().max().unwrap();
    assert!(
        max - min >= 4,
        "vibrato should vary the period, min {min} max {max}"
    );
}

#[test]
fn velocity_route_scales_amp_per_voice() {
    let (mut engine, mut inputs) = test_engine();
    // Negative velocity-to-amp route duck the loud voice harder
    assert!(engine.add_mod_route(ModRoute::new(ModSource::Velocity, ModDest::Amp, -1.0)));
    inputs.note_tx.push(NoteEvent::on(69, 127));
    let mut block = vec![0.0f32; 2000];
    engine.process_block(&mut block);
    // Full velocity with a -1 route cancels the amp term entirely
    assert!(
        peak(&block[1500..]) < 0.05,
        "full-velocity voice should be ducked to silence"
    );
}

// ---------------------------------------------------------------------------
// 5. Output hygiene
// ---------------------------------------------------------------------------

#[test]
fn output_is_always_finite() {
    let (mut engine, mut inputs) = test_engine();
    engine.set_osc_bank(1, "saw").unwrap();
    engine.osc_config_mut(1).set_enabled(true);
    engine.set_osc_bank(2, "square").unwrap();
    engine.osc_config_mut(2).set_enabled(true);
    engine.pool_mut().set_svf_enabled(true);
    engine.pool_mut().svf_mut().set_resonance(1.0).unwrap();
    engine.pool_mut().set_ladder_enabled(true);
    engine.pool_mut().ladder_mut().set_resonance(1.0).unwrap();
    engine.pool_mut().ladder_mut().set_drive(10.0).unwrap();

    for note in [21, 60, 108] {
        inputs.note_tx.push(NoteEvent::on(note, 127));
    }
    let mut block = vec![0.0f32; 48000];
    engine.process_block(&mut block);
    assert!(block.iter().all(|s| s.is_finite()));
}

#[test]
fn stereo_render_mirrors_mono() {
    let (mut engine, mut inputs) = test_engine();
    inputs.note_tx.push(NoteEvent::on(60, 100));
    let mut left = vec![0.0f32; 512];
    let mut right = vec![0.0f32; 512];
    engine.process_stereo(&mut left, &mut right);
    assert_eq!(left, right);
    assert!(peak(&left) > 0.0);
}

#[test]
fn queue_overflow_drops_events_without_disturbing_engine() {
    let (mut engine, mut inputs) = test_engine();
    let mut accepted = 0;
    for i in 0..1000u32 {
        if inputs.note_tx.push(NoteEvent::on((i % 80) as u8 + 20, 100)) {
            accepted += 1;
        }
    }
    assert!(accepted < 1000, "queue must reject past capacity");
    let mut block = vec![0.0f32; 256];
    engine.process_block(&mut block);
    // All accepted events applied; pool saturates at its voice count
    assert_eq!(engine.pool().active_voices(), MAX_VOICES);
}
