//! Wire events carried from the control thread to the audio thread.
//!
//! Events are small `Copy` values so queue slots can hand them over
//! without allocation. Parameter values travel normalized; the engine
//! denormalizes them on arrival (see [`crate::params`]).

use crate::params::ParamId;

/// Note message kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NoteKind {
    /// Key down.
    #[default]
    On,
    /// Key up.
    Off,
}

/// A note on/off message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NoteEvent {
    /// Whether the key went down or up.
    pub kind: NoteKind,
    /// MIDI note number, 0 to 127.
    pub note: u8,
    /// Key velocity, 0 to 127. Ignored for note off.
    pub velocity: u8,
}

impl NoteEvent {
    /// A key-down event.
    pub fn on(note: u8, velocity: u8) -> Self {
        Self {
            kind: NoteKind::On,
            note,
            velocity,
        }
    }

    /// A key-up event.
    pub fn off(note: u8) -> Self {
        Self {
            kind: NoteKind::Off,
            note,
            velocity: 0,
        }
    }
}

/// A normalized parameter change.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ParamEvent {
    /// Which parameter to change.
    pub id: ParamId,
    /// Normalized value in `[0, 1]`; out-of-range values are clamped
    /// during denormalization.
    pub value: f32,
}

impl ParamEvent {
    /// Build a parameter change event.
    pub fn new(id: ParamId, value: f32) -> Self {
        Self { id, value }
    }
}
