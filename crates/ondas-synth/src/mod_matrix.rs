//! Modulation routing with per-block linear smoothing.
//!
//! Routes connect a [`ModSource`] to a [`ModDest`] with a scaling
//! amount. Destination values are recomputed once per block from a
//! [`ModSourceBlock`] snapshot, then glide linearly to the new target
//! over the block: [`ModMatrix::begin_block`] sets a per-sample step,
//! [`ModMatrix::advance`] applies it. Values continue from wherever the
//! previous block ended, so block boundaries never click.
//!
//! The route table is a fixed array; adding beyond capacity reports
//! `false` and removal swaps the last route into the hole (order is not
//! meaningful).

use crate::voice::MAX_VOICES;

/// Modulation source identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModSource {
    /// First block-rate LFO.
    Lfo1,
    /// Second block-rate LFO.
    Lfo2,
    /// Per-voice note velocity, `[0, 1]`.
    Velocity,
    /// Per-voice key position, `-1` at MIDI 0 to `+1` at MIDI 127,
    /// centered on middle C.
    KeyTrack,
    /// Mod wheel, `[0, 1]`.
    ModWheel,
}

/// Modulation destination identifier.
///
/// Units differ per destination: pitch in semitones, filter cutoff in
/// octaves (applied as `base * 2^v`), scan and resonance as additive
/// offsets, amp as a gain offset (`1 + v`, floored at zero).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModDest {
    /// Slot 1 pitch, semitones.
    Osc1Pitch,
    /// Slot 2 pitch, semitones.
    Osc2Pitch,
    /// Slot 3 pitch, semitones.
    Osc3Pitch,
    /// Slot 1 scan offset.
    Osc1Scan,
    /// Slot 2 scan offset.
    Osc2Scan,
    /// Slot 3 scan offset.
    Osc3Scan,
    /// SVF cutoff, octaves.
    SvfCutoff,
    /// SVF resonance offset.
    SvfResonance,
    /// Ladder cutoff, octaves.
    LadderCutoff,
    /// Ladder resonance offset.
    LadderResonance,
    /// Voice amplitude offset.
    Amp,
}

impl ModDest {
    /// Number of destinations.
    pub const COUNT: usize = 11;

    /// Dense array index.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            ModDest::Osc1Pitch => 0,
            ModDest::Osc2Pitch => 1,
            ModDest::Osc3Pitch => 2,
            ModDest::Osc1Scan => 3,
            ModDest::Osc2Scan => 4,
            ModDest::Osc3Scan => 5,
            ModDest::SvfCutoff => 6,
            ModDest::SvfResonance => 7,
            ModDest::LadderCutoff => 8,
            ModDest::LadderResonance => 9,
            ModDest::Amp => 10,
        }
    }
}

/// One modulation route.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModRoute {
    /// Source of the modulation signal.
    pub source: ModSource,
    /// Destination the signal drives.
    pub dest: ModDest,
    /// Scaling applied to the source value, `[-1, 1]`.
    pub amount: f32,
}

impl ModRoute {
    /// Create a route with the amount clamped to `[-1, 1]`.
    pub fn new(source: ModSource, dest: ModDest, amount: f32) -> Self {
        Self {
            source,
            dest,
            amount: amount.clamp(-1.0, 1.0),
        }
    }
}

/// Per-block snapshot of every modulation source.
///
/// Global sources are scalars; velocity and key tracking are per-voice.
#[derive(Clone, Copy, Debug)]
pub struct ModSourceBlock {
    /// LFO 1 value, `[-1, 1]`.
    pub lfo1: f32,
    /// LFO 2 value, `[-1, 1]`.
    pub lfo2: f32,
    /// Mod wheel, `[0, 1]`.
    pub mod_wheel: f32,
    /// Per-voice velocity, `[0, 1]`.
    pub velocity: [f32; MAX_VOICES],
    /// Per-voice key tracking, `[-1, 1]`.
    pub key_track: [f32; MAX_VOICES],
}

impl Default for ModSourceBlock {
    fn default() -> Self {
        Self {
            lfo1: 0.0,
            lfo2: 0.0,
            mod_wheel: 0.0,
            velocity: [0.0; MAX_VOICES],
            key_track: [0.0; MAX_VOICES],
        }
    }
}

impl ModSourceBlock {
    /// Source value for a voice.
    #[inline]
    pub fn value(&self, source: ModSource, voice: usize) -> f32 {
        match source {
            ModSource::Lfo1 => self.lfo1,
            ModSource::Lfo2 => self.lfo2,
            ModSource::ModWheel => self.mod_wheel,
            ModSource::Velocity => self.velocity[voice],
            ModSource::KeyTrack => self.key_track[voice],
        }
    }
}

/// Fixed-capacity modulation matrix with block smoothing.
///
/// `N` is the route capacity. All storage is inline; nothing in here
/// allocates or locks.
///
/// # Example
///
/// ```rust
/// use ondas_synth::mod_matrix::{ModDest, ModMatrix, ModRoute, ModSource, ModSourceBlock};
///
/// let mut matrix: ModMatrix<16> = ModMatrix::new();
/// assert!(matrix.add_route(ModRoute::new(ModSource::Lfo1, ModDest::SvfCutoff, 0.5)));
///
/// let mut sources = ModSourceBlock::default();
/// sources.lfo1 = 1.0;
/// matrix.begin_block(&sources, 64);
/// for _ in 0..64 {
///     matrix.advance();
/// }
/// assert!((matrix.value(ModDest::SvfCutoff, 0) - 0.5).abs() < 1e-4);
/// ```
pub struct ModMatrix<const N: usize> {
    routes: [Option<ModRoute>; N],
    route_count: usize,
    value: [[f32; MAX_VOICES]; ModDest::COUNT],
    step: [[f32; MAX_VOICES]; ModDest::COUNT],
}

impl<const N: usize> Default for ModMatrix<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ModMatrix<N> {
    /// Empty matrix; every destination reads 0.
    pub fn new() -> Self {
        Self {
            routes: [None; N],
            route_count: 0,
            value: [[0.0; MAX_VOICES]; ModDest::COUNT],
            step: [[0.0; MAX_VOICES]; ModDest::COUNT],
        }
    }

    /// Add a route. Returns `false` when the table is full; the route
    /// is dropped and existing routes are untouched.
    pub fn add_route(&mut self, route: ModRoute) -> bool {
        if self.route_count >= N {
            return false;
        }
        self.routes[self.route_count] = Some(route);
        self.route_count += 1;
        true
    }

    /// Remove a route by index, swapping the last route into its slot.
    /// Returns the removed route, or `None` for an out-of-range index.
    pub fn remove_route(&mut self, index: usize) -> Option<ModRoute> {
        if index >= self.route_count {
            return None;
        }
        let removed = self.routes[index].take();
        self.route_count -= 1;
        if index < self.route_count {
            self.routes[index] = self.routes[self.route_count].take();
        } else {
            self.routes[self.route_count] = None;
        }
        removed
    }

    /// Remove all routes. Destination values glide back to zero over
    /// the next block.
    pub fn clear_routes(&mut self) {
        self.routes = [None; N];
        self.route_count = 0;
    }

    /// Number of active routes.
    pub fn route_count(&self) -> usize {
        self.route_count
    }

    /// Route by index, if present.
    pub fn route(&self, index: usize) -> Option<&ModRoute> {
        if index < self.route_count {
            self.routes[index].as_ref()
        } else {
            None
        }
    }

    /// Compute new destination targets from a source snapshot and set
    /// the per-sample smoothing steps for a block of `block_len`
    /// samples. Values ramp from wherever the previous block left them.
    pub fn begin_block(&mut self, sources: &ModSourceBlock, block_len: usize) {
        let inv_len = 1.0 / block_len.max(1) as f32;
        let mut target = [[0.0f32; MAX_VOICES]; ModDest::COUNT];
        for route in self.routes.iter().take(self.route_count).flatten() {
            let d = route.dest.index();
            for v in 0..MAX_VOICES {
                target[d][v] += sources.value(route.source, v) * route.amount;
            }
        }
        for d in 0..ModDest::COUNT {
            for v in 0..MAX_VOICES {
                self.step[d][v] = (target[d][v] - self.value[d][v]) * inv_len;
            }
        }
    }

    /// Advance every destination value by one sample's step.
    #[inline]
    pub fn advance(&mut self) {
        for d in 0..ModDest::COUNT {
            for v in 0..MAX_VOICES {
                self.value[d][v] += self.step[d][v];
            }
        }
    }

    /// Current smoothed value for a destination and voice.
    #[inline]
    pub fn value(&self, dest: ModDest, voice: usize) -> f32 {
        self.value[dest.index()][voice]
    }
}
