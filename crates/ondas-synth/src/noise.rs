//! White noise with explicit PRNG state.
//!
//! Each voice owns its own [`NoiseState`] rather than sharing a global
//! generator, so voices are deterministic in isolation and renders are
//! reproducible regardless of voice evaluation order.

/// xorshift32 noise generator state.
#[derive(Clone, Copy, Debug)]
pub struct NoiseState {
    state: u32,
}

impl Default for NoiseState {
    fn default() -> Self {
        Self::new(0x2F6E_2B1D)
    }
}

impl NoiseState {
    /// Create a generator from a seed. A zero seed would lock xorshift
    /// at zero forever, so it is replaced with a fixed nonzero value.
    pub fn new(seed: u32) -> Self {
        Self {
            state: if seed == 0 { 0x2F6E_2B1D } else { seed },
        }
    }

    /// Next sample in `[-1, 1]`.
    #[inline]
    pub fn next_bipolar(&mut self) -> f32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        (x as f32 / u32::MAX as f32) * 2.0 - 1.0
    }
}

/// Shared noise tap configuration for the voice pool.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoiseConfig {
    /// Whether the noise tap is mixed in.
    pub enabled: bool,
    /// Mix level in `[0, 1]`; callers clamp.
    pub mix: f32,
}
