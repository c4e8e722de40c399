//! State variable filter with shared coefficients and per-voice state.
//!
//! Topology-Preserving Transform (TPT) SVF after Zavalishin, "The Art of
//! VA Filter Design". One [`SvFilter`] holds the configuration and the
//! cached coefficient pair for all voices; each voice carries its own
//! two-integrator [`SvfState`]. The three-step update produces lowpass,
//! highpass, and bandpass simultaneously, with notch as their sum, and
//! the selected mode is a plain enum match over the computed outputs.
//!
//! Coefficients are recomputed only when a setter accepts a new value,
//! or, on the modulated path, when the modulated cutoff or resonance
//! moves more than an epsilon away from the cached baseline. A tangent
//! still runs per recompute, so the epsilon check is what keeps heavily
//! modulated patches affordable.

use core::f32::consts::PI;
use libm::tanf;
use thiserror::Error;

use crate::fast_math::{fast_tan, flush_denormal};

/// Relative change in cutoff or resonance below which the modulated
/// path reuses the cached coefficients.
const MOD_EPSILON: f32 = 0.001;

/// Filter configuration errors, raised at the setter boundary.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FilterConfigError {
    /// Cutoff must be positive and below Nyquist.
    #[error("cutoff {cutoff} Hz outside (0, {nyquist}) Hz")]
    CutoffOutOfRange {
        /// The rejected cutoff in Hz.
        cutoff: f32,
        /// Nyquist frequency for the configured sample rate.
        nyquist: f32,
    },
    /// Resonance must be in `[0, 1]`.
    #[error("resonance {resonance} outside [0, 1]")]
    ResonanceOutOfRange {
        /// The rejected resonance.
        resonance: f32,
    },
    /// Drive must be at least 1.
    #[error("drive {drive} below 1.0")]
    DriveOutOfRange {
        /// The rejected drive.
        drive: f32,
    },
}

/// Which SVF output the filter produces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SvfMode {
    /// Passes frequencies below the cutoff.
    #[default]
    Lowpass,
    /// Passes frequencies above the cutoff.
    Highpass,
    /// Passes frequencies near the cutoff.
    Bandpass,
    /// Rejects frequencies near the cutoff (lp + hp).
    Notch,
}

/// Per-voice integrator state.
#[derive(Clone, Copy, Debug, Default)]
pub struct SvfState {
    ic1: f32,
    ic2: f32,
}

impl SvfState {
    /// Clear both integrators.
    pub fn reset(&mut self) {
        self.ic1 = 0.0;
        self.ic2 = 0.0;
    }
}

/// Cached coefficient pair shared by every voice.
#[derive(Clone, Copy, Debug)]
struct SvfCoeffs {
    g: f32,
    k: f32,
}

impl SvfCoeffs {
    /// `g = tan(pi * fc / sr)`, `k = 1/Q` with resonance in `[0, 1]`
    /// mapped to `Q = 0.5 + resonance * 20`.
    fn compute(cutoff: f32, resonance: f32, sample_rate: f32) -> Self {
        let arg = PI * cutoff / sample_rate;
        // fast_tan holds < 0.2% error below ~10 kHz; use tanf above
        let g = if cutoff < 10_000.0 { fast_tan(arg) } else { tanf(arg) };
        let q = 0.5 + resonance * 20.0;
        Self { g, k: 1.0 / q }
    }
}

/// State variable filter shared across a voice pool.
///
/// # Example
///
/// ```rust
/// use ondas_core::svf::{SvFilter, SvfMode, SvfState};
///
/// let mut filter = SvFilter::new(48000.0);
/// filter.set_cutoff(2000.0).unwrap();
/// filter.set_resonance(0.3).unwrap();
/// filter.set_mode(SvfMode::Lowpass);
/// filter.set_enabled(true);
///
/// let mut state = SvfState::default();
/// let out = filter.process(&mut state, 0.5);
/// assert!(out.is_finite());
/// ```
#[derive(Clone, Debug)]
pub struct SvFilter {
    coeffs: SvfCoeffs,
    sample_rate: f32,
    cutoff: f32,
    resonance: f32,
    mode: SvfMode,
    enabled: bool,
}

impl Default for SvFilter {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl SvFilter {
    /// Create a disabled filter at 1 kHz cutoff, zero resonance.
    pub fn new(sample_rate: f32) -> Self {
        let cutoff = 1000.0;
        let resonance = 0.0;
        Self {
            coeffs: SvfCoeffs::compute(cutoff, resonance, sample_rate),
            sample_rate,
            cutoff,
            resonance,
            mode: SvfMode::Lowpass,
            enabled: false,
        }
    }

    /// Set the cutoff frequency in Hz.
    ///
    /// # Errors
    ///
    /// Rejects values outside `(0, Nyquist)`; the previous cutoff and
    /// coefficients are kept.
    pub fn set_cutoff(&mut self, cutoff: f32) -> Result<(), FilterConfigError> {
        let nyquist = self.sample_rate * 0.5;
        if !(cutoff > 0.0 && cutoff < nyquist) {
            return Err(FilterConfigError::CutoffOutOfRange { cutoff, nyquist });
        }
        self.cutoff = cutoff;
        self.coeffs = SvfCoeffs::compute(self.cutoff, self.resonance, self.sample_rate);
        Ok(())
    }

    /// Set the resonance in `[0, 1]` (mapped to Q = 0.5..20.5).
    ///
    /// # Errors
    ///
    /// Rejects values outside `[0, 1]`.
    pub fn set_resonance(&mut self, resonance: f32) -> Result<(), FilterConfigError> {
        if !(0.0..=1.0).contains(&resonance) {
            return Err(FilterConfigError::ResonanceOutOfRange { resonance });
        }
        self.resonance = resonance;
        self.coeffs = SvfCoeffs::compute(self.cutoff, self.resonance, self.sample_rate);
        Ok(())
    }

    /// Select the output mode.
    pub fn set_mode(&mut self, mode: SvfMode) {
        self.mode = mode;
    }

    /// Enable or disable the filter.
    ///
    /// Enabling does not clear voice states; callers reset the states of
    /// voices they own so a re-enabled filter does not replay stale
    /// integrator charge.
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

    /// Current output mode.
    pub fn mode(&self) -> SvfMode {
        self.mode
    }

    /// Whether the filter is in the signal path.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Process one sample with the cached coefficients.
    ///
    /// Disabled filters pass the input through untouched.
    #[inline]
    pub fn process(&self, state: &mut SvfState, input: f32) -> f32 {
        if !self.enabled {
            return input;
        }
        Self::tick(self.coeffs, state, input, self.mode)
    }

    /// Process one sample under cutoff/resonance modulation.
    ///
    /// `cutoff` and `resonance` are the modulated values for this
    /// sample. Coefficients are recomputed only when either moved more
    /// than the epsilon away from the cached baseline; the modulated
    /// values are clamped, never rejected, since they originate from the
    /// modulation matrix rather than a config boundary.
    #[inline]
    pub fn process_mod(
        &self,
        state: &mut SvfState,
        input: f32,
        cutoff: f32,
        resonance: f32,
    ) -> f32 {
        if !self.enabled {
            return input;
        }
        let cutoff = cutoff.clamp(10.0, self.sample_rate * 0.45);
        let resonance = resonance.clamp(0.0, 1.0);
        let cutoff_moved = (cutoff - self.cutoff).abs() > self.cutoff * MOD_EPSILON;
        let res_moved = (resonance - self.resonance).abs() > MOD_EPSILON;
        let coeffs = if cutoff_moved || res_moved {
            SvfCoeffs::compute(cutoff, resonance, self.sample_rate)
        } else {
            self.coeffs
        };
        Self::tick(coeffs, state, input, self.mode)
    }

    #[inline]
    fn tick(coeffs: SvfCoeffs, state: &mut SvfState, input: f32, mode: SvfMode) -> f32 {
        let SvfCoeffs { g, k } = coeffs;
        let v3 = input - state.ic2;
        let v1 = (g * v3 + state.ic1) / (1.0 + g * (g + k));
        let v2 = state.ic2 + g * v1;

        state.ic1 = flush_denormal(2.0 * v1 - state.ic1);
        state.ic2 = flush_denormal(2.0 * v2 - state.ic2);

        let lp = v2;
        let bp = v1;
        let hp = input - k * v1 - v2;

        match mode {
            SvfMode::Lowpass => lp,
            SvfMode::Highpass => hp,
            SvfMode::Bandpass => bp,
            SvfMode::Notch => lp + hp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled_filter(cutoff: f32, resonance: f32) -> SvFilter {
        let mut filter = SvFilter::new(48000.0);
        filter.set_cutoff(cutoff).unwrap();
        filter.set_resonance(resonance).unwrap();
        filter.set_enabled(true);
        filter
    }

    #[test]
    fn test_disabled_passes_through() {
        let filter = SvFilter::new(48000.0);
        let mut state = SvfState::default();
        assert_eq!(filter.process(&mut state, 0.7), 0.7);
    }

    #[test]
    fn test_lowpass_passes_dc() {
        let filter = enabled_filter(1000.0, 0.0);
        let mut state = SvfState::default();
        let mut out = 0.0;
        for _ in 0..1000 {
            out = filter.process(&mut state, 1.0);
        }
        assert!((out - 1.0).abs() < 0.05, "DC should pass, got {out}");
    }

    #[test]
    fn test_highpass_blocks_dc() {
        let mut filter = enabled_filter(1000.0, 0.0);
        filter.set_mode(SvfMode::Highpass);
        let mut state = SvfState::default();
        let mut out = 0.0;
        for _ in 0..1000 {
            out = filter.process(&mut state, 1.0);
        }
        assert!(out.abs() < 0.1, "DC should be blocked, got {out}");
    }

    #[test]
    fn test_notch_is_lp_plus_hp() {
        let coeffs = SvfCoeffs::compute(2000.0, 0.2, 48000.0);
        let mut s_lp = SvfState::default();
        let mut s_hp = SvfState::default();
        let mut s_nt = SvfState::default();
        for i in 0..300 {
            let input = libm::sinf(i as f32 * 0.17);
            let lp = SvFilter::tick(coeffs, &mut s_lp, input, SvfMode::Lowpass);
            let hp = SvFilter::tick(coeffs, &mut s_hp, input, SvfMode::Highpass);
            let nt = SvFilter::tick(coeffs, &mut s_nt, input, SvfMode::Notch);
            assert!(
                (nt - (lp + hp)).abs() < 1e-5,
                "notch != lp + hp at sample {i}"
            );
        }
    }

    #[test]
    fn test_setter_rejects_bad_cutoff() {
        let mut filter = SvFilter::new(48000.0);
        assert!(filter.set_cutoff(0.0).is_err());
        assert!(filter.set_cutoff(-100.0).is_err());
        assert!(filter.set_cutoff(24000.0).is_err());
        assert!(filter.set_cutoff(f32::NAN).is_err());
        // Prior value untouched
        assert_eq!(filter.cutoff(), 1000.0);
    }

    #[test]
    fn test_setter_rejects_bad_resonance() {
        let mut filter = SvFilter::new(48000.0);
        assert!(filter.set_resonance(-0.1).is_err());
        assert!(filter.set_resonance(1.5).is_err());
        assert_eq!(filter.resonance(), 0.0);
    }

    #[test]
    fn test_mod_within_epsilon_matches_cached() {
        let filter = enabled_filter(1000.0, 0.5);
        let mut s_mod = SvfState::default();
        let mut s_ref = SvfState::default();
        for i in 0..200 {
            let input = libm::sinf(i as f32 * 0.1);
            // Within 0.1% of the baseline
            let a = filter.process_mod(&mut s_mod, input, 1000.5, 0.5);
            let b = filter.process(&mut s_ref, input);
            assert!((a - b).abs() < 1e-7, "epsilon path diverged at {i}");
        }
    }

    #[test]
    fn test_mod_beyond_epsilon_recomputes() {
        let filter = enabled_filter(1000.0, 0.5);
        let mut s_mod = SvfState::default();
        let mut s_ref = SvfState::default();
        let mut max_diff: f32 = 0.0;
        for i in 0..500 {
            let input = libm::sinf(i as f32 * 0.1);
            let a = filter.process_mod(&mut s_mod, input, 4000.0, 0.5);
            let b = filter.process(&mut s_ref, input);
            max_diff = max_diff.max((a - b).abs());
        }
        assert!(
            max_diff > 0.01,
            "modulated cutoff should change the output, max_diff={max_diff}"
        );
    }

    #[test]
    fn test_mod_clamps_extreme_cutoff() {
        let filter = enabled_filter(1000.0, 0.0);
        let mut state = SvfState::default();
        for i in 0..200 {
            let input = libm::sinf(i as f32 * 0.1);
            let out = filter.process_mod(&mut state, input, 1e9, 0.0);
            assert!(out.is_finite(), "clamped cutoff went non-finite at {i}");
        }
    }

    #[test]
    fn test_per_voice_states_independent() {
        let filter = enabled_filter(800.0, 0.4);
        let mut a = SvfState::default();
        let mut b = SvfState::default();
        for _ in 0..100 {
            filter.process(&mut a, 1.0);
        }
        // Voice b never processed anything; fresh state stays zero
        assert_eq!(filter.process(&mut b, 0.0), 0.0);
    }

    #[test]
    fn test_resonance_peaks_at_cutoff() {
        // High resonance should boost a tone at the cutoff relative to
        // the zero-resonance response
        let sr = 48000.0;
        let cutoff = 2000.0;
        let omega = core::f32::consts::TAU * cutoff / sr;
        let measure = |resonance: f32| {
            let filter = enabled_filter(cutoff, resonance);
            let mut state = SvfState::default();
            let mut rms = 0.0f32;
            for i in 0..4000 {
                let out = filter.process(&mut state, libm::sinf(i as f32 * omega));
                if i >= 2000 {
                    rms += out * out;
                }
            }
            libm::sqrtf(rms / 2000.0)
        };
        let flat = measure(0.0);
        let peaked = measure(0.8);
        assert!(
            peaked > flat * 2.0,
            "resonance should boost cutoff tone: flat={flat}, peaked={peaked}"
        );
    }
}
