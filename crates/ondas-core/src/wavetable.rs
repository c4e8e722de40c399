//! Wavetable storage, band-limited bank builders, and the bank registry.
//!
//! A [`WavetableBank`] holds one or more [`WavetableFrame`]s; each frame
//! is a single cycle rendered at [`MAX_MIPS`] progressively band-limited
//! mip levels. Oscillators crossfade between adjacent mips as pitch
//! rises, which keeps the highest harmonic below Nyquist without a
//! per-sample filter.
//!
//! Banks are owned by a [`BankRegistry`] and handed to oscillators as
//! `Arc` handles, so the audio thread never touches the registry.

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;

use libm::sinf;
use thiserror::Error;

use crate::phase::TABLE_SIZE;

/// Number of mip levels per frame.
///
/// Level 0 carries the full harmonic content; each level above it halves
/// the harmonic cap. Eleven levels cover phase increments up to the full
/// table length.
pub const MAX_MIPS: usize = 11;

/// Maximum number of frames in a bank.
pub const MAX_FRAMES: usize = 256;

/// Highest harmonic rendered into mip level `m`.
///
/// Level `m` is played back at phase increments in `[2^m, 2^(m+1))`
/// table positions per sample; keeping harmonics at or below
/// `TABLE_SIZE >> (m + 2)` guarantees nothing lands above Nyquist at the
/// top of that range.
#[inline]
pub fn mip_harmonic_cap(mip: usize) -> usize {
    (TABLE_SIZE >> (mip + 2)).max(1)
}

/// Bank construction and registry errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BankError {
    /// Frame count outside `1..=MAX_FRAMES`.
    #[error("bank must hold 1 to {MAX_FRAMES} frames, got {count}")]
    FrameCount {
        /// The rejected frame count.
        count: usize,
    },
    /// A bank with this name is already registered.
    #[error("a bank named '{name}' is already registered")]
    DuplicateName {
        /// The conflicting bank name.
        name: String,
    },
}

/// One wavetable cycle at every mip level.
///
/// ~90 KB per frame; frames live on the heap and are built offline,
/// never on the audio thread.
#[derive(Debug)]
pub struct WavetableFrame {
    mips: Box<[[f32; TABLE_SIZE]; MAX_MIPS]>,
}

impl WavetableFrame {
    /// Build a frame additively from per-harmonic sine amplitudes.
    ///
    /// `amplitudes[h - 1]` is the amplitude of harmonic `h`; negative
    /// values flip the harmonic's sign (used by triangle and saw
    /// series). Each mip level includes only harmonics up to its cap.
    /// The whole frame is normalized so mip level 0 peaks at 1.0, with
    /// the same gain applied to every level to keep them
    /// level-consistent across the crossfade.
    pub fn from_harmonics(amplitudes: &[f32]) -> Self {
        let mut mips = Box::new([[0.0f32; TABLE_SIZE]; MAX_MIPS]);
        for (m, table) in mips.iter_mut().enumerate() {
            let cap = mip_harmonic_cap(m).min(amplitudes.len());
            for (h, &amp) in amplitudes.iter().enumerate().take(cap) {
                if amp == 0.0 {
                    continue;
                }
                let harmonic = (h + 1) as f32;
                for (n, sample) in table.iter_mut().enumerate() {
                    let t = n as f32 / TABLE_SIZE as f32;
                    *sample += amp * sinf(core::f32::consts::TAU * harmonic * t);
                }
            }
        }

        // Normalize against the full-bandwidth level
        let peak = mips[0].iter().fold(0.0f32, |p, &s| p.max(s.abs()));
        if peak > 0.0 {
            let gain = 1.0 / peak;
            for table in mips.iter_mut() {
                for sample in table.iter_mut() {
                    *sample *= gain;
                }
            }
        }

        Self { mips }
    }

    /// A silent frame.
    pub fn silent() -> Self {
        Self {
            mips: Box::new([[0.0; TABLE_SIZE]; MAX_MIPS]),
        }
    }

    /// Table for a mip level. Panics if `mip >= MAX_MIPS`.
    #[inline]
    pub fn mip(&self, mip: usize) -> &[f32; TABLE_SIZE] {
        &self.mips[mip]
    }
}

/// A named collection of frames an oscillator can scan across.
#[derive(Debug)]
pub struct WavetableBank {
    name: String,
    frames: Vec<WavetableFrame>,
}

impl WavetableBank {
    /// Create a bank from pre-built frames.
    ///
    /// # Errors
    ///
    /// Returns [`BankError::FrameCount`] unless `1..=MAX_FRAMES` frames
    /// are supplied.
    pub fn new(name: &str, frames: Vec<WavetableFrame>) -> Result<Self, BankError> {
        let count = frames.len();
        if count == 0 || count > MAX_FRAMES {
            return Err(BankError::FrameCount { count });
        }
        Ok(Self {
            name: name.to_string(),
            frames,
        })
    }

    /// Single-frame pure sine bank.
    pub fn sine(name: &str) -> Self {
        Self {
            name: name.to_string(),
            frames: alloc::vec![WavetableFrame::from_harmonics(&[1.0])],
        }
    }

    /// Single-frame band-limited sawtooth bank.
    pub fn saw(name: &str) -> Self {
        Self {
            name: name.to_string(),
            frames: alloc::vec![WavetableFrame::from_harmonics(&saw_series())],
        }
    }

    /// Single-frame band-limited square bank.
    pub fn square(name: &str) -> Self {
        Self {
            name: name.to_string(),
            frames: alloc::vec![WavetableFrame::from_harmonics(&square_series())],
        }
    }

    /// Single-frame band-limited triangle bank.
    pub fn triangle(name: &str) -> Self {
        Self {
            name: name.to_string(),
            frames: alloc::vec![WavetableFrame::from_harmonics(&triangle_series())],
        }
    }

    /// Multi-frame bank morphing from sawtooth to square across frames.
    ///
    /// Frame 0 is a pure saw, the last frame a pure square; harmonic
    /// amplitudes blend linearly in between, so every frame stays
    /// band-limited. Useful for exercising scan-position interpolation.
    ///
    /// # Errors
    ///
    /// Returns [`BankError::FrameCount`] unless `2..=MAX_FRAMES` frames
    /// are requested.
    pub fn saw_square_morph(name: &str, frame_count: usize) -> Result<Self, BankError> {
        if frame_count < 2 || frame_count > MAX_FRAMES {
            return Err(BankError::FrameCount { count: frame_count });
        }
        let saw = saw_series();
        let square = square_series();
        let frames = (0..frame_count)
            .map(|f| {
                let t = f as f32 / (frame_count - 1) as f32;
                let blended: Vec<f32> = saw
                    .iter()
                    .zip(square.iter())
                    .map(|(&a, &b)| a + (b - a) * t)
                    .collect();
                WavetableFrame::from_harmonics(&blended)
            })
            .collect();
        Ok(Self {
            name: name.to_string(),
            frames,
        })
    }

    /// Bank name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of frames.
    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Frame by index. Panics if out of range.
    #[inline]
    pub fn frame(&self, index: usize) -> &WavetableFrame {
        &self.frames[index]
    }
}

fn saw_series() -> Vec<f32> {
    // saw(t) = (2/pi) * sum (-1)^(h+1) sin(h t) / h
    let scale = 2.0 / core::f32::consts::PI;
    (1..=mip_harmonic_cap(0))
        .map(|h| {
            let sign = if h % 2 == 0 { -1.0 } else { 1.0 };
            sign * scale / h as f32
        })
        .collect()
}

fn square_series() -> Vec<f32> {
    // square(t) = (4/pi) * sum sin(h t) / h, odd h
    let scale = 4.0 / core::f32::consts::PI;
    (1..=mip_harmonic_cap(0))
        .map(|h| if h % 2 == 1 { scale / h as f32 } else { 0.0 })
        .collect()
}

fn triangle_series() -> Vec<f32> {
    // triangle(t) = (8/pi^2) * sum (-1)^k sin((2k+1) t) / (2k+1)^2
    let scale = 8.0 / (core::f32::consts::PI * core::f32::consts::PI);
    (1..=mip_harmonic_cap(0))
        .map(|h| {
            if h % 2 == 0 {
                0.0
            } else {
                let k = (h - 1) / 2;
                let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
                sign * scale / (h * h) as f32
            }
        })
        .collect()
}

/// Owned, name-keyed store of wavetable banks.
///
/// The registry lives on the control side; oscillator configs hold
/// `Arc<WavetableBank>` handles resolved once at configuration time, so
/// rendering never performs a lookup.
///
/// # Example
///
/// ```rust
/// use ondas_core::wavetable::{BankRegistry, WavetableBank};
///
/// let mut registry = BankRegistry::new();
/// registry.register(WavetableBank::sine("sine")).unwrap();
/// let bank = registry.get("sine").unwrap();
/// assert_eq!(bank.frame_count(), 1);
/// ```
#[derive(Default)]
pub struct BankRegistry {
    banks: Vec<Arc<WavetableBank>>,
}

impl BankRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self { banks: Vec::new() }
    }

    /// Registry pre-loaded with the four standard single-frame banks
    /// ("sine", "saw", "square", "triangle").
    pub fn with_standard_banks() -> Self {
        let mut registry = Self::new();
        // Names are distinct, registration cannot fail
        let _ = registry.register(WavetableBank::sine("sine"));
        let _ = registry.register(WavetableBank::saw("saw"));
        let _ = registry.register(WavetableBank::square("square"));
        let _ = registry.register(WavetableBank::triangle("triangle"));
        registry
    }

    /// Register a bank, returning its shared handle.
    ///
    /// # Errors
    ///
    /// Returns [`BankError::DuplicateName`] if a bank with the same
    /// name already exists; the registry is left unchanged.
    pub fn register(&mut self, bank: WavetableBank) -> Result<Arc<WavetableBank>, BankError> {
        if self.get(bank.name()).is_some() {
            return Err(BankError::DuplicateName {
                name: bank.name().to_string(),
            });
        }
        let handle = Arc::new(bank);
        self.banks.push(Arc::clone(&handle));
        #[cfg(feature = "tracing")]
        tracing::debug!("bank_register: {} ({} frames)", handle.name(), handle.frame_count());
        Ok(handle)
    }

    /// Look up a bank by name.
    pub fn get(&self, name: &str) -> Option<Arc<WavetableBank>> {
        self.banks
            .iter()
            .find(|b| b.name() == name)
            .map(Arc::clone)
    }

    /// Iterate over registered bank names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.banks.iter().map(|b| b.name())
    }

    /// Number of registered banks.
    pub fn len(&self) -> usize {
        self.banks.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.banks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harmonic_cap_halves_per_mip() {
        assert_eq!(mip_harmonic_cap(0), 512);
        assert_eq!(mip_harmonic_cap(1), 256);
        assert_eq!(mip_harmonic_cap(9), 1);
        assert_eq!(mip_harmonic_cap(10), 1);
    }

    #[test]
    fn test_sine_frame_is_normalized() {
        let bank = WavetableBank::sine("sine");
        let table = bank.frame(0).mip(0);
        let peak = table.iter().fold(0.0f32, |p, &s| p.max(s.abs()));
        assert!((peak - 1.0).abs() < 1e-4, "Sine peak {peak}, expected 1.0");
    }

    #[test]
    fn test_sine_identical_across_mips() {
        // A single harmonic survives every cap, so all mips match
        let bank = WavetableBank::sine("sine");
        let frame = bank.frame(0);
        for m in 1..MAX_MIPS {
            for n in (0..TABLE_SIZE).step_by(97) {
                assert!(
                    (frame.mip(0)[n] - frame.mip(m)[n]).abs() < 1e-6,
                    "Sine mip {m} diverges at sample {n}"
                );
            }
        }
    }

    #[test]
    fn test_saw_mips_progressively_band_limited() {
        // Higher mips lose harmonics, so their slope at the reset point
        // softens; a crude proxy is the maximum sample-to-sample step
        let bank = WavetableBank::saw("saw");
        let frame = bank.frame(0);
        let max_step = |m: usize| {
            let t = frame.mip(m);
            (0..TABLE_SIZE)
                .map(|n| (t[(n + 1) % TABLE_SIZE] - t[n]).abs())
                .fold(0.0f32, f32::max)
        };
        assert!(
            max_step(0) > max_step(4),
            "Mip 4 should be smoother than mip 0"
        );
        assert!(
            max_step(4) > max_step(8),
            "Mip 8 should be smoother than mip 4"
        );
    }

    #[test]
    fn test_bank_frame_count_validation() {
        assert_eq!(
            WavetableBank::new("empty", Vec::new()).unwrap_err(),
            BankError::FrameCount { count: 0 }
        );
        let frames = alloc::vec![WavetableFrame::silent()];
        assert!(WavetableBank::new("one", frames).is_ok());
    }

    #[test]
    fn test_bank_is_debug_printable() {
        // Configs embedding bank handles derive Debug, so banks and
        // frames must format
        let frames = alloc::vec![WavetableFrame::silent()];
        let bank = WavetableBank::new("dbg", frames).unwrap();
        let text = alloc::format!("{bank:?}");
        assert!(text.contains("dbg"));
    }

    #[test]
    fn test_morph_endpoints_differ() {
        let bank = WavetableBank::saw_square_morph("morph", 4).unwrap();
        assert_eq!(bank.frame_count(), 4);
        let first = bank.frame(0).mip(0);
        let last = bank.frame(3).mip(0);
        let diff: f32 = (0..TABLE_SIZE)
            .map(|n| (first[n] - last[n]).abs())
            .sum::<f32>()
            / TABLE_SIZE as f32;
        assert!(diff > 0.05, "Morph endpoints too similar: {diff}");
    }

    #[test]
    fn test_morph_rejects_single_frame() {
        assert!(WavetableBank::saw_square_morph("m", 1).is_err());
    }

    #[test]
    fn test_registry_register_and_get() {
        let mut registry = BankRegistry::new();
        registry.register(WavetableBank::sine("sine")).unwrap();
        assert!(registry.get("sine").is_some());
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_registry_rejects_duplicate_names() {
        let mut registry = BankRegistry::new();
        registry.register(WavetableBank::sine("sine")).unwrap();
        let err = registry.register(WavetableBank::saw("sine")).unwrap_err();
        assert_eq!(
            err,
            BankError::DuplicateName {
                name: "sine".into()
            }
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_standard_banks() {
        let registry = BankRegistry::with_standard_banks();
        for name in ["sine", "saw", "square", "triangle"] {
            assert!(registry.get(name).is_some(), "Missing bank '{name}'");
        }
    }
}
