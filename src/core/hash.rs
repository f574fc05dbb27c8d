//! Run Hashing for Audit
//!
//! Provides deterministic hashing of finished runs for:
//! - Tamper detection on exported analytics runs
//! - Replay validation (recomputed fingerprint must match)
//! - Compact run identity in logs

use sha2::{Digest, Sha256};

/// Hash output type (256 bits / 32 bytes)
pub type Fingerprint = [u8; 32];

/// Deterministic hasher for run data.
///
/// Wraps SHA-256 with helpers for the primitive types a run is made of.
/// Order of updates is critical for determinism.
pub struct RunHasher {
    hasher: Sha256,
}

impl RunHasher {
    /// Create a new hasher with domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Create hasher for a run summary.
    pub fn for_run() -> Self {
        Self::new(b"KEYRUSH_RUN_V1")
    }

    /// Create hasher for a keystroke log.
    pub fn for_keystrokes() -> Self {
        Self::new(b"KEYRUSH_KEYS_V1")
    }

    /// Update with raw bytes.
    #[inline]
    pub fn update_bytes(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// Update with a u8 value.
    #[inline]
    pub fn update_u8(&mut self, value: u8) {
        self.hasher.update([value]);
    }

    /// Update with a u32 value (little-endian).
    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a u64 value (little-endian).
    #[inline]
    pub fn update_u64(&mut self, value: u64) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with an f64 value (IEEE-754 bits, little-endian).
    #[inline]
    pub fn update_f64(&mut self, value: f64) {
        self.hasher.update(value.to_bits().to_le_bytes());
    }

    /// Update with a boolean.
    #[inline]
    pub fn update_bool(&mut self, value: bool) {
        self.update_u8(value as u8);
    }

    /// Update with a character (as its scalar value).
    #[inline]
    pub fn update_char(&mut self, value: char) {
        self.update_u32(value as u32);
    }

    /// Update with a length-prefixed string.
    ///
    /// The prefix keeps `("ab", "c")` and `("a", "bc")` apart.
    #[inline]
    pub fn update_str(&mut self, value: &str) {
        self.update_u64(value.len() as u64);
        self.hasher.update(value.as_bytes());
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> Fingerprint {
        self.hasher.finalize().into()
    }
}

/// Compute a run fingerprint.
///
/// The seed is always hashed first; the closure adds run-specific data.
pub fn compute_run_fingerprint<F>(seed: &str, add_run: F) -> Fingerprint
where
    F: FnOnce(&mut RunHasher),
{
    let mut hasher = RunHasher::for_run();
    hasher.update_str(seed);
    add_run(&mut hasher);
    hasher.finalize()
}

/// Short hex prefix of a fingerprint, for log lines.
pub fn short_hex(fingerprint: &Fingerprint) -> String {
    hex::encode(&fingerprint[..6])
}

// =============================================================================
// TESTS
// =============================================================================
