//! Content-addressed keys for synthesized audio.
//!
//! A fingerprint is derived from the normalized sentence text, the voice id,
//! and the playback speed. Byte-identical inputs always yield the same key,
//! which is what lets auto-repeat loops reuse clips instead of re-paying the
//! backend for them.

use sha2::{Digest, Sha256};

use crate::text::normalize;

/// Stable cache key for one `(text, voice, speed)` synthesis request.
///
/// Doubles as the on-disk file stem, so it must be filesystem-safe: the
/// inner value is lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint for a synthesis request.
    ///
    /// Speed is quantized to hundredths before hashing so that the key does
    /// not depend on float formatting; the settings UI steps speed in 0.2
    /// increments, well above the quantum.
    pub fn compute(text: &str, voice: &str, speed: f32) -> Self {
        let speed_q = (speed * 100.0).round() as u32;
        let mut hasher = Sha256::new();
        hasher.update(normalize(text).as_bytes());
        hasher.update([0u8]);
        hasher.update(voice.as_bytes());
        hasher.update([0u8]);
        hasher.update(speed_q.to_le_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    /// File name of the cached artifact for this key.
    pub fn file_name(&self) -> String {
        format!("{}.wav", self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Full hex is unwieldy in logs; the first 12 chars identify a clip.
        write!(f, "{}", &self.0[..12])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let a = Fingerprint::compute("How are you?", "en-US-SteffanNeural", 2.0);
        let b = Fingerprint::compute("How are you?", "en-US-SteffanNeural", 2.0);
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_inputs_distinct_keys() {
        let base = Fingerprint::compute("How are you?", "en-US-SteffanNeural", 2.0);
        assert_ne!(base, Fingerprint::compute("How are you!", "en-US-SteffanNeural", 2.0));
        assert_ne!(base, Fingerprint::compute("How are you?", "en-US-JennyNeural", 2.0));
        assert_ne!(base, Fingerprint::compute("How are you?", "en-US-SteffanNeural", 2.2));
    }

    #[test]
    fn whitespace_variants_share_a_key() {
        let a = Fingerprint::compute("How are  you? ", "v", 1.0);
        let b = Fingerprint::compute(" How are you?", "v", 1.0);
        assert_eq!(a, b);
    }

    #[test]
    fn speed_quantization_is_stable() {
        // 1.2 is not exactly representable; the quantized key must not
        // depend on which nearby float the caller holds.
        let a = Fingerprint::compute("text", "v", 1.2);
        let b = Fingerprint::compute("text", "v", 0.4 * 3.0);
        assert_eq!(a, b);
    }

    #[test]
    fn file_name_is_hex_wav() {
        let fp = Fingerprint::compute("text", "v", 1.0);
        let name = fp.file_name();
        assert!(name.ends_with(".wav"));
        assert_eq!(name.len(), 64 + 4);
        assert!(name[..64].chars().all(|c| c.is_ascii_hexdigit()));
    }
}
