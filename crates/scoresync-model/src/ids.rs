//! Universal identity: the 128-bit opaque ID bound to a score-note/performance-event pair.

use std::fmt;

/// Opaque 128-bit identity, stable across every artifact that refers to the same
/// score-note <-> performance-event pair.
///
/// Derived deterministically from a BLAKE3 hash of the canonical match evidence
/// (see [`UniversalId::derive`]), so re-running the pipeline on unchanged inputs
/// reproduces the same IDs (testable property 8 in the spec).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniversalId([u8; 16]);

impl UniversalId {
    /// Derives a `UniversalId` from canonical match evidence plus a salt.
    ///
    /// The salt defaults to 0; the matcher bumps it and re-derives on a
    /// prefix collision (see [`crate::registry` collision handling in the
    /// registry crate]).
    pub fn derive(evidence: &str, salt: u32) -> Self {
        let mut input = Vec::with_capacity(evidence.len() + 4);
        input.extend_from_slice(evidence.as_bytes());
        input.extend_from_slice(&salt.to_le_bytes());
        let hash = blake3::hash(&input);
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&hash.as_bytes()[..16]);
        Self(bytes)
    }

    /// Builds a `UniversalId` from raw bytes (used when reloading a persisted registry).
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Parses a `UniversalId` from its 32-character lowercase hex representation.
    pub fn from_hex(s: &str) -> Option<Self> {
        if s.len() != 32 {
            return None;
        }
        let mut bytes = [0u8; 16];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            let byte_str = std::str::from_utf8(chunk).ok()?;
            bytes[i] = u8::from_str_radix(byte_str, 16).ok()?;
        }
        Some(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// The full 32-character lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// First 4 lowercase-hex characters, used as a short filename prefix (spec.md §3.2, §6.3).
    pub fn prefix4(&self) -> String {
        self.to_hex()[..4].to_string()
    }
}

impl fmt::Display for UniversalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl serde::Serialize for UniversalId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for UniversalId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        UniversalId::from_hex(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid UniversalId hex: {s}")))
    }
}

/// Identifier for a group (tied-note or ornament) and the format for its
/// expansion sub-IDs (`{group_id}_expansion_{k}`, spec.md §3.2).
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct GroupId(pub String);

impl GroupId {
    pub fn new(universal_id: &UniversalId) -> Self {
        Self(universal_id.to_hex())
    }

    /// Builds a sub-ID of the form `{group_id}_expansion_{k}` with `k` zero-padded to 2 digits.
    pub fn expansion_sub_id(&self, k: usize) -> String {
        format!("{}_expansion_{:02}", self.0, k)
    }

    /// True if `candidate` is a sub-ID produced by [`Self::expansion_sub_id`] for this group.
    pub fn owns_sub_id(&self, candidate: &str) -> bool {
        match candidate.strip_prefix(&self.0) {
            Some(rest) => {
                rest.starts_with("_expansion_") && rest[11..].chars().all(|c| c.is_ascii_digit())
            }
            None => false,
        }
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
