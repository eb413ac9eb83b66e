//! Stable identifiers for template assets

use core::fmt;

use serde::{Deserialize, Serialize};

/// A unique identifier for a template asset, derived from its
/// project-relative path.
///
/// The id survives renames of the scene that produced the template but not
/// moves of the template file itself; callers that move files re-derive the
/// id from the new path.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TemplateId(u64);

impl TemplateId {
    /// Create an id from raw bits.
    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Get the raw bits.
    #[inline]
    pub const fn to_bits(&self) -> u64 {
        self.0
    }

    /// Derive an id from a project-relative path.
    ///
    /// Path separators are normalized so the same asset hashes identically
    /// on every platform.
    pub fn from_path(path: &str) -> Self {
        // Simple FNV-1a hash
        let mut hash = 0xcbf29ce484222325u64;
        for byte in path.bytes() {
            let b = if byte == b'\\' { b'/' } else { byte };
            hash ^= b as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        Self(hash)
    }
}

impl fmt::Debug for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TemplateId({:016x})", self.0)
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_from_path_is_stable() {
        let a = TemplateId::from_path("assets/props/crate.prefab");
        let b = TemplateId::from_path("assets/props/crate.prefab");
        assert_eq!(a, b);
    }

    #[test]
    fn test_id_from_path_distinguishes_paths() {
        let a = TemplateId::from_path("assets/props/crate.prefab");
        let b = TemplateId::from_path("assets/props/barrel.prefab");
        assert_ne!(a, b);
    }

    #[test]
    fn test_id_normalizes_separators() {
        let fwd = TemplateId::from_path("assets/props/crate.prefab");
        let back = TemplateId::from_path("assets\\props\\crate.prefab");
        assert_eq!(fwd, back);
    }

    #[test]
    fn test_id_bits_roundtrip() {
        let id = TemplateId::from_path("assets/door.prefab");
        assert_eq!(TemplateId::from_bits(id.to_bits()), id);
    }
}
