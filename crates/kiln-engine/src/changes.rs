//! Content hashing.
//!
//! BLAKE3 backs both change detection (a reloaded resource whose bytes hash the
//! same as before is a no-op) and the short fingerprints used in versioned URLs.

/// Full BLAKE3 digest of `bytes`.
pub fn content_hash(bytes: &[u8]) -> [u8; 32] {
    *blake3::hash(bytes).as_bytes()
}

/// Lowercase hex fingerprint of `bytes`, truncated to `len` characters.
pub fn fingerprint(bytes: &[u8], len: usize) -> String {
    let hex = blake3::hash(bytes).to_hex();
    hex.as_str()[..len.min(hex.len())].to_string()
}

/// Whether `bytes` differ from the content that produced `previous`.
pub fn has_changed(previous: Option<&[u8; 32]>, bytes: &[u8]) -> bool {
    previous.is_none_or(|hash| *hash != content_hash(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_and_truncated() {
        let a = fingerprint(b"console.log(1)", 8);
        assert_eq!(a.len(), 8);
        assert_eq!(a, fingerprint(b"console.log(1)", 8));
        assert_ne!(a, fingerprint(b"console.log(2)", 8));
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn change_detection() {
        let hash = content_hash(b"body {}");
        assert!(!has_changed(Some(&hash), b"body {}"));
        assert!(has_changed(Some(&hash), b"body { color: red }"));
        assert!(has_changed(None, b"body {}"));
    }
}
