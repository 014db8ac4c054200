use sha2::{Digest, Sha256};

/// Stable hash of an already-ordered sequence of string parts: join with
/// `|`, then SHA-256, hex-encoded. Callers are responsible for sorting map
/// keys before calling this (the hash itself does not sort).
pub fn stable_hash(parts: &[&str]) -> String {
    let joined = parts.join("|");
    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_for_same_input() {
        assert_eq!(stable_hash(&["a", "b"]), stable_hash(&["a", "b"]));
    }

    #[test]
    fn order_sensitive() {
        assert_ne!(stable_hash(&["a", "b"]), stable_hash(&["b", "a"]));
    }
}
