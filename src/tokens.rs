//! Confirmation key generation.

use rand::Rng;
use sha2::{Digest, Sha256};

/// Generate a confirmation key for an address.
///
/// The key is the SHA-256 of a fresh per-issuance salt, 32 bytes from the
/// thread-local CSPRNG and the address itself, hex encoded (64 lowercase
/// characters).
pub fn confirmation_key_generate(email: &str) -> String {
    let mut rng = rand::rng();
    let salt: [u8; 16] = rng.random();
    let secret: [u8; 32] = rng.random();

    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(secret);
    hasher.update(email.as_bytes());
    hex::encode(hasher.finalize())
}

/// Normalize a key for storage and lookup.
pub fn confirmation_key_normalize(key: &str) -> String {
    key.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_unique_hex() {
        let first = confirmation_key_generate("daphne@example.com");
        let second = confirmation_key_generate("daphne@example.com");

        assert_ne!(first, second);
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(first, first.to_lowercase());
    }

    #[test]
    fn normalize_lowercases() {
        assert_eq!(confirmation_key_normalize("AbC123"), "abc123");
        assert_eq!(confirmation_key_normalize(" ABC123 "), "abc123");
    }
}
