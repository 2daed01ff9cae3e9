//! PKCE Helper
//!
//! RFC 7636 Proof Key for Code Exchange, S256 only.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Default number of random verifier bytes.
pub const DEFAULT_VERIFIER_BYTES: usize = 32;

/// Verifier/challenge pair, created per login attempt.
#[derive(Clone)]
pub struct PkceChallenge {
    pub verifier: String,
    pub challenge: String,
}

impl PkceChallenge {
    /// Generate a fresh pair from 32 random bytes.
    pub fn generate() -> Self {
        let verifier = generate_verifier(DEFAULT_VERIFIER_BYTES);
        let challenge = generate_challenge(&verifier);
        Self {
            verifier,
            challenge,
        }
    }

    /// Always "S256".
    pub fn method(&self) -> &'static str {
        "S256"
    }
}

impl std::fmt::Debug for PkceChallenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkceChallenge")
            .field("verifier", &"[REDACTED]")
            .field("challenge", &self.challenge)
            .finish()
    }
}

/// base64url(random bytes); lengths below 32 are raised to 32.
pub fn generate_verifier(len: usize) -> String {
    let mut bytes = vec![0u8; len.max(DEFAULT_VERIFIER_BYTES)];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// base64url(sha256(verifier)).
pub fn generate_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Random URL-safe value for the OAuth `state` parameter.
pub fn generate_state() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_s256_known_vector() {
        // RFC 7636 appendix B
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        assert_eq!(
            generate_challenge(verifier),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_verifier_shape() {
        let verifier = generate_verifier(32);
        assert_eq!(verifier.len(), 43);
        assert!(verifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));

        // Short requests still get 32 bytes of entropy
        assert_eq!(generate_verifier(8).len(), 43);
        assert_eq!(generate_verifier(64).len(), 86);
    }

    #[test]
    fn test_verifiers_do_not_collide() {
        assert_ne!(generate_verifier(32), generate_verifier(32));
        assert_ne!(generate_state(), generate_state());
    }

    #[test]
    fn test_pair_is_consistent() {
        let pkce = PkceChallenge::generate();
        assert_eq!(pkce.challenge, generate_challenge(&pkce.verifier));
        assert_eq!(pkce.method(), "S256");
        assert!(!format!("{pkce:?}").contains(&pkce.verifier));
    }
}
