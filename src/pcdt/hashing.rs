//! Credential digests and attempt fingerprints.
//!
//! One coherent scheme for the whole system: a fixed-key keyed digest
//! (HMAC-SHA-256 under a process-wide pepper) with no per-record salt, so the
//! audit engine can recompute signup digests byte-for-byte during its fast and
//! dictionary passes. Fingerprints use a separate construction so a stored
//! digest and a logged fingerprint never collide across tables.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Environment variable holding the pepper.
pub const PEPPER_ENV: &str = "PCDT_PEPPER";

/// Lab default; override via `PCDT_PEPPER` outside of demos.
const DEFAULT_PEPPER: &str = "lab_pepper_please_change";

/// The keyed hashing scheme shared by signup, login, and the audit engine.
#[derive(Clone)]
pub struct Hashing {
    pepper: SecretString,
}

impl std::fmt::Debug for Hashing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hashing").field("pepper", &"***").finish()
    }
}

impl Hashing {
    #[must_use]
    pub fn new(pepper: SecretString) -> Self {
        Self { pepper }
    }

    /// Build from `PCDT_PEPPER`, falling back to the lab default.
    #[must_use]
    pub fn from_env() -> Self {
        let pepper = std::env::var(PEPPER_ENV).unwrap_or_else(|_| DEFAULT_PEPPER.to_string());
        Self::new(SecretString::from(pepper))
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC-SHA-256 accepts keys of any length, so this cannot fail.
        HmacSha256::new_from_slice(self.pepper.expose_secret().as_bytes())
            .unwrap_or_else(|_| unreachable!("hmac accepts any key length"))
    }

    /// One-way digest of a plaintext password, hex-encoded.
    #[must_use]
    pub fn digest(&self, plaintext: &str) -> String {
        let mut mac = self.mac();
        mac.update(plaintext.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Constant-time check of `plaintext` against a stored digest.
    ///
    /// A malformed stored digest (bad hex, wrong length) verifies false
    /// instead of erroring; the caller treats it as an ordinary mismatch.
    #[must_use]
    pub fn verify(&self, plaintext: &str, stored_digest: &str) -> bool {
        let Ok(expected) = hex::decode(stored_digest) else {
            return false;
        };
        let mut mac = self.mac();
        mac.update(plaintext.as_bytes());
        mac.verify_slice(&expected).is_ok()
    }

    /// Keyed fingerprint of a *submitted* plaintext, used to correlate
    /// identical passwords across accounts without storing the plaintext.
    /// Independent of [`Hashing::digest`] by construction.
    #[must_use]
    pub fn fingerprint(&self, plaintext: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.pepper.expose_secret().as_bytes());
        hasher.update(plaintext.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hashing() -> Hashing {
        Hashing::new(SecretString::from("test-pepper"))
    }

    #[test]
    fn digest_is_deterministic() {
        let scheme = hashing();
        assert_eq!(scheme.digest("hunter2"), scheme.digest("hunter2"));
        assert_ne!(scheme.digest("hunter2"), scheme.digest("hunter3"));
    }

    #[test]
    fn digest_depends_on_pepper() {
        let first = Hashing::new(SecretString::from("pepper-a")).digest("hunter2");
        let second = Hashing::new(SecretString::from("pepper-b")).digest("hunter2");
        assert_ne!(first, second);
    }

    #[test]
    fn verify_round_trip() {
        let scheme = hashing();
        let digest = scheme.digest("hunter2");
        assert!(scheme.verify("hunter2", &digest));
        assert!(!scheme.verify("hunter3", &digest));
    }

    #[test]
    fn malformed_digest_verifies_false() {
        let scheme = hashing();
        assert!(!scheme.verify("hunter2", "not-hex"));
        assert!(!scheme.verify("hunter2", "abcd"));
        assert!(!scheme.verify("hunter2", ""));
    }

    #[test]
    fn fingerprint_differs_from_digest() {
        let scheme = hashing();
        assert_ne!(scheme.fingerprint("hunter2"), scheme.digest("hunter2"));
    }

    #[test]
    fn same_password_same_fingerprint_across_accounts() {
        let scheme = hashing();
        assert_eq!(scheme.fingerprint("hunter2"), scheme.fingerprint("hunter2"));
    }

    #[test]
    fn from_env_reads_pepper() {
        temp_env::with_var(PEPPER_ENV, Some("env-pepper"), || {
            let scheme = Hashing::from_env();
            let reference = Hashing::new(SecretString::from("env-pepper"));
            assert_eq!(scheme.digest("x"), reference.digest("x"));
        });
    }
}
