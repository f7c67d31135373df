//! PKCE (Proof Key for Code Exchange) verifier and challenge handling.
//!
//! RFC 7636: https://tools.ietf.org/html/rfc7636

use std::fmt;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{TryRngCore, rngs::OsRng};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Unreserved characters permitted in a code verifier.
pub const VERIFIER_ALPHABET: &[u8; 66] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

pub const MIN_VERIFIER_LENGTH: usize = 43;
pub const MAX_VERIFIER_LENGTH: usize = 128;
pub const DEFAULT_VERIFIER_LENGTH: usize = MAX_VERIFIER_LENGTH;

/// Only the S256 method is supported.
pub const CODE_CHALLENGE_METHOD: &str = "S256";

// Largest multiple of the alphabet size that fits in a byte; bytes at or
// above it are rejected so every symbol stays equally likely.
const REJECTION_BOUND: u8 = (256 / VERIFIER_ALPHABET.len() * VERIFIER_ALPHABET.len()) as u8;

#[derive(Clone, PartialEq, Eq)]
pub struct CodeVerifier(String);

impl CodeVerifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<String> for CodeVerifier {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// Verifiers are secrets, keep them out of logs.
impl fmt::Debug for CodeVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CodeVerifier(<{} chars>)", self.0.len())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeChallenge(String);

impl CodeChallenge {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CodeChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generates a code verifier of `length` characters.
///
/// Lengths outside of `[43, 128]` are clamped into that range. Characters
/// are drawn uniformly from [`VERIFIER_ALPHABET`] using the operating
/// system's random source.
///
/// # Errors
///
/// Returns [`Error::RandomSourceUnavailable`] when the OS random source
/// cannot be read.
pub fn generate_code_verifier(length: usize) -> Result<CodeVerifier> {
    let length = length.clamp(MIN_VERIFIER_LENGTH, MAX_VERIFIER_LENGTH);
    let mut rng = OsRng;
    let mut verifier = String::with_capacity(length);
    let mut buf = [0u8; MAX_VERIFIER_LENGTH];

    while verifier.len() < length {
        rng.try_fill_bytes(&mut buf)
            .map_err(|e| Error::RandomSourceUnavailable(e.to_string()))?;

        for byte in buf.iter().copied().filter(|b| *b < REJECTION_BOUND) {
            if verifier.len() == length {
                break;
            }
            let idx = byte as usize % VERIFIER_ALPHABET.len();
            verifier.push(VERIFIER_ALPHABET[idx] as char);
        }
    }

    Ok(CodeVerifier(verifier))
}

/// Derives the S256 code challenge for `verifier`.
///
/// The digest is computed on the blocking pool; a failure to run that task
/// is reported as [`Error::HashingUnavailable`].
pub async fn derive_code_challenge(verifier: &CodeVerifier) -> Result<CodeChallenge> {
    let input = verifier.0.clone();
    tokio::task::spawn_blocking(move || challenge_for(&input))
        .await
        .map_err(|e| Error::HashingUnavailable(e.to_string()))
}

fn challenge_for(verifier: &str) -> CodeChallenge {
    let hash = Sha256::digest(verifier.as_bytes());
    CodeChallenge(URL_SAFE_NO_PAD.encode(hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_bound_is_multiple_of_alphabet() {
        assert_eq!(REJECTION_BOUND, 198);
        assert_eq!(REJECTION_BOUND as usize % VERIFIER_ALPHABET.len(), 0);
    }

    #[test]
    fn challenge_matches_rfc7636_appendix_b() {
        let challenge = challenge_for("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
        assert_eq!(
            challenge.as_str(),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn debug_hides_verifier() {
        let verifier = CodeVerifier::from("super-secret".to_string());
        assert!(!format!("{:?}", verifier).contains("super-secret"));
    }
}
