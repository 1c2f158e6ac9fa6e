//! Random token and PKCE pair generation.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

const RANDOM_BYTES: usize = 32;

/// Supported PKCE challenge methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PkceCodeChallengeMethod {
	/// SHA-256 based PKCE (RFC 7636 S256).
	S256,
}
impl PkceCodeChallengeMethod {
	/// Returns the RFC 7636 identifier for the challenge method.
	pub fn as_str(self) -> &'static str {
		match self {
			PkceCodeChallengeMethod::S256 => "S256",
		}
	}
}

/// Verifier plus the challenge derived from it.
#[derive(Clone)]
pub struct PkcePair {
	/// Secret verifier sent with the code exchange.
	pub verifier: String,
	/// Challenge sent with the authorization request.
	pub challenge: String,
	/// Method used to derive the challenge.
	pub method: PkceCodeChallengeMethod,
}
impl PkcePair {
	/// Generates a fresh S256 pair.
	pub fn generate() -> Self {
		let (challenge, verifier) = generate_pkce_pair();

		Self { verifier, challenge, method: PkceCodeChallengeMethod::S256 }
	}
}
impl Debug for PkcePair {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PkcePair")
			.field("verifier", &"<redacted>")
			.field("challenge", &self.challenge)
			.field("method", &self.method)
			.finish()
	}
}

/// Base64url (unpadded) encoding of 32 bytes from the thread-local CSPRNG.
///
/// Always 43 characters long.
pub fn generate_random_token() -> String {
	let mut bytes = [0_u8; RANDOM_BYTES];

	rand::rng().fill_bytes(&mut bytes);

	URL_SAFE_NO_PAD.encode(bytes)
}

/// Returns `(challenge, verifier)`.
pub fn generate_pkce_pair() -> (String, String) {
	let verifier = generate_random_token();
	let challenge = compute_pkce_challenge(&verifier);

	(challenge, verifier)
}

/// S256 challenge for `verifier`, hashed over its UTF-8 bytes.
pub fn compute_pkce_challenge(verifier: &str) -> String {
	let digest = Sha256::digest(verifier.as_bytes());

	URL_SAFE_NO_PAD.encode(digest)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn random_tokens_are_url_safe_and_unique() {
		let first = generate_random_token();
		let second = generate_random_token();

		assert_eq!(first.len(), 43);
		assert!(first.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
		assert_ne!(first, second);
	}

	#[test]
	fn challenge_is_derived_from_verifier() {
		for _ in 0..16 {
			let (challenge, verifier) = generate_pkce_pair();

			assert_eq!(challenge, compute_pkce_challenge(&verifier));
			assert_eq!(challenge.len(), 43);
		}
	}

	#[test]
	fn challenge_matches_rfc_7636_vector() {
		assert_eq!(
			compute_pkce_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
			"E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
		);
	}
}
