//! Signed client assertions that authenticate the broker at the token endpoint.
//!
//! The provider authenticates confidential clients with `private_key_jwt`: every token
//! endpoint call carries a short-lived RS256 JWT whose issuer and subject are the client id
//! and whose audience is the token endpoint URL.

// std
use std::{fs, path::Path, path::PathBuf};
// crates.io
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use uuid::Uuid;
// self
use crate::_prelude::*;

/// Value sent as `client_assertion_type` alongside every assertion.
pub const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

const DEFAULT_LIFETIME: Duration = Duration::hours(1);
const PEM_LABELS: [&str; 2] = ["PRIVATE KEY", "RSA PRIVATE KEY"];

/// Failures raised while loading key material or signing an assertion.
#[derive(Debug, ThisError)]
pub enum SigningError {
	/// PEM input could not be split into blocks.
	#[error("PEM input is malformed.")]
	Pem {
		/// Underlying PEM framing failure.
		#[source]
		source: pem::PemError,
	},
	/// PEM input carried no private key block.
	#[error("PEM input does not contain a private key block.")]
	MissingPrivateKey,
	/// Private key block could not be parsed as an RSA key.
	#[error("Private key is not a valid RSA key.")]
	InvalidKey {
		/// Underlying key parsing failure.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
	/// Claims could not be signed.
	#[error("Client assertion could not be signed.")]
	Encode {
		/// Underlying signing failure.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
	/// Key file could not be read.
	#[error("Unable to read key material from {path}.")]
	Io {
		/// File that failed to load.
		path: PathBuf,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
}

/// Claim set of a client assertion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientAssertionClaims {
	/// Token endpoint URL.
	pub aud: String,
	/// Client id.
	pub iss: String,
	/// Client id.
	pub sub: String,
	/// Unique assertion id.
	pub jti: String,
	/// Issued-at, seconds since epoch.
	pub iat: i64,
	/// Not-before, seconds since epoch.
	pub nbf: i64,
	/// Expiry, seconds since epoch.
	pub exp: i64,
}

/// RSA private key used to sign assertions.
#[derive(Clone)]
pub struct SigningKey {
	encoding: EncodingKey,
	key_id: Option<String>,
}
impl SigningKey {
	/// Loads an RSA key from PEM text.
	///
	/// The input may be a bare PKCS#1/PKCS#8 private key or a bundle that also carries
	/// certificates; only the first private key block is used.
	pub fn from_pem(input: &[u8]) -> Result<Self, SigningError> {
		let blocks = pem::parse_many(input).map_err(|source| SigningError::Pem { source })?;
		let block = blocks
			.iter()
			.find(|block| PEM_LABELS.contains(&block.tag()))
			.ok_or(SigningError::MissingPrivateKey)?;
		let encoding = EncodingKey::from_rsa_pem(pem::encode(block).as_bytes())
			.map_err(|source| SigningError::InvalidKey { source })?;

		Ok(Self { encoding, key_id: None })
	}

	/// Reads and parses a PEM file.
	pub fn from_pem_file(path: impl AsRef<Path>) -> Result<Self, SigningError> {
		let path = path.as_ref();
		let input = fs::read(path)
			.map_err(|source| SigningError::Io { path: path.to_path_buf(), source })?;

		Self::from_pem(&input)
	}

	/// Sets the `kid` header emitted with every assertion.
	pub fn with_key_id(mut self, key_id: impl Into<String>) -> Self {
		self.key_id = Some(key_id.into());

		self
	}

	/// Returns the configured key id, if any.
	pub fn key_id(&self) -> Option<&str> {
		self.key_id.as_deref()
	}
}
impl Debug for SigningKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SigningKey")
			.field("key", &"<redacted>")
			.field("key_id", &self.key_id)
			.finish()
	}
}

/// Builds RS256 client assertions for token endpoint calls.
#[derive(Clone, Debug)]
pub struct ClientAssertionSigner {
	key: SigningKey,
	lifetime: Duration,
}
impl ClientAssertionSigner {
	/// Creates a signer issuing assertions valid for one hour.
	pub fn new(key: SigningKey) -> Self {
		Self { key, lifetime: DEFAULT_LIFETIME }
	}

	/// Overrides the assertion lifetime.
	pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
		self.lifetime = lifetime;

		self
	}

	/// Signs a fresh assertion for `client_id` targeting `audience`.
	pub fn build_assertion(&self, client_id: &str, audience: &Url) -> Result<String, SigningError> {
		self.build_assertion_at(client_id, audience, OffsetDateTime::now_utc())
	}

	/// Same as [`build_assertion`](Self::build_assertion) with an explicit "now".
	pub fn build_assertion_at(
		&self,
		client_id: &str,
		audience: &Url,
		now: OffsetDateTime,
	) -> Result<String, SigningError> {
		let claims = self.claims_at(client_id, audience, now);
		let mut header = Header::new(Algorithm::RS256);

		header.kid = self.key.key_id.clone();

		jsonwebtoken::encode(&header, &claims, &self.key.encoding)
			.map_err(|source| SigningError::Encode { source })
	}

	/// Claim set that [`build_assertion_at`](Self::build_assertion_at) would sign.
	pub fn claims_at(
		&self,
		client_id: &str,
		audience: &Url,
		now: OffsetDateTime,
	) -> ClientAssertionClaims {
		let issued = now.unix_timestamp();

		ClientAssertionClaims {
			aud: audience.as_str().to_owned(),
			iss: client_id.to_owned(),
			sub: client_id.to_owned(),
			jti: Uuid::new_v4().to_string(),
			iat: issued,
			nbf: issued,
			exp: (now + self.lifetime).unix_timestamp(),
		}
	}
}
