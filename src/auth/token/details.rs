//! Immutable token snapshots, expiry bookkeeping, and their JSON form.

// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// Errors produced while building or decoding [`TokenDetails`].
#[derive(Debug, ThisError)]
pub enum TokenDetailsError {
	/// A required string field was not supplied or is empty.
	#[error("Token field `{field}` is missing or empty.")]
	Empty {
		/// Name of the offending field.
		field: &'static str,
	},
	/// Neither an absolute nor a relative expiry was configured.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
	/// The reported lifetime puts the expiry outside the representable date range.
	#[error("Expiry lifetime of {expires_in} is out of range.")]
	ExpiryOutOfRange {
		/// Lifetime that overflowed.
		expires_in: Duration,
	},
	/// JSON payload could not be decoded.
	#[error("Token details JSON is malformed.")]
	Parse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}

/// Immutable snapshot of the provider's token set for one user.
///
/// Instances come from a token endpoint response or from a store read and are never
/// mutated; a refresh yields a new value that replaces the stored one.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenDetails {
	/// Signed OpenID Connect ID token.
	pub id_token: TokenSecret,
	/// Bearer credential attached to API calls.
	pub access_token: TokenSecret,
	/// Absolute expiry, always computed as time of receipt plus the reported lifetime.
	pub expires_at: OffsetDateTime,
	/// Token type reported by the provider (normally `Bearer`).
	pub token_type: String,
	/// Long-lived credential used to mint new access tokens.
	pub refresh_token: TokenSecret,
	/// Space-delimited list of granted scopes.
	pub scope: String,
}
impl TokenDetails {
	/// Returns a builder that validates every field.
	pub fn builder() -> TokenDetailsBuilder {
		TokenDetailsBuilder::default()
	}

	/// Returns `true` once `expires_at` is at or before `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		self.expires_at <= instant
	}

	/// Returns `true` if the access token has expired relative to the current clock.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}

	/// Expiry as seconds since the unix epoch.
	pub fn expires_at_unix(&self) -> i64 {
		self.expires_at.unix_timestamp()
	}

	/// Seconds the access token remains valid at `instant`, clamped to zero.
	pub fn expires_in_at(&self, instant: OffsetDateTime) -> i64 {
		(self.expires_at - instant).whole_seconds().max(0)
	}

	/// Serializes to the token-endpoint JSON shape with a relative `expires_in`.
	pub fn to_json(&self) -> String {
		self.to_json_at(OffsetDateTime::now_utc())
	}

	/// Same as [`to_json`](Self::to_json) with an explicit "now".
	pub fn to_json_at(&self, instant: OffsetDateTime) -> String {
		serde_json::json!({
			"id_token": self.id_token.expose(),
			"access_token": self.access_token.expose(),
			"expires_in": self.expires_in_at(instant),
			"token_type": self.token_type,
			"refresh_token": self.refresh_token.expose(),
			"scope": self.scope,
		})
		.to_string()
	}

	/// Parses the token-endpoint JSON shape, anchoring `expires_in` at the current clock.
	pub fn from_json(payload: &str) -> Result<Self, TokenDetailsError> {
		Self::from_json_at(payload, OffsetDateTime::now_utc())
	}

	/// Same as [`from_json`](Self::from_json) with an explicit "now".
	pub fn from_json_at(payload: &str, instant: OffsetDateTime) -> Result<Self, TokenDetailsError> {
		let mut de = serde_json::Deserializer::from_str(payload);
		let wire: TokenDetailsJson = serde_path_to_error::deserialize(&mut de)
			.map_err(|source| TokenDetailsError::Parse { source })?;

		Self::builder()
			.id_token(wire.id_token)
			.access_token(wire.access_token)
			.refresh_token(wire.refresh_token)
			.token_type(wire.token_type)
			.scope(wire.scope)
			.received_at(instant)
			.expires_in(Duration::seconds(wire.expires_in.max(0)))
			.build()
	}
}
impl Debug for TokenDetails {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenDetails")
			.field("id_token", &"<redacted>")
			.field("access_token", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.field("token_type", &self.token_type)
			.field("refresh_token", &"<redacted>")
			.field("scope", &self.scope)
			.finish()
	}
}
impl Display for TokenDetails {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(
			f,
			"TokenDetails(id_token={}..., access_token={}..., expires_at={}, token_type={}, refresh_token={}..., scope={})",
			self.id_token.preview(),
			self.access_token.preview(),
			self.expires_at,
			self.token_type,
			self.refresh_token.preview(),
			self.scope,
		)
	}
}

#[derive(Deserialize)]
struct TokenDetailsJson {
	id_token: String,
	access_token: String,
	expires_in: i64,
	token_type: String,
	refresh_token: String,
	scope: String,
}

/// Builder for [`TokenDetails`].
#[derive(Clone, Debug, Default)]
pub struct TokenDetailsBuilder {
	id_token: Option<TokenSecret>,
	access_token: Option<TokenSecret>,
	refresh_token: Option<TokenSecret>,
	token_type: Option<String>,
	scope: Option<String>,
	received_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl TokenDetailsBuilder {
	/// Provides the ID token value.
	pub fn id_token(mut self, token: impl Into<String>) -> Self {
		self.id_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Sets the token type.
	pub fn token_type(mut self, token_type: impl Into<String>) -> Self {
		self.token_type = Some(token_type.into());

		self
	}

	/// Sets the space-delimited granted scope.
	pub fn scope(mut self, scope: impl Into<String>) -> Self {
		self.scope = Some(scope.into());

		self
	}

	/// Sets the instant the token response was received (defaults to now).
	pub fn received_at(mut self, instant: OffsetDateTime) -> Self {
		self.received_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant, e.g. when reloading a stored row.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets the provider-reported lifetime relative to the receipt instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Consumes the builder and produces validated [`TokenDetails`].
	pub fn build(self) -> Result<TokenDetails, TokenDetailsError> {
		let id_token = required_secret("id_token", self.id_token)?;
		let access_token = required_secret("access_token", self.access_token)?;
		let refresh_token = required_secret("refresh_token", self.refresh_token)?;
		let token_type = required_text("token_type", self.token_type)?;
		let scope = required_text("scope", self.scope)?;
		let received_at = self.received_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) => received_at
				.checked_add(delta)
				.ok_or(TokenDetailsError::ExpiryOutOfRange { expires_in: delta })?,
			(None, None) => return Err(TokenDetailsError::MissingExpiry),
		};

		Ok(TokenDetails { id_token, access_token, expires_at, token_type, refresh_token, scope })
	}
}

fn required_secret(
	field: &'static str,
	value: Option<TokenSecret>,
) -> Result<TokenSecret, TokenDetailsError> {
	value.filter(|secret| !secret.is_empty()).ok_or(TokenDetailsError::Empty { field })
}

fn required_text(field: &'static str, value: Option<String>) -> Result<String, TokenDetailsError> {
	value.filter(|text| !text.is_empty()).ok_or(TokenDetailsError::Empty { field })
}
