//! Broker-level error types shared across flows, providers, and stores.

// self
use crate::{_prelude::*, auth::UserId, provider::ProviderEndpoint};

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical broker error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Client assertion could not be produced from the configured key material.
	#[error(transparent)]
	Signing(#[from] crate::auth::SigningError),

	/// Completion was attempted without a live pending authorization for the user.
	#[error("No pending authorization exists for user {user}.")]
	FlowState {
		/// User whose callback could not be matched.
		user: UserId,
	},
	/// Returned `state` does not match the value issued with the authorization URL.
	#[error("Authorization state mismatch for user {user}.")]
	AntiCsrf {
		/// User whose callback carried the foreign state.
		user: UserId,
	},
	/// Authorization code exchange failed at the token endpoint.
	#[error("Authorization code exchange failed: {0}")]
	TokenExchange(#[source] ProviderError),
	/// Refresh token exchange failed at the token endpoint.
	#[error("Token refresh failed: {0}")]
	TokenRefresh(#[source] ProviderError),
	/// A token was requested for a user that never completed authorization.
	#[error("User {user} has not authorized the provider.")]
	NotAuthorized {
		/// User without stored token details.
		user: UserId,
	},
	/// Downstream data API rejected or failed the call.
	#[error(transparent)]
	Api(#[from] ApiError),
}
impl Error {
	/// Returns `true` when repeating the same call later may succeed.
	pub fn is_retryable(&self) -> bool {
		match self {
			Self::TokenExchange(err) | Self::TokenRefresh(err) => err.is_retryable(),
			Self::Api(err) => err.is_retryable(),
			_ => false,
		}
	}

	/// Returns `true` when the user has to go through the authorization redirect again.
	pub fn requires_authorization(&self) -> bool {
		match self {
			Self::NotAuthorized { .. } => true,
			Self::TokenRefresh(err) => matches!(err, ProviderError::InvalidGrant { .. }),
			_ => false,
		}
	}
}

/// Failures raised while talking to a provider endpoint.
#[derive(Debug, ThisError)]
pub enum ProviderError {
	/// Provider rejected the grant (e.g., bad code or refresh token).
	#[error("Provider rejected the grant: {reason}.")]
	InvalidGrant {
		/// Provider- or broker-supplied reason string.
		reason: String,
	},
	/// Client authentication failed or the client assertion was refused.
	#[error("Client authentication failed: {reason}.")]
	InvalidClient {
		/// Provider- or broker-supplied reason string.
		reason: String,
	},
	/// Requested scopes exceed what the client may obtain.
	#[error("Requested scopes were refused: {reason}.")]
	InsufficientScope {
		/// Provider- or broker-supplied reason string.
		reason: String,
	},
	/// Temporary upstream failure; retry with backoff.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Request could not be built or the response violated the token contract.
	#[error(transparent)]
	Config(#[from] ConfigError),
}
impl ProviderError {
	/// Returns `true` for timeouts, throttling, server-side, and network failures.
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::Transient(_) | Self::Transport(_))
	}
}

/// Failures reported for the provider's data API.
#[derive(Debug, ThisError)]
pub enum ApiError {
	/// API answered with a non-200 status or a populated `errors` array.
	#[error(
		"Provider API rejected the call with HTTP {status}: {}.",
		.message.as_deref().unwrap_or("no error message")
	)]
	Rejected {
		/// HTTP status code returned by the API.
		status: u16,
		/// First error message reported by the API, if any.
		message: Option<String>,
	},
	/// API answered 200 with a body that does not match the expected shape.
	#[error("Provider API returned a malformed response.")]
	ResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code returned by the API.
		status: u16,
	},
	/// Request never produced an HTTP response (timeout, network, request construction).
	#[error(transparent)]
	Provider(#[from] ProviderError),
}
impl ApiError {
	/// HTTP status reported by the API, when a response was received.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Rejected { status, .. } | Self::ResponseParse { status, .. } => Some(*status),
			Self::Provider(ProviderError::Transient(err)) => err.status(),
			Self::Provider(_) => None,
		}
	}

	/// First error message reported by the API, if any.
	pub fn message(&self) -> Option<&str> {
		match self {
			Self::Rejected { message, .. } => message.as_deref(),
			_ => None,
		}
	}

	/// Returns `true` for throttling, server-side, timeout, and network failures.
	pub fn is_retryable(&self) -> bool {
		match self {
			Self::Rejected { status, .. } => *status == 429 || *status >= 500,
			Self::ResponseParse { .. } => false,
			Self::Provider(err) => err.is_retryable(),
		}
	}
}

/// Configuration and validation failures raised by the broker.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Request body could not be encoded.
	#[error("Request body could not be encoded.")]
	RequestEncode(#[source] serde_json::Error),
	/// Provider descriptor contains an invalid URL.
	#[error("Descriptor contains an invalid URL.")]
	InvalidDescriptor {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Redirect URI cannot be parsed.
	#[error("Redirect URI is invalid.")]
	InvalidRedirect {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},

	/// Token endpoint response omitted `expires_in`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Token endpoint returned a non-positive duration.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
	/// Token endpoint response omitted `id_token` and no previous value exists.
	#[error("Token endpoint response is missing id_token.")]
	MissingIdToken,
	/// Token endpoint response omitted `refresh_token` and no previous value exists.
	#[error("Token endpoint response is missing refresh_token.")]
	MissingRefreshToken,
	/// Token details validation failed.
	#[error("Unable to build token details.")]
	TokenDetails(#[from] crate::auth::TokenDetailsError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Provider returned an unexpected but non-fatal response, or the call timed out.
	#[error("The {endpoint} endpoint call failed: {message}.")]
	Endpoint {
		/// Endpoint that produced the failure.
		endpoint: ProviderEndpoint,
		/// Provider- or broker-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Token endpoint responded with malformed JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}
impl TransientError {
	/// HTTP status code associated with the failure, when available.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Endpoint { status, .. } | Self::TokenResponseParse { status, .. } => *status,
		}
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the provider.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the provider.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
