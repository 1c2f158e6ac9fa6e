//! High-level flow orchestrators powered by the broker facade.

pub mod auth_code_pkce;
pub mod refresh;

mod bank_accounts;
mod common;

pub use auth_code_pkce::*;
pub use refresh::*;

// self
use crate::{
	_prelude::*,
	auth::{ClientAssertionSigner, UserId},
	http::TokenHttpClient,
	oauth::TransportErrorMapper,
	provider::{DefaultProviderStrategy, ProviderDescriptor, ProviderStrategy},
	store::TokenStore,
};
#[cfg(feature = "reqwest")]
use crate::{error::ConfigError, http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// Broker specialized for the crate's default reqwest transport stack.
pub type ReqwestBroker = Broker<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Coordinates authorization, token lifecycle, and data API calls for one OAuth client.
///
/// The broker owns the HTTP client, token store, provider descriptor, strategy, and
/// client assertion signer, plus the in-flight authorization map. Cloning is cheap and
/// clones share the pending authorizations, per-user guards, and refresh metrics.
#[derive(Clone)]
pub struct Broker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for every outbound provider request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Token store holding the latest token details per user.
	pub store: Arc<dyn TokenStore>,
	/// Provider descriptor that defines the endpoints.
	pub descriptor: ProviderDescriptor,
	/// Strategy responsible for token request adjustments and error classification.
	pub strategy: Arc<dyn ProviderStrategy>,
	/// OAuth 2.0 client identifier used in every grant and as the assertion issuer.
	pub client_id: String,
	/// Redirect URI registered with the provider.
	pub redirect_uri: Url,
	/// Signer producing the client assertion attached to token endpoint calls.
	pub signer: Arc<ClientAssertionSigner>,
	/// Shared metrics recorder for refresh outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	/// Tokens expiring within this window are refreshed early (zero by default).
	pub expiry_leeway: Duration,
	pending: Arc<PendingAuthorizations>,
	flow_guards: Arc<Mutex<HashMap<UserId, Arc<AsyncMutex<()>>>>>,
}
impl<C, M> Broker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a broker that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		store: Arc<dyn TokenStore>,
		descriptor: ProviderDescriptor,
		client_id: impl Into<String>,
		redirect_uri: Url,
		signer: ClientAssertionSigner,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			store,
			descriptor,
			strategy: Arc::new(DefaultProviderStrategy),
			client_id: client_id.into(),
			redirect_uri,
			signer: Arc::new(signer),
			refresh_metrics: Default::default(),
			expiry_leeway: Duration::ZERO,
			pending: Default::default(),
			flow_guards: Default::default(),
		}
	}

	/// Replaces the provider strategy.
	pub fn with_strategy(mut self, strategy: Arc<dyn ProviderStrategy>) -> Self {
		self.strategy = strategy;

		self
	}

	/// Uses a fresh pending-authorization map whose entries expire after `ttl`.
	pub fn with_pending_ttl(mut self, ttl: Duration) -> Self {
		self.pending = Arc::new(PendingAuthorizations::new(ttl));

		self
	}

	/// Shares an existing pending-authorization map, e.g. between brokers for one client.
	pub fn with_pending_authorizations(mut self, pending: Arc<PendingAuthorizations>) -> Self {
		self.pending = pending;

		self
	}

	/// Refreshes tokens that expire within `leeway`; negative values count as zero.
	pub fn with_expiry_leeway(mut self, leeway: Duration) -> Self {
		self.expiry_leeway = if leeway.is_negative() { Duration::ZERO } else { leeway };

		self
	}

	/// In-flight authorization map used by this broker.
	pub fn pending_authorizations(&self) -> &Arc<PendingAuthorizations> {
		&self.pending
	}
}
#[cfg(feature = "reqwest")]
impl Broker<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a broker backed by reqwest with a 30 second request timeout.
	pub fn new(
		store: Arc<dyn TokenStore>,
		descriptor: ProviderDescriptor,
		client_id: impl Into<String>,
		redirect_uri: Url,
		signer: ClientAssertionSigner,
	) -> Result<Self, ConfigError> {
		let http_client = ReqwestHttpClient::with_timeout(ReqwestHttpClient::DEFAULT_TIMEOUT)?;

		Ok(Self::with_http_client(
			store,
			descriptor,
			client_id,
			redirect_uri,
			signer,
			http_client,
			Arc::new(ReqwestTransportErrorMapper),
		))
	}
}
impl<C, M> Debug for Broker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Broker")
			.field("descriptor", &self.descriptor)
			.field("client_id", &self.client_id)
			.field("redirect_uri", &self.redirect_uri.as_str())
			.field("expiry_leeway", &self.expiry_leeway)
			.field("pending_authorizations", &self.pending.len())
			.finish()
	}
}
