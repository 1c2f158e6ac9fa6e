//! Token endpoint facade built on the `oauth2` crate.
//!
//! The facade configures an `oauth2` client for `private_key_jwt` style authentication:
//! `client_id` travels in the form body, no client secret is ever set, and every request
//! carries a freshly signed `client_assertion`. Responses are mapped into
//! [`TokenDetails`], and failures into [`ProviderError`] via the provider strategy and a
//! [`TransportErrorMapper`].

pub use oauth2;

// crates.io
use oauth2::{
	AuthType, AuthorizationCode, Client, ClientId, EndpointNotSet, EndpointSet, ExtraTokenFields,
	HttpClientError, PkceCodeVerifier, RedirectUrl, RefreshToken, RequestTokenError,
	StandardRevocableToken, StandardTokenResponse, TokenResponse, TokenUrl,
	basic::{
		BasicErrorResponse, BasicRequestTokenError, BasicRevocationErrorResponse,
		BasicTokenIntrospectionResponse, BasicTokenType,
	},
};
// self
use crate::{
	_prelude::*,
	auth::{CLIENT_ASSERTION_TYPE, TokenDetails},
	error::{ConfigError, ProviderError, TransientError, TransportError},
	flows::REQUESTED_SCOPE,
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	provider::{
		GrantType, ProviderDescriptor, ProviderEndpoint, ProviderErrorContext, ProviderErrorKind,
		ProviderStrategy,
	},
};

/// Token endpoint response carrying the OpenID Connect `id_token`.
pub type StitchTokenResponse = StandardTokenResponse<IdTokenFields, BasicTokenType>;

type ConfiguredClient = Client<
	BasicErrorResponse,
	StitchTokenResponse,
	BasicTokenIntrospectionResponse,
	StandardRevocableToken,
	BasicRevocationErrorResponse,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointSet,
>;
type FacadeFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ProviderError>> + 'a + Send>>;

/// Extra token response fields returned alongside the standard OAuth 2.0 ones.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdTokenFields {
	/// Signed OpenID Connect ID token.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id_token: Option<String>,
}
impl ExtraTokenFields for IdTokenFields {}

/// Maps HTTP transport failures into [`ProviderError`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] raised while calling `endpoint`.
	fn map_transport_error(
		&self,
		endpoint: ProviderEndpoint,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> ProviderError;
}

/// Default mapper for reqwest-backed transports.
///
/// Timeouts become retryable [`TransientError::Endpoint`] values; connection failures
/// become [`TransportError::Network`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		endpoint: ProviderEndpoint,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> ProviderError {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(endpoint, meta, *inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => endpoint_failure(
				endpoint,
				meta,
				format!("HTTP client error occurred: {message}"),
			),
			_ => endpoint_failure(endpoint, meta, "HTTP client error occurred"),
		}
	}
}

/// Inputs for an authorization code exchange.
pub(crate) struct CodeExchange<'a> {
	pub(crate) strategy: &'a dyn ProviderStrategy,
	pub(crate) code: &'a str,
	pub(crate) code_verifier: &'a str,
	pub(crate) client_assertion: &'a str,
}

/// Inputs for a refresh token exchange.
pub(crate) struct RefreshExchange<'a> {
	pub(crate) strategy: &'a dyn ProviderStrategy,
	pub(crate) previous: &'a TokenDetails,
	pub(crate) client_assertion: &'a str,
}

pub(crate) trait OAuth2Facade {
	fn exchange_authorization_code<'a>(
		&'a self,
		exchange: CodeExchange<'a>,
	) -> FacadeFuture<'a, TokenDetails>;

	fn refresh_token<'a>(&'a self, exchange: RefreshExchange<'a>)
	-> FacadeFuture<'a, TokenDetails>;
}

pub(crate) struct TokenFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	oauth_client: ConfiguredClient,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> TokenFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) fn from_descriptor(
		descriptor: &ProviderDescriptor,
		client_id: &str,
		redirect_uri: &Url,
		http_client: Arc<C>,
		error_mapper: Arc<M>,
	) -> Result<Self, ConfigError> {
		let token_url = TokenUrl::new(descriptor.endpoints.token.to_string())
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;
		let redirect_url = RedirectUrl::new(redirect_uri.to_string())
			.map_err(|source| ConfigError::InvalidRedirect { source })?;
		let oauth_client = Client::new(ClientId::new(client_id.to_owned()))
			.set_token_uri(token_url)
			.set_redirect_uri(redirect_url)
			.set_auth_type(AuthType::RequestBody);

		Ok(Self { oauth_client, http_client, error_mapper })
	}
}
impl<C, M> OAuth2Facade for TokenFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn exchange_authorization_code<'a>(
		&'a self,
		exchange: CodeExchange<'a>,
	) -> FacadeFuture<'a, TokenDetails> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let instrumented = self.http_client.with_metadata(meta.clone());
			let mut request = self
				.oauth_client
				.exchange_code(AuthorizationCode::new(exchange.code.to_owned()))
				.set_pkce_verifier(PkceCodeVerifier::new(exchange.code_verifier.to_owned()));

			for (key, value) in
				extra_params(exchange.strategy, GrantType::AuthorizationCode, exchange.client_assertion)
			{
				request = request.add_extra_param(key, value);
			}

			let response = request.request_async(&instrumented).await.map_err(|err| {
				map_request_error(
					exchange.strategy,
					GrantType::AuthorizationCode,
					meta.take(),
					err,
					self.error_mapper.as_ref(),
				)
			})?;

			map_token_response(response, None, OffsetDateTime::now_utc()).map_err(Into::into)
		})
	}

	fn refresh_token<'a>(
		&'a self,
		exchange: RefreshExchange<'a>,
	) -> FacadeFuture<'a, TokenDetails> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let instrumented = self.http_client.with_metadata(meta.clone());
			let refresh_secret =
				RefreshToken::new(exchange.previous.refresh_token.expose().to_owned());
			let mut request = self.oauth_client.exchange_refresh_token(&refresh_secret);

			for (key, value) in
				extra_params(exchange.strategy, GrantType::RefreshToken, exchange.client_assertion)
			{
				request = request.add_extra_param(key, value);
			}

			let response = request.request_async(&instrumented).await.map_err(|err| {
				map_request_error(
					exchange.strategy,
					GrantType::RefreshToken,
					meta.take(),
					err,
					self.error_mapper.as_ref(),
				)
			})?;

			map_token_response(response, Some(exchange.previous), OffsetDateTime::now_utc())
				.map_err(Into::into)
		})
	}
}

fn extra_params(
	strategy: &dyn ProviderStrategy,
	grant: GrantType,
	client_assertion: &str,
) -> BTreeMap<String, String> {
	let mut form = BTreeMap::new();

	form.insert("client_assertion_type".to_owned(), CLIENT_ASSERTION_TYPE.to_owned());
	form.insert("client_assertion".to_owned(), client_assertion.to_owned());
	strategy.augment_token_request(grant, &mut form);

	form
}

/// Converts a token endpoint response into [`TokenDetails`].
///
/// `previous` supplies the ID token, refresh token, and scope when a refresh response omits
/// them; without it those fields are mandatory (scope falls back to the requested set).
pub(crate) fn map_token_response(
	response: StitchTokenResponse,
	previous: Option<&TokenDetails>,
	received_at: OffsetDateTime,
) -> Result<TokenDetails, ConfigError> {
	let expires_in = response.expires_in().ok_or(ConfigError::MissingExpiresIn)?.as_secs();
	let expires_in = i64::try_from(expires_in).map_err(|_| ConfigError::ExpiresInOutOfRange)?;

	if expires_in <= 0 {
		return Err(ConfigError::NonPositiveExpiresIn);
	}

	let id_token = response
		.extra_fields()
		.id_token
		.clone()
		.or_else(|| previous.map(|details| details.id_token.expose().to_owned()))
		.ok_or(ConfigError::MissingIdToken)?;
	let refresh_token = response
		.refresh_token()
		.map(|token| token.secret().to_owned())
		.or_else(|| previous.map(|details| details.refresh_token.expose().to_owned()))
		.ok_or(ConfigError::MissingRefreshToken)?;
	let scope = response
		.scopes()
		.filter(|scopes| !scopes.is_empty())
		.map(|scopes| scopes.iter().map(|scope| scope.as_str()).collect::<Vec<_>>().join(" "))
		.or_else(|| previous.map(|details| details.scope.clone()))
		.unwrap_or_else(|| REQUESTED_SCOPE.to_owned());
	let token_type = match response.token_type() {
		BasicTokenType::Bearer => "Bearer".to_owned(),
		other => other.as_ref().to_owned(),
	};

	TokenDetails::builder()
		.id_token(id_token)
		.access_token(response.access_token().secret().to_owned())
		.refresh_token(refresh_token)
		.token_type(token_type)
		.scope(scope)
		.received_at(received_at)
		.expires_in(Duration::seconds(expires_in))
		.build()
		.map_err(ConfigError::from)
}

fn map_request_error<E, M>(
	strategy: &dyn ProviderStrategy,
	grant: GrantType,
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
	mapper: &M,
) -> ProviderError
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let meta_ref = meta.as_ref();

	match err {
		RequestTokenError::ServerResponse(response) =>
			map_server_response_error(strategy, grant, response, meta_ref),
		RequestTokenError::Request(error) =>
			mapper.map_transport_error(ProviderEndpoint::Token, meta_ref, error),
		RequestTokenError::Parse(source, body) => {
			let status = meta_status(meta_ref);

			match status {
				Some(code) if code >= 400 => classify_unparsed_failure(strategy, grant, code, &body),
				_ => TransientError::TokenResponseParse { source, status }.into(),
			}
		},
		RequestTokenError::Other(message) => endpoint_failure(
			ProviderEndpoint::Token,
			meta_ref,
			format!("Token endpoint returned an unexpected response: {message}"),
		),
	}
}

fn map_server_response_error(
	strategy: &dyn ProviderStrategy,
	grant: GrantType,
	response: BasicErrorResponse,
	meta: Option<&ResponseMetadata>,
) -> ProviderError {
	let mut ctx =
		ProviderErrorContext::new(grant).with_oauth_error(response.error().as_ref().to_string());

	if let Some(description) = response.error_description() {
		ctx = ctx.with_error_description(description.clone());
	}
	if let Some(status) = meta_status(meta) {
		ctx = ctx.with_http_status(status);
	}

	classify(strategy, &ctx, meta)
}

fn classify_unparsed_failure(
	strategy: &dyn ProviderStrategy,
	grant: GrantType,
	status: u16,
	body: &[u8],
) -> ProviderError {
	let ctx = ProviderErrorContext::new(grant)
		.with_http_status(status)
		.with_body_preview(String::from_utf8_lossy(body));

	classify(strategy, &ctx, None)
}

fn classify(
	strategy: &dyn ProviderStrategy,
	ctx: &ProviderErrorContext,
	meta: Option<&ResponseMetadata>,
) -> ProviderError {
	let reason = ctx.reason();

	match strategy.classify_token_error(ctx) {
		ProviderErrorKind::InvalidGrant => ProviderError::InvalidGrant { reason },
		ProviderErrorKind::InvalidClient => ProviderError::InvalidClient { reason },
		ProviderErrorKind::InsufficientScope => ProviderError::InsufficientScope { reason },
		ProviderErrorKind::Transient => TransientError::Endpoint {
			endpoint: ProviderEndpoint::Token,
			message: reason,
			status: ctx.http_status.or_else(|| meta_status(meta)),
			retry_after: meta_retry_after(meta),
		}
		.into(),
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(
	endpoint: ProviderEndpoint,
	meta: Option<&ResponseMetadata>,
	err: ReqwestError,
) -> ProviderError {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return TransientError::Endpoint {
			endpoint,
			message: "Request timed out".into(),
			status: meta_status(meta).or_else(|| err.status().map(|code| code.as_u16())),
			retry_after: meta_retry_after(meta),
		}
		.into();
	}

	TransportError::from(err).into()
}

pub(crate) fn endpoint_failure(
	endpoint: ProviderEndpoint,
	meta: Option<&ResponseMetadata>,
	message: impl Into<String>,
) -> ProviderError {
	TransientError::Endpoint {
		endpoint,
		message: message.into(),
		status: meta_status(meta),
		retry_after: meta_retry_after(meta),
	}
	.into()
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}

fn meta_retry_after(meta: Option<&ResponseMetadata>) -> Option<Duration> {
	meta.and_then(|value| value.retry_after)
}
