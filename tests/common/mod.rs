#![allow(dead_code)]

// std
use std::sync::Arc;
// crates.io
#[cfg(feature = "reqwest")] use httpmock::MockServer;
use time::{Duration, OffsetDateTime};
#[cfg(feature = "reqwest")] use url::Url;
// self
use stitch_broker::{
	auth::{ClientAssertionSigner, SigningKey, TokenDetails, UserId},
	store::{MemoryStore, TokenStore},
};
#[cfg(feature = "reqwest")]
use stitch_broker::{
	flows::ReqwestBroker,
	http::ReqwestHttpClient,
	oauth::ReqwestTransportErrorMapper,
	provider::ProviderDescriptor,
	reqwest::{Client as ReqwestClient, redirect::Policy},
};

pub const CLIENT_ID: &str = "test-client-4c1e";
pub const REDIRECT_URI: &str = "https://app.example.com/return";
pub const AUTHORIZE_PATH: &str = "/connect/authorize";
pub const TOKEN_PATH: &str = "/connect/token";
pub const API_PATH: &str = "/graphql";

const CLIENT_KEY: &[u8] = include_bytes!("../fixtures/client_key.pem");

pub fn user(value: &str) -> UserId {
	UserId::new(value).expect("User identifier fixture should be valid.")
}

pub fn signer() -> ClientAssertionSigner {
	let key = SigningKey::from_pem(CLIENT_KEY).expect("Fixture private key should load.");

	ClientAssertionSigner::new(key)
}

#[cfg(feature = "reqwest")]
pub fn descriptor(server: &MockServer) -> ProviderDescriptor {
	ProviderDescriptor::builder()
		.authorization_endpoint(
			Url::parse(&server.url(AUTHORIZE_PATH)).expect("Mock authorize URL should parse."),
		)
		.token_endpoint(Url::parse(&server.url(TOKEN_PATH)).expect("Mock token URL should parse."))
		.api_endpoint(Url::parse(&server.url(API_PATH)).expect("Mock API URL should parse."))
		.build()
		.expect("Mock descriptor should build.")
}

#[cfg(feature = "reqwest")]
/// Builds a reqwest client that accepts the self-signed certificates produced by `httpmock`,
/// bounded by `timeout` and without redirects like the production client.
pub fn test_http_client(timeout: std::time::Duration) -> ReqwestHttpClient {
	let client = ReqwestClient::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.timeout(timeout)
		.redirect(Policy::none())
		.build()
		.expect("Failed to build insecure Reqwest client for tests.");

	ReqwestHttpClient::with_client(client)
}

#[cfg(feature = "reqwest")]
/// Builds a reqwest-backed broker against `server` with an in-memory store.
pub fn broker(server: &MockServer) -> (ReqwestBroker, Arc<MemoryStore>) {
	broker_with_client(server, test_http_client(std::time::Duration::from_secs(5)))
}

#[cfg(feature = "reqwest")]
pub fn broker_with_client(
	server: &MockServer,
	http_client: ReqwestHttpClient,
) -> (ReqwestBroker, Arc<MemoryStore>) {
	let store_backend = Arc::new(MemoryStore::default());
	let store: Arc<dyn TokenStore> = store_backend.clone();
	let broker = ReqwestBroker::with_http_client(
		store,
		descriptor(server),
		CLIENT_ID,
		Url::parse(REDIRECT_URI).expect("Redirect URI fixture should parse."),
		signer(),
		http_client,
		Arc::new(ReqwestTransportErrorMapper),
	);

	(broker, store_backend)
}

pub fn token(access: &str, refresh: &str, expires_at: OffsetDateTime) -> TokenDetails {
	TokenDetails::builder()
		.id_token("id-token-fixture")
		.access_token(access)
		.refresh_token(refresh)
		.token_type("Bearer")
		.scope("openid accounts offline_access")
		.expires_at(expires_at)
		.build()
		.expect("Token fixture should build.")
}

pub async fn seed(store: &MemoryStore, user: &UserId, details: TokenDetails) {
	store.set_token_details(user, details).await.expect("Seeding the store should succeed.");
}

pub fn fresh_token(access: &str) -> TokenDetails {
	token(access, "refresh-fresh", OffsetDateTime::now_utc() + Duration::minutes(30))
}

pub fn expired_token(access: &str, refresh: &str) -> TokenDetails {
	token(access, refresh, OffsetDateTime::now_utc() - Duration::seconds(1))
}

pub fn token_response(access: &str, refresh: &str, expires_in: i64) -> String {
	format!(
		"{{\"id_token\":\"id-{access}\",\"access_token\":\"{access}\",\"refresh_token\":\"{refresh}\",\"token_type\":\"bearer\",\"expires_in\":{expires_in},\"scope\":\"openid accounts offline_access\"}}"
	)
}
