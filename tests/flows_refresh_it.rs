#![cfg(feature = "reqwest")]

mod common;

// crates.io
use httpmock::prelude::*;
use time::{Duration, OffsetDateTime};
// self
use common::*;
use stitch_broker::{
	error::{Error, ProviderError, TransientError},
	provider::ProviderEndpoint,
	store::TokenStore,
};

#[tokio::test]
async fn unexpired_token_is_returned_without_refresh() {
	let server = MockServer::start_async().await;
	let (broker, store) = broker(&server);
	let alice = user("alice");
	let seeded = fresh_token("access-fresh");

	seed(&store, &alice, seeded.clone()).await;

	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(token_response("access-unused", "refresh-unused", 3600));
		})
		.await;
	let token = broker.get_valid_token(&alice).await.expect("Fresh token should be returned.");

	assert_eq!(token, seeded);
	assert_eq!(broker.refresh_metrics.reused(), 1);
	assert_eq!(broker.refresh_metrics.attempts(), 0);

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn expired_token_is_refreshed_once_and_persisted() {
	let server = MockServer::start_async().await;
	let (broker, store) = broker(&server);
	let bob = user("bob");

	seed(&store, &bob, expired_token("access-old", "refresh-old")).await;

	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(TOKEN_PATH)
				.form_urlencoded_tuple("grant_type", "refresh_token")
				.form_urlencoded_tuple("refresh_token", "refresh-old")
				.form_urlencoded_tuple("client_id", CLIENT_ID)
				.form_urlencoded_tuple_exists("client_assertion");
			then.status(200)
				.header("content-type", "application/json")
				.body(token_response("access-new", "refresh-new", 1800));
		})
		.await;
	let token = broker.get_valid_token(&bob).await.expect("Refresh should succeed.");

	assert_eq!(token.access_token.expose(), "access-new");
	assert_eq!(token.refresh_token.expose(), "refresh-new");
	assert!(token.expires_at > OffsetDateTime::now_utc() + Duration::minutes(29));

	let again = broker.get_valid_token(&bob).await.expect("Refreshed token should be reused.");

	assert_eq!(again, token);
	assert_eq!(broker.refresh_metrics.attempts(), 1);
	assert_eq!(broker.refresh_metrics.successes(), 1);

	mock.assert_calls_async(1).await;

	let stored = store
		.get_token_details(&bob)
		.await
		.expect("Store lookup should succeed.")
		.expect("Refreshed tokens should be persisted.");

	assert_eq!(stored, token);
}

#[tokio::test]
async fn concurrent_reads_share_a_single_refresh() {
	let server = MockServer::start_async().await;
	let (broker, store) = broker(&server);
	let carol = user("carol");

	seed(&store, &carol, expired_token("access-stale", "refresh-stale")).await;

	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(token_response("access-shared", "refresh-shared", 3600));
		})
		.await;
	let (first, second) = tokio::join!(broker.get_valid_token(&carol), broker.get_valid_token(&carol));
	let first = first.expect("First read should succeed.");
	let second = second.expect("Second read should succeed.");

	assert_eq!(first.access_token.expose(), "access-shared");
	assert_eq!(second, first);

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn refresh_keeps_previous_refresh_and_id_tokens_when_omitted() {
	let server = MockServer::start_async().await;
	let (broker, store) = broker(&server);
	let dave = user("dave");

	seed(&store, &dave, expired_token("access-old", "refresh-keep")).await;

	server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"access-rotated\",\"token_type\":\"bearer\",\"expires_in\":600}");
		})
		.await;

	let token = broker.get_valid_token(&dave).await.expect("Refresh should succeed.");

	assert_eq!(token.access_token.expose(), "access-rotated");
	assert_eq!(token.refresh_token.expose(), "refresh-keep");
	assert_eq!(token.id_token.expose(), "id-token-fixture");
	assert_eq!(token.scope, "openid accounts offline_access");
}

#[tokio::test]
async fn missing_tokens_require_authorization() {
	let server = MockServer::start_async().await;
	let (broker, _) = broker(&server);
	let err = broker
		.get_valid_token(&user("nobody"))
		.await
		.expect_err("Unknown users must be rejected.");

	assert!(matches!(err, Error::NotAuthorized { .. }));
	assert!(err.requires_authorization());
}

#[tokio::test]
async fn revoked_refresh_token_surfaces_invalid_grant() {
	let server = MockServer::start_async().await;
	let (broker, store) = broker(&server);
	let erin = user("erin");
	let stale = expired_token("access-old", "refresh-revoked");

	seed(&store, &erin, stale.clone()).await;

	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_grant\",\"error_description\":\"refresh token revoked\"}");
		})
		.await;
	let err = broker.get_valid_token(&erin).await.expect_err("Revoked refresh must fail.");

	mock.assert_async().await;

	assert!(matches!(err, Error::TokenRefresh(ProviderError::InvalidGrant { .. })));
	assert!(err.requires_authorization());
	assert_eq!(broker.refresh_metrics.failures(), 1);

	let stored = store
		.get_token_details(&erin)
		.await
		.expect("Store lookup should succeed.")
		.expect("Failed refresh must leave the stored entry untouched.");

	assert_eq!(stored, stale);
}

#[tokio::test]
async fn slow_token_endpoint_times_out_as_retryable_error() {
	let server = MockServer::start_async().await;
	let (broker, store) =
		broker_with_client(&server, test_http_client(std::time::Duration::from_millis(200)));
	let frank = user("frank");
	let stale = expired_token("access-old", "refresh-slow");

	seed(&store, &frank, stale.clone()).await;

	server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(token_response("access-late", "refresh-late", 3600))
				.delay(std::time::Duration::from_secs(2));
		})
		.await;

	let err = broker.get_valid_token(&frank).await.expect_err("Slow token endpoint must time out.");

	assert!(err.is_retryable());
	assert!(matches!(
		err,
		Error::TokenRefresh(ProviderError::Transient(TransientError::Endpoint {
			endpoint: ProviderEndpoint::Token,
			..
		}))
	));
	assert_eq!(broker.refresh_metrics.failures(), 1);

	let stored = store
		.get_token_details(&frank)
		.await
		.expect("Store lookup should succeed.")
		.expect("Timed-out refresh must leave the stored entry untouched.");

	assert_eq!(stored, stale);
}

#[tokio::test]
async fn purge_expired_removes_only_expired_entries() {
	let server = MockServer::start_async().await;
	let (broker, store) = broker(&server);

	seed(&store, &user("expired-1"), expired_token("a1", "r1")).await;
	seed(&store, &user("expired-2"), expired_token("a2", "r2")).await;
	seed(&store, &user("fresh"), fresh_token("a3")).await;

	let removed = broker.purge_expired().await.expect("Purge should succeed.");

	assert_eq!(removed, 2);
	assert_eq!(store.len(), 1);
	assert!(!broker.should_authorize(&user("fresh")).await.expect("Lookup should succeed."));
	assert!(broker.should_authorize(&user("expired-1")).await.expect("Lookup should succeed."));
}
