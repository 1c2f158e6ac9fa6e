mod common;

// std
use std::{
	error::Error as StdError,
	fmt::{Display, Formatter, Result as FmtResult},
	future::Future,
	pin::Pin,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
};
// crates.io
use parking_lot::Mutex;
use time::{Duration, OffsetDateTime};
use url::Url;
// self
use stitch_broker::{
	auth::{TokenDetails, UserId},
	error::{ApiError, Error, ProviderError, TransientError, TransportError},
	flows::Broker,
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	oauth::{
		TransportErrorMapper,
		oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse},
	},
	provider::{ProviderDescriptor, ProviderEndpoint},
	store::{MemoryStore, TokenStore},
};

#[derive(Debug)]
enum FakeTransportError {
	Throttled,
}
impl Display for FakeTransportError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Throttled => write!(f, "Transport throttled."),
		}
	}
}
impl StdError for FakeTransportError {}

#[derive(Clone)]
struct FakeHttpClient {
	retry_after: Duration,
	calls: Arc<AtomicUsize>,
}
impl FakeHttpClient {
	fn throttled(retry_after: Duration) -> Self {
		Self { retry_after, calls: Default::default() }
	}
}
impl TokenHttpClient for FakeHttpClient {
	type Handle = FakeHttpHandle;
	type TransportError = FakeTransportError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		FakeHttpHandle { slot, retry_after: self.retry_after, calls: self.calls.clone() }
	}
}

struct FakeHttpHandle {
	slot: ResponseMetadataSlot,
	retry_after: Duration,
	calls: Arc<AtomicUsize>,
}
impl<'a> AsyncHttpClient<'a> for FakeHttpHandle {
	type Error = HttpClientError<FakeTransportError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'a + Send + Sync>>;

	fn call(&'a self, _request: HttpRequest) -> Self::Future {
		let slot = self.slot.clone();
		let retry_after = self.retry_after;

		self.calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async move {
			assert!(
				slot.take().is_none(),
				"ResponseMetadataSlot must be clear before dispatching a request."
			);
			slot.store(ResponseMetadata { status: Some(429), retry_after: Some(retry_after) });

			Err(HttpClientError::Reqwest(Box::new(FakeTransportError::Throttled)))
		})
	}
}

#[derive(Clone, Default)]
struct RecordingTransportErrorMapper {
	metadata: Arc<Mutex<Vec<(ProviderEndpoint, Option<ResponseMetadata>)>>>,
}
impl RecordingTransportErrorMapper {
	fn recorded(&self) -> Vec<(ProviderEndpoint, Option<ResponseMetadata>)> {
		self.metadata.lock().clone()
	}
}
impl TransportErrorMapper<FakeTransportError> for RecordingTransportErrorMapper {
	fn map_transport_error(
		&self,
		endpoint: ProviderEndpoint,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<FakeTransportError>,
	) -> ProviderError {
		let status = meta.and_then(|value| value.status);
		let retry_after = meta.and_then(|value| value.retry_after);

		self.metadata.lock().push((endpoint, meta.cloned()));

		match err {
			HttpClientError::Reqwest(inner) => TransientError::Endpoint {
				endpoint,
				message: format!("Fake transport error: {inner}"),
				status,
				retry_after,
			}
			.into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			other => TransientError::Endpoint {
				endpoint,
				message: format!("Unhandled HTTP client error: {other:?}"),
				status,
				retry_after,
			}
			.into(),
		}
	}
}

type FakeBroker = Broker<FakeHttpClient, RecordingTransportErrorMapper>;

fn build_broker(
	http_client: FakeHttpClient,
	mapper: RecordingTransportErrorMapper,
) -> (FakeBroker, Arc<MemoryStore>) {
	let descriptor = ProviderDescriptor::builder()
		.authorization_endpoint(
			Url::parse("https://mock.example.com/connect/authorize")
				.expect("Mock authorization endpoint should parse."),
		)
		.token_endpoint(
			Url::parse("https://mock.example.com/connect/token")
				.expect("Mock token endpoint should parse."),
		)
		.api_endpoint(
			Url::parse("https://mock.example.com/graphql").expect("Mock API endpoint should parse."),
		)
		.build()
		.expect("Mock descriptor should build.");
	let store_backend = Arc::new(MemoryStore::default());
	let store: Arc<dyn TokenStore> = store_backend.clone();
	let broker = Broker::with_http_client(
		store,
		descriptor,
		common::CLIENT_ID,
		Url::parse(common::REDIRECT_URI).expect("Redirect URI should parse."),
		common::signer(),
		http_client,
		mapper,
	);

	(broker, store_backend)
}

fn stale_token() -> TokenDetails {
	common::token("access-stale", "refresh-stale", OffsetDateTime::now_utc() - Duration::minutes(1))
}

fn user() -> UserId {
	common::user("throttled-user")
}

#[tokio::test]
async fn throttled_refresh_surfaces_retry_after() {
	let http_client = FakeHttpClient::throttled(Duration::seconds(5));
	let mapper = RecordingTransportErrorMapper::default();
	let (broker, store) = build_broker(http_client.clone(), mapper.clone());

	common::seed(&store, &user(), stale_token()).await;

	let err = broker.get_valid_token(&user()).await.expect_err("Refresh should be throttled.");

	match err {
		Error::TokenRefresh(ProviderError::Transient(TransientError::Endpoint {
			endpoint,
			status,
			retry_after,
			..
		})) => {
			assert_eq!(endpoint, ProviderEndpoint::Token);
			assert_eq!(status, Some(429));
			assert_eq!(retry_after, Some(Duration::seconds(5)));
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}

	assert_eq!(http_client.calls.load(Ordering::SeqCst), 1);
	assert_eq!(broker.refresh_metrics.failures(), 1);
}

#[tokio::test]
async fn api_failures_are_mapped_with_the_api_endpoint() {
	let http_client = FakeHttpClient::throttled(Duration::seconds(30));
	let mapper = RecordingTransportErrorMapper::default();
	let (broker, store) = build_broker(http_client, mapper.clone());

	common::seed(&store, &user(), common::fresh_token("access-live")).await;

	let err = broker.get_bank_accounts(&user()).await.expect_err("API call should be throttled.");

	assert!(err.is_retryable());
	assert!(matches!(err, Error::Api(ApiError::Provider(ProviderError::Transient(_)))));

	let recorded = mapper.recorded();

	assert_eq!(recorded.len(), 1);
	assert_eq!(recorded[0].0, ProviderEndpoint::Api);
	assert_eq!(recorded[0].1.as_ref().and_then(|meta| meta.retry_after), Some(Duration::seconds(30)));
}
