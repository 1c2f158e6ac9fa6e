//! Provider descriptor data structures shared by all flows.

/// Builder API for assembling provider descriptors.
pub mod builder;
/// Grant identifiers used on token endpoint calls.
pub mod grant;

pub use builder::*;
pub use grant::*;

// self
use crate::_prelude::*;

/// Stitch authorization endpoint.
pub const STITCH_AUTHORIZATION_ENDPOINT: &str = "https://secure.stitch.money/connect/authorize";
/// Stitch token endpoint.
pub const STITCH_TOKEN_ENDPOINT: &str = "https://secure.stitch.money/connect/token";
/// Stitch GraphQL endpoint.
pub const STITCH_API_ENDPOINT: &str = "https://api.stitch.money/graphql";

/// Outbound endpoint a request was sent to; used to label failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderEndpoint {
	/// Token endpoint (code exchange and refresh).
	Token,
	/// Data API endpoint.
	Api,
}
impl ProviderEndpoint {
	/// Short label used in messages, spans, and metrics.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Token => "token",
			Self::Api => "api",
		}
	}
}
impl Display for ProviderEndpoint {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Endpoint set declared by a provider descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// Browser-facing authorization endpoint.
	pub authorization: Url,
	/// Token endpoint used for exchanges and refreshes; also the assertion audience.
	pub token: Url,
	/// GraphQL data API endpoint.
	pub api: Url,
}

/// Immutable provider descriptor consumed by flows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
	/// Endpoint definitions exposed by the provider.
	pub endpoints: ProviderEndpoints,
}
impl ProviderDescriptor {
	/// Creates a new, empty builder.
	pub fn builder() -> ProviderDescriptorBuilder {
		ProviderDescriptorBuilder::default()
	}

	/// Descriptor pointing at Stitch's production endpoints.
	pub fn stitch() -> Result<Self, ProviderDescriptorError> {
		Self::builder()
			.authorization_endpoint(parse_endpoint("authorization", STITCH_AUTHORIZATION_ENDPOINT)?)
			.token_endpoint(parse_endpoint("token", STITCH_TOKEN_ENDPOINT)?)
			.api_endpoint(parse_endpoint("api", STITCH_API_ENDPOINT)?)
			.build()
	}

	/// URL for the given outbound endpoint.
	pub fn endpoint(&self, endpoint: ProviderEndpoint) -> &Url {
		match endpoint {
			ProviderEndpoint::Token => &self.endpoints.token,
			ProviderEndpoint::Api => &self.endpoints.api,
		}
	}
}

fn parse_endpoint(endpoint: &'static str, raw: &str) -> Result<Url, ProviderDescriptorError> {
	Url::parse(raw).map_err(|source| ProviderDescriptorError::InvalidUrl { endpoint, source })
}
