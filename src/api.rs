//! GraphQL request and response shapes for the provider's data API.
//!
//! Only bank-account listing is modeled. [`bank_accounts_request`] builds the HTTP request
//! and [`parse_bank_accounts`] turns the raw response into [`BankAccount`] values or an
//! [`ApiError`].

// crates.io
use oauth2::{
	HttpRequest,
	http::{
		Method,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
	},
};
use serde::de::{self, Deserializer};
// self
use crate::{
	_prelude::*,
	auth::TokenDetails,
	error::{ApiError, ConfigError},
};

/// Fixed query listing the user's bank accounts.
pub const BANK_ACCOUNTS_QUERY: &str = "query ListBankAccounts {
  user {
    bankAccounts {
      name
      currency
      branchCode
      bankId
      accountType
      accountNumber
      supportsPaymentInitiation
    }
  }
}";

const JSON: &str = "application/json";

/// Bank account projection returned by the data API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankAccount {
	/// Account display name.
	pub name: String,
	/// ISO 4217 currency code.
	pub currency: String,
	/// Branch code; the API may send it as a string or a number.
	#[serde(deserialize_with = "branch_code")]
	pub branch_code: i64,
	/// Provider identifier of the bank.
	pub bank_id: String,
	/// Account type (e.g. `current`).
	pub account_type: String,
	/// Account number.
	pub account_number: String,
	/// Whether payments can be initiated from this account.
	pub supports_payment_initiation: bool,
}

/// JSON body posted to the GraphQL endpoint.
#[derive(Clone, Debug, Serialize)]
pub struct GraphQlRequest<'a> {
	/// GraphQL document.
	pub query: &'a str,
	/// Query variables; serialized as `null` when absent.
	pub variables: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct GraphQlEnvelope {
	#[serde(default)]
	data: Option<serde_json::Value>,
	#[serde(default)]
	errors: Option<Vec<GraphQlError>>,
}

#[derive(Deserialize)]
struct GraphQlError {
	#[serde(default)]
	message: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BankAccountsData {
	user: BankAccountsUser,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BankAccountsUser {
	bank_accounts: Vec<BankAccount>,
}

/// Builds the authenticated POST for [`BANK_ACCOUNTS_QUERY`].
pub fn bank_accounts_request(endpoint: &Url, token: &TokenDetails) -> Result<HttpRequest, ConfigError> {
	let body = serde_json::to_vec(&GraphQlRequest { query: BANK_ACCOUNTS_QUERY, variables: None })
		.map_err(ConfigError::RequestEncode)?;

	oauth2::http::Request::builder()
		.method(Method::POST)
		.uri(endpoint.as_str())
		.header(AUTHORIZATION, format!("Bearer {}", token.access_token.expose()))
		.header(CONTENT_TYPE, JSON)
		.header(ACCEPT, JSON)
		.body(body)
		.map_err(ConfigError::from)
}

/// Interprets a data API response.
///
/// Succeeds only on HTTP 200 without a populated `errors` array. Any other outcome is an
/// [`ApiError::Rejected`] carrying the status and the first reported message.
pub fn parse_bank_accounts(status: u16, body: &[u8]) -> Result<Vec<BankAccount>, ApiError> {
	let mut de = serde_json::Deserializer::from_slice(body);
	let envelope: GraphQlEnvelope = match serde_path_to_error::deserialize(&mut de) {
		Ok(envelope) => envelope,
		Err(_) if status != 200 => return Err(ApiError::Rejected { status, message: None }),
		Err(source) => return Err(ApiError::ResponseParse { source, status }),
	};
	let errors = envelope.errors.unwrap_or_default();

	if status != 200 || !errors.is_empty() {
		let message = errors.into_iter().find_map(|error| error.message);

		return Err(ApiError::Rejected { status, message });
	}

	let data = envelope.data.unwrap_or(serde_json::Value::Null);
	let parsed: BankAccountsData = serde_path_to_error::deserialize(data)
		.map_err(|source| ApiError::ResponseParse { source, status })?;

	Ok(parsed.user.bank_accounts)
}

fn branch_code<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
	D: Deserializer<'de>,
{
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Raw {
		Number(i64),
		Text(String),
	}

	match Raw::deserialize(deserializer)? {
		Raw::Number(value) => Ok(value),
		Raw::Text(text) => text
			.trim()
			.parse()
			.map_err(|_| de::Error::custom(format!("branch code `{text}` is not an integer"))),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const ACCOUNTS: &str = r#"{
		"data": {
			"user": {
				"bankAccounts": [
					{
						"name": "FNB Cheque",
						"currency": "ZAR",
						"branchCode": "250655",
						"bankId": "fnb",
						"accountType": "current",
						"accountNumber": "62000000001",
						"supportsPaymentInitiation": true
					},
					{
						"name": "Savings",
						"currency": "ZAR",
						"branchCode": 198765,
						"bankId": "nedbank",
						"accountType": "savings",
						"accountNumber": "1000000002",
						"supportsPaymentInitiation": false
					}
				]
			}
		}
	}"#;

	fn token() -> TokenDetails {
		TokenDetails::builder()
			.id_token("id")
			.access_token("access-123")
			.refresh_token("refresh")
			.token_type("Bearer")
			.scope("openid accounts")
			.expires_in(Duration::minutes(5))
			.build()
			.expect("Token fixture should build.")
	}

	#[test]
	fn request_carries_bearer_token_and_query() {
		let endpoint = Url::parse("https://api.stitch.money/graphql").expect("Endpoint should parse.");
		let request = bank_accounts_request(&endpoint, &token()).expect("Request should build.");

		assert_eq!(request.method(), &Method::POST);
		assert_eq!(request.uri(), "https://api.stitch.money/graphql");
		assert_eq!(
			request.headers().get(AUTHORIZATION).and_then(|value| value.to_str().ok()),
			Some("Bearer access-123")
		);

		let body: serde_json::Value =
			serde_json::from_slice(request.body()).expect("Body should be JSON.");

		assert_eq!(body["query"], BANK_ACCOUNTS_QUERY);
		assert!(body["variables"].is_null());
		assert!(body.as_object().is_some_and(|object| object.contains_key("variables")));
	}

	#[test]
	fn accounts_are_mapped_field_for_field() {
		let accounts =
			parse_bank_accounts(200, ACCOUNTS.as_bytes()).expect("Fixture should parse.");

		assert_eq!(accounts.len(), 2);
		assert_eq!(accounts[0].branch_code, 250655);
		assert_eq!(accounts[0].account_number, "62000000001");
		assert!(accounts[0].supports_payment_initiation);
		assert_eq!(accounts[1].branch_code, 198765);
		assert_eq!(accounts[1].bank_id, "nedbank");
	}

	#[test]
	fn errors_array_is_rejected_even_on_200() {
		let err = parse_bank_accounts(200, br#"{"data":null,"errors":[{"message":"boom"}]}"#)
			.expect_err("Populated errors must be rejected.");

		assert_eq!(err.status(), Some(200));
		assert_eq!(err.message(), Some("boom"));
	}

	#[test]
	fn non_200_status_is_rejected() {
		let err = parse_bank_accounts(401, br#"{"errors":[{"message":"invalid token"}]}"#)
			.expect_err("401 must be rejected.");

		assert!(matches!(err, ApiError::Rejected { status: 401, .. }));
		assert_eq!(err.message(), Some("invalid token"));

		let err = parse_bank_accounts(502, b"<html>Bad Gateway</html>")
			.expect_err("Non-JSON failures must be rejected.");

		assert!(matches!(err, ApiError::Rejected { status: 502, message: None }));
		assert!(err.is_retryable());
	}

	#[test]
	fn malformed_success_reports_the_path() {
		let err = parse_bank_accounts(
			200,
			br#"{"data":{"user":{"bankAccounts":[{"name":"x","currency":"ZAR","branchCode":"abc","bankId":"b","accountType":"t","accountNumber":"1","supportsPaymentInitiation":true}]}}}"#,
		)
		.expect_err("Bad branch code must be rejected.");

		match err {
			ApiError::ResponseParse { source, status } => {
				assert_eq!(status, 200);
				assert!(source.path().to_string().starts_with("user.bankAccounts[0]"));
			},
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}
}
