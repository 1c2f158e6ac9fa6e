//! Drives the Stitch authorization round trip from a terminal.
//!
//! Prints the authorization URL, waits for the redirect URL to be pasted back, completes the
//! exchange, and lists the linked bank accounts. Tokens persist in `STITCH_STORE` (default
//! `stitch-tokens.json`), so later runs go straight to the API call.
//!
//! ```sh
//! STITCH_CLIENT_ID=... STITCH_CERTIFICATE=./certificate.pem cargo run --example stitch_authorization
//! ```

// std
use std::{env, io, sync::Arc};
// crates.io
use color_eyre::{Result, eyre::eyre};
use url::Url;
// self
use stitch_broker::{
	auth::{ClientAssertionSigner, SigningKey, UserId},
	flows::Broker,
	provider::ProviderDescriptor,
	store::{FileStore, TokenStore},
};

const DEFAULT_REDIRECT_URI: &str = "http://localhost:8080/return";

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let client_id = env::var("STITCH_CLIENT_ID").map_err(|_| eyre!("STITCH_CLIENT_ID is not set"))?;
	let certificate =
		env::var("STITCH_CERTIFICATE").map_err(|_| eyre!("STITCH_CERTIFICATE is not set"))?;
	let redirect_uri = env::var("STITCH_REDIRECT_URI")
		.unwrap_or_else(|_| DEFAULT_REDIRECT_URI.into())
		.parse::<Url>()?;
	let store_path = env::var("STITCH_STORE").unwrap_or_else(|_| "stitch-tokens.json".into());
	let store: Arc<dyn TokenStore> = Arc::new(FileStore::open(store_path)?);
	let signer = ClientAssertionSigner::new(SigningKey::from_pem_file(certificate)?);
	let broker = Broker::new(store, ProviderDescriptor::stitch()?, client_id, redirect_uri, signer)?;
	let user = UserId::new("demo-user")?;

	if broker.should_authorize(&user).await? {
		println!("Send your user to {}.", broker.initiate_authorization(&user));
		println!("Paste the URL you were redirected to:");

		let mut line = String::new();

		io::stdin().read_line(&mut line)?;

		let redirect = Url::parse(line.trim())?;
		let query_value = |name: &str| {
			redirect
				.query_pairs()
				.find(|(key, _)| key == name)
				.map(|(_, value)| value.into_owned())
				.ok_or_else(|| eyre!("redirect URL has no `{name}` parameter"))
		};
		let details =
			broker.complete_authorization(&user, &query_value("code")?, &query_value("state")?).await?;

		println!("Authorized: {details}.");
	}

	for account in broker.get_bank_accounts(&user).await? {
		println!(
			"{} ({}) {} {} branch {}",
			account.name,
			account.account_type,
			account.currency,
			account.account_number,
			account.branch_code
		);
	}

	Ok(())
}
