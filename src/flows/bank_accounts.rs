//! Data API call listing the user's bank accounts.

// crates.io
use oauth2::AsyncHttpClient;
// self
use crate::{
	_prelude::*,
	api::{self, BankAccount},
	auth::UserId,
	error::ApiError,
	flows::Broker,
	http::{ResponseMetadataSlot, TokenHttpClient},
	oauth::TransportErrorMapper,
	obs::{self, FlowKind, FlowSpan},
	provider::ProviderEndpoint,
};

impl<C, M> Broker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Lists the bank accounts linked to `user`, refreshing the access token first when it
	/// has expired.
	///
	/// Token problems surface exactly as from [`get_valid_token`](Self::get_valid_token);
	/// API rejections, including a 200 response with GraphQL `errors`, surface as
	/// [`Error::Api`].
	pub async fn get_bank_accounts(&self, user: &UserId) -> Result<Vec<BankAccount>> {
		const KIND: FlowKind = FlowKind::BankAccounts;

		let token = self.get_valid_token(user).await?;
		let span = FlowSpan::new(KIND, "get_bank_accounts", user);

		obs::observe(KIND, span, async move {
			let request = api::bank_accounts_request(&self.descriptor.endpoints.api, &token)?;
			let slot = ResponseMetadataSlot::default();
			let handle = self.http_client.with_metadata(slot.clone());
			let response = handle.call(request).await.map_err(|err| {
				let meta = slot.take();

				ApiError::Provider(self.transport_mapper.map_transport_error(
					ProviderEndpoint::Api,
					meta.as_ref(),
					err,
				))
			})?;

			Ok(api::parse_bank_accounts(response.status().as_u16(), response.body())?)
		})
		.await
	}
}
