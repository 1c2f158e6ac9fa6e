//! Authorization Code + PKCE flow.
//!
//! [`Broker::initiate_authorization`] issues a redirect URL carrying a random `state`,
//! `nonce`, and S256 PKCE challenge and remembers `{state, verifier}` for the user. When the
//! provider redirects back, [`Broker::complete_authorization`] consumes that entry, checks
//! the returned `state`, and exchanges the code (plus verifier and a signed client
//! assertion) for [`TokenDetails`], which are written to the token store.
//!
//! A user has at most one pending authorization; initiating again replaces the previous
//! one, and completion removes it whether or not the exchange succeeds.

pub mod pending;
pub mod pkce;

pub use pending::*;
pub use pkce::*;

// self
use crate::{
	_prelude::*,
	auth::{TokenDetails, UserId},
	flows::{Broker, common},
	http::TokenHttpClient,
	oauth::{CodeExchange, OAuth2Facade, TransportErrorMapper},
	obs::{self, FlowKind, FlowSpan},
	provider::ProviderDescriptor,
	store::TokenStore,
};

/// Scopes requested on every authorization.
pub const REQUESTED_SCOPE: &str = "openid accounts offline_access";

impl<C, M> Broker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Returns `true` when the store holds no token details for `user`.
	///
	/// Expiry is not considered: an expired token can still be refreshed.
	pub async fn should_authorize(&self, user: &UserId) -> Result<bool> {
		let details = <dyn TokenStore>::get_token_details(self.store.as_ref(), user).await?;

		Ok(details.is_none())
	}

	/// Builds the provider authorization URL for `user` and records the pending request.
	///
	/// Any earlier pending request for the same user is discarded. No network I/O happens.
	pub fn initiate_authorization(&self, user: &UserId) -> Url {
		let state = generate_random_token();
		let nonce = generate_random_token();
		let pkce = PkcePair::generate();
		let url = build_authorization_url(
			&self.descriptor,
			&self.client_id,
			&self.redirect_uri,
			&nonce,
			&state,
			&pkce,
		);
		let pending =
			PendingAuthorization::new(state, nonce, pkce.verifier, OffsetDateTime::now_utc());

		self.pending.insert(user.clone(), pending);

		url
	}

	/// Completes the redirect round trip for `user`.
	///
	/// Fails with [`Error::FlowState`] when no live pending request exists and with
	/// [`Error::AntiCsrf`] when `returned_state` does not match; neither case reaches the
	/// network. Token endpoint failures surface as [`Error::TokenExchange`].
	pub async fn complete_authorization(
		&self,
		user: &UserId,
		code: &str,
		returned_state: &str,
	) -> Result<TokenDetails> {
		const KIND: FlowKind = FlowKind::AuthorizationCode;

		let span = FlowSpan::new(KIND, "complete_authorization", user);

		obs::observe(KIND, span, async move {
			let pending = self
				.pending
				.take(user, OffsetDateTime::now_utc())
				.ok_or_else(|| Error::FlowState { user: user.clone() })?;

			if !pending.validate_state(returned_state) {
				return Err(Error::AntiCsrf { user: user.clone() });
			}

			let client_assertion = common::client_assertion(self)?;
			let facade = common::token_facade(self)?;
			let guard = common::flow_guard(self, user);
			let _singleflight = guard.lock().await;
			let details = facade
				.exchange_authorization_code(CodeExchange {
					strategy: self.strategy.as_ref(),
					code,
					code_verifier: pending.code_verifier(),
					client_assertion: &client_assertion,
				})
				.await
				.map_err(Error::TokenExchange)?;

			<dyn TokenStore>::set_token_details(self.store.as_ref(), user, details.clone()).await?;

			Ok(details)
		})
		.await
	}

	/// Drops the pending authorization for `user`; returns `true` when one existed.
	pub fn cancel_authorization(&self, user: &UserId) -> bool {
		self.pending.remove(user)
	}

	/// Returns `true` when `user` has a live pending authorization.
	pub fn has_pending_authorization(&self, user: &UserId) -> bool {
		self.pending.contains(user, OffsetDateTime::now_utc())
	}
}

fn build_authorization_url(
	descriptor: &ProviderDescriptor,
	client_id: &str,
	redirect_uri: &Url,
	nonce: &str,
	state: &str,
	pkce: &PkcePair,
) -> Url {
	let mut url = descriptor.endpoints.authorization.clone();

	url.query_pairs_mut()
		.append_pair("client_id", client_id)
		.append_pair("scope", REQUESTED_SCOPE)
		.append_pair("response_type", "code")
		.append_pair("redirect_uri", redirect_uri.as_str())
		.append_pair("nonce", nonce)
		.append_pair("state", state)
		.append_pair("code_challenge", &pkce.challenge)
		.append_pair("code_challenge_method", pkce.method.as_str());

	url
}
