//! Token lifecycle: lazy refresh on read and expired-entry maintenance.
//!
//! [`Broker::get_valid_token`] serializes per user, so concurrent callers for the same user
//! trigger at most one `grant_type=refresh_token` call and all observe the persisted result.

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::{TokenDetails, UserId},
	flows::{Broker, common},
	http::TokenHttpClient,
	oauth::{OAuth2Facade, RefreshExchange, TransportErrorMapper},
	obs::{self, FlowKind, FlowSpan},
	store::TokenStore,
};

impl<C, M> Broker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Returns non-expired token details for `user`, refreshing and persisting them first
	/// when needed.
	///
	/// Fails with [`Error::NotAuthorized`] when nothing is stored. Refresh failures surface as
	/// [`Error::TokenRefresh`]; no retry is attempted.
	pub async fn get_valid_token(&self, user: &UserId) -> Result<TokenDetails> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "get_valid_token", user);

		obs::observe(KIND, span, async move {
			let guard = common::flow_guard(self, user);
			let _singleflight = guard.lock().await;
			let current = <dyn TokenStore>::get_token_details(self.store.as_ref(), user)
				.await?
				.ok_or_else(|| Error::NotAuthorized { user: user.clone() })?;

			if !current.is_expired_at(OffsetDateTime::now_utc() + self.expiry_leeway) {
				self.refresh_metrics.record_reuse();

				return Ok(current);
			}

			self.refresh_metrics.record_attempt();

			let refreshed = self.refresh(user, &current).await.inspect_err(|_| {
				self.refresh_metrics.record_failure();
			})?;

			self.refresh_metrics.record_success();

			Ok(refreshed)
		})
		.await
	}

	/// Deletes stored tokens whose expiry has passed and drops stale pending authorizations
	/// along with idle per-user guards.
	///
	/// Returns the number of token entries removed. Intended for a periodic job.
	pub async fn purge_expired(&self) -> Result<usize> {
		let now = OffsetDateTime::now_utc();

		self.pending.purge_expired(now);
		common::prune_flow_guards(self);

		Ok(<dyn TokenStore>::delete_expired_tokens(self.store.as_ref(), now).await?)
	}

	async fn refresh(&self, user: &UserId, current: &TokenDetails) -> Result<TokenDetails> {
		let client_assertion = common::client_assertion(self)?;
		let facade = common::token_facade(self)?;
		let refreshed = facade
			.refresh_token(RefreshExchange {
				strategy: self.strategy.as_ref(),
				previous: current,
				client_assertion: &client_assertion,
			})
			.await
			.map_err(Error::TokenRefresh)?;

		<dyn TokenStore>::set_token_details(self.store.as_ref(), user, refreshed.clone()).await?;

		Ok(refreshed)
	}
}
