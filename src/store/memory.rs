//! Thread-safe in-memory [`TokenStore`] for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{TokenDetails, UserId},
	store::{StoreFuture, TokenStore},
};

type StoreMap = Arc<RwLock<HashMap<UserId, TokenDetails>>>;

/// Keeps token details in-process; clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Number of users with stored token details.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn purge_now(map: StoreMap, now: OffsetDateTime) -> usize {
		let mut guard = map.write();
		let before = guard.len();

		guard.retain(|_, details| !details.is_expired_at(now));

		before - guard.len()
	}
}
impl TokenStore for MemoryStore {
	fn get_token_details<'a>(&'a self, user: &'a UserId) -> StoreFuture<'a, Option<TokenDetails>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().get(user).cloned()) })
	}

	fn set_token_details<'a>(
		&'a self,
		user: &'a UserId,
		details: TokenDetails,
	) -> StoreFuture<'a, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().insert(user.clone(), details);

			Ok(())
		})
	}

	fn delete_expired_tokens(&self, now: OffsetDateTime) -> StoreFuture<'_, usize> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::purge_now(map, now)) })
	}
}
