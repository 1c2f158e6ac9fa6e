//! Per-user token storage contract and built-in implementations.
//!
//! The broker only relies on [`TokenStore`]; any backend (SQL, key-value, remote) can be
//! plugged in. Writes for one user must be atomic relative to reads for the same user so a
//! refresh never resurrects a stale token. The broker additionally serializes its own
//! read-refresh-write sequence per user.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{TokenDetails, UserId},
};

/// Boxed future returned by [`TokenStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Durable storage of the latest [`TokenDetails`] per user.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Returns the stored token details for `user`; absence is not an error.
	fn get_token_details<'a>(&'a self, user: &'a UserId) -> StoreFuture<'a, Option<TokenDetails>>;

	/// Inserts or fully replaces the token details for `user`.
	fn set_token_details<'a>(
		&'a self,
		user: &'a UserId,
		details: TokenDetails,
	) -> StoreFuture<'a, ()>;

	/// Deletes every entry whose `expires_at` is at or before `now`; returns how many went.
	fn delete_expired_tokens(&self, now: OffsetDateTime) -> StoreFuture<'_, usize>;
}

/// Error type produced by [`TokenStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Stored data could not be encoded or decoded.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;
	use crate::error::Error;

	#[test]
	fn store_error_converts_into_broker_error_with_source() {
		let store_error = StoreError::Backend { message: "database unreachable".into() };
		let broker_error: Error = store_error.clone().into();

		assert!(matches!(broker_error, Error::Storage(_)));
		assert!(broker_error.to_string().contains("database unreachable"));

		let source = StdError::source(&broker_error)
			.expect("Broker error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}
}
