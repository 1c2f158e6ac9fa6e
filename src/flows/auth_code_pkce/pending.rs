//! In-flight authorization requests keyed by user.

// crates.io
use subtle::ConstantTimeEq;
// self
use crate::{_prelude::*, auth::UserId};

const DEFAULT_TTL: Duration = Duration::minutes(10);

/// State recorded when an authorization URL is issued.
#[derive(Clone)]
pub struct PendingAuthorization {
	/// Anti-CSRF value that must come back on the redirect.
	pub state: String,
	/// OpenID Connect nonce sent with the authorization request.
	pub nonce: String,
	/// Instant the authorization URL was issued.
	pub created_at: OffsetDateTime,
	code_verifier: String,
}
impl PendingAuthorization {
	/// Records a new pending authorization.
	pub fn new(
		state: impl Into<String>,
		nonce: impl Into<String>,
		code_verifier: impl Into<String>,
		created_at: OffsetDateTime,
	) -> Self {
		Self {
			state: state.into(),
			nonce: nonce.into(),
			created_at,
			code_verifier: code_verifier.into(),
		}
	}

	/// PKCE verifier that must accompany the code exchange.
	pub fn code_verifier(&self) -> &str {
		&self.code_verifier
	}

	/// Compares the returned `state` in constant time.
	pub fn validate_state(&self, returned_state: &str) -> bool {
		self.state.as_bytes().ct_eq(returned_state.as_bytes()).into()
	}

	/// Returns `true` once `ttl` has elapsed since issuance.
	pub fn is_expired_at(&self, ttl: Duration, now: OffsetDateTime) -> bool {
		self.created_at + ttl <= now
	}
}
impl Debug for PendingAuthorization {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PendingAuthorization")
			.field("state", &self.state)
			.field("nonce", &self.nonce)
			.field("created_at", &self.created_at)
			.field("code_verifier", &"<redacted>")
			.finish()
	}
}

/// Lockable map holding at most one pending authorization per user.
///
/// Entries older than the configured TTL are treated as absent. Each broker owns one map
/// by default; share an instance across brokers with
/// [`Broker::with_pending_authorizations`](crate::flows::Broker::with_pending_authorizations).
#[derive(Debug)]
pub struct PendingAuthorizations {
	ttl: Duration,
	entries: Mutex<HashMap<UserId, PendingAuthorization>>,
}
impl PendingAuthorizations {
	/// Creates an empty map whose entries expire after `ttl`.
	pub fn new(ttl: Duration) -> Self {
		Self { ttl, entries: Default::default() }
	}

	/// Configured time-to-live.
	pub fn ttl(&self) -> Duration {
		self.ttl
	}

	/// Stores `pending` for `user`, returning the entry it replaced.
	pub fn insert(&self, user: UserId, pending: PendingAuthorization) -> Option<PendingAuthorization> {
		self.entries.lock().insert(user, pending)
	}

	/// Removes and returns the live entry for `user`.
	///
	/// Expired entries are removed as well but reported as absent.
	pub fn take(&self, user: &UserId, now: OffsetDateTime) -> Option<PendingAuthorization> {
		self.entries.lock().remove(user).filter(|pending| !pending.is_expired_at(self.ttl, now))
	}

	/// Drops any entry for `user`; returns `true` when one existed.
	pub fn remove(&self, user: &UserId) -> bool {
		self.entries.lock().remove(user).is_some()
	}

	/// Returns `true` when `user` has a live entry.
	pub fn contains(&self, user: &UserId, now: OffsetDateTime) -> bool {
		self.entries.lock().get(user).is_some_and(|pending| !pending.is_expired_at(self.ttl, now))
	}

	/// Drops expired entries and returns how many were removed.
	pub fn purge_expired(&self, now: OffsetDateTime) -> usize {
		let mut entries = self.entries.lock();
		let before = entries.len();

		entries.retain(|_, pending| !pending.is_expired_at(self.ttl, now));

		before - entries.len()
	}

	/// Number of stored entries, including expired ones not yet purged.
	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	/// Returns `true` when no entries are stored.
	pub fn is_empty(&self) -> bool {
		self.entries.lock().is_empty()
	}
}
impl Default for PendingAuthorizations {
	fn default() -> Self {
		Self::new(DEFAULT_TTL)
	}
}
