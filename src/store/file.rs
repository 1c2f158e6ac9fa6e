//! Simple file-backed [`TokenStore`] for single-process deployments and demos.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{TokenDetails, UserId},
	store::{StoreError, StoreFuture, TokenStore},
};

/// On-disk row: one per user, with the expiry stored as unix seconds.
#[derive(Debug, Serialize, Deserialize)]
struct StoredToken {
	user: UserId,
	id_token: String,
	access_token: String,
	expires_at: i64,
	token_type: String,
	refresh_token: String,
	scope: String,
}
impl StoredToken {
	fn from_details(user: &UserId, details: &TokenDetails) -> Self {
		Self {
			user: user.clone(),
			id_token: details.id_token.expose().to_owned(),
			access_token: details.access_token.expose().to_owned(),
			expires_at: details.expires_at_unix(),
			token_type: details.token_type.clone(),
			refresh_token: details.refresh_token.expose().to_owned(),
			scope: details.scope.clone(),
		}
	}

	fn into_entry(self) -> Result<(UserId, TokenDetails), StoreError> {
		let expires_at = OffsetDateTime::from_unix_timestamp(self.expires_at).map_err(|e| {
			StoreError::Serialization {
				message: format!("Stored expiry for {} is out of range: {e}", self.user),
			}
		})?;
		let details = TokenDetails::builder()
			.id_token(self.id_token)
			.access_token(self.access_token)
			.refresh_token(self.refresh_token)
			.token_type(self.token_type)
			.scope(self.scope)
			.expires_at(expires_at)
			.build()
			.map_err(|e| StoreError::Serialization {
				message: format!("Stored token for {} is invalid: {e}", self.user),
			})?;

		Ok((self.user, details))
	}
}

/// Persists token details to a JSON file after each mutation.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<HashMap<UserId, TokenDetails>>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Location of the backing file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<HashMap<UserId, TokenDetails>, StoreError> {
		if !path.exists() {
			return Ok(HashMap::new());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.is_empty() {
			return Ok(HashMap::new());
		}

		let rows: Vec<StoredToken> =
			serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
				message: format!("Failed to parse {}: {e}", path.display()),
			})?;

		rows.into_iter().map(StoredToken::into_entry).collect()
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, contents: &HashMap<UserId, TokenDetails>) -> Result<(), StoreError> {
		let mut rows = contents
			.iter()
			.map(|(user, details)| StoredToken::from_details(user, details))
			.collect::<Vec<_>>();

		rows.sort_by(|a, b| a.user.as_ref().cmp(b.user.as_ref()));

		let serialized = serde_json::to_vec_pretty(&rows).map_err(|e| {
			StoreError::Serialization { message: format!("Failed to serialize store rows: {e}") }
		})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl TokenStore for FileStore {
	fn get_token_details<'a>(&'a self, user: &'a UserId) -> StoreFuture<'a, Option<TokenDetails>> {
		Box::pin(async move { Ok(self.inner.read().get(user).cloned()) })
	}

	fn set_token_details<'a>(
		&'a self,
		user: &'a UserId,
		details: TokenDetails,
	) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();
			let mut next = guard.clone();

			next.insert(user.clone(), details);
			self.persist_locked(&next)?;

			*guard = next;

			Ok(())
		})
	}

	fn delete_expired_tokens(&self, now: OffsetDateTime) -> StoreFuture<'_, usize> {
		Box::pin(async move {
			let mut guard = self.inner.write();
			let mut next = guard.clone();

			next.retain(|_, details| !details.is_expired_at(now));

			let removed = guard.len() - next.len();

			if removed > 0 {
				self.persist_locked(&next)?;

				*guard = next;
			}

			Ok(removed)
		})
	}
}
