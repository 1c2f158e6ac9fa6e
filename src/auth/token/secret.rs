//! Secret wrapper that keeps provider-issued tokens out of logs.

// self
use crate::_prelude::*;

const PREVIEW_CHARS: usize = 5;

/// Redacted token secret wrapper keeping sensitive material out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns the first few characters of the secret, enough to tell tokens apart in logs.
	pub fn preview(&self) -> &str {
		match self.0.char_indices().nth(PREVIEW_CHARS) {
			Some((idx, _)) => &self.0[..idx],
			None => &self.0,
		}
	}

	/// Returns `true` when the wrapped value is empty.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn secret_formatters_redact() {
		let secret = TokenSecret::new("super-secret");

		assert_eq!(format!("{secret:?}"), "TokenSecret(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
	}

	#[test]
	fn preview_respects_char_boundaries() {
		assert_eq!(TokenSecret::new("eyJhbGciOi").preview(), "eyJhb");
		assert_eq!(TokenSecret::new("abc").preview(), "abc");
		assert_eq!(TokenSecret::new("ééééééé").preview(), "ééééé");
	}
}
