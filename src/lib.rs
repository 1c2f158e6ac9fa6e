//! Authorization Code + PKCE client for the Stitch API with `private_key_jwt` client
//! assertions, per-user token lifecycle, and bank-account retrieval.
//!
//! The [`flows::Broker`] is the single entry point. It asks a [`store::TokenStore`] whether a
//! user already authorized, issues PKCE-protected authorization URLs, validates the returned
//! `state`, exchanges codes for [`auth::TokenDetails`], refreshes expired tokens, and calls the
//! provider's GraphQL API on the user's behalf. Every outbound request goes through an
//! [`http::TokenHttpClient`], so the transport can be swapped for tests or custom stacks.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod api;
pub mod auth;
pub mod error;
pub mod flows;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod provider;
pub mod store;

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
