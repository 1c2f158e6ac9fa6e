//! Provider-facing descriptors (data) and strategies (behavior).
//!
//! `descriptor` exposes validated endpoint metadata for the provider's authorization,
//! token, and data API endpoints. `strategy` defines [`ProviderStrategy`], an
//! HTTP-client-agnostic hook used by flows to augment outgoing token requests and map
//! error responses into the broker error taxonomy.

pub mod descriptor;
pub mod strategy;

pub use descriptor::*;
pub use strategy::*;
