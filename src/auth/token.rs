//! Token value objects issued by the provider.

pub mod details;
pub mod secret;
