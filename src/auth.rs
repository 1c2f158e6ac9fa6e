//! Auth-domain identifiers, token models, and client assertion signing.

pub mod assertion;
pub mod id;
pub mod token;

pub use assertion::*;
pub use id::*;
pub use token::{details::*, secret::*};
