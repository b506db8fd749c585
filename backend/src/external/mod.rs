//! External service integrations

pub mod identity;

pub use identity::{IdentityError, IdentityProvider, JwtIdentityProvider, VerifiedIdentity};
