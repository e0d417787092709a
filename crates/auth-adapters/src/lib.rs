//! # auth-adapters
//!
//! Implementations of the `AuthProvider` port. Password hashing is always
//! compiled; bearer tokens sit behind the `auth-jwt` feature.

pub mod password;

#[cfg(feature = "auth-jwt")]
pub mod jwt;

pub use password::Argon2Hasher;

#[cfg(feature = "auth-jwt")]
pub use jwt::JwtAuthProvider;
