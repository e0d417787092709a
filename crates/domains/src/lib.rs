//! barter/crates/domains/src/lib.rs
//!
//! The central domain logic and interface definitions for the barter backend:
//! models, request validation, listing filters, the access policy and the
//! ports adapters plug into.

pub mod error;
pub mod filters;
pub mod models;
pub mod policy;
pub mod ports;
pub mod validation;

// Re-exporting for easier access in other crates
pub use error::*;
pub use filters::*;
pub use models::*;
pub use ports::*;
pub use validation::*;
