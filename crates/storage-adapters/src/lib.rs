//! # storage-adapters
//!
//! Repository implementations. The in-memory store is always available; the
//! PostgreSQL store is compiled with the `db-postgres` feature.

pub mod memory;

#[cfg(feature = "db-postgres")]
pub mod postgres;

pub use memory::InMemoryStore;

#[cfg(feature = "db-postgres")]
pub use postgres::PgStore;
