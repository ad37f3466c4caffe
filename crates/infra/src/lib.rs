//! Infrastructure for the authorization engine: environment configuration,
//! the Postgres connection pool and schema, and Postgres-backed stores.

pub mod config;
pub mod db;
pub mod store;

pub use config::{ConfigError, DatabaseConfig, SeedConfig};
pub use store::{PostgresAuthorizationStore, PostgresIdentityStore};
