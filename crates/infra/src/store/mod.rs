//! Postgres implementations of the authorization storage traits.

pub mod identity;
pub mod postgres;

pub use identity::PostgresIdentityStore;
pub use postgres::PostgresAuthorizationStore;
