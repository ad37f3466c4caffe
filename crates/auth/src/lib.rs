//! `warden-auth` — role-based authorization engine.
//!
//! Roles, permissions and their assignment edges, the service that answers
//! permission queries, and the guards that gate protected operations on it.
//! Storage and identity are reached only through the [`AuthorizationStore`]
//! and [`IdentityStore`] traits; in-memory implementations are provided for
//! tests/dev.

pub mod authorize;
pub mod in_memory;
pub mod permissions;
pub mod principal;
pub mod roles;
pub mod seed;
pub mod service;
pub mod store;

mod validation;

#[cfg(test)]
mod integration_tests;

pub use authorize::{AuthzError, CallContext, Enforcer, Guarded, Requirement};
pub use in_memory::InMemoryAuthorizationStore;
pub use permissions::{NewPermission, Permission, PermissionKey, PermissionType, PermissionUpdate};
pub use principal::{IdentityStore, InMemoryIdentityStore, Principal};
pub use roles::{NewRole, Role, RoleUpdate, RoleWithPermissions};
pub use seed::{PolicySeed, SeedReport};
pub use service::AuthorizationService;
pub use store::{AuthorizationStore, StoreError, StoreResult};
