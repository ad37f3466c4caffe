//! `warden-core` — identifiers and error model shared by every warden crate.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{PermissionId, RoleId, UserId};
