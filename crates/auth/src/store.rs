//! Storage contract for the authorization graph.

use async_trait::async_trait;
use thiserror::Error;

use warden_core::{DomainError, PermissionId, RoleId, UserId};

use crate::{NewPermission, NewRole, Permission, PermissionUpdate, Role, RoleUpdate};

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage operation error.
///
/// `NotFound`, `Conflict` and `Validation` are surfaced to callers unchanged;
/// `Backend` wraps infrastructure failures (connection loss, poisoned locks).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn role_not_found(id: RoleId) -> Self {
        Self::NotFound(format!("role {id}"))
    }

    pub fn permission_not_found(id: PermissionId) -> Self {
        Self::NotFound(format!("permission {id}"))
    }

    pub fn role_name_taken(name: &str) -> Self {
        Self::Conflict(format!("role '{name}' already exists"))
    }

    pub fn permission_name_taken(name: &str) -> Self {
        Self::Conflict(format!("permission '{name}' already exists"))
    }
}

impl From<DomainError> for StoreError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => Self::Validation(msg),
            DomainError::NotFound(msg) => Self::NotFound(msg),
            DomainError::Conflict(msg) => Self::Conflict(msg),
        }
    }
}

/// Durable store for roles, permissions and their assignment edges.
///
/// Every method is one logical transaction. Implementations must:
/// - enforce unique role and permission names atomically
/// - keep at most one edge per `(role, permission)` and `(user, role)` pair
/// - delete a role or permission together with every edge referencing it in a
///   single commit
///
/// Inputs are expected to be validated already (see `NewRole::validate` and
/// friends); the service layer takes care of that.
#[async_trait]
pub trait AuthorizationStore: Send + Sync {
    /// Fails `Conflict` if the name is taken.
    async fn create_role(&self, new: NewRole) -> StoreResult<Role>;

    async fn get_role(&self, id: RoleId) -> StoreResult<Role>;

    async fn find_role_by_name(&self, name: &str) -> StoreResult<Option<Role>>;

    async fn list_roles(&self) -> StoreResult<Vec<Role>>;

    async fn update_role(&self, id: RoleId, update: RoleUpdate) -> StoreResult<Role>;

    /// Returns `false` if the role did not exist.
    async fn delete_role(&self, id: RoleId) -> StoreResult<bool>;

    /// Fails `Conflict` if the name is taken.
    async fn create_permission(&self, new: NewPermission) -> StoreResult<Permission>;

    async fn get_permission(&self, id: PermissionId) -> StoreResult<Permission>;

    async fn find_permission_by_name(&self, name: &str) -> StoreResult<Option<Permission>>;

    async fn list_permissions(&self) -> StoreResult<Vec<Permission>>;

    async fn update_permission(
        &self,
        id: PermissionId,
        update: PermissionUpdate,
    ) -> StoreResult<Permission>;

    /// Returns `false` if the permission did not exist.
    async fn delete_permission(&self, id: PermissionId) -> StoreResult<bool>;

    /// `false` when either endpoint is missing or the edge already exists.
    async fn assign_permission_to_role(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> StoreResult<bool>;

    /// `false` when the edge does not exist.
    async fn remove_permission_from_role(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> StoreResult<bool>;

    /// `false` when the role is missing or the edge already exists.
    async fn assign_role_to_user(&self, user_id: UserId, role_id: RoleId) -> StoreResult<bool>;

    /// `false` when the edge does not exist.
    async fn remove_role_from_user(&self, user_id: UserId, role_id: RoleId) -> StoreResult<bool>;

    /// Fails `NotFound` if the role does not exist.
    async fn get_role_permissions(&self, role_id: RoleId) -> StoreResult<Vec<Permission>>;

    async fn get_user_roles(&self, user_id: UserId) -> StoreResult<Vec<Role>>;

    /// Deduplicated union of the permissions of every role the user holds.
    async fn get_user_permissions(&self, user_id: UserId) -> StoreResult<Vec<Permission>>;

    /// Graph-only check; the superuser bypass lives in the service.
    async fn has_permission(&self, user_id: UserId, resource: &str, action: &str) -> StoreResult<bool> {
        Ok(self
            .get_user_permissions(user_id)
            .await?
            .iter()
            .any(|p| p.matches(resource, action)))
    }
}
