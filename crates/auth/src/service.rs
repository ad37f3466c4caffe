//! Query/mutation API over the authorization graph.
//!
//! This is the single place the superuser bypass is implemented: the
//! enforcement guards and direct callers both go through it.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use warden_core::{PermissionId, RoleId, UserId};

use crate::authorize::CallContext;
use crate::store::{AuthorizationStore, StoreResult};
use crate::{
    IdentityStore, NewPermission, NewRole, Permission, PermissionKey, PermissionUpdate, Principal,
    Role, RoleUpdate, RoleWithPermissions,
};

/// Authorization service.
///
/// Holds explicit handles to the graph store and the identity store; both are
/// constructed once by the caller and shared. No permission state is cached:
/// every check re-reads the graph.
#[derive(Clone)]
pub struct AuthorizationService {
    store: Arc<dyn AuthorizationStore>,
    identity: Arc<dyn IdentityStore>,
}

impl core::fmt::Debug for AuthorizationService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthorizationService").finish_non_exhaustive()
    }
}

impl AuthorizationService {
    pub fn new(store: Arc<dyn AuthorizationStore>, identity: Arc<dyn IdentityStore>) -> Self {
        Self { store, identity }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Roles
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn create_role(&self, new: NewRole) -> StoreResult<Role> {
        let role = self.store.create_role(new.validate()?).await?;
        info!(role_id = %role.id, role = %role.name, "role created");
        Ok(role)
    }

    pub async fn get_role(&self, id: RoleId) -> StoreResult<Role> {
        self.store.get_role(id).await
    }

    pub async fn find_role_by_name(&self, name: &str) -> StoreResult<Option<Role>> {
        self.store.find_role_by_name(name.trim()).await
    }

    pub async fn list_roles(&self) -> StoreResult<Vec<Role>> {
        self.store.list_roles().await
    }

    pub async fn update_role(&self, id: RoleId, update: RoleUpdate) -> StoreResult<Role> {
        let role = self.store.update_role(id, update.validate()?).await?;
        info!(role_id = %role.id, role = %role.name, "role updated");
        Ok(role)
    }

    /// Deletes the role and every edge referencing it.
    pub async fn delete_role(&self, id: RoleId) -> StoreResult<bool> {
        let deleted = self.store.delete_role(id).await?;
        if deleted {
            info!(role_id = %id, "role deleted");
        }
        Ok(deleted)
    }

    pub async fn get_role_with_permissions(&self, id: RoleId) -> StoreResult<RoleWithPermissions> {
        let role = self.store.get_role(id).await?;
        let permissions = self.store.get_role_permissions(id).await?;
        Ok(RoleWithPermissions { role, permissions })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Permissions
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn create_permission(&self, new: NewPermission) -> StoreResult<Permission> {
        let permission = self.store.create_permission(new.validate()?).await?;
        info!(
            permission_id = %permission.id,
            permission = %permission.name,
            key = %permission.key(),
            "permission created"
        );
        Ok(permission)
    }

    pub async fn get_permission(&self, id: PermissionId) -> StoreResult<Permission> {
        self.store.get_permission(id).await
    }

    pub async fn find_permission_by_name(&self, name: &str) -> StoreResult<Option<Permission>> {
        self.store.find_permission_by_name(name.trim()).await
    }

    pub async fn list_permissions(&self) -> StoreResult<Vec<Permission>> {
        self.store.list_permissions().await
    }

    pub async fn update_permission(
        &self,
        id: PermissionId,
        update: PermissionUpdate,
    ) -> StoreResult<Permission> {
        let permission = self.store.update_permission(id, update.validate()?).await?;
        info!(permission_id = %permission.id, permission = %permission.name, "permission updated");
        Ok(permission)
    }

    /// Deletes the permission and every role edge referencing it.
    pub async fn delete_permission(&self, id: PermissionId) -> StoreResult<bool> {
        let deleted = self.store.delete_permission(id).await?;
        if deleted {
            info!(permission_id = %id, "permission deleted");
        }
        Ok(deleted)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Edges
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn assign_permission_to_role(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> StoreResult<bool> {
        let created = self.store.assign_permission_to_role(role_id, permission_id).await?;
        if created {
            info!(role_id = %role_id, permission_id = %permission_id, "permission assigned to role");
        } else {
            debug!(role_id = %role_id, permission_id = %permission_id, "permission assignment was a no-op");
        }
        Ok(created)
    }

    pub async fn remove_permission_from_role(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> StoreResult<bool> {
        let removed = self.store.remove_permission_from_role(role_id, permission_id).await?;
        if removed {
            info!(role_id = %role_id, permission_id = %permission_id, "permission removed from role");
        }
        Ok(removed)
    }

    /// `false` when the user is unknown to the identity store, the role is
    /// missing, or the user already holds the role.
    pub async fn assign_role_to_user(&self, user_id: UserId, role_id: RoleId) -> StoreResult<bool> {
        if self.identity.find_principal(user_id).await?.is_none() {
            debug!(user_id = %user_id, "role assignment skipped: unknown user");
            return Ok(false);
        }
        let created = self.store.assign_role_to_user(user_id, role_id).await?;
        if created {
            info!(user_id = %user_id, role_id = %role_id, "role assigned to user");
        } else {
            debug!(user_id = %user_id, role_id = %role_id, "role assignment was a no-op");
        }
        Ok(created)
    }

    pub async fn remove_role_from_user(&self, user_id: UserId, role_id: RoleId) -> StoreResult<bool> {
        let removed = self.store.remove_role_from_user(user_id, role_id).await?;
        if removed {
            info!(user_id = %user_id, role_id = %role_id, "role removed from user");
        }
        Ok(removed)
    }

    pub async fn get_role_permissions(&self, role_id: RoleId) -> StoreResult<Vec<Permission>> {
        self.store.get_role_permissions(role_id).await
    }

    pub async fn get_user_roles(&self, user_id: UserId) -> StoreResult<Vec<Role>> {
        self.store.get_user_roles(user_id).await
    }

    pub async fn get_user_permissions(&self, user_id: UserId) -> StoreResult<Vec<Permission>> {
        self.store.get_user_permissions(user_id).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Decisions
    // ─────────────────────────────────────────────────────────────────────────

    /// Unknown users are not superusers.
    pub async fn is_superuser(&self, user_id: UserId) -> StoreResult<bool> {
        Ok(self
            .identity
            .find_principal(user_id)
            .await?
            .is_some_and(|p| p.is_superuser))
    }

    pub async fn resolve_principal(&self, user_id: UserId) -> StoreResult<Option<Principal>> {
        self.identity.find_principal(user_id).await
    }

    /// Build a call context for `user_id`; anonymous when the user is unknown.
    pub async fn context_for(&self, user_id: UserId) -> StoreResult<CallContext> {
        Ok(match self.resolve_principal(user_id).await? {
            Some(principal) => CallContext::authenticated(principal),
            None => CallContext::anonymous(),
        })
    }

    /// Superusers satisfy every check without consulting the graph.
    pub fn bypasses(&self, principal: &Principal) -> bool {
        principal.is_superuser
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn has_permission(&self, user_id: UserId, resource: &str, action: &str) -> StoreResult<bool> {
        if self.is_superuser(user_id).await? {
            return Ok(true);
        }
        self.store.has_permission(user_id, resource, action).await
    }

    /// Same rule as [`Self::has_permission`] for an already resolved principal.
    pub async fn permits(&self, principal: &Principal, key: &PermissionKey) -> StoreResult<bool> {
        if self.bypasses(principal) {
            return Ok(true);
        }
        self.store
            .has_permission(principal.id, &key.resource, &key.action)
            .await
    }
}
