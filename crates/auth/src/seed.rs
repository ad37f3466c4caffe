//! Default policy seeding.
//!
//! The policy is a fixed declarative table. Applying it any number of times
//! converges to the same graph: permissions and roles are created only when
//! no entity with that name exists, and every listed edge is (re)asserted
//! through the idempotent assignment operation.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{info, warn};

use warden_core::{PermissionId, UserId};

use crate::service::AuthorizationService;
use crate::store::{StoreError, StoreResult};
use crate::{NewPermission, NewRole, Permission, Role};

/// A permission row of a policy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionSeed {
    pub name: &'static str,
    pub resource: &'static str,
    pub action: &'static str,
    pub description: &'static str,
}

/// A role row of a policy table, listing permissions by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleSeed {
    pub name: &'static str,
    pub description: &'static str,
    pub permissions: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicySeed {
    pub permissions: &'static [PermissionSeed],
    pub roles: &'static [RoleSeed],
}

/// Role granted to the bootstrap administrator.
pub const ADMIN_ROLE: &str = "admin";

const fn perm(
    name: &'static str,
    resource: &'static str,
    action: &'static str,
    description: &'static str,
) -> PermissionSeed {
    PermissionSeed {
        name,
        resource,
        action,
        description,
    }
}

pub const DEFAULT_PERMISSIONS: &[PermissionSeed] = &[
    perm("user.read", "users", "read", "View users"),
    perm("user.write", "users", "write", "Edit users"),
    perm("user.delete", "users", "delete", "Delete users"),
    perm("item.read", "items", "read", "View items"),
    perm("item.write", "items", "write", "Edit items"),
    perm("item.delete", "items", "delete", "Delete items"),
    perm("admin.access", "admin", "access", "Access the admin panel"),
];

pub const DEFAULT_ROLES: &[RoleSeed] = &[
    RoleSeed {
        name: ADMIN_ROLE,
        description: "Administrator",
        permissions: &[
            "user.read",
            "user.write",
            "user.delete",
            "item.read",
            "item.write",
            "item.delete",
            "admin.access",
        ],
    },
    RoleSeed {
        name: "user",
        description: "Regular user",
        permissions: &["item.read", "item.write"],
    },
    RoleSeed {
        name: "viewer",
        description: "Read-only visitor",
        permissions: &["item.read"],
    },
];

impl PolicySeed {
    pub const DEFAULT: PolicySeed = PolicySeed {
        permissions: DEFAULT_PERMISSIONS,
        roles: DEFAULT_ROLES,
    };
}

/// What a seeding run changed. A second run over the same policy reports zeros.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub permissions_created: usize,
    pub roles_created: usize,
    pub edges_created: usize,
}

impl AuthorizationService {
    /// Seed the built-in policy. Safe to call at every process start.
    pub async fn apply_default_policy(&self) -> StoreResult<SeedReport> {
        self.apply_policy(&PolicySeed::DEFAULT).await
    }

    pub async fn apply_policy(&self, policy: &PolicySeed) -> StoreResult<SeedReport> {
        let mut report = SeedReport::default();
        let mut by_name: HashMap<&str, PermissionId> = HashMap::new();

        for seed in policy.permissions {
            let (permission, created) = self.ensure_permission(seed).await?;
            if created {
                report.permissions_created += 1;
            }
            by_name.insert(seed.name, permission.id);
        }

        for seed in policy.roles {
            let (role, created) = self.ensure_role(seed).await?;
            if created {
                report.roles_created += 1;
            }

            for name in seed.permissions {
                let permission_id = match by_name.get(name) {
                    Some(id) => *id,
                    None => match self.find_permission_by_name(name).await? {
                        Some(p) => p.id,
                        None => {
                            warn!(role = seed.name, permission = *name, "seed role lists an unknown permission");
                            continue;
                        }
                    },
                };
                if self.assign_permission_to_role(role.id, permission_id).await? {
                    report.edges_created += 1;
                }
            }
        }

        info!(
            permissions_created = report.permissions_created,
            roles_created = report.roles_created,
            edges_created = report.edges_created,
            "policy applied"
        );
        Ok(report)
    }

    /// Apply the default policy, then grant [`ADMIN_ROLE`] to `user_id`.
    ///
    /// Returns whether a new edge was created.
    pub async fn bootstrap_admin(&self, user_id: UserId) -> StoreResult<bool> {
        self.apply_default_policy().await?;
        let role = self
            .find_role_by_name(ADMIN_ROLE)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("role '{ADMIN_ROLE}'")))?;
        self.assign_role_to_user(user_id, role.id).await
    }

    async fn ensure_permission(&self, seed: &PermissionSeed) -> StoreResult<(Permission, bool)> {
        if let Some(existing) = self.find_permission_by_name(seed.name).await? {
            return Ok((existing, false));
        }
        let new = NewPermission::api(seed.name, seed.resource, seed.action).with_description(seed.description);
        match self.create_permission(new).await {
            Ok(created) => Ok((created, true)),
            // Lost a race with a concurrent seeder; the row exists now.
            Err(StoreError::Conflict(_)) => self
                .find_permission_by_name(seed.name)
                .await?
                .map(|p| (p, false))
                .ok_or_else(|| StoreError::NotFound(format!("permission '{}'", seed.name))),
            Err(e) => Err(e),
        }
    }

    async fn ensure_role(&self, seed: &RoleSeed) -> StoreResult<(Role, bool)> {
        if let Some(existing) = self.find_role_by_name(seed.name).await? {
            return Ok((existing, false));
        }
        match self.create_role(NewRole::new(seed.name).with_description(seed.description)).await {
            Ok(created) => Ok((created, true)),
            Err(StoreError::Conflict(_)) => self
                .find_role_by_name(seed.name)
                .await?
                .map(|r| (r, false))
                .ok_or_else(|| StoreError::NotFound(format!("role '{}'", seed.name))),
            Err(e) => Err(e),
        }
    }
}
