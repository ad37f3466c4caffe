//! In-memory authorization store for tests/dev.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use warden_core::{PermissionId, RoleId, UserId};

use crate::store::{AuthorizationStore, StoreError, StoreResult};
use crate::{NewPermission, NewRole, Permission, PermissionUpdate, Role, RoleUpdate};

#[derive(Debug, Default)]
struct Graph {
    roles: HashMap<RoleId, Role>,
    permissions: HashMap<PermissionId, Permission>,
    role_permissions: HashSet<(RoleId, PermissionId)>,
    user_roles: HashSet<(UserId, RoleId)>,
}

impl Graph {
    fn role_name_taken(&self, name: &str, except: Option<RoleId>) -> bool {
        self.roles
            .values()
            .any(|r| r.name == name && Some(r.id) != except)
    }

    fn permission_name_taken(&self, name: &str, except: Option<PermissionId>) -> bool {
        self.permissions
            .values()
            .any(|p| p.name == name && Some(p.id) != except)
    }

    fn permissions_of(&self, role_id: RoleId) -> impl Iterator<Item = &Permission> {
        self.role_permissions
            .iter()
            .filter(move |(r, _)| *r == role_id)
            .filter_map(|(_, p)| self.permissions.get(p))
    }
}

/// In-memory authorization graph.
///
/// - One lock around the whole graph: each call is atomic
/// - Edges are sets, so duplicates cannot exist
/// - Results are ordered by name
#[derive(Debug, Default)]
pub struct InMemoryAuthorizationStore {
    graph: RwLock<Graph>,
}

impl InMemoryAuthorizationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `(role, permission)` edges; used to assert convergence.
    pub fn role_permission_edge_count(&self) -> StoreResult<usize> {
        Ok(self.read()?.role_permissions.len())
    }

    /// Number of `(user, role)` edges.
    pub fn user_role_edge_count(&self) -> StoreResult<usize> {
        Ok(self.read()?.user_roles.len())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Graph>> {
        self.graph
            .read()
            .map_err(|_| StoreError::Backend("authorization graph lock poisoned".into()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Graph>> {
        self.graph
            .write()
            .map_err(|_| StoreError::Backend("authorization graph lock poisoned".into()))
    }
}

fn sorted_roles<'a>(roles: impl Iterator<Item = &'a Role>) -> Vec<Role> {
    let mut out: Vec<Role> = roles.cloned().collect();
    out.sort_by(|a, b| a.name.cmp(&b.name));
    out
}

fn sorted_permissions<'a>(permissions: impl Iterator<Item = &'a Permission>) -> Vec<Permission> {
    let mut out: Vec<Permission> = permissions.cloned().collect();
    out.sort_by(|a, b| a.name.cmp(&b.name));
    out
}

#[async_trait]
impl AuthorizationStore for InMemoryAuthorizationStore {
    async fn create_role(&self, new: NewRole) -> StoreResult<Role> {
        let mut graph = self.write()?;
        if graph.role_name_taken(&new.name, None) {
            return Err(StoreError::role_name_taken(&new.name));
        }
        let role = Role::from_new(RoleId::new(), new);
        graph.roles.insert(role.id, role.clone());
        Ok(role)
    }

    async fn get_role(&self, id: RoleId) -> StoreResult<Role> {
        self.read()?
            .roles
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::role_not_found(id))
    }

    async fn find_role_by_name(&self, name: &str) -> StoreResult<Option<Role>> {
        Ok(self.read()?.roles.values().find(|r| r.name == name).cloned())
    }

    async fn list_roles(&self) -> StoreResult<Vec<Role>> {
        Ok(sorted_roles(self.read()?.roles.values()))
    }

    async fn update_role(&self, id: RoleId, update: RoleUpdate) -> StoreResult<Role> {
        let mut graph = self.write()?;
        if !graph.roles.contains_key(&id) {
            return Err(StoreError::role_not_found(id));
        }
        if let Some(name) = update.name.as_deref() {
            if graph.role_name_taken(name, Some(id)) {
                return Err(StoreError::role_name_taken(name));
            }
        }
        let role = graph.roles.get_mut(&id).ok_or_else(|| StoreError::role_not_found(id))?;
        role.apply(update);
        Ok(role.clone())
    }

    async fn delete_role(&self, id: RoleId) -> StoreResult<bool> {
        let mut graph = self.write()?;
        if graph.roles.remove(&id).is_none() {
            return Ok(false);
        }
        graph.role_permissions.retain(|(r, _)| *r != id);
        graph.user_roles.retain(|(_, r)| *r != id);
        Ok(true)
    }

    async fn create_permission(&self, new: NewPermission) -> StoreResult<Permission> {
        let mut graph = self.write()?;
        if graph.permission_name_taken(&new.name, None) {
            return Err(StoreError::permission_name_taken(&new.name));
        }
        let permission = Permission::from_new(PermissionId::new(), new);
        graph.permissions.insert(permission.id, permission.clone());
        Ok(permission)
    }

    async fn get_permission(&self, id: PermissionId) -> StoreResult<Permission> {
        self.read()?
            .permissions
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::permission_not_found(id))
    }

    async fn find_permission_by_name(&self, name: &str) -> StoreResult<Option<Permission>> {
        Ok(self
            .read()?
            .permissions
            .values()
            .find(|p| p.name == name)
            .cloned())
    }

    async fn list_permissions(&self) -> StoreResult<Vec<Permission>> {
        Ok(sorted_permissions(self.read()?.permissions.values()))
    }

    async fn update_permission(
        &self,
        id: PermissionId,
        update: PermissionUpdate,
    ) -> StoreResult<Permission> {
        let mut graph = self.write()?;
        if !graph.permissions.contains_key(&id) {
            return Err(StoreError::permission_not_found(id));
        }
        if let Some(name) = update.name.as_deref() {
            if graph.permission_name_taken(name, Some(id)) {
                return Err(StoreError::permission_name_taken(name));
            }
        }
        let permission = graph
            .permissions
            .get_mut(&id)
            .ok_or_else(|| StoreError::permission_not_found(id))?;
        permission.apply(update);
        Ok(permission.clone())
    }

    async fn delete_permission(&self, id: PermissionId) -> StoreResult<bool> {
        let mut graph = self.write()?;
        if graph.permissions.remove(&id).is_none() {
            return Ok(false);
        }
        graph.role_permissions.retain(|(_, p)| *p != id);
        Ok(true)
    }

    async fn assign_permission_to_role(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> StoreResult<bool> {
        let mut graph = self.write()?;
        if !graph.roles.contains_key(&role_id) || !graph.permissions.contains_key(&permission_id) {
            return Ok(false);
        }
        Ok(graph.role_permissions.insert((role_id, permission_id)))
    }

    async fn remove_permission_from_role(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> StoreResult<bool> {
        Ok(self.write()?.role_permissions.remove(&(role_id, permission_id)))
    }

    async fn assign_role_to_user(&self, user_id: UserId, role_id: RoleId) -> StoreResult<bool> {
        let mut graph = self.write()?;
        if !graph.roles.contains_key(&role_id) {
            return Ok(false);
        }
        Ok(graph.user_roles.insert((user_id, role_id)))
    }

    async fn remove_role_from_user(&self, user_id: UserId, role_id: RoleId) -> StoreResult<bool> {
        Ok(self.write()?.user_roles.remove(&(user_id, role_id)))
    }

    async fn get_role_permissions(&self, role_id: RoleId) -> StoreResult<Vec<Permission>> {
        let graph = self.read()?;
        if !graph.roles.contains_key(&role_id) {
            return Err(StoreError::role_not_found(role_id));
        }
        Ok(sorted_permissions(graph.permissions_of(role_id)))
    }

    async fn get_user_roles(&self, user_id: UserId) -> StoreResult<Vec<Role>> {
        let graph = self.read()?;
        Ok(sorted_roles(
            graph
                .user_roles
                .iter()
                .filter(|(u, _)| *u == user_id)
                .filter_map(|(_, r)| graph.roles.get(r)),
        ))
    }

    async fn get_user_permissions(&self, user_id: UserId) -> StoreResult<Vec<Permission>> {
        let graph = self.read()?;
        // Keyed by id so a permission shared by several roles appears once.
        let mut reachable: BTreeMap<PermissionId, &Permission> = BTreeMap::new();
        for (_, role_id) in graph.user_roles.iter().filter(|(u, _)| *u == user_id) {
            for permission in graph.permissions_of(*role_id) {
                reachable.insert(permission.id, permission);
            }
        }
        Ok(sorted_permissions(reachable.into_values()))
    }
}
