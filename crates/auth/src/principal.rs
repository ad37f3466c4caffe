use std::collections::HashMap;
use std::sync::{RwLock, RwLockWriteGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use warden_core::UserId;

use crate::store::{StoreError, StoreResult};

/// The resolved identity of a caller.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    pub id: UserId,
    pub is_superuser: bool,
}

impl Principal {
    pub fn user(id: UserId) -> Self {
        Self {
            id,
            is_superuser: false,
        }
    }

    pub fn superuser(id: UserId) -> Self {
        Self {
            id,
            is_superuser: true,
        }
    }
}

/// Read-only view of the identity store that owns users.
///
/// The authorization core never mutates users; it only asks who they are.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// `None` when the user is unknown.
    async fn find_principal(&self, user_id: UserId) -> StoreResult<Option<Principal>>;
}

/// In-memory identity store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryIdentityStore {
    users: RwLock<HashMap<UserId, Principal>>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a user.
    pub fn insert(&self, principal: Principal) -> StoreResult<()> {
        self.write()?.insert(principal.id, principal);
        Ok(())
    }

    /// `true` if the user was registered.
    pub fn remove(&self, user_id: UserId) -> StoreResult<bool> {
        Ok(self.write()?.remove(&user_id).is_some())
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<UserId, Principal>>> {
        self.users
            .write()
            .map_err(|_| StoreError::Backend("identity store lock poisoned".into()))
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn find_principal(&self, user_id: UserId) -> StoreResult<Option<Principal>> {
        let users = self
            .users
            .read()
            .map_err(|_| StoreError::Backend("identity store lock poisoned".into()))?;
        Ok(users.get(&user_id).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn registered_users_resolve_until_removed() {
        let identity = InMemoryIdentityStore::new();
        let root = UserId::new();
        identity.insert(Principal::superuser(root)).unwrap();

        assert_eq!(identity.find_principal(root).await.unwrap(), Some(Principal::superuser(root)));
        assert!(identity.remove(root).unwrap());
        assert!(!identity.remove(root).unwrap());
        assert_eq!(identity.find_principal(root).await.unwrap(), None);
    }

    #[tokio::test]
    async fn poisoned_lock_rejects_writes() {
        let identity = InMemoryIdentityStore::new();
        let _ = std::thread::scope(|s| {
            s.spawn(|| {
                let _users = identity.users.write().unwrap();
                panic!("writer died holding the identity lock");
            })
            .join()
        });

        let user = UserId::new();
        assert!(matches!(identity.insert(Principal::user(user)), Err(StoreError::Backend(_))));
        assert!(matches!(identity.remove(user), Err(StoreError::Backend(_))));
        assert!(matches!(identity.find_principal(user).await, Err(StoreError::Backend(_))));
    }
}
