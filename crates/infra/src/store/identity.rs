//! Read-only adapter over the externally owned `"user"` table.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use warden_auth::{IdentityStore, Principal, StoreError, StoreResult};
use warden_core::UserId;

/// Resolves principals from the `"user"` table (`id`, `is_superuser`).
///
/// The table belongs to the identity system; this adapter never writes to it.
#[derive(Debug, Clone)]
pub struct PostgresIdentityStore {
    pool: Arc<PgPool>,
}

impl PostgresIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl IdentityStore for PostgresIdentityStore {
    #[instrument(skip(self), err)]
    async fn find_principal(&self, user_id: UserId) -> StoreResult<Option<Principal>> {
        let row = sqlx::query(r#"SELECT id, is_superuser FROM "user" WHERE id = $1"#)
            .bind(user_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("database error in find_principal: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let decode = |e: sqlx::Error| StoreError::Backend(format!("failed to decode user row: {e}"));
        let id: Uuid = row.try_get("id").map_err(decode)?;
        let is_superuser: bool = row.try_get("is_superuser").map_err(decode)?;
        Ok(Some(Principal {
            id: UserId::from_uuid(id),
            is_superuser,
        }))
    }
}
