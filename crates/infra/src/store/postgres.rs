//! Postgres-backed authorization store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Code | StoreError | Scenario |
//! |------------|-----------------|------------|----------|
//! | Database (unique violation) | `23505` | `Conflict` | Role or permission name already taken |
//! | Database (foreign key violation) | `23503` | n/a | Edge endpoint deleted concurrently; the assign call reports `false` |
//! | Database (string too long) | `22001` | `Validation` | Column limit exceeded |
//! | Database (other) | Any other | `Backend` | |
//! | PoolClosed / Io / other | N/A | `Backend` | Connection failures |
//!
//! Deletes remove every referencing edge inside the same transaction as the
//! row itself. The `ON DELETE CASCADE` foreign keys in the schema cover the
//! same ground for rows removed outside this store.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::{debug, instrument};
use uuid::Uuid;

use warden_auth::{
    AuthorizationStore, NewPermission, NewRole, Permission, PermissionType, PermissionUpdate,
    Role, RoleUpdate, StoreError, StoreResult,
};
use warden_core::{PermissionId, RoleId, UserId};

const ROLE_COLUMNS: &str = "r.id, r.name, r.description, r.is_active";
const PERMISSION_COLUMNS: &str =
    "p.id, p.name, p.resource, p.action, p.description, p.permission_type, p.menu_path, p.button_id";

/// Authorization graph persisted in PostgreSQL.
///
/// Uniqueness of names and edges is enforced by the schema, so concurrent
/// writers racing on the same name see exactly one success and one
/// `Conflict`.
#[derive(Debug, Clone)]
pub struct PostgresAuthorizationStore {
    pool: Arc<PgPool>,
}

impl PostgresAuthorizationStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn begin(&self, operation: &str) -> StoreResult<Transaction<'_, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error(operation, e))
    }
}

#[async_trait]
impl AuthorizationStore for PostgresAuthorizationStore {
    #[instrument(skip(self, new), fields(role = %new.name), err)]
    async fn create_role(&self, new: NewRole) -> StoreResult<Role> {
        let role = Role::from_new(RoleId::new(), new);
        sqlx::query(
            r#"
            INSERT INTO roles (id, name, description, is_active)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(role.id.as_uuid())
        .bind(&role.name)
        .bind(&role.description)
        .bind(role.active)
        .execute(&*self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::role_name_taken(&role.name)
            } else {
                map_sqlx_error("create_role", e)
            }
        })?;
        Ok(role)
    }

    #[instrument(skip(self), err)]
    async fn get_role(&self, id: RoleId) -> StoreResult<Role> {
        fetch_role(&*self.pool, id)
            .await?
            .ok_or_else(|| StoreError::role_not_found(id))
    }

    #[instrument(skip(self), err)]
    async fn find_role_by_name(&self, name: &str) -> StoreResult<Option<Role>> {
        let row = sqlx::query(&format!("SELECT {ROLE_COLUMNS} FROM roles r WHERE r.name = $1"))
            .bind(name)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_role_by_name", e))?;
        row.map(role_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_roles(&self) -> StoreResult<Vec<Role>> {
        let rows = sqlx::query(&format!("SELECT {ROLE_COLUMNS} FROM roles r ORDER BY r.name"))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_roles", e))?;
        rows.into_iter().map(role_from_row).collect()
    }

    #[instrument(skip(self, update), err)]
    async fn update_role(&self, id: RoleId, update: RoleUpdate) -> StoreResult<Role> {
        let mut tx = self.begin("update_role").await?;

        let row = sqlx::query(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles r WHERE r.id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_role", e))?;
        let mut role = match row {
            Some(row) => role_from_row(row)?,
            None => return Err(StoreError::role_not_found(id)),
        };
        role.apply(update);

        sqlx::query(
            r#"
            UPDATE roles
            SET name = $2, description = $3, is_active = $4
            WHERE id = $1
            "#,
        )
        .bind(role.id.as_uuid())
        .bind(&role.name)
        .bind(&role.description)
        .bind(role.active)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::role_name_taken(&role.name)
            } else {
                map_sqlx_error("update_role", e)
            }
        })?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(role)
    }

    #[instrument(skip(self), err)]
    async fn delete_role(&self, id: RoleId) -> StoreResult<bool> {
        let mut tx = self.begin("delete_role").await?;

        let users = sqlx::query("DELETE FROM user_roles WHERE role_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_role", e))?
            .rows_affected();
        let grants = sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_role", e))?
            .rows_affected();
        let deleted = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_role", e))?
            .rows_affected()
            > 0;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        debug!(deleted, users, grants, "role edges removed");
        Ok(deleted)
    }

    #[instrument(skip(self, new), fields(permission = %new.name), err)]
    async fn create_permission(&self, new: NewPermission) -> StoreResult<Permission> {
        let permission = Permission::from_new(PermissionId::new(), new);
        sqlx::query(
            r#"
            INSERT INTO permissions
                (id, name, resource, action, description, permission_type, menu_path, button_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(permission.id.as_uuid())
        .bind(&permission.name)
        .bind(&permission.resource)
        .bind(&permission.action)
        .bind(&permission.description)
        .bind(permission.permission_type.as_str())
        .bind(&permission.menu_path)
        .bind(&permission.button_id)
        .execute(&*self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::permission_name_taken(&permission.name)
            } else {
                map_sqlx_error("create_permission", e)
            }
        })?;
        Ok(permission)
    }

    #[instrument(skip(self), err)]
    async fn get_permission(&self, id: PermissionId) -> StoreResult<Permission> {
        let row = sqlx::query(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions p WHERE p.id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_permission", e))?;
        match row {
            Some(row) => permission_from_row(row),
            None => Err(StoreError::permission_not_found(id)),
        }
    }

    #[instrument(skip(self), err)]
    async fn find_permission_by_name(&self, name: &str) -> StoreResult<Option<Permission>> {
        let row = sqlx::query(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions p WHERE p.name = $1"
        ))
        .bind(name)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_permission_by_name", e))?;
        row.map(permission_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_permissions(&self) -> StoreResult<Vec<Permission>> {
        let rows = sqlx::query(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions p ORDER BY p.name"
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_permissions", e))?;
        rows.into_iter().map(permission_from_row).collect()
    }

    #[instrument(skip(self, update), err)]
    async fn update_permission(
        &self,
        id: PermissionId,
        update: PermissionUpdate,
    ) -> StoreResult<Permission> {
        let mut tx = self.begin("update_permission").await?;

        let row = sqlx::query(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions p WHERE p.id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_permission", e))?;
        let mut permission = match row {
            Some(row) => permission_from_row(row)?,
            None => return Err(StoreError::permission_not_found(id)),
        };
        permission.apply(update);

        sqlx::query(
            r#"
            UPDATE permissions
            SET name = $2, resource = $3, action = $4, description = $5,
                permission_type = $6, menu_path = $7, button_id = $8
            WHERE id = $1
            "#,
        )
        .bind(permission.id.as_uuid())
        .bind(&permission.name)
        .bind(&permission.resource)
        .bind(&permission.action)
        .bind(&permission.description)
        .bind(permission.permission_type.as_str())
        .bind(&permission.menu_path)
        .bind(&permission.button_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::permission_name_taken(&permission.name)
            } else {
                map_sqlx_error("update_permission", e)
            }
        })?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(permission)
    }

    #[instrument(skip(self), err)]
    async fn delete_permission(&self, id: PermissionId) -> StoreResult<bool> {
        let mut tx = self.begin("delete_permission").await?;

        let grants = sqlx::query("DELETE FROM role_permissions WHERE permission_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_permission", e))?
            .rows_affected();
        let deleted = sqlx::query("DELETE FROM permissions WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_permission", e))?
            .rows_affected()
            > 0;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        debug!(deleted, grants, "permission edges removed");
        Ok(deleted)
    }

    #[instrument(skip(self), err)]
    async fn assign_permission_to_role(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO role_permissions (role_id, permission_id)
            SELECT $1, $2
            WHERE EXISTS (SELECT 1 FROM roles WHERE id = $1)
              AND EXISTS (SELECT 1 FROM permissions WHERE id = $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(role_id.as_uuid())
        .bind(permission_id.as_uuid())
        .execute(&*self.pool)
        .await;
        edge_inserted("assign_permission_to_role", result)
    }

    #[instrument(skip(self), err)]
    async fn remove_permission_from_role(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> StoreResult<bool> {
        let removed =
            sqlx::query("DELETE FROM role_permissions WHERE role_id = $1 AND permission_id = $2")
                .bind(role_id.as_uuid())
                .bind(permission_id.as_uuid())
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("remove_permission_from_role", e))?
                .rows_affected();
        Ok(removed > 0)
    }

    #[instrument(skip(self), err)]
    async fn assign_role_to_user(&self, user_id: UserId, role_id: RoleId) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_id)
            SELECT $1, $2
            WHERE EXISTS (SELECT 1 FROM roles WHERE id = $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(role_id.as_uuid())
        .execute(&*self.pool)
        .await;
        edge_inserted("assign_role_to_user", result)
    }

    #[instrument(skip(self), err)]
    async fn remove_role_from_user(&self, user_id: UserId, role_id: RoleId) -> StoreResult<bool> {
        let removed = sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role_id = $2")
            .bind(user_id.as_uuid())
            .bind(role_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("remove_role_from_user", e))?
            .rows_affected();
        Ok(removed > 0)
    }

    #[instrument(skip(self), err)]
    async fn get_role_permissions(&self, role_id: RoleId) -> StoreResult<Vec<Permission>> {
        // Read both in one snapshot so a concurrent delete cannot produce an
        // empty list for a role that was just reported as existing.
        let mut tx = self.begin("get_role_permissions").await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("get_role_permissions", e))?;

        if fetch_role(&mut *tx, role_id).await?.is_none() {
            return Err(StoreError::role_not_found(role_id));
        }
        let rows = sqlx::query(&format!(
            r#"
            SELECT {PERMISSION_COLUMNS}
            FROM permissions p
            JOIN role_permissions rp ON rp.permission_id = p.id
            WHERE rp.role_id = $1
            ORDER BY p.name
            "#
        ))
        .bind(role_id.as_uuid())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("get_role_permissions", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        rows.into_iter().map(permission_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn get_user_roles(&self, user_id: UserId) -> StoreResult<Vec<Role>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ROLE_COLUMNS}
            FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = $1
            ORDER BY r.name
            "#
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_user_roles", e))?;
        rows.into_iter().map(role_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn get_user_permissions(&self, user_id: UserId) -> StoreResult<Vec<Permission>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT DISTINCT {PERMISSION_COLUMNS}
            FROM permissions p
            JOIN role_permissions rp ON rp.permission_id = p.id
            JOIN user_roles ur ON ur.role_id = rp.role_id
            WHERE ur.user_id = $1
            ORDER BY p.name
            "#
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_user_permissions", e))?;
        rows.into_iter().map(permission_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn has_permission(&self, user_id: UserId, resource: &str, action: &str) -> StoreResult<bool> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM user_roles ur
                JOIN role_permissions rp ON rp.role_id = ur.role_id
                JOIN permissions p ON p.id = rp.permission_id
                WHERE ur.user_id = $1 AND p.resource = $2 AND p.action = $3
            ) AS granted
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(resource)
        .bind(action)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("has_permission", e))?;
        row.try_get("granted")
            .map_err(|e| StoreError::Backend(format!("failed to read granted: {e}")))
    }
}

async fn fetch_role<'e, E>(executor: E, id: RoleId) -> StoreResult<Option<Role>>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let row = sqlx::query(&format!("SELECT {ROLE_COLUMNS} FROM roles r WHERE r.id = $1"))
        .bind(id.as_uuid())
        .fetch_optional(executor)
        .await
        .map_err(|e| map_sqlx_error("get_role", e))?;
    row.map(role_from_row).transpose()
}

/// Interpret the outcome of an `INSERT ... ON CONFLICT DO NOTHING` edge write.
///
/// Zero rows means the edge already existed or an endpoint was missing; a
/// foreign key violation means an endpoint vanished between the existence
/// check and the insert, which is the same outcome.
fn edge_inserted(
    operation: &str,
    result: Result<sqlx::postgres::PgQueryResult, sqlx::Error>,
) -> StoreResult<bool> {
    match result {
        Ok(done) => Ok(done.rows_affected() > 0),
        Err(e) if is_foreign_key_violation(&e) => Ok(false),
        Err(e) => Err(map_sqlx_error(operation, e)),
    }
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                Some("22001") => StoreError::Validation(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    has_code(err, "23505")
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    has_code(err, "23503")
}

fn has_code(err: &sqlx::Error, expected: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some(expected),
        _ => false,
    }
}

// SQLx row types

#[derive(Debug)]
struct RoleRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    is_active: bool,
}

impl<'r> FromRow<'r, PgRow> for RoleRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(RoleRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            is_active: row.try_get("is_active")?,
        })
    }
}

impl From<RoleRow> for Role {
    fn from(row: RoleRow) -> Self {
        Role {
            id: RoleId::from_uuid(row.id),
            name: row.name,
            description: row.description,
            active: row.is_active,
        }
    }
}

#[derive(Debug)]
struct PermissionRow {
    id: Uuid,
    name: String,
    resource: String,
    action: String,
    description: Option<String>,
    permission_type: String,
    menu_path: Option<String>,
    button_id: Option<String>,
}

impl<'r> FromRow<'r, PgRow> for PermissionRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(PermissionRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            resource: row.try_get("resource")?,
            action: row.try_get("action")?,
            description: row.try_get("description")?,
            permission_type: row.try_get("permission_type")?,
            menu_path: row.try_get("menu_path")?,
            button_id: row.try_get("button_id")?,
        })
    }
}

impl TryFrom<PermissionRow> for Permission {
    type Error = StoreError;

    fn try_from(row: PermissionRow) -> Result<Self, Self::Error> {
        let permission_type: PermissionType = row
            .permission_type
            .parse()
            .map_err(|e| StoreError::Backend(format!("corrupt permission row {}: {e}", row.id)))?;
        Ok(Permission {
            id: PermissionId::from_uuid(row.id),
            name: row.name,
            resource: row.resource,
            action: row.action,
            description: row.description,
            permission_type,
            menu_path: row.menu_path,
            button_id: row.button_id,
        })
    }
}

fn role_from_row(row: PgRow) -> StoreResult<Role> {
    RoleRow::from_row(&row)
        .map(Role::from)
        .map_err(|e| StoreError::Backend(format!("failed to decode role row: {e}")))
}

fn permission_from_row(row: PgRow) -> StoreResult<Permission> {
    PermissionRow::from_row(&row)
        .map_err(|e| StoreError::Backend(format!("failed to decode permission row: {e}")))?
        .try_into()
}

#[cfg(test)]
mod tests {
    //! Run against a disposable database:
    //! `WARDEN_TEST_DATABASE_URL=postgres://... cargo test -p warden-infra`.
    //! Without the variable these tests return early.

    use super::*;
    use crate::db::ensure_schema;

    async fn store() -> Option<PostgresAuthorizationStore> {
        let url = std::env::var("WARDEN_TEST_DATABASE_URL").ok()?;
        let pool = PgPool::connect(&url).await.expect("connect test database");
        ensure_schema(&pool).await.expect("apply schema");
        Some(PostgresAuthorizationStore::new(pool))
    }

    fn unique(prefix: &str) -> String {
        format!("{prefix}-{}", &Uuid::now_v7().simple().to_string()[..12])
    }

    #[tokio::test]
    async fn role_names_are_unique() {
        let Some(store) = store().await else { return };
        let name = unique("editor");

        store.create_role(NewRole::new(&name)).await.unwrap();
        let err = store.create_role(NewRole::new(&name)).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn edges_are_idempotent_and_cascade_on_delete() {
        let Some(store) = store().await else { return };
        let role = store.create_role(NewRole::new(unique("editor"))).await.unwrap();
        let resource = unique("doc");
        let permission = store
            .create_permission(NewPermission::api(unique("doc.edit"), &resource, "edit"))
            .await
            .unwrap();
        let user = UserId::new();

        assert!(store.assign_permission_to_role(role.id, permission.id).await.unwrap());
        assert!(!store.assign_permission_to_role(role.id, permission.id).await.unwrap());
        assert!(store.assign_role_to_user(user, role.id).await.unwrap());
        assert!(!store.assign_role_to_user(user, role.id).await.unwrap());
        assert!(store.has_permission(user, &resource, "edit").await.unwrap());

        assert!(store.delete_role(role.id).await.unwrap());
        assert!(!store.delete_role(role.id).await.unwrap());
        assert!(store.get_user_roles(user).await.unwrap().is_empty());
        assert!(!store.has_permission(user, &resource, "edit").await.unwrap());
    }

    #[tokio::test]
    async fn assigning_to_missing_endpoints_is_refused() {
        let Some(store) = store().await else { return };
        let role = store.create_role(NewRole::new(unique("ghost"))).await.unwrap();

        assert!(!store
            .assign_permission_to_role(role.id, PermissionId::new())
            .await
            .unwrap());
        assert!(!store.assign_role_to_user(UserId::new(), RoleId::new()).await.unwrap());
        assert!(matches!(
            store.get_role_permissions(RoleId::new()).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn permission_update_round_trips_ui_metadata() {
        let Some(store) = store().await else { return };
        let permission = store
            .create_permission(NewPermission::api(unique("menu.reports"), unique("menu"), "view"))
            .await
            .unwrap();

        let updated = store
            .update_permission(
                permission.id,
                PermissionUpdate {
                    permission_type: Some(PermissionType::Menu),
                    menu_path: Some("/reports".into()),
                    ..PermissionUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.permission_type, PermissionType::Menu);
        assert_eq!(store.get_permission(permission.id).await.unwrap(), updated);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_assignment_creates_one_edge() {
        let Some(store) = store().await else { return };
        let role = store.create_role(NewRole::new(unique("editor"))).await.unwrap();
        let permission = store
            .create_permission(NewPermission::api(unique("doc.edit"), unique("doc"), "edit"))
            .await
            .unwrap();

        let (a, b) = tokio::join!(
            store.assign_permission_to_role(role.id, permission.id),
            store.assign_permission_to_role(role.id, permission.id),
        );
        let mut outcomes = [a.unwrap(), b.unwrap()];
        outcomes.sort();
        assert_eq!(outcomes, [false, true]);

        let edges: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM role_permissions WHERE role_id = $1 AND permission_id = $2",
        )
        .bind(role.id.as_uuid())
        .bind(permission.id.as_uuid())
        .fetch_one(store.pool())
        .await
        .unwrap();
        assert_eq!(edges, 1);
    }

    #[tokio::test]
    async fn renaming_a_permission_onto_a_taken_name_conflicts() {
        let Some(store) = store().await else { return };
        let taken = unique("doc.read");
        store
            .create_permission(NewPermission::api(&taken, unique("doc"), "read"))
            .await
            .unwrap();
        let other = store
            .create_permission(NewPermission::api(unique("doc.write"), unique("doc"), "write"))
            .await
            .unwrap();

        let err = store
            .update_permission(
                other.id,
                PermissionUpdate {
                    name: Some(taken.clone()),
                    ..PermissionUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::permission_name_taken(&taken));
        assert_eq!(store.get_permission(other.id).await.unwrap(), other);
    }
}
