//! Seed the default roles and permissions into Postgres.
//!
//! Safe to run repeatedly. Set `WARDEN_BOOTSTRAP_ADMIN` to a user id to grant
//! that user the `admin` role as well.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use warden_auth::AuthorizationService;
use warden_infra::{db, DatabaseConfig, PostgresAuthorizationStore, PostgresIdentityStore, SeedConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    warden_observability::init();

    let db_config = DatabaseConfig::from_env().context("loading database configuration")?;
    let seed_config = SeedConfig::from_env().context("loading seed configuration")?;

    let pool = db::connect(&db_config)
        .await
        .context("connecting to database")?;
    db::ensure_schema(&pool)
        .await
        .context("applying authorization schema")?;

    let service = AuthorizationService::new(
        Arc::new(PostgresAuthorizationStore::new(pool.clone())),
        Arc::new(PostgresIdentityStore::new(pool)),
    );

    let report = service
        .apply_default_policy()
        .await
        .context("seeding default policy")?;
    info!(
        permissions_created = report.permissions_created,
        roles_created = report.roles_created,
        edges_created = report.edges_created,
        "default policy applied"
    );

    if let Some(user_id) = seed_config.bootstrap_admin {
        let granted = service
            .bootstrap_admin(user_id)
            .await
            .context("granting bootstrap admin")?;
        if granted {
            info!(%user_id, "admin role granted");
        } else {
            warn!(%user_id, "admin role not granted; user unknown or already an admin");
        }
    }

    Ok(())
}
