//! Schema bootstrap (spec.md §4.G): connect and migrate, or recover a
//! database that went missing.

use indexer_store::Store;
use tracing::{info, warn};
use url::Url;

use crate::backup;
use crate::backup::BackupConfig;
use crate::error::SupervisorError;

/// The maintenance connection string (pointed at the `postgres` database)
/// used to run `CREATE DATABASE` when the target database itself is gone.
fn maintenance_url(database_url: &str) -> Result<String, SupervisorError> {
    let mut url = Url::parse(database_url)
        .map_err(|e| SupervisorError::InvalidDatabaseUrl(e.to_string()))?;
    url.set_path("/postgres");
    Ok(url.to_string())
}

fn database_name(database_url: &str) -> Result<String, SupervisorError> {
    let url = Url::parse(database_url)
        .map_err(|e| SupervisorError::InvalidDatabaseUrl(e.to_string()))?;
    let name = url.path().trim_start_matches('/');
    if name.is_empty() {
        return Err(SupervisorError::InvalidDatabaseUrl(
            "database url has no database name".to_string(),
        ));
    }
    Ok(name.to_string())
}

async fn recreate_database(database_url: &str) -> Result<(), SupervisorError> {
    let name = database_name(database_url)?;
    let maintenance = maintenance_url(database_url)?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(1)
        .connect(&maintenance)
        .await
        .map_err(indexer_store::StoreError::from)?;
    sqlx::query(&format!("CREATE DATABASE \"{name}\""))
        .execute(&pool)
        .await
        .map_err(|e| SupervisorError::RecreateFailed(e.to_string()))?;
    info!(database = %name, "recreated missing database");
    Ok(())
}

/// Connects to `database_url`, running migrations. On connection failure,
/// restores the most recent backup if one exists, otherwise recreates the
/// database from scratch, before retrying the connection once.
pub async fn bootstrap(database_url: &str, backup_config: &BackupConfig) -> Result<Store, SupervisorError> {
    match Store::connect(database_url).await {
        Ok(store) => Ok(store),
        Err(e) => {
            warn!(error = %e, "initial connection failed, attempting recovery");
            match backup::latest_backup(&backup_config.backup_dir).await? {
                Some(path) => backup::restore_from_backup(database_url, &path).await?,
                None => recreate_database(database_url).await?,
            }
            Store::connect(database_url).await.map_err(SupervisorError::from)
        }
    }
}
