//! Backup rotation (spec.md §4.G): a periodic `pg_dump`, `zstd`-compressed
//! and retained for 7 days, plus a honeypot-database presence check.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::SupervisorError;

const BACKUP_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);
const RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct BackupConfig {
    pub backup_dir: PathBuf,
    /// A second, otherwise-unused database whose disappearance signals
    /// an operator or tooling error against the Postgres instance itself.
    pub honeypot_database: Option<String>,
}

fn backup_file_name(unix_timestamp: i64) -> String {
    format!("evm-indexer-{unix_timestamp}.sql.zst")
}

async fn run_pg_dump(database_url: &str) -> Result<Vec<u8>, SupervisorError> {
    let output = Command::new("pg_dump")
        .arg("--dbname")
        .arg(database_url)
        .arg("--format=plain")
        .output()
        .await?;
    if !output.status.success() {
        return Err(SupervisorError::BackupFailed(
            String::from_utf8_lossy(&output.stderr).to_string(),
        ));
    }
    Ok(output.stdout)
}

/// Runs `pg_dump`, compresses the result, and writes it under
/// `config.backup_dir`. Returns the written file's path.
pub async fn run_backup(database_url: &str, config: &BackupConfig) -> Result<PathBuf, SupervisorError> {
    tokio::fs::create_dir_all(&config.backup_dir).await?;

    let dump = run_pg_dump(database_url).await?;
    let compressed = tokio::task::spawn_blocking(move || zstd::encode_all(dump.as_slice(), 3))
        .await
        .map_err(|e| SupervisorError::BackupFailed(format!("compression task panicked: {e}")))?
        .map_err(|e| SupervisorError::BackupFailed(e.to_string()))?;

    let timestamp = current_unix_timestamp();
    let path = config.backup_dir.join(backup_file_name(timestamp));
    tokio::fs::write(&path, compressed).await?;
    info!(path = %path.display(), "backup written");
    Ok(path)
}

/// Deletes backup files older than the 7-day retention window.
pub async fn prune_old_backups(backup_dir: &Path) -> Result<(), SupervisorError> {
    let mut entries = match tokio::fs::read_dir(backup_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    while let Some(entry) = entries.next_entry().await? {
        let metadata = entry.metadata().await?;
        let Ok(modified) = metadata.modified() else {
            continue;
        };
        if modified.elapsed().map(|age| age > RETENTION).unwrap_or(false) {
            tokio::fs::remove_file(entry.path()).await?;
            info!(path = %entry.path().display(), "pruned expired backup");
        }
    }
    Ok(())
}

/// Finds the most recently modified `*.sql.zst` file under `backup_dir`,
/// used to restore a database the Supervisor cannot otherwise connect to.
pub async fn latest_backup(backup_dir: &Path) -> Result<Option<PathBuf>, SupervisorError> {
    let mut entries = match tokio::fs::read_dir(backup_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("zst") {
            continue;
        }
        let modified = entry.metadata().await?.modified()?;
        if newest.as_ref().map(|(t, _)| modified > *t).unwrap_or(true) {
            newest = Some((modified, path));
        }
    }
    Ok(newest.map(|(_, path)| path))
}

/// Decompresses `backup_path` and pipes it into `psql` against
/// `database_url`.
pub async fn restore_from_backup(database_url: &str, backup_path: &Path) -> Result<(), SupervisorError> {
    let compressed = tokio::fs::read(backup_path).await?;
    let sql = tokio::task::spawn_blocking(move || zstd::decode_all(compressed.as_slice()))
        .await
        .map_err(|e| SupervisorError::RestoreFailed(format!("decompression task panicked: {e}")))?
        .map_err(|e| SupervisorError::RestoreFailed(e.to_string()))?;

    use std::process::Stdio;
    let mut child = Command::new("psql")
        .arg(database_url)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .spawn()?;

    {
        use tokio::io::AsyncWriteExt;
        let stdin = child
            .stdin
            .as_mut()
            .ok_or_else(|| SupervisorError::RestoreFailed("psql stdin unavailable".to_string()))?;
        stdin.write_all(&sql).await?;
    }

    let status = child.wait().await?;
    if !status.success() {
        return Err(SupervisorError::RestoreFailed(format!(
            "psql exited with {status}"
        )));
    }
    info!(path = %backup_path.display(), "restored from backup");
    Ok(())
}

/// Queries `pg_database` on the maintenance database for `honeypot_database`.
/// Its disappearance is logged as an alert; this never deletes or recreates
/// anything on its own.
async fn check_honeypot(maintenance_url: &str, honeypot_database: &str) -> Result<(), SupervisorError> {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(1)
        .connect(maintenance_url)
        .await
        .map_err(indexer_store::StoreError::from)?;
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(honeypot_database)
        .fetch_one(&pool)
        .await
        .map_err(indexer_store::StoreError::from)?;
    if !exists {
        error!(honeypot_database, "honeypot database is missing; investigate the Postgres instance");
    }
    Ok(())
}

fn current_unix_timestamp() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// The long-lived 6-hour backup task (spec.md §4.G).
pub async fn run_backup_task(
    database_url: String,
    maintenance_url: Option<String>,
    config: BackupConfig,
    cancel: CancellationToken,
) -> Result<(), SupervisorError> {
    let mut interval = tokio::time::interval(BACKUP_INTERVAL);
    interval.tick().await; // first tick fires immediately; skip it

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = cancel.cancelled() => return Ok(()),
        }

        if let Err(e) = run_backup(&database_url, &config).await {
            warn!(error = %e, "backup cycle failed");
        }
        if let Err(e) = prune_old_backups(&config.backup_dir).await {
            warn!(error = %e, "backup pruning failed");
        }
        if let (Some(maintenance_url), Some(honeypot)) = (&maintenance_url, &config.honeypot_database) {
            if let Err(e) = check_honeypot(maintenance_url, honeypot).await {
                warn!(error = %e, "honeypot check failed");
            }
        }
    }
}
