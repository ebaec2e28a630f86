use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use thiserror::Error;
use tracing::{debug, info};

use shared::domain::{ProposalContent, ProposalId, ProposalRecord, Theme};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to create parent directory '{path}' for database url: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to open database: {0}")]
    Open(#[source] sqlx::Error),
    #[error("failed to run migrations: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("refusing to persist reserved proposal id '{0}'")]
    ReservedId(String),
    #[error("failed to write proposal: {0}")]
    Write(#[source] sqlx::Error),
    #[error("failed to read proposal: {0}")]
    Read(#[source] sqlx::Error),
    #[error("stored proposal '{id}' is corrupt: {reason}")]
    Corrupt { id: String, reason: String },
}

/// Key-value contract the authoring and resolution flows depend on.
#[async_trait]
pub trait ProposalStore: Send + Sync {
    async fn save(&self, record: &ProposalRecord) -> Result<(), StorageError>;
    async fn get_by_id(&self, id: &str) -> Result<Option<ProposalRecord>, StorageError>;
}

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self, StorageError> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)
            .map_err(StorageError::Open)?
            .create_if_missing(true);
        // Every connection to an in-memory database sees its own empty database.
        let max_connections = if is_memory_url(database_url) { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await
            .map_err(StorageError::Open)?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!(%database_url, "proposal storage ready");
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<(), StorageError> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(StorageError::Read)?;
        Ok(())
    }

    pub async fn list_recent(&self, limit: u32) -> Result<Vec<ProposalRecord>, StorageError> {
        let rows = sqlx::query(
            "SELECT id, sender_name, recipient_name, contact_handle, message, theme, created_at
             FROM proposals
             ORDER BY created_at DESC
             LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Read)?;
        rows.iter().map(record_from_row).collect()
    }
}

#[async_trait]
impl ProposalStore for Storage {
    async fn save(&self, record: &ProposalRecord) -> Result<(), StorageError> {
        if record.id().is_sentinel() {
            return Err(StorageError::ReservedId(record.id().to_string()));
        }

        sqlx::query(
            "INSERT INTO proposals
                (id, sender_name, recipient_name, contact_handle, message, theme, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id().as_str())
        .bind(record.sender_name())
        .bind(record.recipient_name())
        .bind(record.contact_handle())
        .bind(record.message())
        .bind(record.theme().as_str())
        .bind(record.created_at())
        .execute(&self.pool)
        .await
        .map_err(StorageError::Write)?;
        debug!(id = %record.id(), "proposal saved");
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<ProposalRecord>, StorageError> {
        let row = sqlx::query(
            "SELECT id, sender_name, recipient_name, contact_handle, message, theme, created_at
             FROM proposals
             WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::Read)?;
        row.as_ref().map(record_from_row).transpose()
    }
}

fn record_from_row(row: &SqliteRow) -> Result<ProposalRecord, StorageError> {
    let id: String = row.try_get("id").map_err(StorageError::Read)?;
    let theme_raw: String = row.try_get("theme").map_err(StorageError::Read)?;
    let theme = Theme::from_str(&theme_raw).map_err(|err| StorageError::Corrupt {
        id: id.clone(),
        reason: err.to_string(),
    })?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(StorageError::Read)?;
    let content = ProposalContent {
        sender_name: row.try_get("sender_name").map_err(StorageError::Read)?,
        recipient_name: row.try_get("recipient_name").map_err(StorageError::Read)?,
        contact_handle: row.try_get("contact_handle").map_err(StorageError::Read)?,
        message: row.try_get("message").map_err(StorageError::Read)?,
        theme,
    };
    Ok(ProposalRecord::new(ProposalId::new(id), content, created_at))
}

fn is_memory_url(database_url: &str) -> bool {
    database_url.starts_with("sqlite::memory:") || database_url.contains("mode=memory")
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<(), StorageError> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).map_err(|source| StorageError::CreateDir {
        path: parent.to_path_buf(),
        source,
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if is_memory_url(database_url) || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
