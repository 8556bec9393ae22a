use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};

use crate::{validate_draft_name, DraftStore};

/// Drafts kept as rows of a single SQLite table.
#[derive(Clone)]
pub struct SqliteDraftStore {
    pool: Pool<Sqlite>,
    database_url: String,
}

impl SqliteDraftStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to open draft database '{database_url}'"))?;

        let store = Self {
            pool,
            database_url: database_url.to_string(),
        };
        store.ensure_drafts_table().await?;
        Ok(store)
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    async fn ensure_drafts_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS drafts (
                name       TEXT PRIMARY KEY NOT NULL,
                body       TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to ensure drafts table exists")?;
        Ok(())
    }
}

#[async_trait]
impl DraftStore for SqliteDraftStore {
    async fn put(&self, name: &str, blob: &str) -> Result<bool> {
        validate_draft_name(name)?;
        let now = Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;
        let existing = sqlx::query_scalar::<_, i64>("SELECT 1 FROM drafts WHERE name = ?")
            .bind(name)
            .fetch_optional(&mut *tx)
            .await
            .with_context(|| format!("failed to look up draft '{name}'"))?;

        sqlx::query(
            r#"
            INSERT INTO drafts (name, body, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at
            "#,
        )
        .bind(name)
        .bind(blob)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("failed to store draft '{name}'"))?;
        tx.commit().await?;

        Ok(existing.is_some())
    }

    async fn get(&self, name: &str) -> Result<Option<String>> {
        sqlx::query_scalar::<_, String>("SELECT body FROM drafts WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to load draft '{name}'"))
    }

    async fn list(&self) -> Result<Vec<String>> {
        sqlx::query_scalar::<_, String>("SELECT name FROM drafts ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .context("failed to list drafts")
    }

    fn location(&self, name: &str) -> String {
        format!("{}#{name}", self.database_url)
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
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
