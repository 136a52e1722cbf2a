use anyhow::Context;
use axum::async_trait;
use sqlx::{postgres::PgPoolOptions, types::Json, PgPool};
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::entries::repo_types::{MacroGoals, ResolvedFoodEntry};
use crate::storage::{EntryStore, StoreError, ENTRIES_KEY, GOALS_KEY};

/// Key-value rows in Postgres: one JSONB document per key.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;

        if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
            warn!(error = %e, "migration failed; continuing");
        }

        Ok(Self { pool })
    }

    async fn read_entries(&self) -> Result<Vec<ResolvedFoodEntry>, StoreError> {
        let row = sqlx::query_as::<_, (Json<Vec<ResolvedFoodEntry>>,)>(
            r#"SELECT value FROM kv_store WHERE key = $1"#,
        )
        .bind(ENTRIES_KEY)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(Json(v),)| v).unwrap_or_default())
    }
}

#[async_trait]
impl EntryStore for PgStore {
    async fn append(&self, entry: ResolvedFoodEntry) -> Result<(), StoreError> {
        // single statement, so the row lock makes concurrent appends queue up
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value)
            VALUES ($1, jsonb_build_array($2::jsonb))
            ON CONFLICT (key) DO UPDATE
               SET value = kv_store.value || jsonb_build_array($2::jsonb),
                   updated_at = now()
            "#,
        )
        .bind(ENTRIES_KEY)
        .bind(Json(&entry))
        .execute(&self.pool)
        .await?;
        debug!(id = %entry.id, "entry appended");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ResolvedFoodEntry>, StoreError> {
        self.read_entries().await
    }

    async fn goal(&self) -> Result<MacroGoals, StoreError> {
        let row = sqlx::query_as::<_, (Json<MacroGoals>,)>(
            r#"SELECT value FROM kv_store WHERE key = $1"#,
        )
        .bind(GOALS_KEY)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(Json(g),)| g).unwrap_or_default())
    }

    async fn replace_goal(&self, goal: MacroGoals) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()
            "#,
        )
        .bind(GOALS_KEY)
        .bind(Json(goal))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn prune_before(&self, cutoff: OffsetDateTime) -> Result<usize, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, (Json<Vec<ResolvedFoodEntry>>,)>(
            r#"SELECT value FROM kv_store WHERE key = $1 FOR UPDATE"#,
        )
        .bind(ENTRIES_KEY)
        .fetch_optional(&mut *tx)
        .await?;
        let Some((Json(mut entries),)) = row else {
            return Ok(0);
        };

        let before = entries.len();
        entries.retain(|e| e.timestamp >= cutoff);
        let removed = before - entries.len();

        if removed > 0 {
            sqlx::query(r#"UPDATE kv_store SET value = $2, updated_at = now() WHERE key = $1"#)
                .bind(ENTRIES_KEY)
                .bind(Json(&entries))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(removed)
    }
}
