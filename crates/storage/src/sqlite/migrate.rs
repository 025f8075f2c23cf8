use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs the versioned schema migrations for the progress ledger.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: progress ledger.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        // (item_id, user_id) is the upsert identity; the unique constraint keeps
        // concurrent writers from creating duplicate rows.
        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS progress (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    item_id TEXT NOT NULL,
                    user_id INTEGER NOT NULL CHECK (user_id >= 0),
                    element_type TEXT NOT NULL CHECK (element_type IN ('exercise', 'video')),
                    topic_id TEXT NOT NULL,
                    theme_id TEXT NOT NULL,
                    item_status TEXT NOT NULL
                        CHECK (item_status IN ('NotStarted', 'InProgress', 'Completed')),
                    modified_at TEXT NOT NULL,
                    UNIQUE (item_id, user_id)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_progress_user_topic_status
                    ON progress (user_id, topic_id, item_status);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_progress_user_theme_status
                    ON progress (user_id, theme_id, item_status);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
