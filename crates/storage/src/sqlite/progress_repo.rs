use learnpath_core::model::{ContentId, ProgressRecord, UserId};

use super::{
    SqliteRepository,
    mapping::{count_from_i64, map_progress_row, user_id_to_i64},
};
use crate::repository::{
    NewProgressRecord, ProgressCountFilter, ProgressRepository, ProgressScope, StorageError,
};

const SELECT_COLUMNS: &str = r"
    SELECT
        id, item_id, user_id, element_type, topic_id, theme_id, item_status, modified_at
    FROM progress
";

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn count(&self, filter: &ProgressCountFilter) -> Result<u64, StorageError> {
        let sql = match filter.scope {
            ProgressScope::Topic(_) => {
                "SELECT COUNT(*) FROM progress WHERE user_id = ?1 AND topic_id = ?2 AND item_status = ?3"
            }
            ProgressScope::Theme(_) => {
                "SELECT COUNT(*) FROM progress WHERE user_id = ?1 AND theme_id = ?2 AND item_status = ?3"
            }
        };

        let n = sqlx::query_scalar::<_, i64>(sql)
            .bind(user_id_to_i64(filter.user_id)?)
            .bind(filter.scope.id().as_str())
            .bind(filter.item_status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(conn)?;

        count_from_i64(n)
    }

    async fn find_first(
        &self,
        user_id: UserId,
        item_id: &ContentId,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        let sql = format!("{SELECT_COLUMNS} WHERE user_id = ?1 AND item_id = ?2 LIMIT 1");
        let row = sqlx::query(&sql)
            .bind(user_id_to_i64(user_id)?)
            .bind(item_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn find_many(
        &self,
        user_id: UserId,
        scope: &ProgressScope,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        let column = match scope {
            ProgressScope::Topic(_) => "topic_id",
            ProgressScope::Theme(_) => "theme_id",
        };
        let sql = format!("{SELECT_COLUMNS} WHERE user_id = ?1 AND {column} = ?2 ORDER BY id ASC");

        let rows = sqlx::query(&sql)
            .bind(user_id_to_i64(user_id)?)
            .bind(scope.id().as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_progress_row(&row)?);
        }
        Ok(out)
    }

    async fn upsert(&self, record: NewProgressRecord) -> Result<ProgressRecord, StorageError> {
        let user_id = user_id_to_i64(record.user_id)?;

        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO progress (
                item_id, user_id, element_type, topic_id, theme_id, item_status, modified_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(item_id, user_id) DO UPDATE SET
                -- the first write owns element/topic/theme; later writes only move status
                item_status = excluded.item_status,
                modified_at = excluded.modified_at
            ",
        )
        .bind(record.item_id.as_str())
        .bind(user_id)
        .bind(record.element_type.as_str())
        .bind(record.topic_id.as_str())
        .bind(record.theme_id.as_str())
        .bind(record.item_status.as_str())
        .bind(record.modified_at)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        let sql = format!("{SELECT_COLUMNS} WHERE user_id = ?1 AND item_id = ?2");
        let row = sqlx::query(&sql)
            .bind(user_id)
            .bind(record.item_id.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(conn)?;

        tx.commit().await.map_err(conn)?;

        map_progress_row(&row)
    }
}
