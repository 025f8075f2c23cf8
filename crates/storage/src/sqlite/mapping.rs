use learnpath_core::model::{ContentId, ProgressRecord, UserId};
use sqlx::Row;

use crate::repository::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn user_id_to_i64(id: UserId) -> Result<i64, StorageError> {
    i64::try_from(id.value()).map_err(|_| StorageError::Serialization("user_id overflow".into()))
}

pub(crate) fn user_id_from_i64(v: i64) -> Result<UserId, StorageError> {
    u64::try_from(v)
        .map(UserId::new)
        .map_err(|_| StorageError::Serialization("user_id sign overflow".into()))
}

pub(crate) fn count_from_i64(v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid count: {v}")))
}

pub(crate) fn map_progress_row(row: &sqlx::sqlite::SqliteRow) -> Result<ProgressRecord, StorageError> {
    let element_type: String = row.try_get("element_type").map_err(ser)?;
    let item_status: String = row.try_get("item_status").map_err(ser)?;

    Ok(ProgressRecord {
        id: row.try_get("id").map_err(ser)?,
        item_id: ContentId::new(row.try_get::<String, _>("item_id").map_err(ser)?),
        user_id: user_id_from_i64(row.try_get::<i64, _>("user_id").map_err(ser)?)?,
        element_type: element_type.parse().map_err(ser)?,
        topic_id: ContentId::new(row.try_get::<String, _>("topic_id").map_err(ser)?),
        theme_id: ContentId::new(row.try_get::<String, _>("theme_id").map_err(ser)?),
        item_status: item_status.parse().map_err(ser)?,
        modified_at: row.try_get("modified_at").map_err(ser)?,
    })
}
