use sqlx::PgPool;

use crate::core::time::primitive_now_utc;
use crate::db::models::ImportHistory;
use crate::repositories::new_id;
use crate::repositories::store::NewImportHistory;

const COLUMNS: &str = "\
    id, mode, total_records, new_students, new_teachers, new_subjects, duplicates_skipped, \
    error_count, imported_by, created_at";

pub(crate) async fn create(
    pool: &PgPool,
    entry: NewImportHistory,
) -> Result<ImportHistory, sqlx::Error> {
    sqlx::query_as::<_, ImportHistory>(&format!(
        "INSERT INTO import_history (
            id, mode, total_records, new_students, new_teachers, new_subjects,
            duplicates_skipped, error_count, imported_by, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING {COLUMNS}"
    ))
    .bind(new_id())
    .bind(entry.mode)
    .bind(entry.total_records)
    .bind(entry.new_students)
    .bind(entry.new_teachers)
    .bind(entry.new_subjects)
    .bind(entry.duplicates_skipped)
    .bind(entry.error_count)
    .bind(entry.imported_by)
    .bind(primitive_now_utc())
    .fetch_one(pool)
    .await
}
