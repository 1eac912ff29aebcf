use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::core::time::primitive_now_utc;
use crate::db::models::RefreshToken;

const COLUMNS: &str = "id, user_id, session_id, token_hash, expires_at, revoked_at, created_at";

pub(crate) struct CreateRefreshToken<'a> {
    pub(crate) id: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) session_id: &'a str,
    pub(crate) token_hash: &'a str,
    pub(crate) expires_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateRefreshToken<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO refresh_tokens (id, user_id, session_id, token_hash, expires_at, created_at)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(params.id)
    .bind(params.user_id)
    .bind(params.session_id)
    .bind(params.token_hash)
    .bind(params.expires_at)
    .bind(primitive_now_utc())
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn find_by_hash(
    pool: &PgPool,
    token_hash: &str,
) -> Result<Option<RefreshToken>, sqlx::Error> {
    sqlx::query_as::<_, RefreshToken>(&format!(
        "SELECT {COLUMNS} FROM refresh_tokens WHERE token_hash = $1"
    ))
    .bind(token_hash)
    .fetch_optional(pool)
    .await
}

/// Marks a single token as used. Returns `false` if it was already revoked.
pub(crate) async fn revoke(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE refresh_tokens SET revoked_at = $1 WHERE id = $2 AND revoked_at IS NULL",
    )
    .bind(primitive_now_utc())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn revoke_session(pool: &PgPool, session_id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE refresh_tokens SET revoked_at = $1 WHERE session_id = $2 AND revoked_at IS NULL",
    )
    .bind(primitive_now_utc())
    .bind(session_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
