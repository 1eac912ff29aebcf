use sqlx::PgPool;

use crate::core::time::primitive_now_utc;
use crate::db::models::AuthUser;

const COLUMNS: &str = "id, email, hashed_password, created_at, updated_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<AuthUser>, sqlx::Error> {
    sqlx::query_as::<_, AuthUser>(&format!("SELECT {COLUMNS} FROM auth_users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<AuthUser>, sqlx::Error> {
    sqlx::query_as::<_, AuthUser>(&format!(
        "SELECT {COLUMNS} FROM auth_users WHERE LOWER(email) = LOWER($1)"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn create(
    pool: &PgPool,
    id: &str,
    email: &str,
    hashed_password: &str,
) -> Result<AuthUser, sqlx::Error> {
    let now = primitive_now_utc();
    sqlx::query_as::<_, AuthUser>(&format!(
        "INSERT INTO auth_users (id, email, hashed_password, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $4)
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(email)
    .bind(hashed_password)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    email: Option<&str>,
    hashed_password: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE auth_users SET
            email = COALESCE($1, email),
            hashed_password = COALESCE($2, hashed_password),
            updated_at = $3
         WHERE id = $4",
    )
    .bind(email)
    .bind(hashed_password)
    .bind(primitive_now_utc())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM auth_users WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}
