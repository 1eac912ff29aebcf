use sqlx::PgPool;

use crate::core::time::primitive_now_utc;
use crate::db::models::Profile;
use crate::db::types::Role;
use crate::repositories::store::{NewProfile, ProfilePatch};

const COLUMNS: &str = "id, email, first_name, last_name, role, created_at, updated_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Profile>, sqlx::Error> {
    sqlx::query_as::<_, Profile>(&format!("SELECT {COLUMNS} FROM profiles WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<Profile>, sqlx::Error> {
    sqlx::query_as::<_, Profile>(&format!(
        "SELECT {COLUMNS} FROM profiles WHERE LOWER(email) = LOWER($1) LIMIT 1"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await
}

/// Inserts or refreshes the profile for an auth user.
pub(crate) async fn upsert(pool: &PgPool, params: NewProfile) -> Result<Profile, sqlx::Error> {
    let now = primitive_now_utc();
    sqlx::query_as::<_, Profile>(&format!(
        "INSERT INTO profiles (id, email, first_name, last_name, role, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $6)
         ON CONFLICT (id) DO UPDATE SET
            email = EXCLUDED.email,
            first_name = EXCLUDED.first_name,
            last_name = EXCLUDED.last_name,
            role = EXCLUDED.role,
            updated_at = EXCLUDED.updated_at
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.email)
    .bind(params.first_name)
    .bind(params.last_name)
    .bind(params.role)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    patch: ProfilePatch,
) -> Result<Option<Profile>, sqlx::Error> {
    sqlx::query_as::<_, Profile>(&format!(
        "UPDATE profiles SET
            email = COALESCE($1, email),
            first_name = COALESCE($2, first_name),
            last_name = COALESCE($3, last_name),
            updated_at = $4
         WHERE id = $5
         RETURNING {COLUMNS}"
    ))
    .bind(patch.email)
    .bind(patch.first_name)
    .bind(patch.last_name)
    .bind(primitive_now_utc())
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM profiles WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn list_by_role(pool: &PgPool, role: Role) -> Result<Vec<Profile>, sqlx::Error> {
    sqlx::query_as::<_, Profile>(&format!(
        "SELECT {COLUMNS} FROM profiles WHERE role = $1 ORDER BY created_at DESC"
    ))
    .bind(role)
    .fetch_all(pool)
    .await
}
