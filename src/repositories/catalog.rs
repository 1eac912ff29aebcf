//! Subjects and teachers share the same `(id, name, created_at, updated_at)` shape.

use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use crate::core::time::primitive_now_utc;
use crate::repositories::store::{EntityFilter, Page};
use crate::repositories::{contains_pattern, new_id, push_page};

const COLUMNS: &str = "id, name, created_at, updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NamedTable {
    Subjects,
    Teachers,
}

impl NamedTable {
    fn table(self) -> &'static str {
        match self {
            Self::Subjects => "subjects",
            Self::Teachers => "teachers",
        }
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &EntityFilter) {
    builder.push(" WHERE TRUE");
    if let Some(name) = filter.name.as_deref().filter(|name| !name.trim().is_empty()) {
        builder.push(" AND name ILIKE ");
        builder.push_bind(contains_pattern(name.trim()));
    }
    if let Some(ids) = &filter.ids {
        builder.push(" AND id = ANY(");
        builder.push_bind(ids.clone());
        builder.push(")");
    }
}

pub(crate) async fn list<T>(
    pool: &PgPool,
    table: NamedTable,
    filter: &EntityFilter,
    page: Option<Page>,
) -> Result<(Vec<T>, i64), sqlx::Error>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let mut count =
        QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) FROM {}", table.table()));
    push_filter(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut builder =
        QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM {}", table.table()));
    push_filter(&mut builder, filter);
    builder.push(" ORDER BY name ASC, id ASC");
    push_page(&mut builder, page);
    let rows = builder.build_query_as::<T>().fetch_all(pool).await?;

    Ok((rows, total))
}

pub(crate) async fn find_by_name<T>(
    pool: &PgPool,
    table: NamedTable,
    name: &str,
) -> Result<Option<T>, sqlx::Error>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    sqlx::query_as::<_, T>(&format!(
        "SELECT {COLUMNS} FROM {} WHERE name = $1 LIMIT 1",
        table.table()
    ))
    .bind(name)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn find_by_ids<T>(
    pool: &PgPool,
    table: NamedTable,
    ids: &[String],
) -> Result<Vec<T>, sqlx::Error>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, T>(&format!(
        "SELECT {COLUMNS} FROM {} WHERE id = ANY($1) ORDER BY name ASC",
        table.table()
    ))
    .bind(ids)
    .fetch_all(pool)
    .await
}

pub(crate) async fn insert_many<T>(
    pool: &PgPool,
    table: NamedTable,
    names: &[String],
) -> Result<Vec<T>, sqlx::Error>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    if names.is_empty() {
        return Ok(Vec::new());
    }

    let now = primitive_now_utc();
    let mut builder = QueryBuilder::<Postgres>::new(format!(
        "INSERT INTO {} (id, name, created_at, updated_at) ",
        table.table()
    ));
    builder.push_values(names, |mut row, name| {
        row.push_bind(new_id()).push_bind(name.clone()).push_bind(now).push_bind(now);
    });
    builder.push(format!(" RETURNING {COLUMNS}"));
    builder.build_query_as::<T>().fetch_all(pool).await
}

pub(crate) async fn rename<T>(
    pool: &PgPool,
    table: NamedTable,
    id: &str,
    name: &str,
) -> Result<Option<T>, sqlx::Error>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    sqlx::query_as::<_, T>(&format!(
        "UPDATE {} SET name = $1, updated_at = $2 WHERE id = $3 RETURNING {COLUMNS}",
        table.table()
    ))
    .bind(name)
    .bind(primitive_now_utc())
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete_many(
    pool: &PgPool,
    table: NamedTable,
    ids: &[String],
) -> Result<u64, sqlx::Error> {
    if ids.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query(&format!("DELETE FROM {} WHERE id = ANY($1)", table.table()))
        .bind(ids)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
