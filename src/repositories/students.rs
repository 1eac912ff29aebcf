use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::core::time::primitive_now_utc;
use crate::db::models::Student;
use crate::repositories::store::{EntityFilter, NewStudent, Page, StudentPatch};
use crate::repositories::{contains_pattern, new_id, push_page};

const COLUMNS: &str = "id, name, email, created_at, updated_at";

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

pub(crate) async fn list(
    pool: &PgPool,
    filter: &EntityFilter,
    page: Option<Page>,
) -> Result<(Vec<Student>, i64), sqlx::Error> {
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM students");
    push_filter(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM students"));
    push_filter(&mut builder, filter);
    builder.push(" ORDER BY name ASC, id ASC");
    push_page(&mut builder, page);
    let students = builder.build_query_as::<Student>().fetch_all(pool).await?;

    Ok((students, total))
}

pub(crate) async fn find_by_name(
    pool: &PgPool,
    name: &str,
) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!(
        "SELECT {COLUMNS} FROM students WHERE name = $1 LIMIT 1"
    ))
    .bind(name)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn find_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!(
        "SELECT {COLUMNS} FROM students WHERE LOWER(email) = LOWER($1) ORDER BY created_at LIMIT 1"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn find_by_ids(
    pool: &PgPool,
    ids: &[String],
) -> Result<Vec<Student>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, Student>(&format!(
        "SELECT {COLUMNS} FROM students WHERE id = ANY($1) ORDER BY name ASC"
    ))
    .bind(ids)
    .fetch_all(pool)
    .await
}

pub(crate) async fn find_by_emails(
    pool: &PgPool,
    emails: &[String],
) -> Result<Vec<Student>, sqlx::Error> {
    if emails.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, Student>(&format!(
        "SELECT {COLUMNS} FROM students WHERE email = ANY($1) ORDER BY created_at ASC"
    ))
    .bind(emails)
    .fetch_all(pool)
    .await
}

pub(crate) async fn insert_many(
    pool: &PgPool,
    students: Vec<NewStudent>,
) -> Result<Vec<Student>, sqlx::Error> {
    if students.is_empty() {
        return Ok(Vec::new());
    }

    let now = primitive_now_utc();
    let mut builder = QueryBuilder::<Postgres>::new(
        "INSERT INTO students (id, name, email, created_at, updated_at) ",
    );
    builder.push_values(students, |mut row, student| {
        row.push_bind(new_id())
            .push_bind(student.name)
            .push_bind(student.email)
            .push_bind(now)
            .push_bind(now);
    });
    builder.push(format!(" RETURNING {COLUMNS}"));
    builder.build_query_as::<Student>().fetch_all(pool).await
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    patch: StudentPatch,
) -> Result<Option<Student>, sqlx::Error> {
    let (set_email, email) = match patch.email {
        Some(email) => (true, email),
        None => (false, None),
    };

    sqlx::query_as::<_, Student>(&format!(
        "UPDATE students SET
            name = COALESCE($1, name),
            email = CASE WHEN $2 THEN $3 ELSE email END,
            updated_at = $4
         WHERE id = $5
         RETURNING {COLUMNS}"
    ))
    .bind(patch.name)
    .bind(set_email)
    .bind(email)
    .bind(primitive_now_utc())
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete_many(pool: &PgPool, ids: &[String]) -> Result<u64, sqlx::Error> {
    if ids.is_empty() {
        return Ok(0);
    }

    let result =
        sqlx::query("DELETE FROM students WHERE id = ANY($1)").bind(ids).execute(pool).await?;
    Ok(result.rows_affected())
}
