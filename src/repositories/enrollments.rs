use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::core::time::primitive_now_utc;
use crate::db::models::Enrollment;
use crate::repositories::store::{
    DirectoryCounts, EnrollmentFilter, EnrollmentOwner, Page, TripleKey,
};
use crate::repositories::{new_id, push_page};

const COLUMNS: &str = "id, student_id, teacher_id, subject_id, active, created_at, updated_at";

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &EnrollmentFilter) {
    builder.push(" WHERE active = TRUE");
    if filter.require_student {
        builder.push(" AND student_id IS NOT NULL");
    }
    if let Some(student_id) = &filter.student_id {
        builder.push(" AND student_id = ");
        builder.push_bind(student_id.clone());
    }
    if let Some(teacher_id) = &filter.teacher_id {
        builder.push(" AND teacher_id = ");
        builder.push_bind(teacher_id.clone());
    }
    if let Some(subject_id) = &filter.subject_id {
        builder.push(" AND subject_id = ");
        builder.push_bind(subject_id.clone());
    }
    if let Some(student_ids) = &filter.student_ids {
        builder.push(" AND student_id = ANY(");
        builder.push_bind(student_ids.clone());
        builder.push(")");
    }
    if let Some(teacher_ids) = &filter.teacher_ids {
        builder.push(" AND teacher_id = ANY(");
        builder.push_bind(teacher_ids.clone());
        builder.push(")");
    }
}

pub(crate) async fn list_active(
    pool: &PgPool,
    filter: &EnrollmentFilter,
    page: Option<Page>,
) -> Result<Vec<Enrollment>, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM student_teacher_subjects"));
    push_filter(&mut builder, filter);
    builder.push(" ORDER BY id ASC");
    push_page(&mut builder, page);
    builder.build_query_as::<Enrollment>().fetch_all(pool).await
}

pub(crate) async fn count_active(
    pool: &PgPool,
    filter: &EnrollmentFilter,
) -> Result<i64, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM student_teacher_subjects");
    push_filter(&mut builder, filter);
    builder.build_query_scalar().fetch_one(pool).await
}

pub(crate) async fn find_by_ids(
    pool: &PgPool,
    ids: &[String],
) -> Result<Vec<Enrollment>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, Enrollment>(&format!(
        "SELECT {COLUMNS} FROM student_teacher_subjects WHERE id = ANY($1) ORDER BY id"
    ))
    .bind(ids)
    .fetch_all(pool)
    .await
}

pub(crate) async fn find_by_key(
    pool: &PgPool,
    key: &TripleKey,
) -> Result<Option<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "SELECT {COLUMNS} FROM student_teacher_subjects
         WHERE student_id IS NOT DISTINCT FROM $1
           AND subject_id = $2
           AND teacher_id IS NOT DISTINCT FROM $3
         ORDER BY active DESC, updated_at DESC
         LIMIT 1"
    ))
    .bind(key.student_id.as_deref())
    .bind(&key.subject_id)
    .bind(key.teacher_id.as_deref())
    .fetch_optional(pool)
    .await
}

pub(crate) async fn insert_many(
    pool: &PgPool,
    keys: &[TripleKey],
) -> Result<Vec<Enrollment>, sqlx::Error> {
    if keys.is_empty() {
        return Ok(Vec::new());
    }

    let now = primitive_now_utc();
    let mut builder = QueryBuilder::<Postgres>::new(
        "INSERT INTO student_teacher_subjects
            (id, student_id, teacher_id, subject_id, active, created_at, updated_at) ",
    );
    builder.push_values(keys, |mut row, key| {
        row.push_bind(new_id())
            .push_bind(key.student_id.clone())
            .push_bind(key.teacher_id.clone())
            .push_bind(key.subject_id.clone())
            .push_bind(true)
            .push_bind(now)
            .push_bind(now);
    });
    builder.push(format!(" RETURNING {COLUMNS}"));
    builder.build_query_as::<Enrollment>().fetch_all(pool).await
}

pub(crate) async fn set_active(pool: &PgPool, id: &str, active: bool) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE student_teacher_subjects SET active = $1, updated_at = $2 WHERE id = $3")
        .bind(active)
        .bind(primitive_now_utc())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub(crate) async fn deactivate_for(
    pool: &PgPool,
    owner: &EnrollmentOwner,
) -> Result<u64, sqlx::Error> {
    let (column, id) = match owner {
        EnrollmentOwner::Student(id) => ("student_id", id),
        EnrollmentOwner::Teacher(id) => ("teacher_id", id),
    };

    let result = sqlx::query(&format!(
        "UPDATE student_teacher_subjects SET active = FALSE, updated_at = $1
         WHERE {column} = $2 AND active = TRUE"
    ))
    .bind(primitive_now_utc())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Removes every enrollment, student, teacher and subject. Explicit questionnaire
/// assignments cascade with their enrollments; responses only hold weak ids and stay.
pub(crate) async fn clear_directory(pool: &PgPool) -> Result<DirectoryCounts, sqlx::Error> {
    let enrollments = sqlx::query("DELETE FROM student_teacher_subjects").execute(pool).await?;
    let students = sqlx::query("DELETE FROM students").execute(pool).await?;
    let teachers = sqlx::query("DELETE FROM teachers").execute(pool).await?;
    let subjects = sqlx::query("DELETE FROM subjects").execute(pool).await?;

    Ok(DirectoryCounts {
        enrollments: enrollments.rows_affected() as i64,
        students: students.rows_affected() as i64,
        teachers: teachers.rows_affected() as i64,
        subjects: subjects.rows_affected() as i64,
    })
}
