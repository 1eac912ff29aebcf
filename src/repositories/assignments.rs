use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::core::time::primitive_now_utc;
use crate::db::models::Enrollment;
use crate::repositories::store::{Page, StudentAssignment, TripleKey};
use crate::repositories::{new_id, push_page};

const INSERT_CHUNK: usize = 1000;

pub(crate) async fn count(pool: &PgPool, questionnaire_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM questionnaire_assignments WHERE questionnaire_id = $1",
    )
    .bind(questionnaire_id)
    .fetch_one(pool)
    .await
}

pub(crate) async fn list_enrollment_ids(
    pool: &PgPool,
    questionnaire_id: &str,
    page: Page,
) -> Result<Vec<String>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(
        "SELECT enrollment_id FROM questionnaire_assignments WHERE questionnaire_id = ",
    );
    builder.push_bind(questionnaire_id.to_string());
    builder.push(" ORDER BY id ASC");
    push_page(&mut builder, Some(page));
    builder.build_query_scalar::<String>().fetch_all(pool).await
}

pub(crate) async fn insert_many(
    pool: &PgPool,
    questionnaire_id: &str,
    enrollment_ids: &[String],
) -> Result<u64, sqlx::Error> {
    let now = primitive_now_utc();
    let mut inserted = 0;

    for chunk in enrollment_ids.chunks(INSERT_CHUNK) {
        let mut builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO questionnaire_assignments \
             (id, questionnaire_id, enrollment_id, created_at) ",
        );
        builder.push_values(chunk, |mut row, enrollment_id| {
            row.push_bind(new_id())
                .push_bind(questionnaire_id.to_string())
                .push_bind(enrollment_id.clone())
                .push_bind(now);
        });
        inserted += builder.build().execute(pool).await?.rows_affected();
    }

    Ok(inserted)
}

pub(crate) async fn delete_for(pool: &PgPool, questionnaire_id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM questionnaire_assignments WHERE questionnaire_id = $1")
        .bind(questionnaire_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub(crate) async fn exists_for_key(
    pool: &PgPool,
    questionnaire_id: &str,
    key: &TripleKey,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(
            SELECT 1 FROM questionnaire_assignments qa
            JOIN student_teacher_subjects sts ON sts.id = qa.enrollment_id
            WHERE qa.questionnaire_id = $1
              AND sts.student_id IS NOT DISTINCT FROM $2
              AND sts.subject_id = $3
              AND sts.teacher_id IS NOT DISTINCT FROM $4
        )",
    )
    .bind(questionnaire_id)
    .bind(key.student_id.as_deref())
    .bind(&key.subject_id)
    .bind(key.teacher_id.as_deref())
    .fetch_one(pool)
    .await
}

#[derive(sqlx::FromRow)]
struct StudentAssignmentRow {
    questionnaire_id: String,
    #[sqlx(flatten)]
    enrollment: Enrollment,
}

pub(crate) async fn list_for_student(
    pool: &PgPool,
    student_id: &str,
    questionnaire_ids: &[String],
) -> Result<Vec<StudentAssignment>, sqlx::Error> {
    if questionnaire_ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query_as::<_, StudentAssignmentRow>(
        "SELECT qa.questionnaire_id,
                sts.id, sts.student_id, sts.teacher_id, sts.subject_id, sts.active,
                sts.created_at, sts.updated_at
         FROM questionnaire_assignments qa
         JOIN student_teacher_subjects sts ON sts.id = qa.enrollment_id
         WHERE sts.student_id = $1 AND qa.questionnaire_id = ANY($2)
         ORDER BY qa.questionnaire_id, qa.id",
    )
    .bind(student_id)
    .bind(questionnaire_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| StudentAssignment {
            questionnaire_id: row.questionnaire_id,
            enrollment: row.enrollment,
        })
        .collect())
}
