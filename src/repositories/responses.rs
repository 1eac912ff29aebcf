use std::collections::HashMap;

use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::core::time::primitive_now_utc;
use crate::db::models::{QuestionResponse, QuestionnaireResponse};
use crate::repositories::new_id;
use crate::repositories::store::{NewAnswer, ResponseKey, StoreError};

const COLUMNS: &str = "id, questionnaire_id, student_email, subject_id, teacher_id, submitted_at";

const ANSWER_COLUMNS: &str = "\
    id, response_id, question_id, answer_text, answer_option_id, answer_rating, answer_boolean, \
    created_at";

pub(crate) async fn find_by_key(
    pool: &PgPool,
    key: &ResponseKey,
) -> Result<Option<QuestionnaireResponse>, sqlx::Error> {
    sqlx::query_as::<_, QuestionnaireResponse>(&format!(
        "SELECT {COLUMNS} FROM questionnaire_responses
         WHERE questionnaire_id = $1
           AND student_email = $2
           AND subject_id = $3
           AND teacher_id IS NOT DISTINCT FROM $4
         LIMIT 1"
    ))
    .bind(&key.questionnaire_id)
    .bind(&key.student_email)
    .bind(&key.subject_id)
    .bind(key.teacher_id.as_deref())
    .fetch_optional(pool)
    .await
}

pub(crate) async fn create(
    pool: &PgPool,
    key: ResponseKey,
) -> Result<QuestionnaireResponse, StoreError> {
    let result = sqlx::query_as::<_, QuestionnaireResponse>(&format!(
        "INSERT INTO questionnaire_responses (
            id, questionnaire_id, student_email, subject_id, teacher_id, submitted_at
        ) VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {COLUMNS}"
    ))
    .bind(new_id())
    .bind(key.questionnaire_id)
    .bind(key.student_email)
    .bind(key.subject_id)
    .bind(key.teacher_id)
    .bind(primitive_now_utc())
    .fetch_one(pool)
    .await;

    match result {
        Ok(response) => Ok(response),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            let constraint = db_err.constraint().unwrap_or("questionnaire_responses");
            Err(StoreError::UniqueViolation(constraint.to_string()))
        }
        Err(err) => Err(err.into()),
    }
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM questionnaire_responses WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub(crate) async fn insert_answers(
    pool: &PgPool,
    answers: Vec<NewAnswer>,
) -> Result<u64, sqlx::Error> {
    if answers.is_empty() {
        return Ok(0);
    }

    let now = primitive_now_utc();
    let mut builder = QueryBuilder::<Postgres>::new(
        "INSERT INTO question_responses (
            id, response_id, question_id, answer_text, answer_option_id, answer_rating,
            answer_boolean, created_at
        ) ",
    );
    builder.push_values(answers, |mut row, answer| {
        row.push_bind(new_id())
            .push_bind(answer.response_id)
            .push_bind(answer.question_id)
            .push_bind(answer.answer_text)
            .push_bind(answer.answer_option_id)
            .push_bind(answer.answer_rating)
            .push_bind(answer.answer_boolean)
            .push_bind(now);
    });
    let result = builder.build().execute(pool).await?;
    Ok(result.rows_affected())
}

pub(crate) async fn list_for_questionnaire(
    pool: &PgPool,
    questionnaire_id: &str,
) -> Result<Vec<QuestionnaireResponse>, sqlx::Error> {
    sqlx::query_as::<_, QuestionnaireResponse>(&format!(
        "SELECT {COLUMNS} FROM questionnaire_responses
         WHERE questionnaire_id = $1
         ORDER BY submitted_at ASC, id ASC"
    ))
    .bind(questionnaire_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Vec<QuestionnaireResponse>, sqlx::Error> {
    sqlx::query_as::<_, QuestionnaireResponse>(&format!(
        "SELECT {COLUMNS} FROM questionnaire_responses WHERE student_email = $1"
    ))
    .bind(email)
    .fetch_all(pool)
    .await
}

pub(crate) async fn count_by_questionnaire(
    pool: &PgPool,
    questionnaire_ids: &[String],
) -> Result<HashMap<String, i64>, sqlx::Error> {
    if questionnaire_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, (String, i64)>(
        "SELECT questionnaire_id, COUNT(*) FROM questionnaire_responses
         WHERE questionnaire_id = ANY($1)
         GROUP BY questionnaire_id",
    )
    .bind(questionnaire_ids)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().collect())
}

pub(crate) async fn list_answers(
    pool: &PgPool,
    response_ids: &[String],
) -> Result<Vec<QuestionResponse>, sqlx::Error> {
    if response_ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, QuestionResponse>(&format!(
        "SELECT {ANSWER_COLUMNS} FROM question_responses
         WHERE response_id = ANY($1)
         ORDER BY created_at ASC, id ASC"
    ))
    .bind(response_ids)
    .fetch_all(pool)
    .await
}
