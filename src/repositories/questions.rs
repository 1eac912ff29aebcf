use std::collections::HashMap;

use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::core::time::primitive_now_utc;
use crate::db::models::{Question, QuestionOption};
use crate::repositories::new_id;
use crate::repositories::store::{NewOption, NewQuestion};

const COLUMNS: &str = "\
    id, questionnaire_id, text, question_type, required, order_index, created_at, updated_at";

const OPTION_COLUMNS: &str = "id, question_id, text, order_index, created_at";

pub(crate) async fn list_for_questionnaires(
    pool: &PgPool,
    questionnaire_ids: &[String],
) -> Result<Vec<Question>, sqlx::Error> {
    if questionnaire_ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM questions
         WHERE questionnaire_id = ANY($1)
         ORDER BY questionnaire_id, order_index ASC, insertion_seq ASC"
    ))
    .bind(questionnaire_ids)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_options(
    pool: &PgPool,
    question_ids: &[String],
) -> Result<Vec<QuestionOption>, sqlx::Error> {
    if question_ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, QuestionOption>(&format!(
        "SELECT {OPTION_COLUMNS} FROM question_options
         WHERE question_id = ANY($1)
         ORDER BY question_id, order_index ASC, insertion_seq ASC"
    ))
    .bind(question_ids)
    .fetch_all(pool)
    .await
}

pub(crate) async fn insert_many(
    pool: &PgPool,
    questions: Vec<NewQuestion>,
) -> Result<Vec<Question>, sqlx::Error> {
    if questions.is_empty() {
        return Ok(Vec::new());
    }

    let now = primitive_now_utc();
    let rows: Vec<(String, NewQuestion)> =
        questions.into_iter().map(|question| (new_id(), question)).collect();
    let order: Vec<String> = rows.iter().map(|(id, _)| id.clone()).collect();

    let mut builder = QueryBuilder::<Postgres>::new(
        "INSERT INTO questions (
            id, questionnaire_id, text, question_type, required, order_index, created_at, updated_at
        ) ",
    );
    builder.push_values(rows, |mut row, (id, question)| {
        row.push_bind(id)
            .push_bind(question.questionnaire_id)
            .push_bind(question.text)
            .push_bind(question.question_type)
            .push_bind(question.required)
            .push_bind(question.order_index)
            .push_bind(now)
            .push_bind(now);
    });
    builder.push(format!(" RETURNING {COLUMNS}"));
    let created = builder.build_query_as::<Question>().fetch_all(pool).await?;

    // RETURNING does not promise VALUES order.
    let mut by_id: HashMap<String, Question> =
        created.into_iter().map(|question| (question.id.clone(), question)).collect();
    Ok(order.into_iter().filter_map(|id| by_id.remove(&id)).collect())
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    question: NewQuestion,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE questions SET
            text = $1,
            question_type = $2,
            required = $3,
            order_index = $4,
            updated_at = $5
         WHERE id = $6",
    )
    .bind(question.text)
    .bind(question.question_type)
    .bind(question.required)
    .bind(question.order_index)
    .bind(primitive_now_utc())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn delete_many(pool: &PgPool, ids: &[String]) -> Result<u64, sqlx::Error> {
    if ids.is_empty() {
        return Ok(0);
    }

    let result =
        sqlx::query("DELETE FROM questions WHERE id = ANY($1)").bind(ids).execute(pool).await?;
    Ok(result.rows_affected())
}

pub(crate) async fn insert_options(
    pool: &PgPool,
    options: Vec<NewOption>,
) -> Result<Vec<QuestionOption>, sqlx::Error> {
    if options.is_empty() {
        return Ok(Vec::new());
    }

    let now = primitive_now_utc();
    let mut builder = QueryBuilder::<Postgres>::new(
        "INSERT INTO question_options (id, question_id, text, order_index, created_at) ",
    );
    builder.push_values(options, |mut row, option| {
        row.push_bind(new_id())
            .push_bind(option.question_id)
            .push_bind(option.text)
            .push_bind(option.order_index)
            .push_bind(now);
    });
    builder.push(format!(" RETURNING {OPTION_COLUMNS}"));
    builder.build_query_as::<QuestionOption>().fetch_all(pool).await
}

pub(crate) async fn delete_options_for(
    pool: &PgPool,
    question_ids: &[String],
) -> Result<u64, sqlx::Error> {
    if question_ids.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query("DELETE FROM question_options WHERE question_id = ANY($1)")
        .bind(question_ids)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
