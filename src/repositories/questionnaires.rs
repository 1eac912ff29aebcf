use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::core::time::primitive_now_utc;
use crate::db::models::Questionnaire;
use crate::repositories::store::{NewQuestionnaire, Page, QuestionnaireFilter, QuestionnairePatch};
use crate::repositories::{contains_pattern, new_id, push_page};

const COLUMNS: &str = "\
    id, group_id, title, description, is_active, is_anonymous, assignment_type, \
    created_at, updated_at";

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &QuestionnaireFilter) {
    builder.push(" WHERE TRUE");
    if let Some(group_id) = &filter.group_id {
        builder.push(" AND group_id = ");
        builder.push_bind(group_id.clone());
    }
    if let Some(title) = filter.title.as_deref().filter(|title| !title.trim().is_empty()) {
        builder.push(" AND title ILIKE ");
        builder.push_bind(contains_pattern(title.trim()));
    }
    if let Some(is_active) = filter.is_active {
        builder.push(" AND is_active = ");
        builder.push_bind(is_active);
    }
}

pub(crate) async fn list(
    pool: &PgPool,
    filter: &QuestionnaireFilter,
    page: Page,
) -> Result<(Vec<Questionnaire>, i64), sqlx::Error> {
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM questionnaires");
    push_filter(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut builder =
        QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM questionnaires"));
    push_filter(&mut builder, filter);
    builder.push(" ORDER BY created_at DESC, id ASC");
    push_page(&mut builder, Some(page));
    let questionnaires = builder.build_query_as::<Questionnaire>().fetch_all(pool).await?;

    Ok((questionnaires, total))
}

pub(crate) async fn list_active(pool: &PgPool) -> Result<Vec<Questionnaire>, sqlx::Error> {
    sqlx::query_as::<_, Questionnaire>(&format!(
        "SELECT {COLUMNS} FROM questionnaires WHERE is_active = TRUE ORDER BY created_at DESC"
    ))
    .fetch_all(pool)
    .await
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<Questionnaire>, sqlx::Error> {
    let sql = format!("SELECT {COLUMNS} FROM questionnaires WHERE id = $1");
    sqlx::query_as::<_, Questionnaire>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn title_exists(
    pool: &PgPool,
    group_id: &str,
    title: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM questionnaires WHERE group_id = $1 AND title = $2)",
    )
    .bind(group_id)
    .bind(title)
    .fetch_one(pool)
    .await
}

pub(crate) async fn create(
    pool: &PgPool,
    params: NewQuestionnaire,
) -> Result<Questionnaire, sqlx::Error> {
    let now = primitive_now_utc();
    sqlx::query_as::<_, Questionnaire>(&format!(
        "INSERT INTO questionnaires (
            id, group_id, title, description, is_active, is_anonymous, assignment_type,
            created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
        RETURNING {COLUMNS}"
    ))
    .bind(new_id())
    .bind(params.group_id)
    .bind(params.title)
    .bind(params.description)
    .bind(params.is_active)
    .bind(params.is_anonymous)
    .bind(params.assignment_type)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    patch: QuestionnairePatch,
) -> Result<Option<Questionnaire>, sqlx::Error> {
    sqlx::query_as::<_, Questionnaire>(&format!(
        "UPDATE questionnaires SET
            title = COALESCE($1, title),
            description = COALESCE($2, description),
            is_active = COALESCE($3, is_active),
            is_anonymous = COALESCE($4, is_anonymous),
            assignment_type = COALESCE($5, assignment_type),
            updated_at = $6
         WHERE id = $7
         RETURNING {COLUMNS}"
    ))
    .bind(patch.title)
    .bind(patch.description)
    .bind(patch.is_active)
    .bind(patch.is_anonymous)
    .bind(patch.assignment_type)
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
        sqlx::query("DELETE FROM questionnaires WHERE id = ANY($1)").bind(ids).execute(pool).await?;
    Ok(result.rows_affected())
}
