use std::collections::HashMap;

use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::core::time::primitive_now_utc;
use crate::db::models::QuestionnaireGroup;
use crate::repositories::store::{GroupPatch, NewGroup, Page};
use crate::repositories::{contains_pattern, new_id, push_page};

const COLUMNS: &str = "id, name, description, created_at, updated_at";

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, name: Option<&str>) {
    if let Some(name) = name.filter(|name| !name.trim().is_empty()) {
        builder.push(" WHERE name ILIKE ");
        builder.push_bind(contains_pattern(name.trim()));
    }
}

pub(crate) async fn list(
    pool: &PgPool,
    name: Option<&str>,
    page: Page,
) -> Result<(Vec<QuestionnaireGroup>, i64), sqlx::Error> {
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM questionnaire_groups");
    push_filter(&mut count, name);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut builder =
        QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM questionnaire_groups"));
    push_filter(&mut builder, name);
    builder.push(" ORDER BY created_at DESC, id ASC");
    push_page(&mut builder, Some(page));
    let groups = builder.build_query_as::<QuestionnaireGroup>().fetch_all(pool).await?;

    Ok((groups, total))
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<QuestionnaireGroup>, sqlx::Error> {
    sqlx::query_as::<_, QuestionnaireGroup>(&format!(
        "SELECT {COLUMNS} FROM questionnaire_groups WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn create(
    pool: &PgPool,
    group: NewGroup,
) -> Result<QuestionnaireGroup, sqlx::Error> {
    let now = primitive_now_utc();
    sqlx::query_as::<_, QuestionnaireGroup>(&format!(
        "INSERT INTO questionnaire_groups (id, name, description, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $4)
         RETURNING {COLUMNS}"
    ))
    .bind(new_id())
    .bind(group.name)
    .bind(group.description)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    patch: GroupPatch,
) -> Result<Option<QuestionnaireGroup>, sqlx::Error> {
    sqlx::query_as::<_, QuestionnaireGroup>(&format!(
        "UPDATE questionnaire_groups SET
            name = COALESCE($1, name),
            description = COALESCE($2, description),
            updated_at = $3
         WHERE id = $4
         RETURNING {COLUMNS}"
    ))
    .bind(patch.name)
    .bind(patch.description)
    .bind(primitive_now_utc())
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM questionnaire_groups WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn count_questionnaires(
    pool: &PgPool,
    group_ids: &[String],
) -> Result<HashMap<String, i64>, sqlx::Error> {
    if group_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, (String, i64)>(
        "SELECT group_id, COUNT(*) FROM questionnaires WHERE group_id = ANY($1) GROUP BY group_id",
    )
    .bind(group_ids)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().collect())
}
