use std::collections::HashMap;

use async_graphql::{OutputType, SimpleObject};
use serde::Serialize;

use crate::services::pagination::Paginated;

pub(crate) mod auth;
pub(crate) mod directory;
pub(crate) mod import;
pub(crate) mod questionnaire;
pub(crate) mod results;

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) service: String,
    pub(crate) status: String,
    pub(crate) components: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RootResponse {
    pub(crate) message: String,
    pub(crate) version: String,
    pub(crate) graphql_url: String,
}

/// One page of a list query; `has_more` is true while later pages exist.
#[derive(Debug, SimpleObject)]
#[graphql(concrete(name = "SubjectPage", params(directory::SubjectView)))]
#[graphql(concrete(name = "TeacherPage", params(directory::TeacherDetail)))]
#[graphql(concrete(name = "StudentPage", params(directory::StudentDetail)))]
#[graphql(concrete(name = "QuestionnaireGroupPage", params(questionnaire::GroupView)))]
#[graphql(concrete(name = "QuestionnairePage", params(questionnaire::QuestionnaireListItem)))]
pub(crate) struct Page<T: OutputType> {
    pub(crate) items: Vec<T>,
    pub(crate) total_count: i64,
    pub(crate) has_more: bool,
}

impl<T: OutputType> Page<T> {
    pub(crate) fn from_service<S>(page: Paginated<S>) -> Self
    where
        T: From<S>,
    {
        let page = page.map(T::from);
        Self { items: page.items, total_count: page.total_count, has_more: page.has_more }
    }
}

/// Result of a bulk delete: `deleted_count` rows were removed.
#[derive(Debug, SimpleObject)]
pub(crate) struct BulkDeletePayload {
    pub(crate) success: bool,
    pub(crate) message: String,
    pub(crate) deleted_count: i64,
}
