//! GraphQL schema and its HTTP handlers.
//!
//! Every request carries the shared [`AppState`] and the caller's
//! [`AuthContext`] as request data; resolvers build their services from those.

mod admins;
mod auth;
mod import_export;
mod questionnaires;
mod students;
mod subjects;
mod teachers;


use async_graphql::http::GraphiQLSource;
use async_graphql::{EmptySubscription, MergedObject, Schema};
use axum::extract::{Extension, State};
use axum::http::HeaderMap;
use axum::response::Html;
use axum::Json;

use crate::api::guards::AuthContext;
use crate::core::metrics;
use crate::core::state::AppState;

const MAX_DEPTH: usize = 15;
const MAX_COMPLEXITY: usize = 2000;

#[derive(MergedObject, Default)]
pub(crate) struct QueryRoot(
    auth::AuthQuery,
    admins::AdminQuery,
    subjects::SubjectQuery,
    teachers::TeacherQuery,
    students::StudentQuery,
    questionnaires::QuestionnaireQuery,
    import_export::ExportQuery,
);

#[derive(MergedObject, Default)]
pub(crate) struct MutationRoot(
    auth::AuthMutation,
    admins::AdminMutation,
    subjects::SubjectMutation,
    teachers::TeacherMutation,
    students::StudentMutation,
    questionnaires::QuestionnaireMutation,
    import_export::ImportMutation,
);

pub(crate) type SurveySchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub(crate) fn build_schema() -> SurveySchema {
    Schema::build(QueryRoot::default(), MutationRoot::default(), EmptySubscription)
        .limit_depth(MAX_DEPTH)
        .limit_complexity(MAX_COMPLEXITY)
        .finish()
}

fn operation_kind(query: &str) -> &'static str {
    if query.trim_start().starts_with("mutation") {
        "mutation"
    } else {
        "query"
    }
}

pub(crate) async fn graphql_handler(
    State(state): State<AppState>,
    Extension(schema): Extension<SurveySchema>,
    headers: HeaderMap,
    Json(request): Json<async_graphql::Request>,
) -> Json<async_graphql::Response> {
    let auth = AuthContext::from_headers(&state, &headers).await;
    let kind = operation_kind(&request.query);
    tracing::debug!(
        operation = request.operation_name.as_deref().unwrap_or("-"),
        kind,
        authenticated = auth.user.is_some(),
        "GraphQL operation"
    );

    let response = schema.execute(request.data(state).data(auth)).await;
    metrics::record_graphql_operation(kind, response.is_err());
    Json(response)
}

pub(crate) async fn graphiql(State(state): State<AppState>) -> Html<String> {
    Html(GraphiQLSource::build().endpoint(&state.settings().api().graphql_path).finish())
}
