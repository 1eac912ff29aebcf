use async_graphql::{Context, Object};

use crate::api::errors::{bulk_deleted, respond, GqlResult, IntoGql};
use crate::api::guards::ContextExt;
use crate::db::models::Subject;
use crate::schemas::directory::{SubjectPayload, SubjectView};
use crate::schemas::{BulkDeletePayload, Page};
use crate::services::directory::DirectoryService;

#[derive(Default)]
pub(crate) struct SubjectQuery;

#[Object]
impl SubjectQuery {
    async fn list_subjects(
        &self,
        ctx: &Context<'_>,
        #[graphql(default)] index: i32,
        name_filter: Option<String>,
    ) -> GqlResult<Page<SubjectView>> {
        ctx.require_admin()?;
        let state = ctx.app_state()?;
        let page = DirectoryService::new(state.store(), state.identity())
            .list_subjects(index, name_filter)
            .await
            .gql()?;
        Ok(Page::from_service(page))
    }
}

#[derive(Default)]
pub(crate) struct SubjectMutation;

#[Object]
impl SubjectMutation {
    async fn create_subject(&self, ctx: &Context<'_>, name: String) -> GqlResult<SubjectPayload> {
        ctx.require_admin()?;
        let state = ctx.app_state()?;
        let outcome =
            DirectoryService::new(state.store(), state.identity()).create_subject(name).await;
        respond(outcome, "Předmět byl úspěšně vytvořen", subject_payload)
    }

    async fn update_subject(
        &self,
        ctx: &Context<'_>,
        id: String,
        name: String,
    ) -> GqlResult<SubjectPayload> {
        ctx.require_admin()?;
        let state = ctx.app_state()?;
        let outcome =
            DirectoryService::new(state.store(), state.identity()).update_subject(&id, name).await;
        respond(outcome, "Předmět byl úspěšně aktualizován", subject_payload)
    }

    async fn delete_subject(&self, ctx: &Context<'_>, id: String) -> GqlResult<SubjectPayload> {
        ctx.require_admin()?;
        let state = ctx.app_state()?;
        let outcome =
            DirectoryService::new(state.store(), state.identity()).delete_subject(&id).await;
        respond(outcome, "Předmět byl úspěšně smazán", subject_payload)
    }

    async fn delete_subjects(
        &self,
        ctx: &Context<'_>,
        ids: Vec<String>,
    ) -> GqlResult<BulkDeletePayload> {
        ctx.require_admin()?;
        let state = ctx.app_state()?;
        let outcome =
            DirectoryService::new(state.store(), state.identity()).delete_subjects(&ids).await;
        bulk_deleted(outcome, "předmětů")
    }
}

fn subject_payload(
    success: bool,
    message: String,
    subject: Option<Subject>,
) -> SubjectPayload {
    SubjectPayload { success, message, subject: subject.map(Into::into) }
}
