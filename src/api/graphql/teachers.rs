use async_graphql::{Context, Object};

use crate::api::errors::{bulk_deleted, respond, GqlResult, IntoGql};
use crate::api::guards::ContextExt;
use crate::schemas::directory::{TeacherAssignmentArg, TeacherDetail, TeacherPayload};
use crate::schemas::{BulkDeletePayload, Page};
use crate::services::directory::{DirectoryService, TeacherListing};

fn teacher_payload(
    success: bool,
    message: String,
    teacher: Option<TeacherListing>,
) -> TeacherPayload {
    TeacherPayload { success, message, teacher: teacher.map(Into::into) }
}

#[derive(Default)]
pub(crate) struct TeacherQuery;

#[Object]
impl TeacherQuery {
    async fn list_teachers(
        &self,
        ctx: &Context<'_>,
        #[graphql(default)] index: i32,
        name_filter: Option<String>,
        subject_filter: Option<String>,
    ) -> GqlResult<Page<TeacherDetail>> {
        ctx.require_admin()?;
        let state = ctx.app_state()?;
        let page = DirectoryService::new(state.store(), state.identity())
            .list_teachers(index, name_filter, subject_filter)
            .await
            .gql()?;
        Ok(Page::from_service(page))
    }
}

#[derive(Default)]
pub(crate) struct TeacherMutation;

#[Object]
impl TeacherMutation {
    async fn create_teacher(
        &self,
        ctx: &Context<'_>,
        name: String,
        #[graphql(default)] assignments: Vec<TeacherAssignmentArg>,
    ) -> GqlResult<TeacherPayload> {
        ctx.require_admin()?;
        let state = ctx.app_state()?;
        let assignments = assignments.into_iter().map(Into::into).collect();
        let outcome = DirectoryService::new(state.store(), state.identity())
            .create_teacher(name, assignments)
            .await;
        respond(outcome, "Učitel byl úspěšně vytvořen", teacher_payload)
    }

    /// Omitting `assignments` keeps the teacher's current subjects.
    async fn update_teacher(
        &self,
        ctx: &Context<'_>,
        id: String,
        name: String,
        assignments: Option<Vec<TeacherAssignmentArg>>,
    ) -> GqlResult<TeacherPayload> {
        ctx.require_admin()?;
        let state = ctx.app_state()?;
        let assignments =
            assignments.map(|rows| rows.into_iter().map(Into::into).collect::<Vec<_>>());
        let outcome = DirectoryService::new(state.store(), state.identity())
            .update_teacher(&id, name, assignments)
            .await;
        respond(outcome, "Učitel byl úspěšně aktualizován", teacher_payload)
    }

    async fn delete_teacher(&self, ctx: &Context<'_>, id: String) -> GqlResult<TeacherPayload> {
        ctx.require_admin()?;
        let state = ctx.app_state()?;
        let outcome =
            DirectoryService::new(state.store(), state.identity()).delete_teacher(&id).await;
        respond(outcome, "Učitel byl úspěšně smazán", teacher_payload)
    }

    async fn delete_teachers(
        &self,
        ctx: &Context<'_>,
        ids: Vec<String>,
    ) -> GqlResult<BulkDeletePayload> {
        ctx.require_admin()?;
        let state = ctx.app_state()?;
        let outcome =
            DirectoryService::new(state.store(), state.identity()).delete_teachers(&ids).await;
        bulk_deleted(outcome, "učitelů")
    }
}
