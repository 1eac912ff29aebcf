use async_graphql::{Context, Object};

use crate::api::errors::{bulk_deleted, respond, GqlResult, IntoGql};
use crate::api::guards::ContextExt;
use crate::schemas::directory::{
    AssignmentDataView, StudentAssignmentArg, StudentDetail, StudentPayload,
    SubjectWithTeachersView,
};
use crate::schemas::{BulkDeletePayload, Page};
use crate::services::directory::{
    CreateStudentInput, DirectoryService, StudentListing, UpdateStudentInput,
};

fn student_payload(
    success: bool,
    message: String,
    student: Option<StudentListing>,
) -> StudentPayload {
    StudentPayload { success, message, student: student.map(Into::into) }
}

#[derive(Default)]
pub(crate) struct StudentQuery;

#[Object]
impl StudentQuery {
    async fn list_students(
        &self,
        ctx: &Context<'_>,
        #[graphql(default)] index: i32,
        name_filter: Option<String>,
        teacher_filter: Option<String>,
        subject_filter: Option<String>,
    ) -> GqlResult<Page<StudentDetail>> {
        ctx.require_admin()?;
        let state = ctx.app_state()?;
        let page = DirectoryService::new(state.store(), state.identity())
            .list_students(index, name_filter, teacher_filter, subject_filter)
            .await
            .gql()?;
        Ok(Page::from_service(page))
    }

    /// Subjects and students for the teacher form.
    async fn get_assignment_data(&self, ctx: &Context<'_>) -> GqlResult<AssignmentDataView> {
        ctx.require_admin()?;
        let state = ctx.app_state()?;
        let data =
            DirectoryService::new(state.store(), state.identity()).teacher_form_data().await.gql()?;
        Ok(data.into())
    }

    /// Subjects with their teachers for the student form.
    async fn get_student_assignment_data(
        &self,
        ctx: &Context<'_>,
    ) -> GqlResult<Vec<SubjectWithTeachersView>> {
        ctx.require_admin()?;
        let state = ctx.app_state()?;
        let subjects =
            DirectoryService::new(state.store(), state.identity()).student_form_data().await.gql()?;
        Ok(subjects.into_iter().map(Into::into).collect())
    }
}

#[derive(Default)]
pub(crate) struct StudentMutation;

#[Object]
impl StudentMutation {
    async fn create_student(
        &self,
        ctx: &Context<'_>,
        name: String,
        email: Option<String>,
        password: Option<String>,
        #[graphql(default)] assignments: Vec<StudentAssignmentArg>,
    ) -> GqlResult<StudentPayload> {
        ctx.require_admin()?;
        let state = ctx.app_state()?;
        let input = CreateStudentInput {
            name,
            email,
            password,
            assignments: assignments.into_iter().map(Into::into).collect(),
        };
        let outcome =
            DirectoryService::new(state.store(), state.identity()).create_student(input).await;
        respond(outcome, "Student byl úspěšně vytvořen", student_payload)
    }

    async fn update_student(
        &self,
        ctx: &Context<'_>,
        id: String,
        name: String,
        email: Option<String>,
        password: Option<String>,
        assignments: Option<Vec<StudentAssignmentArg>>,
    ) -> GqlResult<StudentPayload> {
        ctx.require_admin()?;
        let state = ctx.app_state()?;
        let input = UpdateStudentInput {
            name,
            email,
            password,
            assignments: assignments.map(|rows| rows.into_iter().map(Into::into).collect()),
        };
        let outcome =
            DirectoryService::new(state.store(), state.identity()).update_student(&id, input).await;
        respond(outcome, "Student byl úspěšně aktualizován", student_payload)
    }

    async fn delete_student(&self, ctx: &Context<'_>, id: String) -> GqlResult<StudentPayload> {
        ctx.require_admin()?;
        let state = ctx.app_state()?;
        let outcome =
            DirectoryService::new(state.store(), state.identity()).delete_student(&id).await;
        respond(outcome, "Student byl úspěšně smazán", student_payload)
    }

    async fn delete_students(
        &self,
        ctx: &Context<'_>,
        ids: Vec<String>,
    ) -> GqlResult<BulkDeletePayload> {
        ctx.require_admin()?;
        let state = ctx.app_state()?;
        let outcome =
            DirectoryService::new(state.store(), state.identity()).delete_students(&ids).await;
        bulk_deleted(outcome, "studentů")
    }
}
