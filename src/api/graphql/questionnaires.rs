use async_graphql::{Context, Object};

use crate::api::errors::{bulk_deleted, respond, GqlResult, IntoGql};
use crate::api::guards::ContextExt;
use crate::db::types::AssignmentType;
use crate::repositories::store::{GroupPatch, QuestionnaireFilter};
use crate::schemas::questionnaire::{
    GroupPayload, GroupView, QuestionInputArg, QuestionnaireAssignmentDataView,
    QuestionnaireListItem, QuestionnairePayload, QuestionnaireView, StudentQuestionnaireView,
    SubmitResponseInput, SubmitResponsePayload,
};
use crate::schemas::results::QuestionnaireResultsView;
use crate::schemas::{BulkDeletePayload, Page};
use crate::services::questionnaires::{
    CreateQuestionnaireInput, GroupSummary, QuestionnaireDetail, QuestionnaireService,
    UpdateQuestionnaireInput,
};
use crate::services::responses::ResponseService;
use crate::services::results::ResultsService;

fn group_payload(success: bool, message: String, group: Option<GroupSummary>) -> GroupPayload {
    GroupPayload { success, message, group: group.map(Into::into) }
}

fn questionnaire_payload(
    success: bool,
    message: String,
    questionnaire: Option<QuestionnaireDetail>,
) -> QuestionnairePayload {
    QuestionnairePayload { success, message, questionnaire: questionnaire.map(Into::into) }
}

#[derive(Default)]
pub(crate) struct QuestionnaireQuery;

#[Object]
impl QuestionnaireQuery {
    async fn list_questionnaire_groups(
        &self,
        ctx: &Context<'_>,
        #[graphql(default)] index: i32,
        name_filter: Option<String>,
    ) -> GqlResult<Page<GroupView>> {
        ctx.require_admin()?;
        let state = ctx.app_state()?;
        let page = QuestionnaireService::new(state.store())
            .list_groups(name_filter.as_deref(), index)
            .await
            .gql()?;
        Ok(Page::from_service(page))
    }

    async fn get_questionnaire_group(
        &self,
        ctx: &Context<'_>,
        id: String,
    ) -> GqlResult<Option<GroupView>> {
        ctx.require_admin()?;
        let state = ctx.app_state()?;
        let group = QuestionnaireService::new(state.store()).group(&id).await.gql()?;
        Ok(group.map(Into::into))
    }

    async fn list_questionnaires(
        &self,
        ctx: &Context<'_>,
        group_id: Option<String>,
        #[graphql(default)] index: i32,
        title_filter: Option<String>,
        is_active: Option<bool>,
    ) -> GqlResult<Page<QuestionnaireListItem>> {
        ctx.require_admin()?;
        let state = ctx.app_state()?;
        let filter = QuestionnaireFilter { group_id, title: title_filter, is_active };
        let page = QuestionnaireService::new(state.store()).list(filter, index).await.gql()?;
        Ok(Page::from_service(page))
    }

    /// Admins see any questionnaire; students only those on their own list.
    async fn get_questionnaire(
        &self,
        ctx: &Context<'_>,
        id: String,
    ) -> GqlResult<Option<QuestionnaireView>> {
        let user = ctx.require_auth()?;
        let state = ctx.app_state()?;
        let detail = QuestionnaireService::new(state.store())
            .detail_for(&user.id, user.role, &id)
            .await
            .gql()?;
        Ok(detail.map(Into::into))
    }

    async fn get_questionnaire_assignment_data(
        &self,
        ctx: &Context<'_>,
        subject_id: Option<String>,
        teacher_id: Option<String>,
    ) -> GqlResult<QuestionnaireAssignmentDataView> {
        ctx.require_admin()?;
        let state = ctx.app_state()?;
        let data = QuestionnaireService::new(state.store())
            .assignment_data(subject_id, teacher_id)
            .await
            .gql()?;
        Ok(data.into())
    }

    async fn get_student_questionnaires(
        &self,
        ctx: &Context<'_>,
    ) -> GqlResult<Vec<StudentQuestionnaireView>> {
        let student = ctx.require_student()?;
        let state = ctx.app_state()?;
        let entries = QuestionnaireService::new(state.store())
            .student_questionnaires(&student.id)
            .await
            .gql()?;
        Ok(entries.into_iter().map(Into::into).collect())
    }

    async fn has_submitted_response(
        &self,
        ctx: &Context<'_>,
        questionnaire_id: String,
        subject_id: String,
        teacher_id: Option<String>,
    ) -> GqlResult<bool> {
        let student = ctx.require_student()?;
        let state = ctx.app_state()?;
        ResponseService::new(state.store())
            .has_submitted(&student.id, &questionnaire_id, &subject_id, teacher_id.as_deref())
            .await
            .gql()
    }

    async fn get_questionnaire_results(
        &self,
        ctx: &Context<'_>,
        questionnaire_id: String,
    ) -> GqlResult<QuestionnaireResultsView> {
        ctx.require_admin()?;
        let state = ctx.app_state()?;
        let results =
            ResultsService::new(state.store()).results(&questionnaire_id).await.gql()?;
        Ok(results.into())
    }
}

#[derive(Default)]
pub(crate) struct QuestionnaireMutation;

#[Object]
impl QuestionnaireMutation {
    async fn create_questionnaire_group(
        &self,
        ctx: &Context<'_>,
        name: String,
        description: Option<String>,
    ) -> GqlResult<GroupPayload> {
        ctx.require_admin()?;
        let state = ctx.app_state()?;
        let outcome =
            QuestionnaireService::new(state.store()).create_group(name, description).await;
        respond(outcome, "Skupina dotazníků byla úspěšně vytvořena", group_payload)
    }

    async fn update_questionnaire_group(
        &self,
        ctx: &Context<'_>,
        id: String,
        name: Option<String>,
        description: Option<String>,
    ) -> GqlResult<GroupPayload> {
        ctx.require_admin()?;
        let state = ctx.app_state()?;
        let patch = GroupPatch { name, description };
        let outcome = QuestionnaireService::new(state.store()).update_group(&id, patch).await;
        respond(outcome, "Skupina dotazníků byla úspěšně aktualizována", group_payload)
    }

    async fn delete_questionnaire_group(
        &self,
        ctx: &Context<'_>,
        id: String,
    ) -> GqlResult<GroupPayload> {
        ctx.require_admin()?;
        let state = ctx.app_state()?;
        let outcome = QuestionnaireService::new(state.store()).delete_group(&id).await;
        respond(outcome, "Skupina dotazníků byla úspěšně smazána", |success, message, _| {
            GroupPayload { success, message, group: None }
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn create_questionnaire(
        &self,
        ctx: &Context<'_>,
        group_id: String,
        title: String,
        description: Option<String>,
        #[graphql(default)] is_anonymous: bool,
        #[graphql(default)] assignment_type: AssignmentType,
        #[graphql(default)] assignment_ids: Vec<String>,
        #[graphql(default)] questions: Vec<QuestionInputArg>,
    ) -> GqlResult<QuestionnairePayload> {
        ctx.require_admin()?;
        let state = ctx.app_state()?;
        let input = CreateQuestionnaireInput {
            group_id,
            title,
            description,
            is_anonymous,
            assignment_type,
            assignment_ids,
            questions: questions.into_iter().map(Into::into).collect(),
        };
        let outcome = QuestionnaireService::new(state.store()).create(input).await;
        respond(outcome, "Dotazník byl úspěšně vytvořen", questionnaire_payload)
    }

    /// Supplying `questions` replaces the question set: entries with an id are
    /// updated, entries without one created and missing ones deleted.
    #[allow(clippy::too_many_arguments)]
    async fn update_questionnaire(
        &self,
        ctx: &Context<'_>,
        id: String,
        title: Option<String>,
        description: Option<String>,
        is_active: Option<bool>,
        is_anonymous: Option<bool>,
        assignment_type: Option<AssignmentType>,
        assignment_ids: Option<Vec<String>>,
        questions: Option<Vec<QuestionInputArg>>,
    ) -> GqlResult<QuestionnairePayload> {
        ctx.require_admin()?;
        let state = ctx.app_state()?;
        let input = UpdateQuestionnaireInput {
            title,
            description,
            is_active,
            is_anonymous,
            assignment_type,
            assignment_ids,
            questions: questions.map(|rows| rows.into_iter().map(Into::into).collect()),
        };
        let outcome = QuestionnaireService::new(state.store()).update(&id, input).await;
        respond(outcome, "Dotazník byl úspěšně aktualizován", questionnaire_payload)
    }

    async fn delete_questionnaire(
        &self,
        ctx: &Context<'_>,
        id: String,
    ) -> GqlResult<QuestionnairePayload> {
        ctx.require_admin()?;
        let state = ctx.app_state()?;
        let outcome = QuestionnaireService::new(state.store()).delete(&id).await;
        respond(outcome, "Dotazník byl úspěšně smazán", |success, message, _| {
            QuestionnairePayload { success, message, questionnaire: None }
        })
    }

    async fn delete_questionnaires(
        &self,
        ctx: &Context<'_>,
        ids: Vec<String>,
    ) -> GqlResult<BulkDeletePayload> {
        ctx.require_admin()?;
        let state = ctx.app_state()?;
        let outcome = QuestionnaireService::new(state.store()).delete_many(&ids).await;
        bulk_deleted(outcome, "dotazníků")
    }

    /// Copies the questionnaire as an inactive "(kopie)" in the same group.
    async fn duplicate_questionnaire(
        &self,
        ctx: &Context<'_>,
        id: String,
    ) -> GqlResult<QuestionnairePayload> {
        ctx.require_admin()?;
        let state = ctx.app_state()?;
        let outcome = QuestionnaireService::new(state.store()).duplicate(&id).await;
        respond(outcome, "Dotazník byl úspěšně zduplikován", questionnaire_payload)
    }

    /// Every rejected submission is a transport error with its own code.
    async fn submit_questionnaire_response(
        &self,
        ctx: &Context<'_>,
        input: SubmitResponseInput,
    ) -> GqlResult<SubmitResponsePayload> {
        let student = ctx.require_student()?;
        let state = ctx.app_state()?;
        let receipt =
            ResponseService::new(state.store()).submit(&student.id, input.into()).await.gql()?;
        Ok(receipt.into())
    }
}
