use super::{GroupSummary, QuestionnaireService, GROUP_NOT_FOUND};
use crate::db::models::QuestionnaireGroup;
use crate::repositories::store::{GroupPatch, NewGroup};
use crate::services::error::{OrInternal, ServiceError, ServiceResult};
use crate::services::pagination::{page_window, Paginated, QUESTIONNAIRES_PER_PAGE};

fn group_not_found() -> ServiceError {
    ServiceError::NotFound(GROUP_NOT_FOUND.to_string())
}

impl<'a> QuestionnaireService<'a> {
    pub(crate) async fn list_groups(
        &self,
        name_filter: Option<&str>,
        index: i32,
    ) -> ServiceResult<Paginated<GroupSummary>> {
        let page = page_window(index, QUESTIONNAIRES_PER_PAGE);
        let (groups, total) = self
            .store
            .list_groups(name_filter, page)
            .await
            .or_internal("fetch questionnaire groups")?;

        let ids: Vec<String> = groups.iter().map(|group| group.id.clone()).collect();
        let counts = if ids.is_empty() {
            Default::default()
        } else {
            self.store
                .count_questionnaires_by_group(&ids)
                .await
                .or_internal("count questionnaires")?
        };

        let items = groups
            .into_iter()
            .map(|group| GroupSummary {
                questionnaire_count: counts.get(&group.id).copied().unwrap_or(0),
                group,
            })
            .collect();
        Ok(Paginated::new(items, total, page))
    }

    pub(crate) async fn group(&self, id: &str) -> ServiceResult<Option<GroupSummary>> {
        match self.store.find_group(id).await.or_internal("fetch questionnaire group")? {
            Some(group) => self.summarize(group).await.map(Some),
            None => Ok(None),
        }
    }

    async fn summarize(&self, group: QuestionnaireGroup) -> ServiceResult<GroupSummary> {
        let counts = self
            .store
            .count_questionnaires_by_group(std::slice::from_ref(&group.id))
            .await
            .or_internal("count questionnaires")?;
        let questionnaire_count = counts.get(&group.id).copied().unwrap_or(0);
        Ok(GroupSummary { group, questionnaire_count })
    }

    pub(crate) async fn create_group(
        &self,
        name: String,
        description: Option<String>,
    ) -> ServiceResult<GroupSummary> {
        let group = self
            .store
            .insert_group(NewGroup { name, description })
            .await
            .or_internal("create questionnaire group")?;
        tracing::info!(group_id = %group.id, "Questionnaire group created");
        Ok(GroupSummary { group, questionnaire_count: 0 })
    }

    pub(crate) async fn update_group(
        &self,
        id: &str,
        patch: GroupPatch,
    ) -> ServiceResult<GroupSummary> {
        let group = self
            .store
            .update_group(id, patch)
            .await
            .or_internal("update questionnaire group")?
            .ok_or_else(group_not_found)?;
        self.summarize(group).await
    }

    /// Removes the group together with its questionnaires.
    pub(crate) async fn delete_group(&self, id: &str) -> ServiceResult<()> {
        if !self.store.delete_group(id).await.or_internal("delete questionnaire group")? {
            return Err(group_not_found());
        }
        tracing::info!(group_id = %id, "Questionnaire group deleted");
        Ok(())
    }
}
