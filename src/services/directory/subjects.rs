use super::{DirectoryService, SUBJECT_NOT_FOUND};
use crate::db::models::Subject;
use crate::repositories::store::EntityFilter;
use crate::services::error::{OrInternal, ServiceError, ServiceResult};
use crate::services::pagination::{page_window, Paginated, ITEMS_PER_PAGE};

fn duplicate_name(name: &str) -> ServiceError {
    ServiceError::Conflict(format!("Předmět s názvem \"{name}\" již existuje"))
}

impl<'a> DirectoryService<'a> {
    pub(crate) async fn list_subjects(
        &self,
        index: i32,
        name_filter: Option<String>,
    ) -> ServiceResult<Paginated<Subject>> {
        let page = page_window(index, ITEMS_PER_PAGE);
        let filter = EntityFilter { name: name_filter, ids: None };
        let (subjects, total) =
            self.store.list_subjects(&filter, Some(page)).await.or_internal("fetch subjects")?;
        Ok(Paginated::new(subjects, total, page))
    }

    pub(crate) async fn create_subject(&self, name: String) -> ServiceResult<Subject> {
        if self.store.find_subject_by_name(&name).await.or_internal("check subject")?.is_some() {
            return Err(duplicate_name(&name));
        }
        let subject = self
            .store
            .insert_subjects(std::slice::from_ref(&name))
            .await
            .or_internal("create subject")?
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::Internal("Failed to create subject".to_string()))?;
        tracing::info!(subject_id = %subject.id, "Subject created");
        Ok(subject)
    }

    pub(crate) async fn update_subject(&self, id: &str, name: String) -> ServiceResult<Subject> {
        let ids = [id.to_string()];
        if self.store.find_subjects_by_ids(&ids).await.or_internal("load subject")?.is_empty() {
            return Err(ServiceError::NotFound(SUBJECT_NOT_FOUND.to_string()));
        }
        let taken = self.store.find_subject_by_name(&name).await.or_internal("check subject")?;
        if taken.is_some_and(|other| other.id != id) {
            return Err(duplicate_name(&name));
        }
        self.store
            .rename_subject(id, &name)
            .await
            .or_internal("update subject")?
            .ok_or_else(|| ServiceError::NotFound(SUBJECT_NOT_FOUND.to_string()))
    }

    /// Deletes the subject and, by cascade, its enrollment rows. Returns the
    /// record as it was before deletion.
    pub(crate) async fn delete_subject(&self, id: &str) -> ServiceResult<Subject> {
        let ids = [id.to_string()];
        let subject = self
            .store
            .find_subjects_by_ids(&ids)
            .await
            .or_internal("load subject")?
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::NotFound(SUBJECT_NOT_FOUND.to_string()))?;
        self.store.delete_subjects(&ids).await.or_internal("delete subject")?;
        tracing::info!(subject_id = %id, "Subject deleted");
        Ok(subject)
    }

    pub(crate) async fn delete_subjects(&self, ids: &[String]) -> ServiceResult<u64> {
        self.store.delete_subjects(ids).await.or_internal("delete subjects")
    }
}
