use std::collections::{HashMap, HashSet};

use super::{DirectoryService, TeacherListing, TeacherSubject, TEACHER_NOT_FOUND};
use crate::db::models::{Enrollment, Teacher};
use crate::repositories::store::{EnrollmentFilter, EnrollmentOwner, EntityFilter, TripleKey};
use crate::services::error::{OrInternal, ServiceError, ServiceResult};
use crate::services::pagination::{page_window, Paginated, ITEMS_PER_PAGE};
use crate::services::saga::Saga;

/// A subject taught by the teacher; no students means a teacher-only row.
#[derive(Debug, Clone)]
pub(crate) struct TeacherAssignmentInput {
    pub(crate) subject_id: String,
    pub(crate) student_ids: Vec<String>,
}

fn duplicate_name(name: &str) -> ServiceError {
    ServiceError::Conflict(format!("Učitel se jménem \"{name}\" již existuje"))
}

fn teacher_not_found() -> ServiceError {
    ServiceError::NotFound(TEACHER_NOT_FOUND.to_string())
}

fn keys_for(teacher_id: &str, assignments: &[TeacherAssignmentInput]) -> Vec<TripleKey> {
    assignments
        .iter()
        .flat_map(|assignment| {
            let students: Vec<Option<String>> = if assignment.student_ids.is_empty() {
                vec![None]
            } else {
                assignment.student_ids.iter().cloned().map(Some).collect()
            };
            students.into_iter().map(|student_id| TripleKey {
                student_id,
                subject_id: assignment.subject_id.clone(),
                teacher_id: Some(teacher_id.to_string()),
            })
        })
        .collect()
}

impl<'a> DirectoryService<'a> {
    /// Teachers by name. `subject_filter` keeps teachers with an active row for a
    /// subject whose name contains it.
    pub(crate) async fn list_teachers(
        &self,
        index: i32,
        name_filter: Option<String>,
        subject_filter: Option<String>,
    ) -> ServiceResult<Paginated<TeacherListing>> {
        let page = page_window(index, ITEMS_PER_PAGE);

        let ids = match subject_filter.as_deref().filter(|needle| !needle.is_empty()) {
            None => None,
            Some(needle) => {
                let subject_ids = self.subject_ids_named(needle).await?;
                let rows = self.active_rows_for_subjects(&subject_ids, false).await?;
                let teacher_ids: HashSet<String> =
                    rows.into_iter().filter_map(|row| row.teacher_id).collect();
                if teacher_ids.is_empty() {
                    return Ok(Paginated::new(Vec::new(), 0, page));
                }
                Some(teacher_ids.into_iter().collect())
            }
        };

        let filter = EntityFilter { name: name_filter, ids };
        let (teachers, total) =
            self.store.list_teachers(&filter, Some(page)).await.or_internal("fetch teachers")?;
        let items = self.describe_teachers(teachers).await?;
        Ok(Paginated::new(items, total, page))
    }

    /// Attaches each teacher's active subjects with their distinct student counts.
    async fn describe_teachers(
        &self,
        teachers: Vec<Teacher>,
    ) -> ServiceResult<Vec<TeacherListing>> {
        if teachers.is_empty() {
            return Ok(Vec::new());
        }
        let filter = EnrollmentFilter {
            teacher_ids: Some(teachers.iter().map(|teacher| teacher.id.clone()).collect()),
            ..EnrollmentFilter::default()
        };
        let rows = self.resolver().active_enrollments(&filter).await?;
        let (subjects, _) = self.parties(&rows).await?;

        Ok(teachers
            .into_iter()
            .map(|teacher| {
                let subjects = teacher_subjects(&teacher.id, &rows)
                    .into_iter()
                    .filter_map(|(subject_id, student_count)| {
                        let subject = subjects.get(&subject_id)?.clone();
                        Some(TeacherSubject { subject, student_count })
                    })
                    .collect();
                TeacherListing { teacher, subjects }
            })
            .collect())
    }

    async fn teacher_listing(&self, id: &str) -> ServiceResult<TeacherListing> {
        let teacher = self
            .store
            .find_teachers_by_ids(&[id.to_string()])
            .await
            .or_internal("load teacher")?
            .into_iter()
            .next()
            .ok_or_else(teacher_not_found)?;
        self.describe_teachers(vec![teacher]).await?.pop().ok_or_else(teacher_not_found)
    }

    /// Creates the teacher and its enrollment rows. The teacher is removed again
    /// when the rows cannot be written.
    pub(crate) async fn create_teacher(
        &self,
        name: String,
        assignments: Vec<TeacherAssignmentInput>,
    ) -> ServiceResult<TeacherListing> {
        if self.store.find_teacher_by_name(&name).await.or_internal("check teacher")?.is_some() {
            return Err(duplicate_name(&name));
        }
        let teacher = self
            .store
            .insert_teachers(std::slice::from_ref(&name))
            .await
            .or_internal("create teacher")?
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::Internal("Failed to create teacher".to_string()))?;

        let keys = keys_for(&teacher.id, &assignments);
        if !keys.is_empty() {
            let mut saga = Saga::new("create_teacher");
            let store = self.store;
            let teacher_id = teacher.id.clone();
            saga.on_rollback("delete teacher", move || async move {
                store.delete_teachers(&[teacher_id]).await.map(|_| ())
            });
            saga.run("create assignments", self.store.insert_enrollments(&keys))
                .await
                .or_internal("create assignments")?;
            saga.commit();
        }

        tracing::info!(teacher_id = %teacher.id, rows = keys.len(), "Teacher created");
        self.teacher_listing(&teacher.id).await
    }

    /// Renames the teacher; when `assignments` is given the active rows are
    /// replaced by exactly that set.
    pub(crate) async fn update_teacher(
        &self,
        id: &str,
        name: String,
        assignments: Option<Vec<TeacherAssignmentInput>>,
    ) -> ServiceResult<TeacherListing> {
        let ids = [id.to_string()];
        if self.store.find_teachers_by_ids(&ids).await.or_internal("load teacher")?.is_empty() {
            return Err(teacher_not_found());
        }
        let taken = self.store.find_teacher_by_name(&name).await.or_internal("check teacher")?;
        if taken.is_some_and(|other| other.id != id) {
            return Err(duplicate_name(&name));
        }
        self.store
            .rename_teacher(id, &name)
            .await
            .or_internal("update teacher")?
            .ok_or_else(teacher_not_found)?;

        if let Some(assignments) = assignments {
            self.replace_enrollments(
                EnrollmentOwner::Teacher(id.to_string()),
                keys_for(id, &assignments),
            )
            .await?;
        }

        self.teacher_listing(id).await
    }

    pub(crate) async fn delete_teacher(&self, id: &str) -> ServiceResult<TeacherListing> {
        let ids = [id.to_string()];
        let teacher = self
            .store
            .find_teachers_by_ids(&ids)
            .await
            .or_internal("load teacher")?
            .into_iter()
            .next()
            .ok_or_else(teacher_not_found)?;
        self.store.delete_teachers(&ids).await.or_internal("delete teacher")?;
        tracing::info!(teacher_id = %id, "Teacher deleted");
        Ok(TeacherListing { teacher, subjects: Vec::new() })
    }

    pub(crate) async fn delete_teachers(&self, ids: &[String]) -> ServiceResult<u64> {
        self.store.delete_teachers(ids).await.or_internal("delete teachers")
    }
}

/// `(subject id, distinct student count)` for one teacher, in first-seen order.
fn teacher_subjects(teacher_id: &str, rows: &[Enrollment]) -> Vec<(String, i64)> {
    let mut order = Vec::new();
    let mut students: HashMap<&str, HashSet<&str>> = HashMap::new();
    for row in rows.iter().filter(|row| row.teacher_id.as_deref() == Some(teacher_id)) {
        let entry = students.entry(row.subject_id.as_str()).or_insert_with(|| {
            order.push(row.subject_id.clone());
            HashSet::new()
        });
        if let Some(student_id) = row.student_id.as_deref() {
            entry.insert(student_id);
        }
    }
    order
        .into_iter()
        .map(|subject_id| {
            let count = students.get(subject_id.as_str()).map_or(0, HashSet::len) as i64;
            (subject_id, count)
        })
        .collect()
}
