//! Eligibility of students for questionnaires.
//!
//! `ALL_STUDENTS` questionnaires are resolved against the live set of active
//! enrollments every time; `SPECIFIC_STUDENTS` questionnaires against the
//! enrollments their assignment rows point at.

use std::collections::HashSet;

use crate::db::models::{Enrollment, Questionnaire, QuestionnaireResponse, Student};
use crate::db::types::AssignmentType;
use crate::repositories::store::{EnrollmentFilter, Page, SurveyStore, TripleKey};
use crate::services::error::{OrInternal, ServiceError, ServiceResult};
use crate::services::pagination::{ASSIGNMENT_ID_BATCH, DETAIL_BATCH, ENROLLMENT_BATCH};

/// The student behind an authenticated user. Responses are keyed by the profile email.
#[derive(Debug, Clone)]
pub(crate) struct StudentIdentity {
    pub(crate) student: Student,
    pub(crate) email: String,
}

/// Resolves `user id -> profile email -> student record`.
pub(crate) async fn resolve_student(
    store: &dyn SurveyStore,
    user_id: &str,
) -> ServiceResult<StudentIdentity> {
    let profile = store
        .find_profile(user_id)
        .await
        .or_internal("load profile")?
        .ok_or_else(|| ServiceError::NotFound("User profile not found".to_string()))?;
    let student = store
        .find_student_by_email(&profile.email)
        .await
        .or_internal("load student")?
        .ok_or_else(|| ServiceError::NotFound("Student not found".to_string()))?;

    Ok(StudentIdentity { student, email: profile.email })
}

/// `(questionnaire, subject, teacher-or-none)`: the slot a response fills for one student.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct SubmissionSlot {
    pub(crate) questionnaire_id: String,
    pub(crate) subject_id: String,
    pub(crate) teacher_id: Option<String>,
}

impl SubmissionSlot {
    fn of_response(response: &QuestionnaireResponse) -> Self {
        Self {
            questionnaire_id: response.questionnaire_id.clone(),
            subject_id: response.subject_id.clone(),
            teacher_id: response.teacher_id.clone(),
        }
    }

    fn of_enrollment(questionnaire_id: &str, enrollment: &Enrollment) -> Self {
        Self {
            questionnaire_id: questionnaire_id.to_string(),
            subject_id: enrollment.subject_id.clone(),
            teacher_id: enrollment.teacher_id.clone(),
        }
    }
}

/// One questionnaire a student may answer for one of their enrollments.
#[derive(Debug, Clone)]
pub(crate) struct Eligibility {
    pub(crate) questionnaire: Questionnaire,
    pub(crate) enrollment: Enrollment,
    pub(crate) is_submitted: bool,
}

pub(crate) struct AssignmentResolver<'a> {
    store: &'a dyn SurveyStore,
}

impl<'a> AssignmentResolver<'a> {
    pub(crate) fn new(store: &'a dyn SurveyStore) -> Self {
        Self { store }
    }

    /// Every enrollment the questionnaire is open to.
    pub(crate) async fn eligible_triples(
        &self,
        questionnaire: &Questionnaire,
    ) -> ServiceResult<Vec<Enrollment>> {
        match questionnaire.assignment_type {
            AssignmentType::SpecificStudents => self.assigned_enrollments(&questionnaire.id).await,
            AssignmentType::AllStudents => {
                self.active_enrollments(&EnrollmentFilter::students_only()).await
            }
        }
    }

    /// Size of the eligible population, without loading it.
    pub(crate) async fn count_assigned(&self, questionnaire: &Questionnaire) -> ServiceResult<i64> {
        match questionnaire.assignment_type {
            AssignmentType::SpecificStudents => self
                .store
                .count_assignments(&questionnaire.id)
                .await
                .or_internal("count assignments"),
            AssignmentType::AllStudents => self
                .store
                .count_active_enrollments(&EnrollmentFilter::students_only())
                .await
                .or_internal("count enrollments"),
        }
    }

    /// Drains all active enrollments matching `filter`, one batch at a time.
    pub(crate) async fn active_enrollments(
        &self,
        filter: &EnrollmentFilter,
    ) -> ServiceResult<Vec<Enrollment>> {
        let mut enrollments = Vec::new();
        let mut offset = 0;
        loop {
            let batch = self
                .store
                .list_active_enrollments(filter, Some(Page::new(offset, ENROLLMENT_BATCH)))
                .await
                .or_internal("load enrollments")?;
            let fetched = batch.len() as i64;
            enrollments.extend(batch);
            if fetched < ENROLLMENT_BATCH {
                break;
            }
            offset += ENROLLMENT_BATCH;
        }
        Ok(enrollments)
    }

    /// Enrollments referenced by a questionnaire's assignment rows. Ids are paged
    /// first, details are then fetched in bounded batches.
    pub(crate) async fn assigned_enrollments(
        &self,
        questionnaire_id: &str,
    ) -> ServiceResult<Vec<Enrollment>> {
        let mut ids = Vec::new();
        let mut offset = 0;
        loop {
            let batch = self
                .store
                .list_assignment_enrollment_ids(
                    questionnaire_id,
                    Page::new(offset, ASSIGNMENT_ID_BATCH),
                )
                .await
                .or_internal("load assignments")?;
            let fetched = batch.len() as i64;
            ids.extend(batch);
            if fetched < ASSIGNMENT_ID_BATCH {
                break;
            }
            offset += ASSIGNMENT_ID_BATCH;
        }

        let mut enrollments = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(DETAIL_BATCH) {
            let batch = self
                .store
                .find_enrollments_by_ids(chunk)
                .await
                .or_internal("load assignment details")?;
            enrollments.extend(batch);
        }
        Ok(enrollments)
    }

    /// Whether `questionnaire` accepts a response from this student for the
    /// given subject and teacher.
    pub(crate) async fn is_open_to(
        &self,
        questionnaire: &Questionnaire,
        student_id: &str,
        subject_id: &str,
        teacher_id: Option<&str>,
    ) -> ServiceResult<bool> {
        match questionnaire.assignment_type {
            AssignmentType::AllStudents => Ok(true),
            AssignmentType::SpecificStudents => {
                let key = TripleKey {
                    student_id: Some(student_id.to_string()),
                    subject_id: subject_id.to_string(),
                    teacher_id: teacher_id.map(str::to_string),
                };
                self.store
                    .has_assignment(&questionnaire.id, &key)
                    .await
                    .or_internal("check assignment")
            }
        }
    }

    /// All (questionnaire, enrollment) pairs the student may answer, newest
    /// questionnaire first, each flagged with whether it was already answered.
    pub(crate) async fn eligible_questionnaires_for(
        &self,
        identity: &StudentIdentity,
    ) -> ServiceResult<Vec<Eligibility>> {
        let questionnaires = self
            .store
            .list_active_questionnaires()
            .await
            .or_internal("load questionnaires")?;
        if questionnaires.is_empty() {
            return Ok(Vec::new());
        }

        let student_id = identity.student.id.as_str();
        let own = self
            .active_enrollments(&EnrollmentFilter {
                student_id: Some(student_id.to_string()),
                ..EnrollmentFilter::default()
            })
            .await?;

        let specific_ids: Vec<String> = questionnaires
            .iter()
            .filter(|q| q.assignment_type == AssignmentType::SpecificStudents)
            .map(|q| q.id.clone())
            .collect();
        let assigned = if specific_ids.is_empty() {
            Vec::new()
        } else {
            self.store
                .list_student_assignments(student_id, &specific_ids)
                .await
                .or_internal("load student assignments")?
        };

        let submitted: HashSet<SubmissionSlot> = self
            .store
            .list_responses_by_email(&identity.email)
            .await
            .or_internal("load responses")?
            .iter()
            .map(SubmissionSlot::of_response)
            .collect();

        let mut eligible = Vec::new();
        for questionnaire in questionnaires {
            let enrollments: Vec<&Enrollment> = match questionnaire.assignment_type {
                AssignmentType::AllStudents => own.iter().collect(),
                AssignmentType::SpecificStudents => assigned
                    .iter()
                    .filter(|row| row.questionnaire_id == questionnaire.id)
                    .map(|row| &row.enrollment)
                    .filter(|enrollment| enrollment.student_id.as_deref() == Some(student_id))
                    .collect(),
            };

            for enrollment in enrollments {
                let slot = SubmissionSlot::of_enrollment(&questionnaire.id, enrollment);
                eligible.push(Eligibility {
                    questionnaire: questionnaire.clone(),
                    enrollment: enrollment.clone(),
                    is_submitted: submitted.contains(&slot),
                });
            }
        }

        tracing::debug!(
            student_id,
            eligible = eligible.len(),
            "Resolved eligible questionnaires"
        );
        Ok(eligible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::AssignmentType;
    use crate::repositories::store::{
        DirectoryStore, QuestionnaireStore, ResponseKey, ResponseStore,
    };
    use crate::test_support::{seed_directory, seed_questionnaire, MemoryStore};

    #[tokio::test]
    async fn all_students_yields_one_entry_per_active_enrollment() {
        let store = MemoryStore::default();
        let dir = seed_directory(&store).await;
        let questionnaire =
            seed_questionnaire(&store, "Feedback", AssignmentType::AllStudents, &[]).await;

        let resolver = AssignmentResolver::new(&store);
        let identity = resolve_student(&store, &dir.alice_user_id).await.unwrap();
        let eligible = resolver.eligible_questionnaires_for(&identity).await.unwrap();

        let alice_rows = store
            .count_active_enrollments(&EnrollmentFilter {
                student_id: Some(dir.alice.id.clone()),
                ..EnrollmentFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(eligible.len() as i64, alice_rows);
        assert!(eligible.iter().all(|e| e.questionnaire.id == questionnaire.id));
        assert!(eligible.iter().all(|e| !e.is_submitted));
    }

    #[tokio::test]
    async fn all_students_follows_enrollments_added_later() {
        let store = MemoryStore::default();
        let dir = seed_directory(&store).await;
        seed_questionnaire(&store, "Feedback", AssignmentType::AllStudents, &[]).await;
        let resolver = AssignmentResolver::new(&store);
        let identity = resolve_student(&store, &dir.alice_user_id).await.unwrap();
        let before = resolver.eligible_questionnaires_for(&identity).await.unwrap().len();

        let history = store.insert_subjects(&["History".to_string()]).await.unwrap();
        store
            .insert_enrollments(&[TripleKey {
                student_id: Some(dir.alice.id.clone()),
                subject_id: history[0].id.clone(),
                teacher_id: None,
            }])
            .await
            .unwrap();

        let after = resolver.eligible_questionnaires_for(&identity).await.unwrap();
        assert_eq!(after.len(), before + 1);
        assert!(after.iter().any(|e| {
            e.enrollment.subject_id == history[0].id && e.enrollment.teacher_id.is_none()
        }));
    }

    #[tokio::test]
    async fn specific_students_only_lists_assigned_enrollments() {
        let store = MemoryStore::default();
        let dir = seed_directory(&store).await;
        let questionnaire = seed_questionnaire(
            &store,
            "Math only",
            AssignmentType::SpecificStudents,
            &[dir.alice_math.id.clone(), dir.bob_math.id.clone()],
        )
        .await;

        let resolver = AssignmentResolver::new(&store);
        let identity = resolve_student(&store, &dir.alice_user_id).await.unwrap();
        let eligible = resolver.eligible_questionnaires_for(&identity).await.unwrap();

        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].questionnaire.id, questionnaire.id);
        assert_eq!(eligible[0].enrollment.id, dir.alice_math.id);
        assert_eq!(resolver.count_assigned(&questionnaire).await.unwrap(), 2);
        assert_eq!(resolver.eligible_triples(&questionnaire).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn submitted_flag_treats_missing_teacher_as_its_own_slot() {
        let store = MemoryStore::default();
        let dir = seed_directory(&store).await;
        let questionnaire =
            seed_questionnaire(&store, "Feedback", AssignmentType::AllStudents, &[]).await;
        store
            .insert_enrollments(&[TripleKey {
                student_id: Some(dir.alice.id.clone()),
                subject_id: dir.math.id.clone(),
                teacher_id: None,
            }])
            .await
            .unwrap();
        store
            .insert_response(ResponseKey {
                questionnaire_id: questionnaire.id.clone(),
                student_email: "alice@school.cz".to_string(),
                subject_id: dir.math.id.clone(),
                teacher_id: None,
            })
            .await
            .unwrap();

        let resolver = AssignmentResolver::new(&store);
        let identity = resolve_student(&store, &dir.alice_user_id).await.unwrap();
        let eligible = resolver.eligible_questionnaires_for(&identity).await.unwrap();

        let math: Vec<_> =
            eligible.iter().filter(|e| e.enrollment.subject_id == dir.math.id).collect();
        assert_eq!(math.len(), 2);
        for entry in math {
            assert_eq!(entry.is_submitted, entry.enrollment.teacher_id.is_none());
        }
    }

    #[tokio::test]
    async fn inactive_questionnaires_are_not_offered() {
        let store = MemoryStore::default();
        let dir = seed_directory(&store).await;
        let questionnaire =
            seed_questionnaire(&store, "Closed", AssignmentType::AllStudents, &[]).await;
        store
            .update_questionnaire(
                &questionnaire.id,
                crate::repositories::store::QuestionnairePatch {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let resolver = AssignmentResolver::new(&store);
        let identity = resolve_student(&store, &dir.alice_user_id).await.unwrap();
        assert!(resolver.eligible_questionnaires_for(&identity).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_user_has_no_student() {
        let store = MemoryStore::default();
        let err = resolve_student(&store, "missing").await.unwrap_err();
        assert_eq!(err, ServiceError::NotFound("User profile not found".to_string()));
    }
}
