//! Storage capability consumed by the services.
//!
//! The traits only expose single-statement operations: filtered selects with an
//! optional offset/limit window, batch inserts, patches and deletes. Nothing here
//! spans a transaction; multi-step writes are coordinated by the callers (see
//! `services::saga`).

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::db::models::{
    Enrollment, ImportHistory, Profile, Question, QuestionOption, QuestionResponse, Questionnaire,
    QuestionnaireGroup, QuestionnaireResponse, Student, Subject, Teacher,
};
use crate::db::types::{AssignmentType, ImportMode, QuestionType, Role};

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("{0}")]
    Database(#[from] sqlx::Error),
    #[error("duplicate key value violates unique constraint \"{0}\"")]
    UniqueViolation(String),
}

impl StoreError {
    pub(crate) fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }
}

pub(crate) type StoreResult<T> = Result<T, StoreError>;

/// Offset/limit window over an ordered record set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Page {
    pub(crate) offset: i64,
    pub(crate) limit: i64,
}

impl Page {
    pub(crate) const fn new(offset: i64, limit: i64) -> Self {
        Self { offset, limit }
    }
}

/// Case-insensitive name substring plus an optional id allow-list.
#[derive(Debug, Clone, Default)]
pub(crate) struct EntityFilter {
    pub(crate) name: Option<String>,
    pub(crate) ids: Option<Vec<String>>,
}

/// Filter over *active* enrollments. `require_student` drops teacher-only rows.
#[derive(Debug, Clone, Default)]
pub(crate) struct EnrollmentFilter {
    pub(crate) student_id: Option<String>,
    pub(crate) teacher_id: Option<String>,
    pub(crate) subject_id: Option<String>,
    pub(crate) student_ids: Option<Vec<String>>,
    pub(crate) teacher_ids: Option<Vec<String>>,
    pub(crate) require_student: bool,
}

impl EnrollmentFilter {
    pub(crate) fn students_only() -> Self {
        Self { require_student: true, ..Self::default() }
    }

    pub(crate) fn matches(&self, enrollment: &Enrollment) -> bool {
        fn eq(filter: &Option<String>, value: Option<&String>) -> bool {
            filter.as_ref().map_or(true, |wanted| value == Some(wanted))
        }
        fn within(filter: &Option<Vec<String>>, value: Option<&String>) -> bool {
            filter.as_ref().map_or(true, |ids| value.is_some_and(|value| ids.contains(value)))
        }

        enrollment.active
            && (!self.require_student || enrollment.student_id.is_some())
            && eq(&self.student_id, enrollment.student_id.as_ref())
            && eq(&self.teacher_id, enrollment.teacher_id.as_ref())
            && eq(&self.subject_id, Some(&enrollment.subject_id))
            && within(&self.student_ids, enrollment.student_id.as_ref())
            && within(&self.teacher_ids, enrollment.teacher_id.as_ref())
    }
}

/// (student, subject, teacher-or-null) coordinates of an enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct TripleKey {
    pub(crate) student_id: Option<String>,
    pub(crate) subject_id: String,
    pub(crate) teacher_id: Option<String>,
}

impl TripleKey {
    pub(crate) fn of(enrollment: &Enrollment) -> Self {
        Self {
            student_id: enrollment.student_id.clone(),
            subject_id: enrollment.subject_id.clone(),
            teacher_id: enrollment.teacher_id.clone(),
        }
    }
}

/// Identifies one submission; at most one response may exist per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct ResponseKey {
    pub(crate) questionnaire_id: String,
    pub(crate) student_email: String,
    pub(crate) subject_id: String,
    pub(crate) teacher_id: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct NewProfile {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) first_name: Option<String>,
    pub(crate) last_name: Option<String>,
    pub(crate) role: Role,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ProfilePatch {
    pub(crate) email: Option<String>,
    pub(crate) first_name: Option<String>,
    pub(crate) last_name: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct NewStudent {
    pub(crate) name: String,
    pub(crate) email: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct StudentPatch {
    pub(crate) name: Option<String>,
    /// `Some(None)` clears the stored email.
    pub(crate) email: Option<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EnrollmentOwner {
    Student(String),
    Teacher(String),
}

/// Row counts removed by a full directory wipe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct DirectoryCounts {
    pub(crate) enrollments: i64,
    pub(crate) students: i64,
    pub(crate) teachers: i64,
    pub(crate) subjects: i64,
}

#[derive(Debug, Clone)]
pub(crate) struct NewImportHistory {
    pub(crate) mode: ImportMode,
    pub(crate) total_records: i32,
    pub(crate) new_students: i32,
    pub(crate) new_teachers: i32,
    pub(crate) new_subjects: i32,
    pub(crate) duplicates_skipped: i32,
    pub(crate) error_count: i32,
    pub(crate) imported_by: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct NewGroup {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct GroupPatch {
    pub(crate) name: Option<String>,
    pub(crate) description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct QuestionnaireFilter {
    pub(crate) group_id: Option<String>,
    pub(crate) title: Option<String>,
    pub(crate) is_active: Option<bool>,
}

#[derive(Debug, Clone)]
pub(crate) struct NewQuestionnaire {
    pub(crate) group_id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) is_anonymous: bool,
    pub(crate) assignment_type: AssignmentType,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct QuestionnairePatch {
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) is_active: Option<bool>,
    pub(crate) is_anonymous: Option<bool>,
    pub(crate) assignment_type: Option<AssignmentType>,
}

#[derive(Debug, Clone)]
pub(crate) struct NewQuestion {
    pub(crate) questionnaire_id: String,
    pub(crate) text: String,
    pub(crate) question_type: QuestionType,
    pub(crate) required: bool,
    pub(crate) order_index: i32,
}

#[derive(Debug, Clone)]
pub(crate) struct NewOption {
    pub(crate) question_id: String,
    pub(crate) text: String,
    pub(crate) order_index: i32,
}

/// A single answer row. Exactly one `answer_*` field is set.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NewAnswer {
    pub(crate) response_id: String,
    pub(crate) question_id: String,
    pub(crate) answer_text: Option<String>,
    pub(crate) answer_option_id: Option<String>,
    pub(crate) answer_rating: Option<i32>,
    pub(crate) answer_boolean: Option<bool>,
}

/// An explicit questionnaire assignment resolved to its enrollment.
#[derive(Debug, Clone)]
pub(crate) struct StudentAssignment {
    pub(crate) questionnaire_id: String,
    pub(crate) enrollment: Enrollment,
}

/// Profiles, the student/teacher/subject directory and its enrollments.
#[async_trait]
pub(crate) trait DirectoryStore: Send + Sync {
    async fn find_profile(&self, id: &str) -> StoreResult<Option<Profile>>;
    async fn find_profile_by_email(&self, email: &str) -> StoreResult<Option<Profile>>;
    async fn insert_profile(&self, profile: NewProfile) -> StoreResult<Profile>;
    async fn update_profile(&self, id: &str, patch: ProfilePatch) -> StoreResult<Option<Profile>>;
    async fn delete_profile(&self, id: &str) -> StoreResult<bool>;
    async fn list_profiles_by_role(&self, role: Role) -> StoreResult<Vec<Profile>>;

    async fn list_subjects(
        &self,
        filter: &EntityFilter,
        page: Option<Page>,
    ) -> StoreResult<(Vec<Subject>, i64)>;
    async fn find_subject_by_name(&self, name: &str) -> StoreResult<Option<Subject>>;
    async fn find_subjects_by_ids(&self, ids: &[String]) -> StoreResult<Vec<Subject>>;
    async fn insert_subjects(&self, names: &[String]) -> StoreResult<Vec<Subject>>;
    async fn rename_subject(&self, id: &str, name: &str) -> StoreResult<Option<Subject>>;
    async fn delete_subjects(&self, ids: &[String]) -> StoreResult<u64>;

    async fn list_teachers(
        &self,
        filter: &EntityFilter,
        page: Option<Page>,
    ) -> StoreResult<(Vec<Teacher>, i64)>;
    async fn find_teacher_by_name(&self, name: &str) -> StoreResult<Option<Teacher>>;
    async fn find_teachers_by_ids(&self, ids: &[String]) -> StoreResult<Vec<Teacher>>;
    async fn insert_teachers(&self, names: &[String]) -> StoreResult<Vec<Teacher>>;
    async fn rename_teacher(&self, id: &str, name: &str) -> StoreResult<Option<Teacher>>;
    async fn delete_teachers(&self, ids: &[String]) -> StoreResult<u64>;

    async fn list_students(
        &self,
        filter: &EntityFilter,
        page: Option<Page>,
    ) -> StoreResult<(Vec<Student>, i64)>;
    async fn find_student_by_name(&self, name: &str) -> StoreResult<Option<Student>>;
    async fn find_student_by_email(&self, email: &str) -> StoreResult<Option<Student>>;
    async fn find_students_by_ids(&self, ids: &[String]) -> StoreResult<Vec<Student>>;
    async fn find_students_by_emails(&self, emails: &[String]) -> StoreResult<Vec<Student>>;
    async fn insert_students(&self, students: Vec<NewStudent>) -> StoreResult<Vec<Student>>;
    async fn update_student(&self, id: &str, patch: StudentPatch)
        -> StoreResult<Option<Student>>;
    async fn delete_students(&self, ids: &[String]) -> StoreResult<u64>;

    /// Active enrollments ordered by id so that paging is stable.
    async fn list_active_enrollments(
        &self,
        filter: &EnrollmentFilter,
        page: Option<Page>,
    ) -> StoreResult<Vec<Enrollment>>;
    async fn count_active_enrollments(&self, filter: &EnrollmentFilter) -> StoreResult<i64>;
    async fn find_enrollments_by_ids(&self, ids: &[String]) -> StoreResult<Vec<Enrollment>>;
    /// Any row with these coordinates, active ones first.
    async fn find_enrollment(&self, key: &TripleKey) -> StoreResult<Option<Enrollment>>;
    async fn insert_enrollments(&self, keys: &[TripleKey]) -> StoreResult<Vec<Enrollment>>;
    async fn set_enrollment_active(&self, id: &str, active: bool) -> StoreResult<()>;
    async fn deactivate_enrollments(&self, owner: &EnrollmentOwner) -> StoreResult<u64>;
    async fn clear_directory(&self) -> StoreResult<DirectoryCounts>;

    async fn insert_import_history(&self, entry: NewImportHistory) -> StoreResult<ImportHistory>;
}

/// Groups, questionnaires, their questions/options and explicit assignments.
#[async_trait]
pub(crate) trait QuestionnaireStore: Send + Sync {
    async fn list_groups(
        &self,
        name: Option<&str>,
        page: Page,
    ) -> StoreResult<(Vec<QuestionnaireGroup>, i64)>;
    async fn find_group(&self, id: &str) -> StoreResult<Option<QuestionnaireGroup>>;
    async fn insert_group(&self, group: NewGroup) -> StoreResult<QuestionnaireGroup>;
    async fn update_group(
        &self,
        id: &str,
        patch: GroupPatch,
    ) -> StoreResult<Option<QuestionnaireGroup>>;
    async fn delete_group(&self, id: &str) -> StoreResult<bool>;
    async fn count_questionnaires_by_group(
        &self,
        group_ids: &[String],
    ) -> StoreResult<HashMap<String, i64>>;

    async fn list_questionnaires(
        &self,
        filter: &QuestionnaireFilter,
        page: Page,
    ) -> StoreResult<(Vec<Questionnaire>, i64)>;
    /// Active questionnaires, newest first.
    async fn list_active_questionnaires(&self) -> StoreResult<Vec<Questionnaire>>;
    async fn find_questionnaire(&self, id: &str) -> StoreResult<Option<Questionnaire>>;
    async fn questionnaire_title_exists(&self, group_id: &str, title: &str) -> StoreResult<bool>;
    async fn insert_questionnaire(&self, questionnaire: NewQuestionnaire)
        -> StoreResult<Questionnaire>;
    async fn update_questionnaire(
        &self,
        id: &str,
        patch: QuestionnairePatch,
    ) -> StoreResult<Option<Questionnaire>>;
    async fn delete_questionnaires(&self, ids: &[String]) -> StoreResult<u64>;

    /// Questions of the given questionnaires by `order_index`, ties in insertion order.
    async fn list_questions(&self, questionnaire_ids: &[String]) -> StoreResult<Vec<Question>>;
    async fn list_options(&self, question_ids: &[String]) -> StoreResult<Vec<QuestionOption>>;
    /// Returns the created rows in input order.
    async fn insert_questions(&self, questions: Vec<NewQuestion>) -> StoreResult<Vec<Question>>;
    async fn update_question(&self, id: &str, question: NewQuestion) -> StoreResult<()>;
    async fn delete_questions(&self, ids: &[String]) -> StoreResult<u64>;
    async fn insert_options(&self, options: Vec<NewOption>) -> StoreResult<Vec<QuestionOption>>;
    async fn delete_options_for_questions(&self, question_ids: &[String]) -> StoreResult<u64>;

    async fn count_assignments(&self, questionnaire_id: &str) -> StoreResult<i64>;
    async fn list_assignment_enrollment_ids(
        &self,
        questionnaire_id: &str,
        page: Page,
    ) -> StoreResult<Vec<String>>;
    async fn insert_assignments(
        &self,
        questionnaire_id: &str,
        enrollment_ids: &[String],
    ) -> StoreResult<u64>;
    async fn delete_assignments(&self, questionnaire_id: &str) -> StoreResult<u64>;
    async fn has_assignment(&self, questionnaire_id: &str, key: &TripleKey) -> StoreResult<bool>;
    async fn list_student_assignments(
        &self,
        student_id: &str,
        questionnaire_ids: &[String],
    ) -> StoreResult<Vec<StudentAssignment>>;
}

/// Submitted responses and their answers.
#[async_trait]
pub(crate) trait ResponseStore: Send + Sync {
    async fn find_response(&self, key: &ResponseKey) -> StoreResult<Option<QuestionnaireResponse>>;
    /// Fails with [`StoreError::UniqueViolation`] when the key is already taken.
    async fn insert_response(&self, key: ResponseKey) -> StoreResult<QuestionnaireResponse>;
    async fn delete_response(&self, id: &str) -> StoreResult<()>;
    async fn insert_answers(&self, answers: Vec<NewAnswer>) -> StoreResult<u64>;
    async fn list_responses(&self, questionnaire_id: &str)
        -> StoreResult<Vec<QuestionnaireResponse>>;
    async fn list_responses_by_email(&self, email: &str)
        -> StoreResult<Vec<QuestionnaireResponse>>;
    async fn count_responses(
        &self,
        questionnaire_ids: &[String],
    ) -> StoreResult<HashMap<String, i64>>;
    async fn list_answers(&self, response_ids: &[String]) -> StoreResult<Vec<QuestionResponse>>;
}

pub(crate) trait SurveyStore: DirectoryStore + QuestionnaireStore + ResponseStore {}

impl<T> SurveyStore for T where T: DirectoryStore + QuestionnaireStore + ResponseStore {}
