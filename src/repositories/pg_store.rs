//! [`SurveyStore`](crate::repositories::store::SurveyStore) over the Postgres repositories.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::models::{
    Enrollment, ImportHistory, Profile, Question, QuestionOption, QuestionResponse, Questionnaire,
    QuestionnaireGroup, QuestionnaireResponse, Student, Subject, Teacher,
};
use crate::db::types::Role;
use crate::repositories::catalog::NamedTable;
use crate::repositories::store::{
    DirectoryCounts, DirectoryStore, EnrollmentFilter, EnrollmentOwner, EntityFilter, GroupPatch,
    NewAnswer, NewGroup, NewImportHistory, NewOption, NewProfile, NewQuestion, NewQuestionnaire,
    NewStudent, Page, ProfilePatch, QuestionnaireFilter, QuestionnairePatch, QuestionnaireStore,
    ResponseKey, ResponseStore, StoreResult, StudentAssignment, StudentPatch, TripleKey,
};
use crate::repositories::{
    assignments, catalog, enrollments, groups, import_history, profiles, questionnaires, questions,
    responses, students,
};

#[derive(Clone)]
pub(crate) struct PgSurveyStore {
    pool: PgPool,
}

impl PgSurveyStore {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DirectoryStore for PgSurveyStore {
    async fn find_profile(&self, id: &str) -> StoreResult<Option<Profile>> {
        Ok(profiles::find_by_id(&self.pool, id).await?)
    }

    async fn find_profile_by_email(&self, email: &str) -> StoreResult<Option<Profile>> {
        Ok(profiles::find_by_email(&self.pool, email).await?)
    }

    async fn insert_profile(&self, profile: NewProfile) -> StoreResult<Profile> {
        Ok(profiles::upsert(&self.pool, profile).await?)
    }

    async fn update_profile(&self, id: &str, patch: ProfilePatch) -> StoreResult<Option<Profile>> {
        Ok(profiles::update(&self.pool, id, patch).await?)
    }

    async fn delete_profile(&self, id: &str) -> StoreResult<bool> {
        Ok(profiles::delete(&self.pool, id).await?)
    }

    async fn list_profiles_by_role(&self, role: Role) -> StoreResult<Vec<Profile>> {
        Ok(profiles::list_by_role(&self.pool, role).await?)
    }

    async fn list_subjects(
        &self,
        filter: &EntityFilter,
        page: Option<Page>,
    ) -> StoreResult<(Vec<Subject>, i64)> {
        Ok(catalog::list(&self.pool, NamedTable::Subjects, filter, page).await?)
    }

    async fn find_subject_by_name(&self, name: &str) -> StoreResult<Option<Subject>> {
        Ok(catalog::find_by_name(&self.pool, NamedTable::Subjects, name).await?)
    }

    async fn find_subjects_by_ids(&self, ids: &[String]) -> StoreResult<Vec<Subject>> {
        Ok(catalog::find_by_ids(&self.pool, NamedTable::Subjects, ids).await?)
    }

    async fn insert_subjects(&self, names: &[String]) -> StoreResult<Vec<Subject>> {
        Ok(catalog::insert_many(&self.pool, NamedTable::Subjects, names).await?)
    }

    async fn rename_subject(&self, id: &str, name: &str) -> StoreResult<Option<Subject>> {
        Ok(catalog::rename(&self.pool, NamedTable::Subjects, id, name).await?)
    }

    async fn delete_subjects(&self, ids: &[String]) -> StoreResult<u64> {
        Ok(catalog::delete_many(&self.pool, NamedTable::Subjects, ids).await?)
    }

    async fn list_teachers(
        &self,
        filter: &EntityFilter,
        page: Option<Page>,
    ) -> StoreResult<(Vec<Teacher>, i64)> {
        Ok(catalog::list(&self.pool, NamedTable::Teachers, filter, page).await?)
    }

    async fn find_teacher_by_name(&self, name: &str) -> StoreResult<Option<Teacher>> {
        Ok(catalog::find_by_name(&self.pool, NamedTable::Teachers, name).await?)
    }

    async fn find_teachers_by_ids(&self, ids: &[String]) -> StoreResult<Vec<Teacher>> {
        Ok(catalog::find_by_ids(&self.pool, NamedTable::Teachers, ids).await?)
    }

    async fn insert_teachers(&self, names: &[String]) -> StoreResult<Vec<Teacher>> {
        Ok(catalog::insert_many(&self.pool, NamedTable::Teachers, names).await?)
    }

    async fn rename_teacher(&self, id: &str, name: &str) -> StoreResult<Option<Teacher>> {
        Ok(catalog::rename(&self.pool, NamedTable::Teachers, id, name).await?)
    }

    async fn delete_teachers(&self, ids: &[String]) -> StoreResult<u64> {
        Ok(catalog::delete_many(&self.pool, NamedTable::Teachers, ids).await?)
    }

    async fn list_students(
        &self,
        filter: &EntityFilter,
        page: Option<Page>,
    ) -> StoreResult<(Vec<Student>, i64)> {
        Ok(students::list(&self.pool, filter, page).await?)
    }

    async fn find_student_by_name(&self, name: &str) -> StoreResult<Option<Student>> {
        Ok(students::find_by_name(&self.pool, name).await?)
    }

    async fn find_student_by_email(&self, email: &str) -> StoreResult<Option<Student>> {
        Ok(students::find_by_email(&self.pool, email).await?)
    }

    async fn find_students_by_ids(&self, ids: &[String]) -> StoreResult<Vec<Student>> {
        Ok(students::find_by_ids(&self.pool, ids).await?)
    }

    async fn find_students_by_emails(&self, emails: &[String]) -> StoreResult<Vec<Student>> {
        Ok(students::find_by_emails(&self.pool, emails).await?)
    }

    async fn insert_students(&self, new_students: Vec<NewStudent>) -> StoreResult<Vec<Student>> {
        Ok(students::insert_many(&self.pool, new_students).await?)
    }

    async fn update_student(
        &self,
        id: &str,
        patch: StudentPatch,
    ) -> StoreResult<Option<Student>> {
        Ok(students::update(&self.pool, id, patch).await?)
    }

    async fn delete_students(&self, ids: &[String]) -> StoreResult<u64> {
        Ok(students::delete_many(&self.pool, ids).await?)
    }

    async fn list_active_enrollments(
        &self,
        filter: &EnrollmentFilter,
        page: Option<Page>,
    ) -> StoreResult<Vec<Enrollment>> {
        Ok(enrollments::list_active(&self.pool, filter, page).await?)
    }

    async fn count_active_enrollments(&self, filter: &EnrollmentFilter) -> StoreResult<i64> {
        Ok(enrollments::count_active(&self.pool, filter).await?)
    }

    async fn find_enrollments_by_ids(&self, ids: &[String]) -> StoreResult<Vec<Enrollment>> {
        Ok(enrollments::find_by_ids(&self.pool, ids).await?)
    }

    async fn find_enrollment(&self, key: &TripleKey) -> StoreResult<Option<Enrollment>> {
        Ok(enrollments::find_by_key(&self.pool, key).await?)
    }

    async fn insert_enrollments(&self, keys: &[TripleKey]) -> StoreResult<Vec<Enrollment>> {
        Ok(enrollments::insert_many(&self.pool, keys).await?)
    }

    async fn set_enrollment_active(&self, id: &str, active: bool) -> StoreResult<()> {
        Ok(enrollments::set_active(&self.pool, id, active).await?)
    }

    async fn deactivate_enrollments(&self, owner: &EnrollmentOwner) -> StoreResult<u64> {
        Ok(enrollments::deactivate_for(&self.pool, owner).await?)
    }

    async fn clear_directory(&self) -> StoreResult<DirectoryCounts> {
        Ok(enrollments::clear_directory(&self.pool).await?)
    }

    async fn insert_import_history(&self, entry: NewImportHistory) -> StoreResult<ImportHistory> {
        Ok(import_history::create(&self.pool, entry).await?)
    }
}

#[async_trait]
impl QuestionnaireStore for PgSurveyStore {
    async fn list_groups(
        &self,
        name: Option<&str>,
        page: Page,
    ) -> StoreResult<(Vec<QuestionnaireGroup>, i64)> {
        Ok(groups::list(&self.pool, name, page).await?)
    }

    async fn find_group(&self, id: &str) -> StoreResult<Option<QuestionnaireGroup>> {
        Ok(groups::find_by_id(&self.pool, id).await?)
    }

    async fn insert_group(&self, group: NewGroup) -> StoreResult<QuestionnaireGroup> {
        Ok(groups::create(&self.pool, group).await?)
    }

    async fn update_group(
        &self,
        id: &str,
        patch: GroupPatch,
    ) -> StoreResult<Option<QuestionnaireGroup>> {
        Ok(groups::update(&self.pool, id, patch).await?)
    }

    async fn delete_group(&self, id: &str) -> StoreResult<bool> {
        Ok(groups::delete(&self.pool, id).await?)
    }

    async fn count_questionnaires_by_group(
        &self,
        group_ids: &[String],
    ) -> StoreResult<HashMap<String, i64>> {
        Ok(groups::count_questionnaires(&self.pool, group_ids).await?)
    }

    async fn list_questionnaires(
        &self,
        filter: &QuestionnaireFilter,
        page: Page,
    ) -> StoreResult<(Vec<Questionnaire>, i64)> {
        Ok(questionnaires::list(&self.pool, filter, page).await?)
    }

    async fn list_active_questionnaires(&self) -> StoreResult<Vec<Questionnaire>> {
        Ok(questionnaires::list_active(&self.pool).await?)
    }

    async fn find_questionnaire(&self, id: &str) -> StoreResult<Option<Questionnaire>> {
        Ok(questionnaires::find_by_id(&self.pool, id).await?)
    }

    async fn questionnaire_title_exists(&self, group_id: &str, title: &str) -> StoreResult<bool> {
        Ok(questionnaires::title_exists(&self.pool, group_id, title).await?)
    }

    async fn insert_questionnaire(
        &self,
        questionnaire: NewQuestionnaire,
    ) -> StoreResult<Questionnaire> {
        Ok(questionnaires::create(&self.pool, questionnaire).await?)
    }

    async fn update_questionnaire(
        &self,
        id: &str,
        patch: QuestionnairePatch,
    ) -> StoreResult<Option<Questionnaire>> {
        Ok(questionnaires::update(&self.pool, id, patch).await?)
    }

    async fn delete_questionnaires(&self, ids: &[String]) -> StoreResult<u64> {
        Ok(questionnaires::delete_many(&self.pool, ids).await?)
    }

    async fn list_questions(&self, questionnaire_ids: &[String]) -> StoreResult<Vec<Question>> {
        Ok(questions::list_for_questionnaires(&self.pool, questionnaire_ids).await?)
    }

    async fn list_options(&self, question_ids: &[String]) -> StoreResult<Vec<QuestionOption>> {
        Ok(questions::list_options(&self.pool, question_ids).await?)
    }

    async fn insert_questions(
        &self,
        new_questions: Vec<NewQuestion>,
    ) -> StoreResult<Vec<Question>> {
        Ok(questions::insert_many(&self.pool, new_questions).await?)
    }

    async fn update_question(&self, id: &str, question: NewQuestion) -> StoreResult<()> {
        Ok(questions::update(&self.pool, id, question).await?)
    }

    async fn delete_questions(&self, ids: &[String]) -> StoreResult<u64> {
        Ok(questions::delete_many(&self.pool, ids).await?)
    }

    async fn insert_options(&self, options: Vec<NewOption>) -> StoreResult<Vec<QuestionOption>> {
        Ok(questions::insert_options(&self.pool, options).await?)
    }

    async fn delete_options_for_questions(&self, question_ids: &[String]) -> StoreResult<u64> {
        Ok(questions::delete_options_for(&self.pool, question_ids).await?)
    }

    async fn count_assignments(&self, questionnaire_id: &str) -> StoreResult<i64> {
        Ok(assignments::count(&self.pool, questionnaire_id).await?)
    }

    async fn list_assignment_enrollment_ids(
        &self,
        questionnaire_id: &str,
        page: Page,
    ) -> StoreResult<Vec<String>> {
        Ok(assignments::list_enrollment_ids(&self.pool, questionnaire_id, page).await?)
    }

    async fn insert_assignments(
        &self,
        questionnaire_id: &str,
        enrollment_ids: &[String],
    ) -> StoreResult<u64> {
        Ok(assignments::insert_many(&self.pool, questionnaire_id, enrollment_ids).await?)
    }

    async fn delete_assignments(&self, questionnaire_id: &str) -> StoreResult<u64> {
        Ok(assignments::delete_for(&self.pool, questionnaire_id).await?)
    }

    async fn has_assignment(&self, questionnaire_id: &str, key: &TripleKey) -> StoreResult<bool> {
        Ok(assignments::exists_for_key(&self.pool, questionnaire_id, key).await?)
    }

    async fn list_student_assignments(
        &self,
        student_id: &str,
        questionnaire_ids: &[String],
    ) -> StoreResult<Vec<StudentAssignment>> {
        Ok(assignments::list_for_student(&self.pool, student_id, questionnaire_ids).await?)
    }
}

#[async_trait]
impl ResponseStore for PgSurveyStore {
    async fn find_response(&self, key: &ResponseKey) -> StoreResult<Option<QuestionnaireResponse>> {
        Ok(responses::find_by_key(&self.pool, key).await?)
    }

    async fn insert_response(&self, key: ResponseKey) -> StoreResult<QuestionnaireResponse> {
        responses::create(&self.pool, key).await
    }

    async fn delete_response(&self, id: &str) -> StoreResult<()> {
        Ok(responses::delete(&self.pool, id).await?)
    }

    async fn insert_answers(&self, answers: Vec<NewAnswer>) -> StoreResult<u64> {
        Ok(responses::insert_answers(&self.pool, answers).await?)
    }

    async fn list_responses(
        &self,
        questionnaire_id: &str,
    ) -> StoreResult<Vec<QuestionnaireResponse>> {
        Ok(responses::list_for_questionnaire(&self.pool, questionnaire_id).await?)
    }

    async fn list_responses_by_email(
        &self,
        email: &str,
    ) -> StoreResult<Vec<QuestionnaireResponse>> {
        Ok(responses::list_by_email(&self.pool, email).await?)
    }

    async fn count_responses(
        &self,
        questionnaire_ids: &[String],
    ) -> StoreResult<HashMap<String, i64>> {
        Ok(responses::count_by_questionnaire(&self.pool, questionnaire_ids).await?)
    }

    async fn list_answers(&self, response_ids: &[String]) -> StoreResult<Vec<QuestionResponse>> {
        Ok(responses::list_answers(&self.pool, response_ids).await?)
    }
}
