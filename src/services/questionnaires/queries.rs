use std::collections::HashMap;

use super::{
    describe_enrollments, load_questions, AssignmentData, AssignmentDetail, QuestionDetail,
    QuestionnaireDetail, QuestionnaireService, QuestionnaireSummary, StudentQuestionnaire,
};
use crate::db::types::{AssignmentType, Role};
use crate::repositories::store::{EnrollmentFilter, EntityFilter, QuestionnaireFilter};
use crate::services::assignments::{resolve_student, AssignmentResolver};
use crate::services::error::{OrInternal, ServiceError, ServiceResult};
use crate::services::pagination::{page_window, Paginated, QUESTIONNAIRES_PER_PAGE};

impl<'a> QuestionnaireService<'a> {
    pub(crate) async fn list(
        &self,
        filter: QuestionnaireFilter,
        index: i32,
    ) -> ServiceResult<Paginated<QuestionnaireSummary>> {
        let page = page_window(index, QUESTIONNAIRES_PER_PAGE);
        let (questionnaires, total) = self
            .store
            .list_questionnaires(&filter, page)
            .await
            .or_internal("fetch questionnaires")?;

        let ids: Vec<String> = questionnaires.iter().map(|q| q.id.clone()).collect();
        let mut question_counts: HashMap<String, i64> = HashMap::new();
        let mut response_counts = HashMap::new();
        if !ids.is_empty() {
            for question in self.store.list_questions(&ids).await.or_internal("count questions")? {
                *question_counts.entry(question.questionnaire_id).or_default() += 1;
            }
            response_counts =
                self.store.count_responses(&ids).await.or_internal("count responses")?;
        }

        let items = questionnaires
            .into_iter()
            .map(|questionnaire| QuestionnaireSummary {
                question_count: question_counts.get(&questionnaire.id).copied().unwrap_or(0),
                response_count: response_counts.get(&questionnaire.id).copied().unwrap_or(0),
                questionnaire,
            })
            .collect();
        Ok(Paginated::new(items, total, page))
    }

    /// The questionnaire with ordered questions and, for explicit assignment,
    /// the resolved assignment rows.
    pub(crate) async fn detail(&self, id: &str) -> ServiceResult<Option<QuestionnaireDetail>> {
        let Some(questionnaire) =
            self.store.find_questionnaire(id).await.or_internal("fetch questionnaire")?
        else {
            return Ok(None);
        };

        let questions = load_questions(self.store, &[questionnaire.id.clone()]).await?;
        let assignments = match questionnaire.assignment_type {
            AssignmentType::AllStudents => Vec::new(),
            AssignmentType::SpecificStudents => {
                let enrollments =
                    AssignmentResolver::new(self.store).assigned_enrollments(id).await?;
                describe_enrollments(self.store, &enrollments).await?
            }
        };

        tracing::debug!(
            questionnaire_id = %id,
            assignments = assignments.len(),
            "Loaded questionnaire"
        );
        Ok(Some(QuestionnaireDetail { questionnaire, questions, assignments }))
    }

    /// Detail as seen by `role`. Students only see questionnaires on their own list.
    pub(crate) async fn detail_for(
        &self,
        user_id: &str,
        role: Role,
        id: &str,
    ) -> ServiceResult<Option<QuestionnaireDetail>> {
        match role {
            Role::Admin => {}
            Role::Student => {
                let identity = resolve_student(self.store, user_id).await?;
                let eligible = AssignmentResolver::new(self.store)
                    .eligible_questionnaires_for(&identity)
                    .await?;
                if !eligible.iter().any(|entry| entry.questionnaire.id == id) {
                    return Err(ServiceError::Forbidden(
                        "You do not have access to this questionnaire".to_string(),
                    ));
                }
            }
        }
        self.detail(id).await
    }

    /// The caller's eligibility list, decorated with questions, subject and teacher.
    pub(crate) async fn student_questionnaires(
        &self,
        user_id: &str,
    ) -> ServiceResult<Vec<StudentQuestionnaire>> {
        let identity = resolve_student(self.store, user_id).await?;
        let eligible =
            AssignmentResolver::new(self.store).eligible_questionnaires_for(&identity).await?;
        if eligible.is_empty() {
            return Ok(Vec::new());
        }

        let mut questionnaire_ids: Vec<String> =
            eligible.iter().map(|entry| entry.questionnaire.id.clone()).collect();
        questionnaire_ids.sort();
        questionnaire_ids.dedup();
        let mut questions: HashMap<String, Vec<QuestionDetail>> = HashMap::new();
        for detail in load_questions(self.store, &questionnaire_ids).await? {
            questions.entry(detail.question.questionnaire_id.clone()).or_default().push(detail);
        }

        let mut subject_ids: Vec<String> =
            eligible.iter().map(|entry| entry.enrollment.subject_id.clone()).collect();
        subject_ids.sort();
        subject_ids.dedup();
        let mut teacher_ids: Vec<String> =
            eligible.iter().filter_map(|entry| entry.enrollment.teacher_id.clone()).collect();
        teacher_ids.sort();
        teacher_ids.dedup();
        let (subjects, teachers) = tokio::try_join!(
            self.store.find_subjects_by_ids(&subject_ids),
            self.store.find_teachers_by_ids(&teacher_ids),
        )
        .or_internal("load subjects and teachers")?;
        let subjects: HashMap<_, _> = subjects.into_iter().map(|s| (s.id.clone(), s)).collect();
        let teachers: HashMap<_, _> = teachers.into_iter().map(|t| (t.id.clone(), t)).collect();

        Ok(eligible
            .into_iter()
            .map(|entry| StudentQuestionnaire {
                questions: questions.get(&entry.questionnaire.id).cloned().unwrap_or_default(),
                subject: subjects.get(&entry.enrollment.subject_id).cloned(),
                teacher: entry
                    .enrollment
                    .teacher_id
                    .as_ref()
                    .and_then(|id| teachers.get(id))
                    .cloned(),
                is_submitted: entry.is_submitted,
                questionnaire: entry.questionnaire,
            })
            .collect())
    }

    /// Everything the assignment picker needs: the directory plus the active
    /// enrollments narrowed to a subject and/or teacher.
    pub(crate) async fn assignment_data(
        &self,
        subject_id: Option<String>,
        teacher_id: Option<String>,
    ) -> ServiceResult<AssignmentData> {
        let everything = EntityFilter::default();
        let ((subjects, _), (teachers, _), (students, _)) = tokio::try_join!(
            self.store.list_subjects(&everything, None),
            self.store.list_teachers(&everything, None),
            self.store.list_students(&everything, None),
        )
        .or_internal("fetch directory")?;

        let filter = EnrollmentFilter { subject_id, teacher_id, ..EnrollmentFilter::default() };
        let enrollments = AssignmentResolver::new(self.store).active_enrollments(&filter).await?;

        let subject_map: HashMap<_, _> = subjects.iter().map(|s| (s.id.as_str(), s)).collect();
        let teacher_map: HashMap<_, _> = teachers.iter().map(|t| (t.id.as_str(), t)).collect();
        let student_map: HashMap<_, _> = students.iter().map(|s| (s.id.as_str(), s)).collect();

        let assignments = enrollments
            .iter()
            .filter_map(|row| {
                let student = student_map.get(row.student_id.as_deref()?)?;
                let subject = subject_map.get(row.subject_id.as_str())?;
                Some(AssignmentDetail {
                    id: row.id.clone(),
                    student: (*student).clone(),
                    teacher: row
                        .teacher_id
                        .as_deref()
                        .and_then(|id| teacher_map.get(id))
                        .map(|teacher| (*teacher).clone()),
                    subject: (*subject).clone(),
                })
            })
            .collect();

        Ok(AssignmentData { subjects, teachers, students, assignments })
    }
}
