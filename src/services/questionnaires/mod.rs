//! Questionnaire groups, questionnaires and their questions.
//!
//! `lifecycle` owns every write that spans several tables, `queries` the read
//! models handed to the GraphQL layer and `groups` the organisational containers.

mod groups;
mod lifecycle;
mod queries;

use std::collections::HashMap;

use crate::db::models::{
    Enrollment, Question, QuestionOption, Questionnaire, QuestionnaireGroup, Student, Subject,
    Teacher,
};
use crate::db::types::{AssignmentType, QuestionType};
use crate::repositories::store::SurveyStore;
use crate::services::error::{OrInternal, ServiceError, ServiceResult};
use crate::services::pagination::DETAIL_BATCH;

pub(crate) const GROUP_NOT_FOUND: &str = "Skupina dotazníků nenalezena";
pub(crate) const QUESTIONNAIRE_NOT_FOUND: &str = "Dotazník nenalezen";

#[derive(Debug, Clone)]
pub(crate) struct OptionInput {
    pub(crate) text: String,
    pub(crate) order_index: Option<i32>,
}

#[derive(Debug, Clone)]
pub(crate) struct QuestionInput {
    /// Present when updating an existing question.
    pub(crate) id: Option<String>,
    pub(crate) text: String,
    pub(crate) question_type: QuestionType,
    pub(crate) required: bool,
    pub(crate) order_index: Option<i32>,
    pub(crate) options: Option<Vec<OptionInput>>,
}

#[derive(Debug, Clone)]
pub(crate) struct CreateQuestionnaireInput {
    pub(crate) group_id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) is_anonymous: bool,
    pub(crate) assignment_type: AssignmentType,
    pub(crate) assignment_ids: Vec<String>,
    pub(crate) questions: Vec<QuestionInput>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct UpdateQuestionnaireInput {
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) is_active: Option<bool>,
    pub(crate) is_anonymous: Option<bool>,
    pub(crate) assignment_type: Option<AssignmentType>,
    pub(crate) assignment_ids: Option<Vec<String>>,
    pub(crate) questions: Option<Vec<QuestionInput>>,
}

#[derive(Debug, Clone)]
pub(crate) struct QuestionDetail {
    pub(crate) question: Question,
    pub(crate) options: Vec<QuestionOption>,
}

/// An enrollment with its parties resolved. Rows whose student or subject no
/// longer exists are never turned into one.
#[derive(Debug, Clone)]
pub(crate) struct AssignmentDetail {
    pub(crate) id: String,
    pub(crate) student: Student,
    pub(crate) teacher: Option<Teacher>,
    pub(crate) subject: Subject,
}

#[derive(Debug, Clone)]
pub(crate) struct QuestionnaireDetail {
    pub(crate) questionnaire: Questionnaire,
    pub(crate) questions: Vec<QuestionDetail>,
    pub(crate) assignments: Vec<AssignmentDetail>,
}

#[derive(Debug, Clone)]
pub(crate) struct QuestionnaireSummary {
    pub(crate) questionnaire: Questionnaire,
    pub(crate) question_count: i64,
    pub(crate) response_count: i64,
}

#[derive(Debug, Clone)]
pub(crate) struct GroupSummary {
    pub(crate) group: QuestionnaireGroup,
    pub(crate) questionnaire_count: i64,
}

/// One row of a student's questionnaire list.
#[derive(Debug, Clone)]
pub(crate) struct StudentQuestionnaire {
    pub(crate) questionnaire: Questionnaire,
    pub(crate) questions: Vec<QuestionDetail>,
    pub(crate) subject: Option<Subject>,
    pub(crate) teacher: Option<Teacher>,
    pub(crate) is_submitted: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct AssignmentData {
    pub(crate) subjects: Vec<Subject>,
    pub(crate) teachers: Vec<Teacher>,
    pub(crate) students: Vec<Student>,
    pub(crate) assignments: Vec<AssignmentDetail>,
}

pub(crate) struct QuestionnaireService<'a> {
    store: &'a dyn SurveyStore,
}

impl<'a> QuestionnaireService<'a> {
    pub(crate) fn new(store: &'a dyn SurveyStore) -> Self {
        Self { store }
    }
}

/// Questions of the given questionnaires, in display order, with their options.
pub(crate) async fn load_questions(
    store: &dyn SurveyStore,
    questionnaire_ids: &[String],
) -> ServiceResult<Vec<QuestionDetail>> {
    let questions = store.list_questions(questionnaire_ids).await.or_internal("load questions")?;
    let ids: Vec<String> = questions.iter().map(|question| question.id.clone()).collect();
    let mut options: HashMap<String, Vec<QuestionOption>> = HashMap::new();
    if !ids.is_empty() {
        for option in store.list_options(&ids).await.or_internal("load question options")? {
            options.entry(option.question_id.clone()).or_default().push(option);
        }
    }

    Ok(questions
        .into_iter()
        .map(|question| {
            let options = options.remove(&question.id).unwrap_or_default();
            QuestionDetail { question, options }
        })
        .collect())
}

/// Resolves the student, subject and teacher of each enrollment in bounded
/// batches, dropping rows that point at missing students or subjects.
pub(crate) async fn describe_enrollments(
    store: &dyn SurveyStore,
    enrollments: &[Enrollment],
) -> ServiceResult<Vec<AssignmentDetail>> {
    let mut details = Vec::with_capacity(enrollments.len());

    for chunk in enrollments.chunks(DETAIL_BATCH) {
        let student_ids = distinct(chunk.iter().filter_map(|row| row.student_id.clone()));
        let subject_ids = distinct(chunk.iter().map(|row| row.subject_id.clone()));
        let teacher_ids = distinct(chunk.iter().filter_map(|row| row.teacher_id.clone()));

        let (students, subjects, teachers) = tokio::try_join!(
            store.find_students_by_ids(&student_ids),
            store.find_subjects_by_ids(&subject_ids),
            store.find_teachers_by_ids(&teacher_ids),
        )
        .or_internal("load assignment parties")?;

        let students: HashMap<_, _> = students.into_iter().map(|s| (s.id.clone(), s)).collect();
        let subjects: HashMap<_, _> = subjects.into_iter().map(|s| (s.id.clone(), s)).collect();
        let teachers: HashMap<_, _> = teachers.into_iter().map(|t| (t.id.clone(), t)).collect();

        for row in chunk {
            let student = row.student_id.as_ref().and_then(|id| students.get(id));
            let (Some(student), Some(subject)) = (student, subjects.get(&row.subject_id)) else {
                continue;
            };
            details.push(AssignmentDetail {
                id: row.id.clone(),
                student: student.clone(),
                teacher: row.teacher_id.as_ref().and_then(|id| teachers.get(id)).cloned(),
                subject: subject.clone(),
            });
        }
    }

    Ok(details)
}

fn distinct(ids: impl Iterator<Item = String>) -> Vec<String> {
    let mut ids: Vec<String> = ids.collect();
    ids.sort();
    ids.dedup();
    ids
}

fn questionnaire_not_found() -> ServiceError {
    ServiceError::NotFound(QUESTIONNAIRE_NOT_FOUND.to_string())
}
