use async_graphql::{InputObject, SimpleObject};

use crate::core::time::format_primitive;
use crate::db::models::{Question, QuestionOption, Questionnaire};
use crate::db::types::{AssignmentType, QuestionType};
use crate::schemas::directory::{StudentView, SubjectView, TeacherView};
use crate::services::questionnaires::{
    AssignmentData, AssignmentDetail, GroupSummary, OptionInput, QuestionDetail, QuestionInput,
    QuestionnaireDetail, QuestionnaireSummary, StudentQuestionnaire,
};
use crate::services::responses::{AnswerInput, SubmissionInput, SubmissionReceipt};

#[derive(Debug, SimpleObject)]
#[graphql(name = "QuestionnaireGroup")]
pub(crate) struct GroupView {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) questionnaire_count: i64,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl From<GroupSummary> for GroupView {
    fn from(summary: GroupSummary) -> Self {
        let group = summary.group;
        Self {
            id: group.id,
            name: group.name,
            description: group.description,
            questionnaire_count: summary.questionnaire_count,
            created_at: format_primitive(group.created_at),
            updated_at: format_primitive(group.updated_at),
        }
    }
}

#[derive(Debug, SimpleObject)]
#[graphql(name = "QuestionOption")]
pub(crate) struct QuestionOptionView {
    pub(crate) id: String,
    pub(crate) question_id: String,
    pub(crate) text: String,
    pub(crate) order_index: i32,
    pub(crate) created_at: String,
}

impl From<QuestionOption> for QuestionOptionView {
    fn from(option: QuestionOption) -> Self {
        Self {
            id: option.id,
            question_id: option.question_id,
            text: option.text,
            order_index: option.order_index,
            created_at: format_primitive(option.created_at),
        }
    }
}

#[derive(Debug, SimpleObject)]
#[graphql(name = "Question")]
pub(crate) struct QuestionView {
    pub(crate) id: String,
    pub(crate) questionnaire_id: String,
    pub(crate) text: String,
    #[graphql(name = "type")]
    pub(crate) question_type: QuestionType,
    pub(crate) required: bool,
    pub(crate) order_index: i32,
    pub(crate) options: Vec<QuestionOptionView>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl QuestionView {
    pub(crate) fn new(question: Question, options: Vec<QuestionOption>) -> Self {
        Self {
            id: question.id,
            questionnaire_id: question.questionnaire_id,
            text: question.text,
            question_type: question.question_type,
            required: question.required,
            order_index: question.order_index,
            options: options.into_iter().map(Into::into).collect(),
            created_at: format_primitive(question.created_at),
            updated_at: format_primitive(question.updated_at),
        }
    }
}

impl From<QuestionDetail> for QuestionView {
    fn from(detail: QuestionDetail) -> Self {
        Self::new(detail.question, detail.options)
    }
}

/// An assignment triple a questionnaire is explicitly open to.
#[derive(Debug, SimpleObject)]
#[graphql(name = "QuestionnaireAssignment")]
pub(crate) struct AssignmentView {
    pub(crate) id: String,
    pub(crate) student: StudentView,
    pub(crate) subject: SubjectView,
    pub(crate) teacher: Option<TeacherView>,
}

impl From<AssignmentDetail> for AssignmentView {
    fn from(detail: AssignmentDetail) -> Self {
        Self {
            id: detail.id,
            student: detail.student.into(),
            subject: detail.subject.into(),
            teacher: detail.teacher.map(Into::into),
        }
    }
}

#[derive(Debug, SimpleObject)]
#[graphql(name = "Questionnaire")]
pub(crate) struct QuestionnaireView {
    pub(crate) id: String,
    pub(crate) group_id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) is_anonymous: bool,
    pub(crate) assignment_type: AssignmentType,
    pub(crate) questions: Vec<QuestionView>,
    pub(crate) assignments: Vec<AssignmentView>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl QuestionnaireView {
    pub(crate) fn new(
        questionnaire: Questionnaire,
        questions: Vec<QuestionDetail>,
        assignments: Vec<AssignmentDetail>,
    ) -> Self {
        Self {
            id: questionnaire.id,
            group_id: questionnaire.group_id,
            title: questionnaire.title,
            description: questionnaire.description,
            is_active: questionnaire.is_active,
            is_anonymous: questionnaire.is_anonymous,
            assignment_type: questionnaire.assignment_type,
            questions: questions.into_iter().map(Into::into).collect(),
            assignments: assignments.into_iter().map(Into::into).collect(),
            created_at: format_primitive(questionnaire.created_at),
            updated_at: format_primitive(questionnaire.updated_at),
        }
    }
}

impl From<QuestionnaireDetail> for QuestionnaireView {
    fn from(detail: QuestionnaireDetail) -> Self {
        Self::new(detail.questionnaire, detail.questions, detail.assignments)
    }
}

/// A row of the admin questionnaire list.
#[derive(Debug, SimpleObject)]
#[graphql(name = "QuestionnaireSummary")]
pub(crate) struct QuestionnaireListItem {
    pub(crate) id: String,
    pub(crate) group_id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) is_anonymous: bool,
    pub(crate) assignment_type: AssignmentType,
    pub(crate) question_count: i64,
    pub(crate) response_count: i64,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl From<QuestionnaireSummary> for QuestionnaireListItem {
    fn from(summary: QuestionnaireSummary) -> Self {
        let questionnaire = summary.questionnaire;
        Self {
            id: questionnaire.id,
            group_id: questionnaire.group_id,
            title: questionnaire.title,
            description: questionnaire.description,
            is_active: questionnaire.is_active,
            is_anonymous: questionnaire.is_anonymous,
            assignment_type: questionnaire.assignment_type,
            question_count: summary.question_count,
            response_count: summary.response_count,
            created_at: format_primitive(questionnaire.created_at),
            updated_at: format_primitive(questionnaire.updated_at),
        }
    }
}

/// One questionnaire a student may fill in, bound to a (subject, teacher) pair.
#[derive(Debug, SimpleObject)]
#[graphql(name = "StudentQuestionnaire")]
pub(crate) struct StudentQuestionnaireView {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) is_anonymous: bool,
    pub(crate) questions: Vec<QuestionView>,
    pub(crate) subject: Option<SubjectView>,
    pub(crate) teacher: Option<TeacherView>,
    pub(crate) is_submitted: bool,
    pub(crate) created_at: String,
}

impl From<StudentQuestionnaire> for StudentQuestionnaireView {
    fn from(entry: StudentQuestionnaire) -> Self {
        let questionnaire = entry.questionnaire;
        Self {
            id: questionnaire.id,
            title: questionnaire.title,
            description: questionnaire.description,
            is_anonymous: questionnaire.is_anonymous,
            questions: entry.questions.into_iter().map(Into::into).collect(),
            subject: entry.subject.map(Into::into),
            teacher: entry.teacher.map(Into::into),
            is_submitted: entry.is_submitted,
            created_at: format_primitive(questionnaire.created_at),
        }
    }
}

#[derive(Debug, SimpleObject)]
#[graphql(name = "QuestionnaireAssignmentData")]
pub(crate) struct QuestionnaireAssignmentDataView {
    pub(crate) subjects: Vec<SubjectView>,
    pub(crate) teachers: Vec<TeacherView>,
    pub(crate) students: Vec<StudentView>,
    pub(crate) assignments: Vec<AssignmentView>,
}

impl From<AssignmentData> for QuestionnaireAssignmentDataView {
    fn from(data: AssignmentData) -> Self {
        Self {
            subjects: data.subjects.into_iter().map(Into::into).collect(),
            teachers: data.teachers.into_iter().map(Into::into).collect(),
            students: data.students.into_iter().map(Into::into).collect(),
            assignments: data.assignments.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, SimpleObject)]
#[graphql(name = "QuestionnaireGroupPayload")]
pub(crate) struct GroupPayload {
    pub(crate) success: bool,
    pub(crate) message: String,
    pub(crate) group: Option<GroupView>,
}

#[derive(Debug, SimpleObject)]
pub(crate) struct QuestionnairePayload {
    pub(crate) success: bool,
    pub(crate) message: String,
    pub(crate) questionnaire: Option<QuestionnaireView>,
}

#[derive(Debug, SimpleObject)]
pub(crate) struct SubmitResponsePayload {
    pub(crate) success: bool,
    pub(crate) message: String,
    pub(crate) response_id: String,
}

impl From<SubmissionReceipt> for SubmitResponsePayload {
    fn from(receipt: SubmissionReceipt) -> Self {
        Self { success: true, message: receipt.message, response_id: receipt.response_id }
    }
}

#[derive(Debug, InputObject)]
#[graphql(name = "OptionInput")]
pub(crate) struct OptionInputArg {
    pub(crate) text: String,
    pub(crate) order_index: Option<i32>,
}

impl From<OptionInputArg> for OptionInput {
    fn from(arg: OptionInputArg) -> Self {
        Self { text: arg.text, order_index: arg.order_index }
    }
}

/// A question to create, or to update in place when `id` is set.
#[derive(Debug, InputObject)]
#[graphql(name = "QuestionInput")]
pub(crate) struct QuestionInputArg {
    pub(crate) id: Option<String>,
    pub(crate) text: String,
    #[graphql(name = "type")]
    pub(crate) question_type: QuestionType,
    #[graphql(default)]
    pub(crate) required: bool,
    pub(crate) order_index: Option<i32>,
    pub(crate) options: Option<Vec<OptionInputArg>>,
}

impl From<QuestionInputArg> for QuestionInput {
    fn from(arg: QuestionInputArg) -> Self {
        Self {
            id: arg.id,
            text: arg.text,
            question_type: arg.question_type,
            required: arg.required,
            order_index: arg.order_index,
            options: arg.options.map(|options| options.into_iter().map(Into::into).collect()),
        }
    }
}

/// `answer_rating` is a float so that non-integer ratings reach validation
/// instead of failing input coercion.
#[derive(Debug, InputObject)]
#[graphql(name = "AnswerInput")]
pub(crate) struct AnswerInputArg {
    pub(crate) question_id: String,
    pub(crate) answer_text: Option<String>,
    pub(crate) answer_option_id: Option<String>,
    pub(crate) answer_rating: Option<f64>,
    pub(crate) answer_boolean: Option<bool>,
}

impl From<AnswerInputArg> for AnswerInput {
    fn from(arg: AnswerInputArg) -> Self {
        Self {
            question_id: arg.question_id,
            answer_text: arg.answer_text,
            answer_option_id: arg.answer_option_id,
            answer_rating: arg.answer_rating,
            answer_boolean: arg.answer_boolean,
        }
    }
}

#[derive(Debug, InputObject)]
pub(crate) struct SubmitResponseInput {
    pub(crate) questionnaire_id: String,
    pub(crate) subject_id: String,
    pub(crate) teacher_id: Option<String>,
    pub(crate) answers: Vec<AnswerInputArg>,
}

impl From<SubmitResponseInput> for SubmissionInput {
    fn from(input: SubmitResponseInput) -> Self {
        Self {
            questionnaire_id: input.questionnaire_id,
            subject_id: input.subject_id,
            teacher_id: input.teacher_id,
            answers: input.answers.into_iter().map(Into::into).collect(),
        }
    }
}
