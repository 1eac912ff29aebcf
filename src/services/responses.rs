//! Response submission: eligibility, duplicate detection and answer validation
//! precede any write; a failed answer batch removes the response row again.

use std::collections::HashMap;

use crate::core::metrics;
use crate::db::models::Question;
use crate::db::types::QuestionType;
use crate::repositories::store::{NewAnswer, ResponseKey, SurveyStore};
use crate::services::assignments::{resolve_student, AssignmentResolver};
use crate::services::error::{OrInternal, ServiceError, ServiceResult};
use crate::services::saga::Saga;

pub(crate) const SUBMITTED_MESSAGE: &str = "Odpovědi byly úspěšně odeslány";

#[derive(Debug, Clone, Default)]
pub(crate) struct AnswerInput {
    pub(crate) question_id: String,
    pub(crate) answer_text: Option<String>,
    pub(crate) answer_option_id: Option<String>,
    pub(crate) answer_rating: Option<f64>,
    pub(crate) answer_boolean: Option<bool>,
}

impl AnswerInput {
    fn is_blank(&self) -> bool {
        self.answer_text.as_deref().map_or(true, str::is_empty)
            && self.answer_option_id.is_none()
            && self.answer_rating.is_none()
            && self.answer_boolean.is_none()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SubmissionInput {
    pub(crate) questionnaire_id: String,
    pub(crate) subject_id: String,
    pub(crate) teacher_id: Option<String>,
    pub(crate) answers: Vec<AnswerInput>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SubmissionReceipt {
    pub(crate) response_id: String,
    pub(crate) message: String,
}

pub(crate) struct ResponseService<'a> {
    store: &'a dyn SurveyStore,
}

impl<'a> ResponseService<'a> {
    pub(crate) fn new(store: &'a dyn SurveyStore) -> Self {
        Self { store }
    }

    pub(crate) async fn submit(
        &self,
        user_id: &str,
        input: SubmissionInput,
    ) -> ServiceResult<SubmissionReceipt> {
        let result = self.submit_inner(user_id, input).await;
        metrics::record_submission(match &result {
            Ok(_) => "accepted",
            Err(ServiceError::Conflict(_)) => "duplicate",
            Err(ServiceError::Validation(_)) => "invalid",
            Err(ServiceError::Internal(_)) => "failed",
            Err(_) => "rejected",
        });
        result
    }

    async fn submit_inner(
        &self,
        user_id: &str,
        mut input: SubmissionInput,
    ) -> ServiceResult<SubmissionReceipt> {
        input.teacher_id = input.teacher_id.filter(|id| !id.is_empty());
        let identity = resolve_student(self.store, user_id).await?;

        let questionnaire = self
            .store
            .find_questionnaire(&input.questionnaire_id)
            .await
            .or_internal("load questionnaire")?
            .ok_or_else(|| ServiceError::NotFound("Questionnaire not found".to_string()))?;
        if !questionnaire.is_active {
            return Err(ServiceError::InvalidState("Questionnaire is not active".to_string()));
        }

        let open = AssignmentResolver::new(self.store)
            .is_open_to(
                &questionnaire,
                &identity.student.id,
                &input.subject_id,
                input.teacher_id.as_deref(),
            )
            .await?;
        if !open {
            return Err(ServiceError::Forbidden(
                "You do not have access to this questionnaire".to_string(),
            ));
        }

        let key = ResponseKey {
            questionnaire_id: questionnaire.id.clone(),
            student_email: identity.email.clone(),
            subject_id: input.subject_id.clone(),
            teacher_id: input.teacher_id.clone(),
        };
        if self.store.find_response(&key).await.or_internal("check existing response")?.is_some() {
            return Err(already_submitted());
        }

        let questions = self
            .store
            .list_questions(std::slice::from_ref(&questionnaire.id))
            .await
            .or_internal("load questions")?;
        let answers = validate_answers(&questions, &input.answers)?;

        let mut saga = Saga::new("submit_response");
        let response = saga
            .run("create response", self.store.insert_response(key))
            .await
            .map_err(|err| {
                if err.is_unique_violation() {
                    already_submitted()
                } else {
                    ServiceError::internal(err, "create response")
                }
            })?;
        let response_id = response.id.clone();
        let store = self.store;
        saga.on_rollback("delete response", move || async move {
            store.delete_response(&response_id).await
        });

        let rows = answers
            .into_iter()
            .map(|answer| NewAnswer { response_id: response.id.clone(), ..answer })
            .collect();
        saga.run("save answers", self.store.insert_answers(rows))
            .await
            .or_internal("save answers")?;
        saga.commit();

        tracing::info!(
            response_id = %response.id,
            questionnaire_id = %questionnaire.id,
            "Response submitted"
        );
        Ok(SubmissionReceipt { response_id: response.id, message: SUBMITTED_MESSAGE.to_string() })
    }

    /// Whether the caller already answered for this subject and teacher.
    pub(crate) async fn has_submitted(
        &self,
        user_id: &str,
        questionnaire_id: &str,
        subject_id: &str,
        teacher_id: Option<&str>,
    ) -> ServiceResult<bool> {
        let Some(profile) = self.store.find_profile(user_id).await.or_internal("load profile")?
        else {
            return Ok(false);
        };
        let key = ResponseKey {
            questionnaire_id: questionnaire_id.to_string(),
            student_email: profile.email,
            subject_id: subject_id.to_string(),
            teacher_id: teacher_id.filter(|id| !id.is_empty()).map(str::to_string),
        };
        Ok(self.store.find_response(&key).await.or_internal("check response")?.is_some())
    }
}

fn already_submitted() -> ServiceError {
    ServiceError::Conflict(
        "You have already submitted a response for this questionnaire".to_string(),
    )
}

/// Checks required questions and per-type answer shapes. The returned rows still
/// need their `response_id`.
fn validate_answers(
    questions: &[Question],
    answers: &[AnswerInput],
) -> ServiceResult<Vec<NewAnswer>> {
    for question in questions.iter().filter(|question| question.required) {
        let answered = answers
            .iter()
            .find(|answer| answer.question_id == question.id)
            .is_some_and(|answer| !answer.is_blank());
        if !answered {
            return Err(ServiceError::Validation(format!(
                "Required question {} is not answered",
                question.id
            )));
        }
    }

    let by_id: HashMap<&str, &Question> =
        questions.iter().map(|question| (question.id.as_str(), question)).collect();

    answers
        .iter()
        .map(|answer| {
            let question = by_id.get(answer.question_id.as_str()).ok_or_else(|| {
                ServiceError::Validation(format!("Invalid question ID: {}", answer.question_id))
            })?;
            typed_answer(question.question_type, answer)
        })
        .collect()
}

fn typed_answer(question_type: QuestionType, answer: &AnswerInput) -> ServiceResult<NewAnswer> {
    let id = &answer.question_id;
    let mut row = NewAnswer {
        response_id: String::new(),
        question_id: id.clone(),
        answer_text: None,
        answer_option_id: None,
        answer_rating: None,
        answer_boolean: None,
    };

    match question_type {
        QuestionType::FreeText => {
            let text = answer.answer_text.clone().ok_or_else(|| {
                ServiceError::Validation(format!("Text answer required for question {id}"))
            })?;
            row.answer_text = Some(text);
        }
        QuestionType::MultipleChoice => {
            let option = answer.answer_option_id.clone().ok_or_else(|| {
                ServiceError::Validation(format!("Option selection required for question {id}"))
            })?;
            row.answer_option_id = Some(option);
        }
        QuestionType::Rating => {
            let rating = answer.answer_rating.and_then(whole_rating).ok_or_else(|| {
                ServiceError::Validation(format!("Valid rating (1-5) required for question {id}"))
            })?;
            row.answer_rating = Some(rating);
        }
        QuestionType::YesNo => {
            let value = answer.answer_boolean.ok_or_else(|| {
                ServiceError::Validation(format!("Yes/No answer required for question {id}"))
            })?;
            row.answer_boolean = Some(value);
        }
    }

    Ok(row)
}

fn whole_rating(value: f64) -> Option<i32> {
    (value.fract() == 0.0 && (1.0..=5.0).contains(&value)).then_some(value as i32)
}
