//! Response statistics for one questionnaire.
//!
//! Respondent identity is resolved from the stored email to the student name,
//! falling back to the email itself, and is withheld entirely for anonymous
//! questionnaires.

use std::collections::HashMap;

use time::PrimitiveDateTime;

use crate::db::models::{QuestionOption, QuestionResponse, Questionnaire, QuestionnaireResponse};
use crate::db::types::QuestionType;
use crate::repositories::store::SurveyStore;
use crate::services::assignments::AssignmentResolver;
use crate::services::error::{OrInternal, ServiceError, ServiceResult};
use crate::services::questionnaires::{load_questions, QuestionDetail};

#[derive(Debug, Clone)]
pub(crate) struct OptionCount {
    pub(crate) option: QuestionOption,
    pub(crate) count: i64,
    pub(crate) percentage: f64,
}

#[derive(Debug, Clone)]
pub(crate) struct RatingBucket {
    pub(crate) rating: i32,
    pub(crate) count: i64,
    pub(crate) percentage: f64,
}

/// One attributed answer. `V` is the answer payload (option, rating, boolean or text).
#[derive(Debug, Clone)]
pub(crate) struct IndividualAnswer<V> {
    pub(crate) id: String,
    pub(crate) value: V,
    pub(crate) respondent_info: Option<String>,
    pub(crate) submitted_at: PrimitiveDateTime,
}

/// Per-type statistics. Individual listings are `None` for anonymous
/// questionnaires, except free text where only the respondent is hidden.
#[derive(Debug, Clone)]
pub(crate) enum Breakdown {
    MultipleChoice {
        option_counts: Vec<OptionCount>,
        option_responses: Option<Vec<IndividualAnswer<QuestionOption>>>,
    },
    Rating {
        average_rating: f64,
        rating_distribution: Vec<RatingBucket>,
        rating_responses: Option<Vec<IndividualAnswer<i32>>>,
    },
    YesNo {
        yes_count: i64,
        no_count: i64,
        yes_no_responses: Option<Vec<IndividualAnswer<bool>>>,
    },
    FreeText {
        text_responses: Vec<IndividualAnswer<String>>,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct QuestionResult {
    pub(crate) question: QuestionDetail,
    pub(crate) total_responses: i64,
    pub(crate) breakdown: Breakdown,
}

#[derive(Debug, Clone)]
pub(crate) struct QuestionnaireResults {
    pub(crate) questionnaire: Questionnaire,
    pub(crate) questions: Vec<QuestionDetail>,
    pub(crate) total_assigned: i64,
    pub(crate) total_responded: i64,
    pub(crate) response_rate: f64,
    pub(crate) question_results: Vec<QuestionResult>,
}

fn percentage(count: i64, total: i64) -> f64 {
    if total > 0 {
        count as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}

/// An answer joined with the response it belongs to.
struct AnswerRow<'r> {
    answer: &'r QuestionResponse,
    response: &'r QuestionnaireResponse,
    respondent: Option<&'r str>,
}

impl AnswerRow<'_> {
    fn individual<V>(&self, value: V) -> IndividualAnswer<V> {
        IndividualAnswer {
            id: self.answer.id.clone(),
            value,
            respondent_info: self.respondent.map(str::to_string),
            submitted_at: self.response.submitted_at,
        }
    }
}

pub(crate) struct ResultsService<'a> {
    store: &'a dyn SurveyStore,
}

impl<'a> ResultsService<'a> {
    pub(crate) fn new(store: &'a dyn SurveyStore) -> Self {
        Self { store }
    }

    pub(crate) async fn results(
        &self,
        questionnaire_id: &str,
    ) -> ServiceResult<QuestionnaireResults> {
        let questionnaire = self
            .store
            .find_questionnaire(questionnaire_id)
            .await
            .or_internal("fetch questionnaire")?
            .ok_or_else(|| ServiceError::NotFound("Questionnaire not found".to_string()))?;

        let questions = load_questions(self.store, &[questionnaire.id.clone()]).await?;
        let total_assigned =
            AssignmentResolver::new(self.store).count_assigned(&questionnaire).await?;

        let responses = self
            .store
            .list_responses(&questionnaire.id)
            .await
            .or_internal("fetch responses")?;
        let total_responded = responses.len() as i64;
        let response_rate = percentage(total_responded, total_assigned);

        let response_ids: Vec<String> = responses.iter().map(|r| r.id.clone()).collect();
        let answers = if response_ids.is_empty() {
            Vec::new()
        } else {
            self.store.list_answers(&response_ids).await.or_internal("fetch answers")?
        };

        let names = if questionnaire.is_anonymous {
            HashMap::new()
        } else {
            self.respondent_names(&responses).await?
        };
        let by_id: HashMap<&str, &QuestionnaireResponse> =
            responses.iter().map(|response| (response.id.as_str(), response)).collect();

        let mut per_question: HashMap<&str, Vec<AnswerRow<'_>>> = HashMap::new();
        for answer in &answers {
            let Some(response) = by_id.get(answer.response_id.as_str()) else {
                continue;
            };
            let respondent = if questionnaire.is_anonymous {
                None
            } else {
                Some(
                    names
                        .get(response.student_email.as_str())
                        .map_or(response.student_email.as_str(), String::as_str),
                )
            };
            per_question.entry(answer.question_id.as_str()).or_default().push(AnswerRow {
                answer,
                response,
                respondent,
            });
        }

        let question_results = questions
            .iter()
            .map(|detail| {
                let rows = per_question.remove(detail.question.id.as_str()).unwrap_or_default();
                aggregate(detail, &rows, questionnaire.is_anonymous)
            })
            .collect();

        tracing::debug!(
            questionnaire_id = %questionnaire.id,
            total_assigned,
            total_responded,
            "Aggregated questionnaire results"
        );
        Ok(QuestionnaireResults {
            questionnaire,
            questions,
            total_assigned,
            total_responded,
            response_rate,
            question_results,
        })
    }

    /// Student names keyed by the emails responses were stored under.
    async fn respondent_names(
        &self,
        responses: &[QuestionnaireResponse],
    ) -> ServiceResult<HashMap<String, String>> {
        let mut emails: Vec<String> =
            responses.iter().map(|response| response.student_email.clone()).collect();
        emails.sort();
        emails.dedup();
        if emails.is_empty() {
            return Ok(HashMap::new());
        }

        let students = self
            .store
            .find_students_by_emails(&emails)
            .await
            .or_internal("fetch respondents")?;
        let mut names = HashMap::new();
        for student in students {
            if let Some(email) = student.email {
                names.entry(email).or_insert(student.name);
            }
        }
        Ok(names)
    }
}

fn listed<V>(
    anonymous: bool,
    listing: Vec<IndividualAnswer<V>>,
) -> Option<Vec<IndividualAnswer<V>>> {
    (!anonymous).then_some(listing)
}

fn aggregate(detail: &QuestionDetail, rows: &[AnswerRow<'_>], anonymous: bool) -> QuestionResult {
    let total = rows.len() as i64;

    let breakdown = match detail.question.question_type {
        QuestionType::MultipleChoice => {
            let option_counts = detail
                .options
                .iter()
                .map(|option| {
                    let chosen = Some(option.id.as_str());
                    let count = rows
                        .iter()
                        .filter(|row| row.answer.answer_option_id.as_deref() == chosen)
                        .count() as i64;
                    OptionCount {
                        option: option.clone(),
                        count,
                        percentage: percentage(count, total),
                    }
                })
                .collect();
            let options: HashMap<&str, &QuestionOption> =
                detail.options.iter().map(|option| (option.id.as_str(), option)).collect();
            let listing = rows
                .iter()
                .filter_map(|row| {
                    let option = options.get(row.answer.answer_option_id.as_deref()?)?;
                    Some(row.individual((*option).clone()))
                })
                .collect();
            Breakdown::MultipleChoice {
                option_counts,
                option_responses: listed(anonymous, listing),
            }
        }
        QuestionType::Rating => {
            let ratings: Vec<i32> =
                rows.iter().filter_map(|row| row.answer.answer_rating).collect();
            let average_rating = if ratings.is_empty() {
                0.0
            } else {
                ratings.iter().map(|&r| f64::from(r)).sum::<f64>() / ratings.len() as f64
            };
            let rating_distribution = (1..=5)
                .map(|rating| {
                    let count = ratings.iter().filter(|&&r| r == rating).count() as i64;
                    RatingBucket { rating, count, percentage: percentage(count, total) }
                })
                .collect();
            let listing = rows
                .iter()
                .filter_map(|row| row.answer.answer_rating.map(|rating| row.individual(rating)))
                .collect();
            Breakdown::Rating {
                average_rating,
                rating_distribution,
                rating_responses: listed(anonymous, listing),
            }
        }
        QuestionType::YesNo => {
            let count = |value: bool| {
                rows.iter().filter(|row| row.answer.answer_boolean == Some(value)).count() as i64
            };
            let listing = rows
                .iter()
                .filter_map(|row| row.answer.answer_boolean.map(|answer| row.individual(answer)))
                .collect();
            Breakdown::YesNo {
                yes_count: count(true),
                no_count: count(false),
                yes_no_responses: listed(anonymous, listing),
            }
        }
        QuestionType::FreeText => Breakdown::FreeText {
            text_responses: rows
                .iter()
                .filter_map(|row| {
                    let text = row.answer.answer_text.as_deref().filter(|text| !text.is_empty())?;
                    Some(row.individual(text.to_string()))
                })
                .collect(),
        },
    };

    QuestionResult { question: detail.clone(), total_responses: total, breakdown }
}
