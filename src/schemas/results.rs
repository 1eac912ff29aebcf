use async_graphql::SimpleObject;

use crate::core::time::format_primitive;
use crate::db::models::QuestionOption;
use crate::db::types::QuestionType;
use crate::schemas::questionnaire::{QuestionView, QuestionnaireView};
use crate::services::results::{
    Breakdown, IndividualAnswer, OptionCount, QuestionResult, QuestionnaireResults, RatingBucket,
};

#[derive(Debug, SimpleObject)]
#[graphql(name = "OptionCount")]
pub(crate) struct OptionCountView {
    pub(crate) option_id: String,
    pub(crate) option_text: String,
    pub(crate) count: i64,
    pub(crate) percentage: f64,
}

impl From<OptionCount> for OptionCountView {
    fn from(entry: OptionCount) -> Self {
        Self {
            option_id: entry.option.id,
            option_text: entry.option.text,
            count: entry.count,
            percentage: entry.percentage,
        }
    }
}

#[derive(Debug, SimpleObject)]
#[graphql(name = "RatingCount")]
pub(crate) struct RatingBucketView {
    pub(crate) rating: i32,
    pub(crate) count: i64,
    pub(crate) percentage: f64,
}

impl From<RatingBucket> for RatingBucketView {
    fn from(bucket: RatingBucket) -> Self {
        Self { rating: bucket.rating, count: bucket.count, percentage: bucket.percentage }
    }
}

#[derive(Debug, SimpleObject)]
#[graphql(name = "OptionResponse")]
pub(crate) struct OptionResponseView {
    pub(crate) id: String,
    pub(crate) option_id: String,
    pub(crate) option_text: String,
    pub(crate) respondent_info: Option<String>,
    pub(crate) submitted_at: String,
}

impl From<IndividualAnswer<QuestionOption>> for OptionResponseView {
    fn from(answer: IndividualAnswer<QuestionOption>) -> Self {
        Self {
            id: answer.id,
            option_id: answer.value.id,
            option_text: answer.value.text,
            respondent_info: answer.respondent_info,
            submitted_at: format_primitive(answer.submitted_at),
        }
    }
}

#[derive(Debug, SimpleObject)]
#[graphql(name = "RatingResponse")]
pub(crate) struct RatingResponseView {
    pub(crate) id: String,
    pub(crate) rating: i32,
    pub(crate) respondent_info: Option<String>,
    pub(crate) submitted_at: String,
}

impl From<IndividualAnswer<i32>> for RatingResponseView {
    fn from(answer: IndividualAnswer<i32>) -> Self {
        Self {
            id: answer.id,
            rating: answer.value,
            respondent_info: answer.respondent_info,
            submitted_at: format_primitive(answer.submitted_at),
        }
    }
}

#[derive(Debug, SimpleObject)]
#[graphql(name = "YesNoResponse")]
pub(crate) struct YesNoResponseView {
    pub(crate) id: String,
    pub(crate) answer: bool,
    pub(crate) respondent_info: Option<String>,
    pub(crate) submitted_at: String,
}

impl From<IndividualAnswer<bool>> for YesNoResponseView {
    fn from(answer: IndividualAnswer<bool>) -> Self {
        Self {
            id: answer.id,
            answer: answer.value,
            respondent_info: answer.respondent_info,
            submitted_at: format_primitive(answer.submitted_at),
        }
    }
}

#[derive(Debug, SimpleObject)]
#[graphql(name = "TextResponse")]
pub(crate) struct TextResponseView {
    pub(crate) id: String,
    pub(crate) text: String,
    pub(crate) respondent_info: Option<String>,
    pub(crate) submitted_at: String,
}

impl From<IndividualAnswer<String>> for TextResponseView {
    fn from(answer: IndividualAnswer<String>) -> Self {
        Self {
            id: answer.id,
            text: answer.value,
            respondent_info: answer.respondent_info,
            submitted_at: format_primitive(answer.submitted_at),
        }
    }
}

fn convert<S, T: From<S>>(rows: Vec<S>) -> Vec<T> {
    rows.into_iter().map(T::from).collect()
}

/// Statistics for one question. Only the fields of the question's own type are set.
#[derive(Debug, Default, SimpleObject)]
#[graphql(name = "QuestionResult")]
pub(crate) struct QuestionResultView {
    pub(crate) question_id: String,
    pub(crate) question_text: String,
    pub(crate) question_type: Option<QuestionType>,
    pub(crate) question: Option<QuestionView>,
    pub(crate) total_responses: i64,
    pub(crate) option_counts: Option<Vec<OptionCountView>>,
    pub(crate) option_responses: Option<Vec<OptionResponseView>>,
    pub(crate) average_rating: Option<f64>,
    pub(crate) rating_distribution: Option<Vec<RatingBucketView>>,
    pub(crate) rating_responses: Option<Vec<RatingResponseView>>,
    pub(crate) yes_count: Option<i64>,
    pub(crate) no_count: Option<i64>,
    pub(crate) yes_no_responses: Option<Vec<YesNoResponseView>>,
    pub(crate) text_responses: Option<Vec<TextResponseView>>,
}

impl From<QuestionResult> for QuestionResultView {
    fn from(result: QuestionResult) -> Self {
        let question = &result.question.question;
        let mut view = Self {
            question_id: question.id.clone(),
            question_text: question.text.clone(),
            question_type: Some(question.question_type),
            total_responses: result.total_responses,
            ..Self::default()
        };

        match result.breakdown {
            Breakdown::MultipleChoice { option_counts, option_responses } => {
                view.option_counts = Some(convert(option_counts));
                view.option_responses = option_responses.map(convert);
            }
            Breakdown::Rating { average_rating, rating_distribution, rating_responses } => {
                view.average_rating = Some(average_rating);
                view.rating_distribution = Some(convert(rating_distribution));
                view.rating_responses = rating_responses.map(convert);
            }
            Breakdown::YesNo { yes_count, no_count, yes_no_responses } => {
                view.yes_count = Some(yes_count);
                view.no_count = Some(no_count);
                view.yes_no_responses = yes_no_responses.map(convert);
            }
            Breakdown::FreeText { text_responses } => {
                view.text_responses = Some(convert(text_responses));
            }
        }

        view.question = Some(result.question.into());
        view
    }
}

#[derive(Debug, SimpleObject)]
#[graphql(name = "QuestionnaireResults")]
pub(crate) struct QuestionnaireResultsView {
    pub(crate) questionnaire: QuestionnaireView,
    pub(crate) total_assigned: i64,
    pub(crate) total_responded: i64,
    pub(crate) response_rate: f64,
    pub(crate) question_results: Vec<QuestionResultView>,
}

impl From<QuestionnaireResults> for QuestionnaireResultsView {
    fn from(results: QuestionnaireResults) -> Self {
        Self {
            questionnaire: QuestionnaireView::new(
                results.questionnaire,
                results.questions,
                Vec::new(),
            ),
            total_assigned: results.total_assigned,
            total_responded: results.total_responded,
            response_rate: results.response_rate,
            question_results: convert(results.question_results),
        }
    }
}
