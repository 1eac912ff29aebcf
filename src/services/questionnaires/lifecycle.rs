use std::collections::HashSet;

use super::{
    load_questions, questionnaire_not_found, CreateQuestionnaireInput, QuestionInput,
    QuestionnaireDetail, QuestionnaireService, UpdateQuestionnaireInput, GROUP_NOT_FOUND,
};
use crate::db::types::{AssignmentType, QuestionType};
use crate::repositories::store::{NewOption, NewQuestion, NewQuestionnaire, QuestionnairePatch};
use crate::services::assignments::AssignmentResolver;
use crate::services::error::{OrInternal, ServiceError, ServiceResult};

/// Title for a copy of `title` plus the stem used when that title is taken.
///
/// `X` becomes `X (kopie)`, `X (kopie)` becomes `X (kopie 2)` and
/// `X (kopie N)` becomes `X (kopie N+1)`.
pub(crate) fn duplicate_title(title: &str) -> (String, String) {
    match split_copy_suffix(title) {
        Some((base, number)) => (format!("{base} (kopie {})", number + 1), base.to_string()),
        None => (format!("{title} (kopie)"), title.to_string()),
    }
}

/// Splits `"<base> (kopie[ N])"` into the base and `N` (1 when absent).
fn split_copy_suffix(title: &str) -> Option<(&str, u64)> {
    let inner = title.strip_suffix(')')?;
    let open = inner.rfind("(kopie")?;
    let base = inner[..open].trim_end();
    if base.is_empty() {
        return None;
    }

    let rest = &inner[open + "(kopie".len()..];
    if rest.is_empty() {
        return Some((base, 1));
    }
    let digits = rest.trim_start();
    let has_separator = digits.len() < rest.len();
    if !has_separator || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((base, digits.parse().ok()?))
}

fn new_question(questionnaire_id: &str, position: usize, input: &QuestionInput) -> NewQuestion {
    NewQuestion {
        questionnaire_id: questionnaire_id.to_string(),
        text: input.text.clone(),
        question_type: input.question_type,
        required: input.required,
        order_index: input.order_index.unwrap_or(position as i32),
    }
}

/// Options to store for a question; only multiple choice questions keep any.
fn new_options(question_id: &str, input: &QuestionInput) -> Vec<NewOption> {
    if input.question_type != QuestionType::MultipleChoice {
        return Vec::new();
    }
    input
        .options
        .iter()
        .flatten()
        .enumerate()
        .map(|(position, option)| NewOption {
            question_id: question_id.to_string(),
            text: option.text.clone(),
            order_index: option.order_index.unwrap_or(position as i32),
        })
        .collect()
}

impl<'a> QuestionnaireService<'a> {
    /// Creates the questionnaire, its explicit assignments, questions and options.
    /// Later steps do not undo earlier ones.
    pub(crate) async fn create(
        &self,
        input: CreateQuestionnaireInput,
    ) -> ServiceResult<QuestionnaireDetail> {
        if self.store.find_group(&input.group_id).await.or_internal("load group")?.is_none() {
            return Err(ServiceError::NotFound(GROUP_NOT_FOUND.to_string()));
        }

        let questionnaire = self
            .store
            .insert_questionnaire(NewQuestionnaire {
                group_id: input.group_id,
                title: input.title,
                description: input.description,
                is_active: true,
                is_anonymous: input.is_anonymous,
                assignment_type: input.assignment_type,
            })
            .await
            .or_internal("create questionnaire")?;

        if input.assignment_type == AssignmentType::SpecificStudents
            && !input.assignment_ids.is_empty()
        {
            self.store
                .insert_assignments(&questionnaire.id, &input.assignment_ids)
                .await
                .or_internal("assign questionnaire")?;
        }

        self.insert_questions(&questionnaire.id, &input.questions).await?;

        tracing::info!(
            questionnaire_id = %questionnaire.id,
            questions = input.questions.len(),
            assignments = input.assignment_ids.len(),
            "Questionnaire created"
        );
        self.detail(&questionnaire.id).await?.ok_or_else(questionnaire_not_found)
    }

    async fn insert_questions(
        &self,
        questionnaire_id: &str,
        inputs: &[QuestionInput],
    ) -> ServiceResult<()> {
        if inputs.is_empty() {
            return Ok(());
        }

        let rows = inputs
            .iter()
            .enumerate()
            .map(|(position, input)| new_question(questionnaire_id, position, input))
            .collect();
        let created = self.store.insert_questions(rows).await.or_internal("create questions")?;

        let options: Vec<NewOption> = created
            .iter()
            .zip(inputs)
            .flat_map(|(question, input)| new_options(&question.id, input))
            .collect();
        if !options.is_empty() {
            self.store.insert_options(options).await.or_internal("create question options")?;
        }
        Ok(())
    }

    /// Patches scalars, replaces the assignment set when asked to, and diffs the
    /// question list by id.
    pub(crate) async fn update(
        &self,
        id: &str,
        input: UpdateQuestionnaireInput,
    ) -> ServiceResult<QuestionnaireDetail> {
        self.store
            .find_questionnaire(id)
            .await
            .or_internal("load questionnaire")?
            .ok_or_else(questionnaire_not_found)?;

        let patch = QuestionnairePatch {
            title: input.title,
            description: input.description,
            is_active: input.is_active,
            is_anonymous: input.is_anonymous,
            assignment_type: input.assignment_type,
        };
        self.store.update_questionnaire(id, patch).await.or_internal("update questionnaire")?;

        if input.assignment_type.is_some() || input.assignment_ids.is_some() {
            self.store.delete_assignments(id).await.or_internal("clear assignments")?;

            let wants_rows = match input.assignment_type {
                Some(kind) => kind == AssignmentType::SpecificStudents,
                None => true,
            };
            let ids = input.assignment_ids.unwrap_or_default();
            if wants_rows && !ids.is_empty() {
                self.store.insert_assignments(id, &ids).await.or_internal("assign questionnaire")?;
            }
        }

        if let Some(questions) = input.questions {
            self.replace_questions(id, &questions).await?;
        }

        tracing::info!(questionnaire_id = %id, "Questionnaire updated");
        self.detail(id).await?.ok_or_else(questionnaire_not_found)
    }

    async fn replace_questions(
        &self,
        questionnaire_id: &str,
        inputs: &[QuestionInput],
    ) -> ServiceResult<()> {
        let existing = self
            .store
            .list_questions(&[questionnaire_id.to_string()])
            .await
            .or_internal("load questions")?;
        let kept: HashSet<&str> = inputs.iter().filter_map(|q| q.id.as_deref()).collect();
        let removed: Vec<String> = existing
            .iter()
            .filter(|question| !kept.contains(question.id.as_str()))
            .map(|question| question.id.clone())
            .collect();
        if !removed.is_empty() {
            self.store.delete_questions(&removed).await.or_internal("delete questions")?;
        }

        let mut added = Vec::new();
        for (position, input) in inputs.iter().enumerate() {
            let Some(question_id) = input.id.as_deref() else {
                added.push((position, input));
                continue;
            };

            self.store
                .update_question(question_id, new_question(questionnaire_id, position, input))
                .await
                .or_internal("update question")?;

            if input.question_type == QuestionType::MultipleChoice && input.options.is_some() {
                self.store
                    .delete_options_for_questions(&[question_id.to_string()])
                    .await
                    .or_internal("replace question options")?;
                let options = new_options(question_id, input);
                if !options.is_empty() {
                    self.store
                        .insert_options(options)
                        .await
                        .or_internal("replace question options")?;
                }
            }
        }

        for (position, input) in added {
            let created = self
                .store
                .insert_questions(vec![new_question(questionnaire_id, position, input)])
                .await
                .or_internal("create question")?;
            let Some(question) = created.first() else {
                continue;
            };
            let options = new_options(&question.id, input);
            if !options.is_empty() {
                self.store.insert_options(options).await.or_internal("create question options")?;
            }
        }
        Ok(())
    }

    /// Copies a questionnaire into the same group under a free `(kopie)` title.
    /// The copy starts inactive.
    pub(crate) async fn duplicate(&self, id: &str) -> ServiceResult<QuestionnaireDetail> {
        let original = self
            .store
            .find_questionnaire(id)
            .await
            .or_internal("load questionnaire")?
            .ok_or_else(questionnaire_not_found)?;

        let (mut title, base) = duplicate_title(&original.title);
        let mut counter = 2;
        while self
            .store
            .questionnaire_title_exists(&original.group_id, &title)
            .await
            .or_internal("check questionnaire title")?
        {
            title = format!("{base} (kopie {counter})");
            counter += 1;
        }

        let copy = self
            .store
            .insert_questionnaire(NewQuestionnaire {
                group_id: original.group_id.clone(),
                title,
                description: original.description.clone(),
                is_active: false,
                is_anonymous: original.is_anonymous,
                assignment_type: original.assignment_type,
            })
            .await
            .or_internal("duplicate questionnaire")?;

        let questions = load_questions(self.store, &[original.id.clone()]).await?;
        if !questions.is_empty() {
            let rows = questions
                .iter()
                .map(|detail| NewQuestion {
                    questionnaire_id: copy.id.clone(),
                    text: detail.question.text.clone(),
                    question_type: detail.question.question_type,
                    required: detail.question.required,
                    order_index: detail.question.order_index,
                })
                .collect();
            let created =
                self.store.insert_questions(rows).await.or_internal("duplicate questions")?;

            let options: Vec<NewOption> = created
                .iter()
                .zip(&questions)
                .filter(|(_, source)| source.question.question_type == QuestionType::MultipleChoice)
                .flat_map(|(question, source)| {
                    source.options.iter().map(|option| NewOption {
                        question_id: question.id.clone(),
                        text: option.text.clone(),
                        order_index: option.order_index,
                    })
                })
                .collect();
            if !options.is_empty() {
                self.store
                    .insert_options(options)
                    .await
                    .or_internal("duplicate question options")?;
            }
        }

        if original.assignment_type == AssignmentType::SpecificStudents {
            let enrollment_ids: Vec<String> = AssignmentResolver::new(self.store)
                .eligible_triples(&original)
                .await?
                .into_iter()
                .map(|enrollment| enrollment.id)
                .collect();
            if !enrollment_ids.is_empty() {
                self.store
                    .insert_assignments(&copy.id, &enrollment_ids)
                    .await
                    .or_internal("duplicate assignments")?;
            }
        }

        tracing::info!(source_id = %original.id, copy_id = %copy.id, "Questionnaire duplicated");
        self.detail(&copy.id).await?.ok_or_else(questionnaire_not_found)
    }

    pub(crate) async fn delete(&self, id: &str) -> ServiceResult<()> {
        let deleted = self
            .store
            .delete_questionnaires(&[id.to_string()])
            .await
            .or_internal("delete questionnaire")?;
        if deleted == 0 {
            return Err(questionnaire_not_found());
        }
        Ok(())
    }

    /// Deletes every listed questionnaire; questions, options, assignments and
    /// responses go with them.
    pub(crate) async fn delete_many(&self, ids: &[String]) -> ServiceResult<u64> {
        self.store.delete_questionnaires(ids).await.or_internal("delete questionnaires")
    }
}
