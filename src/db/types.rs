use async_graphql::Enum;
use serde::{Deserialize, Serialize};
use sqlx::Type;

/// Role carried by every profile. Authorization checks match on it exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type, Enum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum Role {
    Admin,
    Student,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Type, Enum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "assignment_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum AssignmentType {
    #[default]
    AllStudents,
    SpecificStudents,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type, Enum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "question_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum QuestionType {
    MultipleChoice,
    FreeText,
    Rating,
    YesNo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type, Enum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "import_mode", rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum ImportMode {
    Replace,
    Add,
}
