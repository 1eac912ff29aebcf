use async_graphql::SimpleObject;

use crate::services::import_export::{ImportOutcome, ImportStats};

#[derive(Debug, SimpleObject)]
#[graphql(name = "ImportStats")]
pub(crate) struct ImportStatsView {
    pub(crate) total_records: i32,
    pub(crate) new_students: i32,
    pub(crate) new_teachers: i32,
    pub(crate) new_subjects: i32,
    pub(crate) updated_records: i32,
    pub(crate) duplicates_skipped: i32,
    pub(crate) errors: Vec<String>,
}

impl From<ImportStats> for ImportStatsView {
    fn from(stats: ImportStats) -> Self {
        Self {
            total_records: stats.total_records,
            new_students: stats.new_students,
            new_teachers: stats.new_teachers,
            new_subjects: stats.new_subjects,
            updated_records: stats.updated_records,
            duplicates_skipped: stats.duplicates_skipped,
            errors: stats.errors,
        }
    }
}

#[derive(Debug, SimpleObject)]
#[graphql(name = "ImportResult")]
pub(crate) struct ImportResultView {
    pub(crate) success: bool,
    pub(crate) message: String,
    pub(crate) stats: ImportStatsView,
}

impl From<ImportOutcome> for ImportResultView {
    fn from(outcome: ImportOutcome) -> Self {
        Self { success: outcome.success, message: outcome.message, stats: outcome.stats.into() }
    }
}
