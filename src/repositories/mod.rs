pub(crate) mod assignments;
pub(crate) mod auth_users;
pub(crate) mod catalog;
pub(crate) mod enrollments;
pub(crate) mod groups;
pub(crate) mod health;
pub(crate) mod import_history;
pub(crate) mod pg_store;
pub(crate) mod profiles;
pub(crate) mod questionnaires;
pub(crate) mod questions;
pub(crate) mod refresh_tokens;
pub(crate) mod responses;
pub(crate) mod store;
pub(crate) mod students;

use sqlx::{Postgres, QueryBuilder};

use crate::repositories::store::Page;

/// `ILIKE` pattern matching `needle` anywhere, with wildcards in the input escaped.
pub(crate) fn contains_pattern(needle: &str) -> String {
    let escaped = needle.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{escaped}%")
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub(crate) fn push_page(builder: &mut QueryBuilder<'_, Postgres>, page: Option<Page>) {
    if let Some(page) = page {
        builder.push(" OFFSET ");
        builder.push_bind(page.offset.max(0));
        builder.push(" LIMIT ");
        builder.push_bind(page.limit.max(1));
    }
}

#[cfg(test)]
mod tests {
    use super::contains_pattern;

    #[test]
    fn contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("Nov"), "%Nov%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
    }
}
