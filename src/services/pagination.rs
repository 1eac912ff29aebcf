use crate::repositories::store::Page;

pub(crate) const ITEMS_PER_PAGE: i64 = 100;
pub(crate) const QUESTIONNAIRES_PER_PAGE: i64 = 20;

/// Batch sizes for loops that drain a whole relation.
pub(crate) const ENROLLMENT_BATCH: i64 = 1000;
pub(crate) const ASSIGNMENT_ID_BATCH: i64 = 10_000;
pub(crate) const DETAIL_BATCH: usize = 500;

/// Window for a zero-based page index. Negative indexes clamp to the first page.
pub(crate) fn page_window(index: i32, per_page: i64) -> Page {
    Page::new(i64::from(index.max(0)) * per_page, per_page)
}

#[derive(Debug, Clone)]
pub(crate) struct Paginated<T> {
    pub(crate) items: Vec<T>,
    pub(crate) total_count: i64,
    pub(crate) has_more: bool,
}

impl<T> Paginated<T> {
    pub(crate) fn new(items: Vec<T>, total_count: i64, page: Page) -> Self {
        Self { items, total_count, has_more: page.offset + page.limit < total_count }
    }

    pub(crate) fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            has_more: self.has_more,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_index_is_zero_based() {
        assert_eq!(page_window(0, ITEMS_PER_PAGE), Page::new(0, 100));
        assert_eq!(page_window(2, QUESTIONNAIRES_PER_PAGE), Page::new(40, 20));
        assert_eq!(page_window(-3, ITEMS_PER_PAGE), Page::new(0, 100));
    }

    #[test]
    fn has_more_only_when_rows_remain_past_the_window() {
        let page = page_window(0, ITEMS_PER_PAGE);
        assert!(Paginated::new(vec![1], 101, page).has_more);
        assert!(!Paginated::new(vec![1], 100, page).has_more);
        assert!(!Paginated::<i32>::new(Vec::new(), 0, page).has_more);
    }
}
