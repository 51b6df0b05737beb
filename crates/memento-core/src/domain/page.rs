//! Paginated result container.
//!
//! A [`Page`] is built once by one of its factories and never mutated
//! afterwards. `total_pages` is always derived from `total_items` and
//! `page_size`, except when a page is read back from JSON.

use std::ops::Deref;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::filter::DEFAULT_PAGE_SIZE;

/// An asynchronous, lazily executed query producing items of type `T`.
///
/// The page factories use it the way the windowed strategy needs: one
/// round-trip for the requested slice and a separate one for the count.
#[async_trait]
pub trait QuerySource<T>: Send + Sync {
    /// Materialize at most `limit` items after skipping `offset`.
    async fn fetch_window(&self, offset: u64, limit: u64) -> anyhow::Result<Vec<T>>;

    /// Materialize every item.
    async fn fetch_all(&self) -> anyhow::Result<Vec<T>>;

    /// Count the items without materializing them.
    async fn count(&self) -> anyhow::Result<u64>;
}

/// One page of results plus the metadata describing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Page<T> {
    page_size: u32,
    page_number: u32,
    total_pages: u32,
    total_items: u64,
    order_by: String,
    order_direction: String,
    items: Vec<T>,
}

/// An empty first page with the default page size.
impl<T> Default for Page<T> {
    fn default() -> Self {
        Self::new(Vec::new(), 0, 1, DEFAULT_PAGE_SIZE, String::new(), String::new())
    }
}

/// `max(ceil(total_items / page_size), 1)`; a zero page size counts as one.
fn total_pages(total_items: u64, page_size: u32) -> u32 {
    let pages = total_items.div_ceil(u64::from(page_size.max(1))).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

fn window_offset(page_number: u32, page_size: u32) -> u64 {
    u64::from(page_number.saturating_sub(1)) * u64::from(page_size)
}

impl<T> Page<T> {
    fn new(
        items: Vec<T>,
        total_items: u64,
        page_number: u32,
        page_size: u32,
        order_by: impl Into<String>,
        order_direction: impl Into<String>,
    ) -> Self {
        Self {
            page_size,
            page_number,
            total_pages: total_pages(total_items, page_size),
            total_items,
            order_by: order_by.into(),
            order_direction: order_direction.into(),
            items,
        }
    }

    /// Windowed page over an in-memory sequence.
    ///
    /// Keeps the items at `[(page_number - 1) * page_size, page_number * page_size)`;
    /// `total_items` comes from the separately computed count.
    ///
    /// ```rust
    /// use memento_core::Page;
    ///
    /// let page = Page::create(0..23, 23, 3, 10, "Id", "Ascending");
    /// assert_eq!(page.items(), &[20, 21, 22]);
    /// assert_eq!(page.total_pages(), 3);
    /// assert_eq!(page.total_items(), 23);
    /// ```
    pub fn create(
        items: impl IntoIterator<Item = T>,
        total_items: u64,
        page_number: u32,
        page_size: u32,
        order_by: impl Into<String>,
        order_direction: impl Into<String>,
    ) -> Self {
        let offset = usize::try_from(window_offset(page_number, page_size)).unwrap_or(usize::MAX);
        let items = items
            .into_iter()
            .skip(offset)
            .take(page_size as usize)
            .collect();

        Self::new(
            items,
            total_items,
            page_number,
            page_size,
            order_by,
            order_direction,
        )
    }

    /// Windowed page over a query, fetching the slice and the count as two
    /// round-trips.
    pub async fn create_async<I, C>(
        items: &I,
        count: &C,
        page_number: u32,
        page_size: u32,
        order_by: impl Into<String>,
        order_direction: impl Into<String>,
    ) -> anyhow::Result<Self>
    where
        I: QuerySource<T> + ?Sized,
        C: QuerySource<T> + ?Sized,
    {
        let offset = window_offset(page_number, page_size);
        let (items, total_items) = tokio::try_join!(
            items.fetch_window(offset, u64::from(page_size)),
            count.count()
        )?;

        Ok(Self::new(
            items,
            total_items,
            page_number,
            page_size,
            order_by,
            order_direction,
        ))
    }

    /// Page over items that were already sliced upstream.
    pub fn create_unmodified(
        items: impl IntoIterator<Item = T>,
        total_items: u64,
        page_number: u32,
        page_size: u32,
        order_by: impl Into<String>,
        order_direction: impl Into<String>,
    ) -> Self {
        Self::new(
            items.into_iter().collect(),
            total_items,
            page_number,
            page_size,
            order_by,
            order_direction,
        )
    }

    /// Page over a query whose results were already sliced upstream.
    pub async fn create_unmodified_async<I>(
        items: &I,
        total_items: u64,
        page_number: u32,
        page_size: u32,
        order_by: impl Into<String>,
        order_direction: impl Into<String>,
    ) -> anyhow::Result<Self>
    where
        I: QuerySource<T> + ?Sized,
    {
        let items = items.fetch_all().await?;
        Ok(Self::new(
            items,
            total_items,
            page_number,
            page_size,
            order_by,
            order_direction,
        ))
    }

    /// The 1-based number of this page.
    pub const fn page_number(&self) -> u32 {
        self.page_number
    }

    /// The requested page size.
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Total number of pages, at least 1.
    pub const fn total_pages(&self) -> u32 {
        self.total_pages
    }

    /// Total number of items across every page.
    pub const fn total_items(&self) -> u64 {
        self.total_items
    }

    /// Name of the field the items were ordered by.
    pub fn order_by(&self) -> &str {
        &self.order_by
    }

    /// Direction the items were ordered in.
    pub fn order_direction(&self) -> &str {
        &self.order_direction
    }

    /// Items on this page.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Consume the page, keeping only its items.
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Convert every item while keeping the page metadata.
    ///
    /// ```rust
    /// use memento_core::Page;
    ///
    /// let page = Page::create(vec![1, 2, 3], 3, 1, 10, "Id", "Ascending");
    /// let labels = page.map(|n| format!("#{n}"));
    /// assert_eq!(labels.items(), &["#1", "#2", "#3"]);
    /// assert_eq!(labels.total_items(), 3);
    /// ```
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            page_size: self.page_size,
            page_number: self.page_number,
            total_pages: self.total_pages,
            total_items: self.total_items,
            order_by: self.order_by,
            order_direction: self.order_direction,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}

impl<T> Deref for Page<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}

impl<T> IntoIterator for Page<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Page<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[async_trait]
impl<T: Clone + Send + Sync> QuerySource<T> for Vec<T> {
    async fn fetch_window(&self, offset: u64, limit: u64) -> anyhow::Result<Vec<T>> {
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(self.iter().skip(offset).take(limit).cloned().collect())
    }

    async fn fetch_all(&self) -> anyhow::Result<Vec<T>> {
        Ok(self.clone())
    }

    async fn count(&self) -> anyhow::Result<u64> {
        Ok(self.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(n: u32) -> Vec<u32> {
        (0..n).collect()
    }

    #[test]
    fn test_windowed_tail_page() {
        let page = Page::create(numbers(23), 23, 3, 10, "Id", "Ascending");

        assert_eq!(page.items(), &[20, 21, 22]);
        assert_eq!(page.total_pages(), 3);
        assert_eq!(page.total_items(), 23);
        assert_eq!(page.page_number(), 3);
        assert_eq!(page.page_size(), 10);
    }

    #[test]
    fn test_windowed_slices_match_source() {
        let source = numbers(37);
        for page_size in [1_u32, 3, 10, 50] {
            for page_number in 1..=5_u32 {
                let page = Page::create(
                    source.clone(),
                    source.len() as u64,
                    page_number,
                    page_size,
                    "Id",
                    "Ascending",
                );

                let start = ((page_number - 1) * page_size) as usize;
                let expected: Vec<u32> = source
                    .iter()
                    .copied()
                    .skip(start)
                    .take(page_size as usize)
                    .collect();
                assert_eq!(page.items(), expected.as_slice());
                assert_eq!(page.total_items(), 37);
            }
        }
    }

    #[test]
    fn test_total_pages_is_derived() {
        let cases = [
            (0_u64, 10_u32, 1_u32),
            (1, 10, 1),
            (10, 10, 1),
            (11, 10, 2),
            (23, 10, 3),
            (50, 1, 50),
            (7, 0, 7),
        ];

        for (total_items, page_size, expected) in cases {
            let page = Page::<u32>::create_unmodified(Vec::new(), total_items, 1, page_size, "", "");
            assert_eq!(page.total_pages(), expected, "{total_items}/{page_size}");
        }
    }

    #[test]
    fn test_default_is_empty_first_page() {
        let page = Page::<u32>::default();
        assert!(page.is_empty());
        assert_eq!(page.page_number(), 1);
        assert_eq!(page.page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(page.total_pages(), 1);
        assert_eq!(page.total_items(), 0);
    }

    #[test]
    fn test_page_past_the_end_is_empty() {
        let page = Page::create(numbers(5), 5, 4, 10, "Id", "Ascending");
        assert!(page.is_empty());
        assert_eq!(page.total_pages(), 1);
        assert_eq!(page.total_items(), 5);
    }

    #[test]
    fn test_unmodified_keeps_items() {
        let page = Page::create_unmodified(vec![7, 8, 9], 40, 2, 3, "Name", "Descending");
        assert_eq!(page.items(), &[7, 8, 9]);
        assert_eq!(page.total_items(), 40);
        assert_eq!(page.total_pages(), 14);
        assert_eq!(page.order_by(), "Name");
        assert_eq!(page.order_direction(), "Descending");
    }

    #[tokio::test]
    async fn test_create_async_uses_separate_count() {
        let items = numbers(23);
        let counted = numbers(100);

        let page = Page::create_async(&items, &counted, 2, 10, "Id", "Ascending")
            .await
            .unwrap();

        assert_eq!(page.items(), &(10..20).collect::<Vec<_>>()[..]);
        assert_eq!(page.total_items(), 100);
        assert_eq!(page.total_pages(), 10);
    }

    #[tokio::test]
    async fn test_create_unmodified_async() {
        let items = vec!["a", "b"];
        let page = Page::create_unmodified_async(&items, 12, 6, 2, "Title", "Ascending")
            .await
            .unwrap();

        assert_eq!(page.items(), &["a", "b"]);
        assert_eq!(page.total_pages(), 6);
    }

    #[test]
    fn test_json_shape() {
        let page = Page::create(vec!["x", "y"], 2, 1, 10, "Title", "Descending");
        let json = serde_json::to_value(&page).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "pageSize": 10,
                "pageNumber": 1,
                "totalPages": 1,
                "totalItems": 2,
                "orderBy": "Title",
                "orderDirection": "Descending",
                "items": ["x", "y"]
            })
        );
    }

    #[test]
    fn test_json_round_trip() {
        let page = Page::create(numbers(45), 45, 2, 20, "CreatedAt", "Descending");

        let json = serde_json::to_string(&page).unwrap();
        let restored: Page<u32> = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, page);
        assert_eq!(restored.items(), &(20..40).collect::<Vec<_>>()[..]);
        assert_eq!(restored.total_pages(), 3);
    }

    #[test]
    fn test_deserialize_reads_total_pages_back() {
        let restored: Page<u8> = serde_json::from_str(
            r#"{"pageSize":5,"pageNumber":1,"totalPages":9,"totalItems":2,"orderBy":"Id","orderDirection":"Ascending","items":[1,2]}"#,
        )
        .unwrap();

        assert_eq!(restored.total_pages(), 9);
        assert_eq!(restored.items(), &[1, 2]);
    }

    #[test]
    fn test_map_keeps_metadata() {
        let page = Page::create(numbers(30), 30, 2, 10, "Id", "Ascending");
        let doubled = page.map(|n| n * 2);

        assert_eq!(doubled.first(), Some(&20));
        assert_eq!(doubled.total_pages(), 3);
        assert_eq!(doubled.page_number(), 2);
    }
}
