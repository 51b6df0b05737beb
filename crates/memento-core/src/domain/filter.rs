//! Per-request paging and ordering filters.
//!
//! A filter is built for each incoming request, handed to a repository's
//! `get_all` and dropped afterwards. Paging values are clamped into range
//! instead of being rejected, and query-string parsing is lenient: unknown
//! keys and unparseable values are skipped, leaving the previous values.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The minimum page size.
pub const MINIMUM_PAGE_SIZE: u32 = 1;

/// The default page size.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// The maximum page size.
pub const MAXIMUM_PAGE_SIZE: u32 = 50;

/// Query-string key for the page number.
pub const PAGE_NUMBER_KEY: &str = "PageNumber";

/// Query-string key for the page size.
pub const PAGE_SIZE_KEY: &str = "PageSize";

/// Query-string key for the ordering field.
pub const ORDER_BY_KEY: &str = "OrderBy";

/// Query-string key for the ordering direction.
pub const ORDER_DIRECTION_KEY: &str = "OrderDirection";

/// Flat string-keyed query parameter map.
pub type QueryMap = BTreeMap<String, String>;

/// Direction in which results are ordered.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
pub enum OrderDirection {
    /// Orders ascending.
    #[default]
    Ascending,
    /// Orders descending.
    Descending,
}

impl OrderDirection {
    /// Whether this direction reverses the natural ordering.
    #[must_use]
    pub const fn is_descending(self) -> bool {
        matches!(self, Self::Descending)
    }
}

/// Enumeration of the fields a model can be ordered by.
///
/// Blanket-implemented for any enum that can be displayed and parsed back,
/// e.g. one deriving `strum_macros::{Display, EnumString}`.
pub trait OrderKey: Copy + Default + Display + FromStr + Send + Sync + 'static {}

impl<T> OrderKey for T where T: Copy + Default + Display + FromStr + Send + Sync + 'static {}

/// Paging and ordering state shared by every model filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFilter<O> {
    page_number: u32,
    page_size: u32,
    order_by: O,
    order_direction: OrderDirection,
}

impl<O: OrderKey> Default for ModelFilter<O> {
    fn default() -> Self {
        Self {
            page_number: 1,
            page_size: DEFAULT_PAGE_SIZE,
            order_by: O::default(),
            order_direction: OrderDirection::default(),
        }
    }
}

impl<O: OrderKey> ModelFilter<O> {
    /// Filter for the first page with the default page size.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The 1-based page number.
    pub const fn page_number(&self) -> u32 {
        self.page_number
    }

    /// Set the page number, clamping anything below 1 to 1.
    pub fn set_page_number(&mut self, value: i64) {
        self.page_number = u32::try_from(value.max(1)).unwrap_or(u32::MAX);
    }

    /// The page size.
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Set the page size, clamping it to `[MINIMUM_PAGE_SIZE, MAXIMUM_PAGE_SIZE]`.
    pub fn set_page_size(&mut self, value: i64) {
        let clamped = value.clamp(i64::from(MINIMUM_PAGE_SIZE), i64::from(MAXIMUM_PAGE_SIZE));
        self.page_size = u32::try_from(clamped).unwrap_or(DEFAULT_PAGE_SIZE);
    }

    /// The field the results are ordered by.
    pub const fn order_by(&self) -> O {
        self.order_by
    }

    /// Set the ordering field.
    pub fn set_order_by(&mut self, order_by: O) {
        self.order_by = order_by;
    }

    /// The ordering direction.
    pub const fn order_direction(&self) -> OrderDirection {
        self.order_direction
    }

    /// Set the ordering direction.
    pub fn set_order_direction(&mut self, order_direction: OrderDirection) {
        self.order_direction = order_direction;
    }

    /// Number of items to skip for the current page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page_number.saturating_sub(1)) * u64::from(self.page_size)
    }

    /// Builder-style page selection.
    #[must_use]
    pub fn with_page(mut self, page_number: i64, page_size: i64) -> Self {
        self.set_page_number(page_number);
        self.set_page_size(page_size);
        self
    }

    /// Builder-style ordering selection.
    #[must_use]
    pub fn with_order(mut self, order_by: O, order_direction: OrderDirection) -> Self {
        self.order_by = order_by;
        self.order_direction = order_direction;
        self
    }

    /// Read `PageNumber` and `PageSize`, ignoring values that do not parse.
    pub fn read_paging_from_query(&mut self, query: &QueryMap) {
        if let Some(page_number) = parse_value::<i64>(query, PAGE_NUMBER_KEY) {
            self.set_page_number(page_number);
        }
        if let Some(page_size) = parse_value::<i64>(query, PAGE_SIZE_KEY) {
            self.set_page_size(page_size);
        }
    }

    /// Read `OrderBy` and `OrderDirection`, ignoring values that do not parse.
    pub fn read_ordering_from_query(&mut self, query: &QueryMap) {
        if let Some(order_by) = parse_value::<O>(query, ORDER_BY_KEY) {
            self.order_by = order_by;
        }
        if let Some(order_direction) = parse_value::<OrderDirection>(query, ORDER_DIRECTION_KEY) {
            self.order_direction = order_direction;
        }
    }

    /// Write `PageNumber` and `PageSize`.
    pub fn write_paging_to_query(&self, query: &mut QueryMap) {
        query.insert(PAGE_NUMBER_KEY.to_string(), self.page_number.to_string());
        query.insert(PAGE_SIZE_KEY.to_string(), self.page_size.to_string());
    }

    /// Write `OrderBy` and `OrderDirection`.
    pub fn write_ordering_to_query(&self, query: &mut QueryMap) {
        query.insert(ORDER_BY_KEY.to_string(), self.order_by.to_string());
        query.insert(
            ORDER_DIRECTION_KEY.to_string(),
            self.order_direction.to_string(),
        );
    }
}

/// A model filter: paging and ordering plus domain-specific fields.
///
/// Domain filters embed a [`ModelFilter`] and expose it through
/// [`base`](Filter::base). The query hooks let them read and write their
/// own keys; paging and ordering keys are handled by the provided methods.
///
/// # Example
///
/// ```rust
/// use memento_core::domain::{Filter, ModelFilter, OrderDirection, QueryMap};
///
/// #[derive(Debug, Clone, Copy, Default, strum_macros::Display, strum_macros::EnumString)]
/// enum NoteOrderBy {
///     #[default]
///     Id,
///     Title,
/// }
///
/// #[derive(Debug, Default)]
/// struct NoteFilter {
///     base: ModelFilter<NoteOrderBy>,
///     search: Option<String>,
/// }
///
/// impl Filter for NoteFilter {
///     type OrderBy = NoteOrderBy;
///
///     fn base(&self) -> &ModelFilter<NoteOrderBy> {
///         &self.base
///     }
///
///     fn base_mut(&mut self) -> &mut ModelFilter<NoteOrderBy> {
///         &mut self.base
///     }
///
///     fn read_filter_from_query(&mut self, query: &QueryMap) {
///         self.search = query.get("Search").cloned();
///     }
/// }
///
/// let filter = NoteFilter::from_query_string("Search=milk&PageSize=500&OrderBy=Title");
/// assert_eq!(filter.search.as_deref(), Some("milk"));
/// assert_eq!(filter.base().page_size(), 50);
/// assert!(matches!(filter.base().order_by(), NoteOrderBy::Title));
/// assert_eq!(filter.base().order_direction(), OrderDirection::Ascending);
/// ```
pub trait Filter: Default + Send + Sync {
    /// Enumeration of sortable fields.
    type OrderBy: OrderKey;

    /// The embedded paging and ordering state.
    fn base(&self) -> &ModelFilter<Self::OrderBy>;

    /// Mutable access to the embedded paging and ordering state.
    fn base_mut(&mut self) -> &mut ModelFilter<Self::OrderBy>;

    /// Read the domain-specific fields.
    fn read_filter_from_query(&mut self, _query: &QueryMap) {}

    /// Write the domain-specific fields.
    fn write_filter_to_query(&self, _query: &mut QueryMap) {}

    /// Read every recognised key from a query map.
    fn read_from_query(&mut self, query: &QueryMap) {
        self.read_filter_from_query(query);
        self.base_mut().read_paging_from_query(query);
        self.base_mut().read_ordering_from_query(query);
    }

    /// Write the filter to a query map.
    fn write_to_query(&self) -> QueryMap {
        let mut query = QueryMap::new();
        self.write_filter_to_query(&mut query);
        self.base().write_paging_to_query(&mut query);
        self.base().write_ordering_to_query(&mut query);
        query
    }

    /// Build a filter from a raw (form-urlencoded) query string.
    fn from_query_string(query: &str) -> Self {
        let mut filter = Self::default();
        filter.read_from_query(&parse_query_string(query));
        filter
    }

    /// Encode the filter as a form-urlencoded query string.
    fn to_query_string(&self) -> String {
        to_query_string(&self.write_to_query())
    }
}

impl<O: OrderKey> Filter for ModelFilter<O> {
    type OrderBy = O;

    fn base(&self) -> &ModelFilter<O> {
        self
    }

    fn base_mut(&mut self) -> &mut ModelFilter<O> {
        self
    }
}

/// Parse a form-urlencoded query string into a [`QueryMap`].
///
/// A leading `?` is ignored. When a key repeats, the last value wins.
pub fn parse_query_string(query: &str) -> QueryMap {
    let query = query.strip_prefix('?').unwrap_or(query);
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

/// Encode a [`QueryMap`] as a form-urlencoded query string.
pub fn to_query_string(query: &QueryMap) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(query.iter())
        .finish()
}

fn parse_value<T: FromStr>(query: &QueryMap, key: &str) -> Option<T> {
    query.get(key).and_then(|value| value.trim().parse().ok())
}
