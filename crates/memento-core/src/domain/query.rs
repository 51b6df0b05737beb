//! Backend-neutral query description over one model set.
//!
//! A [`ModelQuery`] is what the repository hooks build and what stores
//! execute. Field names address document fields; a dotted name such as
//! `author.name` addresses a nested field.

use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::filter::OrderDirection;
use super::model::fixed_width;

/// Comparison operators for filter conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Equal to (=)
    Equal,
    /// Not equal to (!=)
    NotEqual,
    /// Greater than (>)
    GreaterThan,
    /// Greater than or equal to (>=)
    GreaterThanOrEqual,
    /// Less than (<)
    LessThan,
    /// Less than or equal to (<=)
    LessThanOrEqual,
    /// Case-insensitive substring match
    Contains,
    /// Value is in a list (IN)
    In,
    /// Value is null or missing (IS NULL)
    IsNull,
    /// Value is present and not null (IS NOT NULL)
    IsNotNull,
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "="),
            Self::NotEqual => write!(f, "!="),
            Self::GreaterThan => write!(f, ">"),
            Self::GreaterThanOrEqual => write!(f, ">="),
            Self::LessThan => write!(f, "<"),
            Self::LessThanOrEqual => write!(f, "<="),
            Self::Contains => write!(f, "CONTAINS"),
            Self::In => write!(f, "IN"),
            Self::IsNull => write!(f, "IS NULL"),
            Self::IsNotNull => write!(f, "IS NOT NULL"),
        }
    }
}

/// A value compared against a document field.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// String value
    String(String),
    /// 64-bit integer value
    Integer(i64),
    /// 64-bit floating point value
    Float(f64),
    /// Boolean value
    Boolean(bool),
    /// List of values (for the IN operator)
    List(Vec<FilterValue>),
    /// Null value
    Null,
}

impl FilterValue {
    /// The value as a JSON value, for comparisons against documents.
    pub fn to_json(&self) -> Value {
        match self {
            Self::String(s) => Value::String(s.clone()),
            Self::Integer(n) => Value::from(*n),
            Self::Float(n) => Value::from(*n),
            Self::Boolean(b) => Value::Bool(*b),
            Self::List(values) => Value::Array(values.iter().map(Self::to_json).collect()),
            Self::Null => Value::Null,
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for FilterValue {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<u32> for FilterValue {
    fn from(n: u32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<f64> for FilterValue {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

/// Timestamps compare in the text form audit fields are stored in.
impl From<DateTime<Utc>> for FilterValue {
    fn from(at: DateTime<Utc>) -> Self {
        Self::String(fixed_width::format(&at))
    }
}

impl<T: Into<Self>> From<Vec<T>> for FilterValue {
    fn from(list: Vec<T>) -> Self {
        Self::List(list.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Self>> From<Option<T>> for FilterValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// A single condition on one document field.
///
/// ```rust
/// use memento_core::{FilterCondition, FilterOperator};
///
/// let by_owner = FilterCondition::eq("created_by", 7_i64);
/// let titled = FilterCondition::contains("title", "groceries");
/// let untouched = FilterCondition::is_null("updated_at");
///
/// assert_eq!(by_owner.operator, FilterOperator::Equal);
/// assert_eq!(titled.operator, FilterOperator::Contains);
/// assert_eq!(untouched.operator, FilterOperator::IsNull);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    /// The field name to filter on
    pub field: String,
    /// The comparison operator
    pub operator: FilterOperator,
    /// The value to compare against
    pub value: FilterValue,
}

impl FilterCondition {
    /// Create a new filter condition.
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: FilterValue) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// `field = value`
    pub fn eq(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::Equal, value.into())
    }

    /// `field != value`
    pub fn ne(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::NotEqual, value.into())
    }

    /// `field > value`
    pub fn gt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::GreaterThan, value.into())
    }

    /// `field >= value`
    pub fn gte(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::GreaterThanOrEqual, value.into())
    }

    /// `field < value`
    pub fn lt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::LessThan, value.into())
    }

    /// `field <= value`
    pub fn lte(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::LessThanOrEqual, value.into())
    }

    /// Case-insensitive substring match on a string field.
    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(
            field,
            FilterOperator::Contains,
            FilterValue::String(value.into()),
        )
    }

    /// `field IN (values...)`; an empty list matches nothing.
    pub fn in_list<T: Into<FilterValue>>(field: impl Into<String>, values: Vec<T>) -> Self {
        Self::new(
            field,
            FilterOperator::In,
            FilterValue::List(values.into_iter().map(Into::into).collect()),
        )
    }

    /// `field IS NULL` (missing fields count as null).
    pub fn is_null(field: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::IsNull, FilterValue::Null)
    }

    /// `field IS NOT NULL`
    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::IsNotNull, FilterValue::Null)
    }
}

/// One ordering key of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderClause {
    /// Field to order by.
    pub field: String,
    /// Direction.
    pub direction: OrderDirection,
}

/// Description of a query over one model set.
///
/// Conditions are AND-ed. Ordering keys apply in sequence; stores break
/// remaining ties by id. `excluded` fields are dropped from the returned
/// documents, which is how the simple shape skips detail-only relations.
///
/// ```rust
/// use memento_core::{FilterCondition, ModelQuery, OrderDirection};
///
/// let query = ModelQuery::new()
///     .filter(FilterCondition::eq("created_by", 7_i64))
///     .order_by("title", OrderDirection::Ascending)
///     .then_by("id", OrderDirection::Descending)
///     .without("comments")
///     .skip(20)
///     .take(10);
///
/// assert_eq!(query.conditions().len(), 1);
/// assert_eq!(query.ordering().len(), 2);
/// assert_eq!(query.offset(), 20);
/// assert_eq!(query.limit(), Some(10));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelQuery {
    conditions: Vec<FilterCondition>,
    ordering: Vec<OrderClause>,
    excluded: Vec<String>,
    offset: u64,
    limit: Option<u64>,
}

impl ModelQuery {
    /// A query over the full documents of the set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a condition (AND-ed with the existing ones).
    #[must_use]
    pub fn filter(mut self, condition: FilterCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Restrict the query to the model with the given id.
    #[must_use]
    pub fn with_id(self, id: i64) -> Self {
        self.filter(FilterCondition::eq("id", id))
    }

    /// Replace the ordering with a single key.
    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, direction: OrderDirection) -> Self {
        self.ordering.clear();
        self.then_by(field, direction)
    }

    /// Append a secondary ordering key.
    #[must_use]
    pub fn then_by(mut self, field: impl Into<String>, direction: OrderDirection) -> Self {
        self.ordering.push(OrderClause {
            field: field.into(),
            direction,
        });
        self
    }

    /// Leave a field out of the returned documents.
    #[must_use]
    pub fn without(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        if !self.excluded.contains(&field) {
            self.excluded.push(field);
        }
        self
    }

    /// Skip the first `offset` matching documents.
    #[must_use]
    pub const fn skip(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Return at most `limit` documents.
    #[must_use]
    pub const fn take(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Same query without ordering or paging, as used for counting.
    #[must_use]
    pub fn unpaged(mut self) -> Self {
        self.ordering.clear();
        self.offset = 0;
        self.limit = None;
        self
    }

    pub fn conditions(&self) -> &[FilterCondition] {
        &self.conditions
    }

    pub fn ordering(&self) -> &[OrderClause] {
        &self.ordering
    }

    pub fn excluded(&self) -> &[String] {
        &self.excluded
    }

    pub const fn offset(&self) -> u64 {
        self.offset
    }

    pub const fn limit(&self) -> Option<u64> {
        self.limit
    }
}
