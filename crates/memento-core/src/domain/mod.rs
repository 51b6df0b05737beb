//! Core domain types.
//!
//! These types describe models, filters, pages and queries independently of
//! any storage backend.
//!
//! # Structure
//!
//! - `model` - Persisted model capability (`Model`, `Audit`)
//! - `filter` - Paging and ordering parameters (`ModelFilter`, `Filter`)
//! - `page` - Paginated results (`Page`, `QuerySource`)
//! - `query` - Backend-neutral query description (`ModelQuery`)
//! - `change` - Pending writes (`ChangeSet`, `Change`)

pub mod change;
pub mod filter;
mod model;
pub mod page;
pub mod query;

pub use model::{Audit, Model, normalize_lookup};

pub use change::{Change, ChangeEntry, ChangeSet, EntryState};

pub use filter::{
    DEFAULT_PAGE_SIZE, Filter, MAXIMUM_PAGE_SIZE, MINIMUM_PAGE_SIZE, ModelFilter, OrderDirection,
    OrderKey, QueryMap, parse_query_string, to_query_string,
};

pub use page::{Page, QuerySource};

pub use query::{FilterCondition, FilterOperator, FilterValue, ModelQuery, OrderClause};
