#![doc = include_str!(concat!(env!("OUT_DIR"), "/README_GENERATED.md"))]
#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod localization;
pub mod logging;
pub mod ports;
pub mod responses;
pub mod services;
pub mod settings;

// Re-export commonly used types for convenience
pub use domain::{
    Audit, Change, ChangeEntry, ChangeSet, DEFAULT_PAGE_SIZE, EntryState, Filter,
    FilterCondition, FilterOperator, FilterValue, MAXIMUM_PAGE_SIZE, MINIMUM_PAGE_SIZE, Model,
    ModelFilter, ModelQuery, OrderClause, OrderDirection, OrderKey, Page, QueryMap, QuerySource,
    normalize_lookup, parse_query_string, to_query_string,
};
pub use localization::SharedLocalizer;
pub use logging::init_logging;
pub use ports::{
    BoundQuery, ErrorKind, Localizer, ModelStore, NoopLocalizer, RepositoryError,
};
pub use responses::MementoResponse;
pub use services::{
    Clock, DOES_NOT_EXIST_KEY, HAS_DUPLICATE_FIELD_KEY, HAS_INVALID_FIELD_KEY, ModelContext,
    ModelPolicy, ModelRepository, ModelValidation, SystemClock,
};
pub use settings::{Settings, SettingsError, SettingsUpdate, validate_settings};

// Dev-dependencies used only by the integration tests
#[cfg(test)]
use memento_db as _;
#[cfg(test)]
use tokio_test as _;
