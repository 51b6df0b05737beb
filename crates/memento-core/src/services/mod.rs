//! Services orchestrating domain types over the ports.

mod model_context;
mod model_repository;

pub use model_context::{Clock, ModelContext, SystemClock};
pub use model_repository::{
    DOES_NOT_EXIST_KEY, HAS_DUPLICATE_FIELD_KEY, HAS_INVALID_FIELD_KEY, ModelPolicy,
    ModelRepository, ModelValidation,
};
