//! Persisted model capability and audit metadata.
//!
//! Every persisted entity carries an [`Audit`] block with its identity and
//! traceability fields. The block is flattened into the model's document so
//! stores see `id`, `created_at`, ... as ordinary top-level fields.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Identity and traceability fields shared by every persisted model.
///
/// `created_at` is stamped once by the model context when the model is
/// inserted. `updated_at` stays `None` until the first update and never
/// moves backwards afterwards.
///
/// Both timestamps are written as RFC 3339 with nanosecond precision, so
/// stores comparing them as text order them chronologically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Audit {
    /// Server-assigned identifier (ignored on insert).
    pub id: i64,
    /// Identifier of the user who created the model.
    pub created_by: i64,
    /// UTC timestamp of creation.
    #[serde(with = "fixed_width")]
    pub created_at: DateTime<Utc>,
    /// Identifier of the user who last updated the model.
    pub updated_by: Option<i64>,
    /// UTC timestamp of the last update.
    #[serde(with = "fixed_width::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Audit {
    /// Audit block for a model that has not been persisted yet.
    #[must_use]
    pub fn created_by(user_id: i64) -> Self {
        Self {
            created_by: user_id,
            ..Self::default()
        }
    }

    /// Whether the model has been through at least one update.
    #[must_use]
    pub const fn was_updated(&self) -> bool {
        self.updated_at.is_some()
    }
}

/// Fixed-width RFC 3339 timestamps (`2024-01-01T00:00:00.000000000Z`).
pub(crate) mod fixed_width {
    use super::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Nanos, true)
    }

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        DateTime::<Utc>::deserialize(deserializer)
    }

    pub mod option {
        use super::{DateTime, Deserialize, Deserializer, Serializer, Utc};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(value) => serializer.serialize_some(&super::format(value)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            Option::<DateTime<Utc>>::deserialize(deserializer)
        }
    }
}

/// A persisted entity with identity and audit metadata.
///
/// Implementors embed an [`Audit`] (usually with `#[serde(flatten)]`) and
/// name the set they are persisted in.
///
/// # Example
///
/// ```rust
/// use memento_core::{Audit, Model};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct Note {
///     #[serde(flatten)]
///     audit: Audit,
///     title: String,
/// }
///
/// impl Model for Note {
///     const SET_NAME: &'static str = "notes";
///
///     fn audit(&self) -> &Audit {
///         &self.audit
///     }
///
///     fn audit_mut(&mut self) -> &mut Audit {
///         &mut self.audit
///     }
/// }
///
/// let note = Note { audit: Audit::created_by(7), title: "hello".into() };
/// assert_eq!(note.id(), 0);
/// assert_eq!(note.audit().created_by, 7);
/// ```
pub trait Model: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Name of the persisted set (table, collection) holding this model.
    const SET_NAME: &'static str;

    /// Audit metadata.
    fn audit(&self) -> &Audit;

    /// Mutable audit metadata.
    fn audit_mut(&mut self) -> &mut Audit;

    /// The model identifier.
    fn id(&self) -> i64 {
        self.audit().id
    }
}

/// Canonical form used for case-insensitive lookups (trimmed, upper-cased).
///
/// ```rust
/// use memento_core::domain::normalize_lookup;
///
/// assert_eq!(normalize_lookup("  Grocery list "), "GROCERY LIST");
/// ```
#[must_use]
pub fn normalize_lookup(value: &str) -> String {
    value.trim().to_uppercase()
}
