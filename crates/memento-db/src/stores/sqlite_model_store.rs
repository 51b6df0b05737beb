//! `SQLite` implementation of the `ModelStore` trait.

use std::marker::PhantomData;

use anyhow::{Context, bail, ensure};
use async_trait::async_trait;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::debug;

use memento_core::{
    Change, FilterCondition, FilterOperator, FilterValue, Model, ModelQuery, ModelStore,
    OrderClause,
};

/// `SQLite` implementation of the `ModelStore` trait.
///
/// Each model set lives in its own table holding JSON documents:
///
/// ```text
/// CREATE TABLE "<set>" (id INTEGER PRIMARY KEY AUTOINCREMENT, body TEXT NOT NULL)
/// ```
///
/// The `id` column is authoritative; it is written into the document when
/// reading. Every other field is addressed through `json_extract`.
pub struct SqliteModelStore<M> {
    pool: SqlitePool,
    _model: PhantomData<fn() -> M>,
}

/// Whether `name` is a plain identifier, safe to put between double quotes.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `SQLite` JSON path for a dotted field name (`author.name` -> `$.author.name`).
fn json_path(field: &str) -> String {
    format!("$.{field}")
}

/// Quoted table name, so set names such as `order` are not parsed as keywords.
fn table<M: Model>() -> String {
    format!("\"{}\"", M::SET_NAME)
}

fn limit_value(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl<M: Model> SqliteModelStore<M> {
    /// Create a store for `M` over an existing pool.
    ///
    /// Fails when `M::SET_NAME` is not a plain identifier.
    pub fn new(pool: SqlitePool) -> anyhow::Result<Self> {
        ensure!(
            is_identifier(M::SET_NAME),
            "Invalid set name {:?}: expected letters, digits and underscores",
            M::SET_NAME
        );
        Ok(Self {
            pool,
            _model: PhantomData,
        })
    }

    /// Ensure the table for this model set exists.
    pub async fn ensure_table(&self) -> anyhow::Result<()> {
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                body TEXT NOT NULL
            )",
            table::<M>()
        ))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Get the underlying pool.
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn push_field(builder: &mut QueryBuilder<'_, Sqlite>, field: &str) {
        if field == "id" {
            builder.push("id");
        } else {
            builder.push("json_extract(body, ");
            builder.push_bind(json_path(field));
            builder.push(")");
        }
    }

    fn push_value(builder: &mut QueryBuilder<'_, Sqlite>, value: &FilterValue) {
        match value {
            FilterValue::String(s) => builder.push_bind(s.clone()),
            FilterValue::Integer(n) => builder.push_bind(*n),
            FilterValue::Float(n) => builder.push_bind(*n),
            FilterValue::Boolean(b) => builder.push_bind(*b),
            FilterValue::List(_) => builder.push_bind(value.to_json().to_string()),
            FilterValue::Null => builder.push_bind(None::<i64>),
        };
    }

    fn push_condition(builder: &mut QueryBuilder<'_, Sqlite>, condition: &FilterCondition) {
        let operator = match (condition.operator, &condition.value) {
            (FilterOperator::Equal, FilterValue::Null) => FilterOperator::IsNull,
            (FilterOperator::NotEqual, FilterValue::Null) => FilterOperator::IsNotNull,
            (operator, _) => operator,
        };

        match operator {
            FilterOperator::IsNull => {
                Self::push_field(builder, &condition.field);
                builder.push(" IS NULL");
            }
            FilterOperator::IsNotNull => {
                Self::push_field(builder, &condition.field);
                builder.push(" IS NOT NULL");
            }
            FilterOperator::Contains => {
                builder.push("instr(lower(");
                Self::push_field(builder, &condition.field);
                builder.push("), lower(");
                Self::push_value(builder, &condition.value);
                builder.push(")) > 0");
            }
            FilterOperator::In => {
                let values = match &condition.value {
                    FilterValue::List(values) => values.as_slice(),
                    value => std::slice::from_ref(value),
                };
                if values.is_empty() {
                    builder.push("0 = 1");
                    return;
                }
                Self::push_field(builder, &condition.field);
                builder.push(" IN (");
                for (index, value) in values.iter().enumerate() {
                    if index > 0 {
                        builder.push(", ");
                    }
                    Self::push_value(builder, value);
                }
                builder.push(")");
            }
            operator => {
                Self::push_field(builder, &condition.field);
                builder.push(format_args!(" {operator} "));
                Self::push_value(builder, &condition.value);
            }
        }
    }

    fn push_where(builder: &mut QueryBuilder<'_, Sqlite>, query: &ModelQuery) {
        for (index, condition) in query.conditions().iter().enumerate() {
            builder.push(if index == 0 { " WHERE " } else { " AND " });
            builder.push("(");
            Self::push_condition(builder, condition);
            builder.push(")");
        }
    }

    fn push_order(builder: &mut QueryBuilder<'_, Sqlite>, ordering: &[OrderClause]) {
        builder.push(" ORDER BY ");
        for clause in ordering {
            Self::push_field(builder, &clause.field);
            builder.push(if clause.direction.is_descending() {
                " DESC, "
            } else {
                " ASC, "
            });
        }
        builder.push("id ASC");
    }

    fn push_projection(builder: &mut QueryBuilder<'_, Sqlite>, excluded: &[String]) {
        builder.push("json_set(");
        if excluded.is_empty() {
            builder.push("body");
        } else {
            builder.push("json_remove(body");
            for field in excluded {
                builder.push(", ");
                builder.push_bind(json_path(field));
            }
            builder.push(")");
        }
        builder.push(", '$.id', id) AS document");
    }

    fn decode(body: &str) -> anyhow::Result<M> {
        serde_json::from_str(body)
            .with_context(|| format!("Failed to deserialize {} model", M::SET_NAME))
    }
}

#[async_trait]
impl<M: Model> ModelStore<M> for SqliteModelStore<M> {
    async fn fetch(&self, query: &ModelQuery) -> anyhow::Result<Vec<M>> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT ");
        Self::push_projection(&mut builder, query.excluded());
        builder.push(" FROM ").push(table::<M>());
        Self::push_where(&mut builder, query);
        Self::push_order(&mut builder, query.ordering());

        if query.limit().is_some() || query.offset() > 0 {
            builder.push(" LIMIT ");
            builder.push_bind(query.limit().map_or(-1, limit_value));
            builder.push(" OFFSET ");
            builder.push_bind(limit_value(query.offset()));
        }

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| Self::decode(&row.try_get::<String, _>("document")?))
            .collect()
    }

    async fn count(&self, query: &ModelQuery) -> anyhow::Result<u64> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM ");
        builder.push(table::<M>());
        Self::push_where(&mut builder, query);

        let count: i64 = builder.build().fetch_one(&self.pool).await?.try_get(0)?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn exists(&self, id: i64) -> anyhow::Result<bool> {
        let found: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?)",
            table::<M>()
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(found)
    }

    async fn commit(&self, changes: Vec<Change<M>>) -> anyhow::Result<Vec<M>> {
        let table = table::<M>();
        let mut tx = self.pool.begin().await?;
        let mut saved = Vec::new();

        for change in changes {
            match change {
                Change::Insert(mut model) => {
                    let body = serde_json::to_string(&model)?;
                    let result = sqlx::query(&format!("INSERT INTO {table} (body) VALUES (?)"))
                        .bind(body)
                        .execute(&mut *tx)
                        .await?;
                    model.audit_mut().id = result.last_insert_rowid();
                    saved.push(model);
                }
                Change::Update(model) => {
                    let id = model.id();
                    let body = serde_json::to_string(&model)?;
                    let result = sqlx::query(&format!("UPDATE {table} SET body = ? WHERE id = ?"))
                        .bind(body)
                        .bind(id)
                        .execute(&mut *tx)
                        .await?;
                    if result.rows_affected() == 0 {
                        bail!("{} {id} does not exist", M::SET_NAME);
                    }
                    saved.push(model);
                }
                Change::Delete(id) => {
                    let result = sqlx::query(&format!("DELETE FROM {table} WHERE id = ?"))
                        .bind(id)
                        .execute(&mut *tx)
                        .await?;
                    if result.rows_affected() == 0 {
                        bail!("{} {id} does not exist", M::SET_NAME);
                    }
                }
            }
        }

        tx.commit().await?;
        debug!(set = M::SET_NAME, saved = saved.len(), "Committed changes");
        Ok(saved)
    }
}
