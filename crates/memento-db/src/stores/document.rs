//! Query evaluation over JSON documents.
//!
//! Semantics follow the SQLite store so both backends agree: missing
//! fields are null, comparisons with null never match, nulls sort first,
//! numbers sort before strings, and `Contains` folds ASCII letters only
//! (like SQLite's `lower`).

use std::cmp::Ordering;

use serde_json::Value;

use memento_core::{FilterCondition, FilterOperator, FilterValue, ModelQuery, OrderClause};

/// JSON pointer for a dotted field name (`author.name` -> `/author/name`).
pub fn field_pointer(field: &str) -> String {
    field
        .split('.')
        .map(|segment| format!("/{}", segment.replace('~', "~0").replace('/', "~1")))
        .collect()
}

/// Value of a (possibly nested) field; `None` when missing or null.
pub fn lookup<'a>(document: &'a Value, field: &str) -> Option<&'a Value> {
    document
        .pointer(&field_pointer(field))
        .filter(|value| !value.is_null())
}

/// Compare two scalar values of the same kind.
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => match (l.as_i64(), r.as_i64()) {
            (Some(l), Some(r)) => Some(l.cmp(&r)),
            _ => l.as_f64()?.partial_cmp(&r.as_f64()?),
        },
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        (Value::Bool(l), Value::Bool(r)) => Some(l.cmp(r)),
        _ => (left == right).then_some(Ordering::Equal),
    }
}

fn equals(left: &Value, right: &Value) -> bool {
    compare(left, right) == Some(Ordering::Equal)
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.to_ascii_lowercase()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(u8::from(*b).to_string()),
        _ => None,
    }
}

/// Whether `document` satisfies `condition`.
pub fn matches(document: &Value, condition: &FilterCondition) -> bool {
    let actual = lookup(document, &condition.field);
    let expected = condition.value.to_json();

    match condition.operator {
        FilterOperator::IsNull => actual.is_none(),
        FilterOperator::IsNotNull => actual.is_some(),
        FilterOperator::Equal if expected.is_null() => actual.is_none(),
        FilterOperator::NotEqual if expected.is_null() => actual.is_some(),
        FilterOperator::In => match (actual, &condition.value) {
            (Some(actual), FilterValue::List(values)) => {
                values.iter().any(|value| equals(actual, &value.to_json()))
            }
            (Some(actual), value) => equals(actual, &value.to_json()),
            (None, _) => false,
        },
        FilterOperator::Contains => match (actual.and_then(text), text(&expected)) {
            (Some(haystack), Some(needle)) => haystack.contains(&needle),
            _ => false,
        },
        operator => {
            let Some(ordering) = actual.and_then(|actual| compare(actual, &expected)) else {
                return false;
            };
            match operator {
                FilterOperator::Equal => ordering == Ordering::Equal,
                FilterOperator::NotEqual => ordering != Ordering::Equal,
                FilterOperator::GreaterThan => ordering == Ordering::Greater,
                FilterOperator::GreaterThanOrEqual => ordering != Ordering::Less,
                FilterOperator::LessThan => ordering == Ordering::Less,
                FilterOperator::LessThanOrEqual => ordering != Ordering::Greater,
                _ => false,
            }
        }
    }
}

/// Whether `document` satisfies every condition of `query`.
pub fn matches_all(document: &Value, query: &ModelQuery) -> bool {
    query
        .conditions()
        .iter()
        .all(|condition| matches(document, condition))
}

/// Storage class rank: null, then numbers, then text, then everything else.
fn rank(value: Option<&Value>) -> u8 {
    match value {
        None => 0,
        Some(Value::Bool(_) | Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(_) => 3,
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Bool(b) => Some(f64::from(u8::from(*b))),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn order_values(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    rank(left).cmp(&rank(right)).then_with(|| match (left, right) {
        (Some(l @ Value::Number(_)), Some(r @ Value::Number(_))) => {
            compare(l, r).unwrap_or(Ordering::Equal)
        }
        (Some(l), Some(r)) if rank(left) == 1 => numeric(l)
            .zip(numeric(r))
            .and_then(|(l, r)| l.partial_cmp(&r))
            .unwrap_or(Ordering::Equal),
        (Some(l), Some(r)) => compare(l, r).unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    })
}

/// Order documents by the given keys, breaking ties by id.
pub fn sort(documents: &mut [(i64, Value)], ordering: &[OrderClause]) {
    documents.sort_by(|(left_id, left), (right_id, right)| {
        ordering
            .iter()
            .fold(Ordering::Equal, |acc, clause| {
                acc.then_with(|| {
                    let ordered = order_values(
                        lookup(left, &clause.field),
                        lookup(right, &clause.field),
                    );
                    if clause.direction.is_descending() {
                        ordered.reverse()
                    } else {
                        ordered
                    }
                })
            })
            .then_with(|| left_id.cmp(right_id))
    });
}

/// Remove every excluded field from the document.
pub fn project(document: &mut Value, excluded: &[String]) {
    for field in excluded {
        let (parent, key) = match field.rsplit_once('.') {
            Some((parent, key)) => (document.pointer_mut(&field_pointer(parent)), key),
            None => (Some(&mut *document), field.as_str()),
        };
        if let Some(Value::Object(map)) = parent {
            map.remove(key);
        }
    }
}
