// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Predicates over cleartext index fields.
//!
//! Filters never see encrypted payloads. Filtering on anything a collection
//! does not declare in `index_fields` is rejected with
//! [`StoreError::UnindexedField`]; such filtering must happen after decryption.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::schema::CollectionSchema;
use crate::error::{StoreError, StoreResult};

/// Predicate over a document's cleartext index fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches every document.
    All,
    Eq(String, Value),
    Ne(String, Value),
    Gt(String, Value),
    Gte(String, Value),
    Lt(String, Value),
    Lte(String, Value),
    In(String, Vec<Value>),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Ne(field.into(), value.into())
    }

    pub fn any_of<V: Into<Value>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Filter::In(field.into(), values.into_iter().map(Into::into).collect())
    }

    pub fn and(self, other: Filter) -> Self {
        match self {
            Filter::All => other,
            Filter::And(mut parts) => {
                parts.push(other);
                Filter::And(parts)
            }
            first => Filter::And(vec![first, other]),
        }
    }

    /// Reject filters touching fields the collection keeps encrypted.
    pub fn validate(&self, schema: &CollectionSchema) -> StoreResult<()> {
        let check = |field: &str| {
            if schema.is_indexed(field) {
                Ok(())
            } else {
                Err(StoreError::UnindexedField {
                    collection: schema.name,
                    field: field.to_string(),
                })
            }
        };

        match self {
            Filter::All => Ok(()),
            Filter::Eq(f, _)
            | Filter::Ne(f, _)
            | Filter::Gt(f, _)
            | Filter::Gte(f, _)
            | Filter::Lt(f, _)
            | Filter::Lte(f, _)
            | Filter::In(f, _) => check(f),
            Filter::And(parts) | Filter::Or(parts) => {
                parts.iter().try_for_each(|p| p.validate(schema))
            }
            Filter::Not(inner) => inner.validate(schema),
        }
    }

    /// Evaluate against a cleartext index map.
    pub fn matches(&self, index: &Map<String, Value>) -> bool {
        let field = |name: &str| index.get(name).unwrap_or(&Value::Null);

        match self {
            Filter::All => true,
            Filter::Eq(f, v) => field(f) == v,
            Filter::Ne(f, v) => field(f) != v,
            Filter::Gt(f, v) => compare(field(f), v) == Some(Ordering::Greater),
            Filter::Gte(f, v) => matches!(
                compare(field(f), v),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Filter::Lt(f, v) => compare(field(f), v) == Some(Ordering::Less),
            Filter::Lte(f, v) => matches!(
                compare(field(f), v),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Filter::In(f, values) => values.contains(field(f)),
            Filter::And(parts) => parts.iter().all(|p| p.matches(index)),
            Filter::Or(parts) => parts.iter().any(|p| p.matches(index)),
            Filter::Not(inner) => !inner.matches(index),
        }
    }
}

/// Ordering between two JSON scalars of the same kind.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::{ADDRESSES, TRANSACTIONS};
    use serde_json::json;

    fn index(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn equality_and_conjunction() {
        let idx = index(json!({"currency": "BTC", "hasActivity": true}));
        assert!(Filter::eq("currency", "BTC").matches(&idx));
        assert!(!Filter::eq("currency", "ETH").matches(&idx));
        assert!(Filter::eq("currency", "BTC")
            .and(Filter::eq("hasActivity", true))
            .matches(&idx));
        assert!(!Filter::eq("currency", "BTC")
            .and(Filter::eq("hasActivity", false))
            .matches(&idx));
    }

    #[test]
    fn ranges_compare_numbers_and_strings() {
        let idx = index(json!({"n": 5, "s": "b"}));
        assert!(Filter::Gt("n".into(), json!(4)).matches(&idx));
        assert!(Filter::Lte("n".into(), json!(5)).matches(&idx));
        assert!(!Filter::Lt("n".into(), json!(5)).matches(&idx));
        assert!(Filter::Gte("s".into(), json!("a")).matches(&idx));
        // Mixed kinds never match a range.
        assert!(!Filter::Gt("n".into(), json!("4")).matches(&idx));
    }

    #[test]
    fn membership_or_and_not() {
        let idx = index(json!({"state": "pending"}));
        assert!(Filter::any_of("state", ["pending", "unconfirmed"]).matches(&idx));
        assert!(Filter::Or(vec![
            Filter::eq("state", "failed"),
            Filter::eq("state", "pending")
        ])
        .matches(&idx));
        assert!(!Filter::Not(Box::new(Filter::eq("state", "pending"))).matches(&idx));
    }

    #[test]
    fn missing_fields_behave_as_null() {
        let idx = index(json!({}));
        assert!(Filter::eq("currency", Value::Null).matches(&idx));
        assert!(Filter::ne("currency", "BTC").matches(&idx));
    }

    #[test]
    fn validate_rejects_encrypted_fields() {
        assert!(Filter::eq("currency", "BTC").validate(&ADDRESSES).is_ok());
        let err = Filter::eq("currency", "BTC")
            .and(Filter::eq("balance", "0"))
            .validate(&ADDRESSES)
            .unwrap_err();
        assert!(matches!(err, StoreError::UnindexedField { field, .. } if field == "balance"));
        assert!(Filter::eq("state", "pending").validate(&TRANSACTIONS).is_ok());
        assert!(Filter::eq("state", "pending").validate(&ADDRESSES).is_err());
    }
}
