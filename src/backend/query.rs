//! Filter and ordering clauses forwarded to the record backend
//!
//! The hosted service accepts queries as JSON objects of the form
//! `{"method": "equal", "attribute": "userId", "values": ["..."]}`. The same
//! clauses are evaluated locally by the in-memory backend.

use std::cmp::Ordering;

use serde::Serialize;
use serde_json::Value;

/// A single query clause
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Attribute equals any of the given values
    Equal { attribute: String, values: Vec<Value> },
    /// Order results by attribute, descending
    OrderDesc(String),
}

#[derive(Serialize)]
struct WireQuery<'a> {
    method: &'static str,
    attribute: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    values: Option<&'a [Value]>,
}

impl Query {
    pub fn equal(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Query::Equal {
            attribute: attribute.into(),
            values: vec![value.into()],
        }
    }

    pub fn order_desc(attribute: impl Into<String>) -> Self {
        Query::OrderDesc(attribute.into())
    }

    /// Encode as the service's JSON query string
    pub fn to_wire(&self) -> String {
        let wire = match self {
            Query::Equal { attribute, values } => WireQuery {
                method: "equal",
                attribute: attribute.as_str(),
                values: Some(values.as_slice()),
            },
            Query::OrderDesc(attribute) => WireQuery {
                method: "orderDesc",
                attribute: attribute.as_str(),
                values: None,
            },
        };
        // Serializing a struct of strings and JSON values cannot fail.
        serde_json::to_string(&wire).unwrap_or_default()
    }

    fn matches(&self, record: &Value) -> bool {
        match self {
            Query::Equal { attribute, values } => record
                .get(attribute)
                .map(|field| values.iter().any(|v| v == field))
                .unwrap_or(false),
            Query::OrderDesc(_) => true,
        }
    }
}

/// Evaluate clauses over a set of records: filters first, then ordering.
pub fn apply(records: Vec<Value>, queries: &[Query]) -> Vec<Value> {
    let mut selected: Vec<Value> = records
        .into_iter()
        .filter(|record| queries.iter().all(|q| q.matches(record)))
        .collect();

    for query in queries.iter().rev() {
        if let Query::OrderDesc(attribute) = query {
            selected.sort_by(|a, b| compare_fields(b.get(attribute), a.get(attribute)));
        }
    }

    selected
}

fn compare_fields(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            let a = a.as_f64().unwrap_or(f64::NAN);
            let b = b.as_f64().unwrap_or(f64::NAN);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}
