//! Filter evaluation and sort ordering over JSON documents
//!
//! Query values arrive as strings from the query string; they are coerced to the
//! type of the stored value before comparing. Array fields match when any element
//! matches.

use std::cmp::Ordering;

use serde_json::Value;

use super::Document;
use crate::geo::{central_angle, GeoPoint};
use crate::query::{Comparison, Filter, Predicate, SortOrder, SortSpec};

/// Resolve a dotted path inside a document
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// Whether a document satisfies every predicate of the filter
pub fn matches(doc: &Document, filter: &Filter) -> bool {
    filter
        .predicates()
        .iter()
        .all(|predicate| matches_predicate(doc, predicate))
}

fn matches_predicate(doc: &Document, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::Compare { field, comparison } => match lookup(doc, field) {
            Some(Value::Array(items)) => items.iter().any(|item| compare(Some(item), comparison)),
            stored => compare(stored, comparison),
        },
        Predicate::WithinSphere {
            field,
            center,
            radius,
        } => lookup(doc, field)
            .and_then(point_of)
            .is_some_and(|point| central_angle(*center, point) <= *radius),
    }
}

fn compare(stored: Option<&Value>, comparison: &Comparison) -> bool {
    match comparison {
        Comparison::Eq(wanted) => match stored {
            None | Some(Value::Null) => wanted.is_null(),
            Some(value) => loosely_equal(value, wanted),
        },
        Comparison::In(candidates) => match stored {
            None => false,
            Some(value) => candidates.iter().any(|wanted| loosely_equal(value, wanted)),
        },
        Comparison::Gt(bound) => ordering(stored, bound) == Some(Ordering::Greater),
        Comparison::Gte(bound) => matches!(
            ordering(stored, bound),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Comparison::Lt(bound) => ordering(stored, bound) == Some(Ordering::Less),
        Comparison::Lte(bound) => {
            matches!(ordering(stored, bound), Some(Ordering::Less | Ordering::Equal))
        }
    }
}

fn loosely_equal(stored: &Value, wanted: &Value) -> bool {
    match (stored, wanted) {
        (Value::Number(n), Value::String(s)) => match (n.as_f64(), s.trim().parse::<f64>()) {
            (Some(a), Ok(b)) => a == b,
            _ => false,
        },
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::Bool(b), Value::String(s)) => s.parse::<bool>().is_ok_and(|parsed| parsed == *b),
        _ => stored == wanted,
    }
}

fn ordering(stored: Option<&Value>, bound: &Value) -> Option<Ordering> {
    match (stored?, bound) {
        (Value::Number(n), Value::String(s)) => n.as_f64()?.partial_cmp(&s.trim().parse::<f64>().ok()?),
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.as_str().cmp(b.as_str())),
        (Value::String(a), Value::Number(b)) => Some(a.as_str().cmp(b.to_string().as_str())),
        _ => None,
    }
}

/// Extract `[lng, lat]` from a GeoJSON point
fn point_of(value: &Value) -> Option<GeoPoint> {
    let coordinates = value.get("coordinates")?.as_array()?;
    match coordinates.as_slice() {
        [lng, lat] => Some(GeoPoint::new(lng.as_f64()?, lat.as_f64()?)),
        _ => None,
    }
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None => 0,
        Some(Value::Null) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Object(_)) => 4,
        Some(Value::Array(_)) => 5,
        Some(Value::Bool(_)) => 6,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Array(x)), Some(Value::Array(y))) => x.len().cmp(&y.len()),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Order two documents by a sort specification
pub fn compare_for_sort(a: &Document, b: &Document, sort: &SortSpec) -> Ordering {
    sort.keys()
        .iter()
        .map(|key| {
            let ordering = compare_values(lookup(a, &key.field), lookup(b, &key.field));
            match key.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        })
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}
