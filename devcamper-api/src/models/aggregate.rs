//! Derived bootcamp fields recomputed whenever a course or review changes

use serde_json::{Number, Value};

use super::{BOOTCAMPS, COURSES, REVIEWS};
use crate::query::Filter;
use crate::store::{DocumentStore, FindQuery, RepositoryResult};

fn as_number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Value::from(value as i64)
    } else {
        Number::from_f64(value).map_or(Value::Null, Value::Number)
    }
}

async fn mean_of(
    store: &dyn DocumentStore,
    collection: &str,
    bootcamp_id: &str,
    field: &str,
) -> RepositoryResult<Option<f64>> {
    let docs = store
        .find(collection, FindQuery::new(Filter::new().eq("bootcamp", bootcamp_id)))
        .await?;
    let values: Vec<f64> = docs
        .iter()
        .filter_map(|doc| doc.get(field).and_then(Value::as_f64))
        .collect();
    if values.is_empty() {
        return Ok(None);
    }
    Ok(Some(values.iter().sum::<f64>() / values.len() as f64))
}

async fn write_field(
    store: &dyn DocumentStore,
    bootcamp_id: &str,
    field: &str,
    value: Option<Value>,
) -> RepositoryResult<()> {
    let Some(mut bootcamp) = store.find_by_id(BOOTCAMPS, bootcamp_id).await? else {
        return Ok(());
    };
    match value {
        Some(value) => bootcamp.insert(field.to_string(), value),
        None => bootcamp.remove(field),
    };
    store.replace(BOOTCAMPS, bootcamp_id, bootcamp).await?;
    Ok(())
}

/// `averageCost = ceil(avg(tuition) / 10) * 10`, removed when no courses remain
pub async fn refresh_average_cost(
    store: &dyn DocumentStore,
    bootcamp_id: &str,
) -> RepositoryResult<Option<f64>> {
    let average = mean_of(store, COURSES, bootcamp_id, "tuition")
        .await?
        .map(|avg| (avg / 10.0).ceil() * 10.0);
    write_field(store, bootcamp_id, "averageCost", average.map(as_number)).await?;
    tracing::debug!(bootcamp = bootcamp_id, average_cost = ?average, "average cost updated");
    Ok(average)
}

/// `averageRating = avg(rating)`, removed when no reviews remain
pub async fn refresh_average_rating(
    store: &dyn DocumentStore,
    bootcamp_id: &str,
) -> RepositoryResult<Option<f64>> {
    let average = mean_of(store, REVIEWS, bootcamp_id, "rating").await?;
    write_field(store, bootcamp_id, "averageRating", average.map(as_number)).await?;
    tracing::debug!(bootcamp = bootcamp_id, average_rating = ?average, "average rating updated");
    Ok(average)
}
