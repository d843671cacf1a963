//! Load JSON fixtures into the document store
//!
//! A seed directory may hold `users.json`, `bootcamps.json`, `courses.json` and
//! `reviews.json`, each a JSON array of documents. Missing files are skipped.
//! Plain passwords are hashed, bootcamps with an `address` but no `location`
//! are geocoded, and bootcamp averages are recomputed once everything is in.

use std::path::Path;

use serde_json::Value;

use crate::auth::PasswordHasher;
use crate::error::{Error, Result};
use crate::geo::GeoLocation;
use crate::models::{
    refresh_average_cost, refresh_average_rating, slugify, Location, BOOTCAMPS, COURSES, REVIEWS,
    USERS,
};
use crate::state::AppState;
use crate::store::{document_id, Document};

/// Documents inserted per collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub bootcamps: usize,
    pub courses: usize,
    pub reviews: usize,
}

/// Seed every fixture file found in `dir`
pub async fn seed_from_dir(state: &AppState, dir: impl AsRef<Path>) -> Result<SeedSummary> {
    let dir = dir.as_ref();
    tracing::info!(dir = %dir.display(), "seeding document store");

    let mut summary = SeedSummary::default();

    for mut user in read_fixture(dir, USERS).await? {
        hash_password(state.passwords(), &mut user)?;
        state.store().insert(USERS, user).await?;
        summary.users += 1;
    }

    let mut bootcamp_ids = Vec::new();
    for mut bootcamp in read_fixture(dir, BOOTCAMPS).await? {
        prepare_bootcamp(state, &mut bootcamp).await;
        let saved = state.store().insert(BOOTCAMPS, bootcamp).await?;
        if let Some(id) = document_id(&saved) {
            bootcamp_ids.push(id.to_string());
        }
        summary.bootcamps += 1;
    }

    for course in read_fixture(dir, COURSES).await? {
        state.store().insert(COURSES, course).await?;
        summary.courses += 1;
    }

    for review in read_fixture(dir, REVIEWS).await? {
        state.store().insert(REVIEWS, review).await?;
        summary.reviews += 1;
    }

    for id in &bootcamp_ids {
        refresh_average_cost(state.store(), id).await?;
        refresh_average_rating(state.store(), id).await?;
    }

    tracing::info!(
        users = summary.users,
        bootcamps = summary.bootcamps,
        courses = summary.courses,
        reviews = summary.reviews,
        "seed complete"
    );
    Ok(summary)
}

/// Read `<dir>/<collection>.json`; a missing file is an empty fixture
async fn read_fixture(dir: &Path, collection: &str) -> Result<Vec<Document>> {
    let path = dir.join(format!("{collection}.json"));
    let raw = match tokio::fs::read(&path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no fixture file");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    serde_json::from_slice(&raw).map_err(|e| {
        Error::BadRequest(format!(
            "Fixture {} is not an array of objects: {e}",
            path.display()
        ))
    })
}

fn hash_password(hasher: &PasswordHasher, user: &mut Document) -> Result<()> {
    if let Some(Value::String(password)) = user.get("password") {
        if !PasswordHasher::is_hash(password) {
            let hash = hasher.hash(password)?;
            user.insert("password".to_string(), Value::String(hash));
        }
    }
    Ok(())
}

/// Derive `slug` and geocode `address` into `location`
async fn prepare_bootcamp(state: &AppState, bootcamp: &mut Document) {
    if !bootcamp.contains_key("slug") {
        if let Some(name) = bootcamp.get("name").and_then(Value::as_str) {
            let slug = slugify(name);
            bootcamp.insert("slug".to_string(), Value::String(slug));
        }
    }

    let Some(Value::String(address)) = bootcamp.remove("address") else {
        return;
    };
    if bootcamp.contains_key("location") {
        return;
    }

    let location = match state.geocoder().geocode(&address).await {
        Ok(results) => results.into_iter().next(),
        Err(e) => {
            tracing::warn!(address = %address, error = %e, "geocoding failed while seeding");
            None
        }
    };
    match location.map(location_value) {
        Some(Ok(value)) => {
            bootcamp.insert("location".to_string(), value);
        }
        Some(Err(e)) => tracing::warn!(address = %address, error = %e, "bad geocoder result"),
        None => tracing::warn!(address = %address, "address not found while seeding"),
    }
}

fn location_value(geo: GeoLocation) -> serde_json::Result<Value> {
    serde_json::to_value(Location::from(geo))
}
