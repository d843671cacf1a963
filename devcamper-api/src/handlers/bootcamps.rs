//! `/api/v1/bootcamps`

use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    routing::{get, post, put},
    Extension, Router,
};
use serde_json::Value;

use super::{courses, ensure_owner, new_record, reviews, API_PREFIX, PUBLISHERS, REVIEWERS};
use crate::error::{Error, Result};
use crate::extract::{JsonBody, QueryPairs};
use crate::geo::{Geocoder, RadiusQuery};
use crate::middleware::{CurrentUser, RouteGuard};
use crate::models::{
    decode_input, merge_fields, slugify, to_document, Bootcamp, Location, Repository, Role,
    BOOTCAMPS, COURSES,
};
use crate::query::{AdvancedResults, Filter, ListParams, PagedResult, Populate};
use crate::responses::{Created, Listing, Success};
use crate::state::AppState;
use crate::store::{Document, FindQuery, CREATED_AT_FIELD, ID_FIELD};
use crate::uploads::PhotoStorage;

/// Bootcamp listing with each bootcamp's courses attached
pub const BOOTCAMP_RESULTS: AdvancedResults =
    AdvancedResults::new(BOOTCAMPS).populate(Populate::virtual_field("courses", COURSES, "bootcamp"));

/// Fields only the server writes
const PROTECTED: &[&str] = &[
    ID_FIELD,
    CREATED_AT_FIELD,
    "user",
    "slug",
    "location",
    "averageCost",
    "averageRating",
    "photo",
];

/// Write-only input field geocoded into `location`
const ADDRESS_FIELD: &str = "address";

/// Bootcamp routes, including the nested course and review routes
pub fn routes(state: &AppState) -> Router<AppState> {
    let publisher = || RouteGuard::authorize(state.clone(), PUBLISHERS);
    let reviewer = || RouteGuard::authorize(state.clone(), REVIEWERS);

    Router::new()
        .route(
            &format!("{API_PREFIX}/bootcamps"),
            get(list_bootcamps).merge(publisher().guard(post(create_bootcamp))),
        )
        .route(
            &format!("{API_PREFIX}/bootcamps/radius/{{zipcode}}/{{distance}}"),
            get(bootcamps_in_radius),
        )
        .route(
            &format!("{API_PREFIX}/bootcamps/{{id}}"),
            get(get_bootcamp).merge(
                publisher().guard(put(update_bootcamp).delete(delete_bootcamp)),
            ),
        )
        .route(
            &format!("{API_PREFIX}/bootcamps/{{id}}/photo"),
            publisher().guard(put(upload_photo)),
        )
        .route(
            &format!("{API_PREFIX}/bootcamps/{{id}}/courses"),
            get(courses::list_bootcamp_courses)
                .merge(publisher().guard(post(courses::add_course))),
        )
        .route(
            &format!("{API_PREFIX}/bootcamps/{{id}}/reviews"),
            get(reviews::list_bootcamp_reviews)
                .merge(reviewer().guard(post(reviews::add_review))),
        )
}

/// `GET /api/v1/bootcamps`
pub async fn list_bootcamps(
    State(state): State<AppState>,
    QueryPairs(pairs): QueryPairs,
) -> Result<PagedResult> {
    let params = ListParams::from_pairs(&pairs)?;
    Ok(BOOTCAMP_RESULTS.run(state.store(), params).await?)
}

/// `GET /api/v1/bootcamps/{id}`
pub async fn get_bootcamp(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Success<Bootcamp>> {
    let bootcamp = Repository::<Bootcamp>::new(state.store()).get(&id).await?;
    Ok(Success::new(bootcamp))
}

/// `POST /api/v1/bootcamps`
pub async fn create_bootcamp(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    JsonBody(mut input): JsonBody<Document>,
) -> Result<Created<Bootcamp>> {
    let bootcamps = Repository::<Bootcamp>::new(state.store());

    if user.role != Role::Admin
        && bootcamps
            .exists(&Filter::new().eq("user", user.id.clone()))
            .await?
    {
        return Err(Error::BadRequest(format!(
            "The user with ID {} has already published a bootcamp",
            user.id
        )));
    }

    let address = take_address(&mut input)?;
    let mut doc = new_record();
    doc.insert("user".to_string(), Value::String(user.id.clone()));
    merge_fields(&mut doc, input, PROTECTED);

    let mut bootcamp: Bootcamp = decode_input(doc)?;
    let address =
        address.ok_or_else(|| Error::ValidationError("Please add an address".to_string()))?;
    bootcamp.slug = slugify(&bootcamp.name);
    bootcamp.location = Some(geocode_address(state.geocoder(), &address).await?);

    let saved = bootcamps.insert(&bootcamp).await?;
    tracing::info!(bootcamp_id = %saved.id, user_id = %user.id, "bootcamp created");
    Ok(Created::new(saved))
}

/// `PUT /api/v1/bootcamps/{id}`
pub async fn update_bootcamp(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    JsonBody(mut input): JsonBody<Document>,
) -> Result<Success<Bootcamp>> {
    let bootcamps = Repository::<Bootcamp>::new(state.store());
    let bootcamp = bootcamps.get(&id).await?;
    ensure_owner(&user, &bootcamp.user, "update this bootcamp")?;

    let address = take_address(&mut input)?;
    let mut doc = to_document(&bootcamp)?;
    merge_fields(&mut doc, input, PROTECTED);

    let mut updated: Bootcamp = decode_input(doc)?;
    updated.slug = slugify(&updated.name);
    if let Some(address) = address {
        updated.location = Some(geocode_address(state.geocoder(), &address).await?);
    }

    Ok(Success::new(bootcamps.save(&updated).await?))
}

/// `DELETE /api/v1/bootcamps/{id}`, removing its courses too
pub async fn delete_bootcamp(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Success<Document>> {
    let bootcamps = Repository::<Bootcamp>::new(state.store());
    let bootcamp = bootcamps.get(&id).await?;
    ensure_owner(&user, &bootcamp.user, "delete this bootcamp")?;

    let removed = state
        .store()
        .delete_many(COURSES, &Filter::new().eq("bootcamp", id.clone()))
        .await?;
    bootcamps.delete(&id).await?;

    tracing::info!(bootcamp_id = %id, courses_removed = removed, "bootcamp deleted");
    Ok(Success::empty())
}

/// `GET /api/v1/bootcamps/radius/{zipcode}/{distance}`
pub async fn bootcamps_in_radius(
    State(state): State<AppState>,
    Path((zipcode, distance)): Path<(String, String)>,
) -> Result<Listing<Document>> {
    let query = RadiusQuery::parse(&zipcode, &distance)?;
    let filter = query.resolve(state.geocoder(), "location").await?;
    let bootcamps = state.store().find(BOOTCAMPS, FindQuery::new(filter)).await?;
    Ok(Listing::new(bootcamps))
}

/// `PUT /api/v1/bootcamps/{id}/photo`, multipart field `file`
pub async fn upload_photo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Success<String>> {
    let bootcamps = Repository::<Bootcamp>::new(state.store());
    let mut bootcamp = bootcamps.get(&id).await?;
    ensure_owner(&user, &bootcamp.user, "update this bootcamp")?;

    let mut multipart = multipart.map_err(|_| no_file())?;
    let photos = state.photos();

    let (original, bytes) = loop {
        let Some(mut field) = multipart.next_field().await? else {
            return Err(no_file());
        };
        if field.name() != Some("file") {
            continue;
        }

        let is_image = field
            .content_type()
            .is_some_and(|content_type| content_type.starts_with("image"));
        if !is_image {
            return Err(Error::BadRequest("Please upload an image file".to_string()));
        }

        let original = field.file_name().map(str::to_string);
        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await? {
            bytes.extend_from_slice(&chunk);
            photos.check_size(bytes.len() as u64)?;
        }
        break (original, bytes);
    };

    if bytes.is_empty() {
        return Err(no_file());
    }

    let name = PhotoStorage::file_name(&bootcamp.id, original.as_deref());
    photos.store(&name, &bytes).await?;

    bootcamp.photo = name.clone();
    bootcamps.save(&bootcamp).await?;
    Ok(Success::new(name))
}

fn no_file() -> Error {
    Error::BadRequest("Please upload a file".to_string())
}

/// Remove `address` from client input
fn take_address(input: &mut Document) -> Result<Option<String>> {
    match input.remove(ADDRESS_FIELD) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(address)) if !address.trim().is_empty() => Ok(Some(address)),
        Some(Value::String(_)) => Ok(None),
        Some(_) => Err(Error::ValidationError(
            "Address must be a string".to_string(),
        )),
    }
}

/// First geocoder match for an address as a GeoJSON location
async fn geocode_address(geocoder: &dyn Geocoder, address: &str) -> Result<Location> {
    geocoder
        .geocode(address)
        .await?
        .into_iter()
        .next()
        .map(Location::from)
        .ok_or_else(|| Error::ValidationError(format!("Could not geocode address '{address}'")))
}
