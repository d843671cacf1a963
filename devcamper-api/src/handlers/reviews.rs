//! `/api/v1/reviews` and `/api/v1/bootcamps/{id}/reviews`

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Extension, Router,
};
use serde_json::Value;

use super::courses::BOOTCAMP_SUMMARY;
use super::{ensure_owner, new_record, API_PREFIX, CHILD_PROTECTED, REVIEWERS};
use crate::error::{Error, Result};
use crate::extract::{JsonBody, QueryPairs};
use crate::middleware::{CurrentUser, RouteGuard};
use crate::models::{
    decode_input, merge_fields, refresh_average_rating, to_document, Bootcamp, Repository, Review,
    REVIEWS,
};
use crate::query::{AdvancedResults, Filter, ListParams, PagedResult};
use crate::responses::{Created, Listing, Success};
use crate::state::AppState;
use crate::store::{Document, FindQuery};

/// Review listing with the reviewed bootcamp's name and description
pub const REVIEW_RESULTS: AdvancedResults = AdvancedResults::new(REVIEWS).populate(BOOTCAMP_SUMMARY);

/// Review routes; the nested bootcamp routes live with the bootcamps
pub fn routes(state: &AppState) -> Router<AppState> {
    let reviewer = RouteGuard::authorize(state.clone(), REVIEWERS);

    Router::new()
        .route(&format!("{API_PREFIX}/reviews"), get(list_reviews))
        .route(
            &format!("{API_PREFIX}/reviews/{{id}}"),
            get(get_review).merge(reviewer.guard(put(update_review).delete(delete_review))),
        )
}

/// `GET /api/v1/reviews`
pub async fn list_reviews(
    State(state): State<AppState>,
    QueryPairs(pairs): QueryPairs,
) -> Result<PagedResult> {
    let params = ListParams::from_pairs(&pairs)?;
    Ok(REVIEW_RESULTS.run(state.store(), params).await?)
}

/// `GET /api/v1/bootcamps/{id}/reviews`
pub async fn list_bootcamp_reviews(
    State(state): State<AppState>,
    Path(bootcamp_id): Path<String>,
) -> Result<Listing<Document>> {
    let reviews = state
        .store()
        .find(
            REVIEWS,
            FindQuery::new(Filter::new().eq("bootcamp", bootcamp_id)),
        )
        .await?;
    Ok(Listing::new(reviews))
}

/// `GET /api/v1/reviews/{id}`
pub async fn get_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Success<Document>> {
    let review = state
        .store()
        .find_by_id(REVIEWS, &id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("No review found with the id of {id}")))?;

    let mut docs = [review];
    BOOTCAMP_SUMMARY.apply(state.store(), &mut docs).await?;
    let [review] = docs;
    Ok(Success::new(review))
}

/// `POST /api/v1/bootcamps/{id}/reviews`
///
/// One review per user per bootcamp; a second attempt is a duplicate.
pub async fn add_review(
    State(state): State<AppState>,
    Path(bootcamp_id): Path<String>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    JsonBody(input): JsonBody<Document>,
) -> Result<Created<Review>> {
    let bootcamp = Repository::<Bootcamp>::new(state.store())
        .find_by_id(&bootcamp_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("No bootcamp with the id of {bootcamp_id}")))?;

    let mut doc = new_record();
    doc.insert("bootcamp".to_string(), Value::String(bootcamp.id.clone()));
    doc.insert("user".to_string(), Value::String(user.id.clone()));
    merge_fields(&mut doc, input, CHILD_PROTECTED);

    let review: Review = decode_input(doc)?;
    let saved = Repository::<Review>::new(state.store())
        .insert(&review)
        .await
        .map_err(|err| match err {
            Error::Duplicate(_) => Error::BadRequest(format!(
                "User {} has already reviewed bootcamp {}",
                user.id, bootcamp.id
            )),
            other => other,
        })?;
    refresh_average_rating(state.store(), &bootcamp.id).await?;

    tracing::info!(review_id = %saved.id, bootcamp_id = %bootcamp.id, "review added");
    Ok(Created::new(saved))
}

/// `PUT /api/v1/reviews/{id}`
pub async fn update_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    JsonBody(input): JsonBody<Document>,
) -> Result<Success<Review>> {
    let reviews = Repository::<Review>::new(state.store());
    let review = reviews.get(&id).await?;
    ensure_owner(&user, &review.user, "update review")?;

    let mut doc = to_document(&review)?;
    merge_fields(&mut doc, input, CHILD_PROTECTED);
    let updated: Review = decode_input(doc)?;

    let saved = reviews.save(&updated).await?;
    refresh_average_rating(state.store(), &saved.bootcamp).await?;
    Ok(Success::new(saved))
}

/// `DELETE /api/v1/reviews/{id}`
pub async fn delete_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Success<Document>> {
    let reviews = Repository::<Review>::new(state.store());
    let review = reviews.get(&id).await?;
    ensure_owner(&user, &review.user, "delete review")?;

    reviews.delete(&id).await?;
    refresh_average_rating(state.store(), &review.bootcamp).await?;
    Ok(Success::empty())
}
