//! `/api/v1/courses` and `/api/v1/bootcamps/{id}/courses`

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Extension, Router,
};
use serde_json::Value;

use super::{ensure_owner, new_record, API_PREFIX, CHILD_PROTECTED, PUBLISHERS};
use crate::error::{Error, Result};
use crate::extract::{JsonBody, QueryPairs};
use crate::middleware::{CurrentUser, RouteGuard};
use crate::models::{
    decode_input, merge_fields, refresh_average_cost, to_document, Bootcamp, Course, Repository,
    BOOTCAMPS, COURSES,
};
use crate::query::{AdvancedResults, Filter, ListParams, PagedResult, Populate};
use crate::responses::{Created, Listing, Success};
use crate::state::AppState;
use crate::store::{Document, FindQuery, RepositoryError};

/// Bootcamp summary attached to each course
pub(crate) const BOOTCAMP_SUMMARY: Populate =
    Populate::reference("bootcamp", BOOTCAMPS).select(&["name", "description"]);

/// Course listing with the owning bootcamp's name and description
pub const COURSE_RESULTS: AdvancedResults = AdvancedResults::new(COURSES).populate(BOOTCAMP_SUMMARY);

/// Course routes; the nested bootcamp routes live with the bootcamps
pub fn routes(state: &AppState) -> Router<AppState> {
    let publisher = RouteGuard::authorize(state.clone(), PUBLISHERS);

    Router::new()
        .route(&format!("{API_PREFIX}/courses"), get(list_courses))
        .route(
            &format!("{API_PREFIX}/courses/{{id}}"),
            get(get_course).merge(
                publisher.guard(put(update_course).delete(delete_course)),
            ),
        )
}

/// `GET /api/v1/courses`
pub async fn list_courses(
    State(state): State<AppState>,
    QueryPairs(pairs): QueryPairs,
) -> Result<PagedResult> {
    let params = ListParams::from_pairs(&pairs)?;
    Ok(COURSE_RESULTS.run(state.store(), params).await?)
}

/// `GET /api/v1/bootcamps/{id}/courses`
pub async fn list_bootcamp_courses(
    State(state): State<AppState>,
    Path(bootcamp_id): Path<String>,
) -> Result<Listing<Document>> {
    let courses = state
        .store()
        .find(
            COURSES,
            FindQuery::new(Filter::new().eq("bootcamp", bootcamp_id)),
        )
        .await?;
    Ok(Listing::new(courses))
}

/// `GET /api/v1/courses/{id}`
pub async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Success<Document>> {
    let course = state
        .store()
        .find_by_id(COURSES, &id)
        .await?
        .ok_or_else(|| RepositoryError::not_found("Course", &id))?;

    let mut docs = [course];
    BOOTCAMP_SUMMARY.apply(state.store(), &mut docs).await?;
    let [course] = docs;
    Ok(Success::new(course))
}

/// `POST /api/v1/bootcamps/{id}/courses`
pub async fn add_course(
    State(state): State<AppState>,
    Path(bootcamp_id): Path<String>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    JsonBody(input): JsonBody<Document>,
) -> Result<Created<Course>> {
    let bootcamp = Repository::<Bootcamp>::new(state.store())
        .find_by_id(&bootcamp_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("No bootcamp with the id of {bootcamp_id}")))?;
    ensure_owner(
        &user,
        &bootcamp.user,
        &format!("add a course to bootcamp {}", bootcamp.id),
    )?;

    let mut doc = new_record();
    doc.insert("bootcamp".to_string(), Value::String(bootcamp.id.clone()));
    doc.insert("user".to_string(), Value::String(user.id.clone()));
    merge_fields(&mut doc, input, CHILD_PROTECTED);

    let course: Course = decode_input(doc)?;
    let saved = Repository::<Course>::new(state.store()).insert(&course).await?;
    refresh_average_cost(state.store(), &bootcamp.id).await?;

    tracing::info!(course_id = %saved.id, bootcamp_id = %bootcamp.id, "course added");
    Ok(Created::new(saved))
}

/// `PUT /api/v1/courses/{id}`
pub async fn update_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    JsonBody(input): JsonBody<Document>,
) -> Result<Success<Course>> {
    let courses = Repository::<Course>::new(state.store());
    let course = courses.get(&id).await?;
    ensure_owner(&user, &course.user, &format!("update course {}", course.id))?;

    let mut doc = to_document(&course)?;
    merge_fields(&mut doc, input, CHILD_PROTECTED);
    let updated: Course = decode_input(doc)?;

    let saved = courses.save(&updated).await?;
    refresh_average_cost(state.store(), &saved.bootcamp).await?;
    Ok(Success::new(saved))
}

/// `DELETE /api/v1/courses/{id}`
pub async fn delete_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Success<Document>> {
    let courses = Repository::<Course>::new(state.store());
    let course = courses.get(&id).await?;
    ensure_owner(&user, &course.user, &format!("delete course {}", course.id))?;

    courses.delete(&id).await?;
    refresh_average_cost(state.store(), &course.bootcamp).await?;
    Ok(Success::empty())
}
