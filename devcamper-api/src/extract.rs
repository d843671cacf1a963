//! Request extractors that reject through the crate [`Error`]

use axum::{
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::{request::Parts, StatusCode},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Error;

/// JSON body decoded into `T`
///
/// A body that is not JSON is a 400 `BadRequest`; JSON of the wrong shape is a
/// 400 `ValidationError` carrying the serde message.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection| match rejection.status() {
                StatusCode::PAYLOAD_TOO_LARGE => Error::PayloadTooLarge(rejection.body_text()),
                _ => Error::BadRequest(rejection.body_text()),
            })?;
        serde_json::from_value(value)
            .map(JsonBody)
            .map_err(|e| Error::ValidationError(e.to_string()))
    }
}

/// Raw query string pairs in request order, repeats included
#[derive(Debug, Clone, Default)]
pub struct QueryPairs(pub Vec<(String, String)>);

impl<S> FromRequestParts<S> for QueryPairs
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
            .map_err(|rejection| Error::BadRequest(rejection.body_text()))?;
        Ok(Self(pairs))
    }
}
