//! `/api/v1/users`, administrators only

use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};
use serde_json::Value;

use super::{new_record, API_PREFIX, ADMINS};
use crate::auth::PasswordHasher;
use crate::error::{Error, Result};
use crate::extract::{JsonBody, QueryPairs};
use crate::middleware::RouteGuard;
use crate::models::{
    decode_input, merge_fields, to_document, Repository, User, USERS, USER_HIDDEN_FIELDS,
};
use crate::query::{AdvancedResults, ListParams, PagedResult};
use crate::responses::{Created, Success};
use crate::state::AppState;
use crate::store::{Document, CREATED_AT_FIELD, ID_FIELD};

/// User listing without credentials
pub const USER_RESULTS: AdvancedResults = AdvancedResults::new(USERS).hide(USER_HIDDEN_FIELDS);

const PROTECTED: &[&str] = &[ID_FIELD, CREATED_AT_FIELD, "password"];

/// User administration routes
pub fn routes(state: &AppState) -> Router<AppState> {
    let admin = || RouteGuard::authorize(state.clone(), ADMINS);

    Router::new()
        .route(
            &format!("{API_PREFIX}/users"),
            admin().guard(get(list_users).post(create_user)),
        )
        .route(
            &format!("{API_PREFIX}/users/{{id}}"),
            admin().guard(get(get_user).put(update_user).delete(delete_user)),
        )
}

/// `GET /api/v1/users`
pub async fn list_users(
    State(state): State<AppState>,
    QueryPairs(pairs): QueryPairs,
) -> Result<PagedResult> {
    let params = ListParams::from_pairs(&pairs)?;
    Ok(USER_RESULTS.run(state.store(), params).await?)
}

/// `GET /api/v1/users/{id}`
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Success<Document>> {
    let user = Repository::<User>::new(state.store()).get(&id).await?;
    Ok(Success::new(user.public_document()?))
}

/// `POST /api/v1/users`
pub async fn create_user(
    State(state): State<AppState>,
    JsonBody(mut input): JsonBody<Document>,
) -> Result<Created<Document>> {
    let password = take_password(state.passwords(), &mut input)?;

    let mut doc = new_record();
    merge_fields(&mut doc, input, PROTECTED);
    if let Some(hash) = password {
        doc.insert("password".to_string(), Value::String(hash));
    }

    let user: User = decode_input(doc)?;
    let saved = Repository::<User>::new(state.store()).insert(&user).await?;
    tracing::info!(user_id = %saved.id, role = %saved.role, "user created by admin");
    Ok(Created::new(saved.public_document()?))
}

/// `PUT /api/v1/users/{id}`
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(mut input): JsonBody<Document>,
) -> Result<Success<Document>> {
    let users = Repository::<User>::new(state.store());
    let user = users.get(&id).await?;
    let password = take_password(state.passwords(), &mut input)?;

    let mut doc = to_document(&user)?;
    merge_fields(&mut doc, input, PROTECTED);
    if let Some(hash) = password {
        doc.insert("password".to_string(), Value::String(hash));
    }

    let updated: User = decode_input(doc)?;
    Ok(Success::new(users.save(&updated).await?.public_document()?))
}

/// `DELETE /api/v1/users/{id}`
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Success<Document>> {
    Repository::<User>::new(state.store()).delete(&id).await?;
    tracing::info!(user_id = %id, "user deleted by admin");
    Ok(Success::empty())
}

/// Pull a plain password out of client input and hash it
fn take_password(hasher: &PasswordHasher, input: &mut Document) -> Result<Option<String>> {
    match input.remove("password") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(plain)) => hasher.hash(&plain).map(Some),
        Some(_) => Err(Error::ValidationError(
            "Password must be a string".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use serde_json::json;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(&AuthConfig {
            argon2_memory_kib: 1024,
            argon2_iterations: 1,
            ..AuthConfig::default()
        })
        .unwrap()
    }

    fn input(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_take_password_hashes() {
        let hasher = hasher();
        let mut doc = input(json!({"password": "123456", "name": "x"}));
        let hash = take_password(&hasher, &mut doc).unwrap().unwrap();
        assert!(PasswordHasher::is_hash(&hash));
        assert!(hasher.verify("123456", &hash).unwrap());
        assert!(!doc.contains_key("password"));
    }

    #[test]
    fn test_take_password_rejects_short_or_non_string() {
        let hasher = hasher();
        assert!(matches!(
            take_password(&hasher, &mut input(json!({"password": "123"}))),
            Err(Error::ValidationError(_))
        ));
        assert!(take_password(&hasher, &mut input(json!({"password": 123456}))).is_err());
        assert_eq!(take_password(&hasher, &mut input(json!({}))).unwrap(), None);
    }
}
