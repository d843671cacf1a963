//! REST handlers for `/api/v1`
//!
//! Each resource module exposes `routes(&AppState)`, which registers its paths
//! with their [`RouteGuard`](crate::middleware::RouteGuard)s already attached.

pub mod auth;
pub mod bootcamps;
pub mod courses;
pub mod reviews;
pub mod users;

use chrono::Utc;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::{Role, User};
use crate::store::{format_timestamp, new_document_id, Document, CREATED_AT_FIELD, ID_FIELD};

/// Versioned API prefix
pub const API_PREFIX: &str = "/api/v1";

/// Roles allowed to publish bootcamps and courses
pub(crate) const PUBLISHERS: &[Role] = &[Role::Publisher, Role::Admin];

/// Roles allowed to write reviews
pub(crate) const REVIEWERS: &[Role] = &[Role::User, Role::Admin];

/// Administrators only
pub(crate) const ADMINS: &[Role] = &[Role::Admin];

/// Fields a client never sets on a child resource
pub(crate) const CHILD_PROTECTED: &[&str] = &[ID_FIELD, CREATED_AT_FIELD, "bootcamp", "user"];

/// A fresh document with server-assigned `_id` and `createdAt`
pub(crate) fn new_record() -> Document {
    let mut doc = Document::new();
    doc.insert(ID_FIELD.to_string(), Value::String(new_document_id()));
    doc.insert(
        CREATED_AT_FIELD.to_string(),
        Value::String(format_timestamp(Utc::now())),
    );
    doc
}

/// 403 unless `user` owns the resource or is an admin
pub(crate) fn ensure_owner(user: &User, owner_id: &str, action: &str) -> Result<()> {
    if user.can_modify(owner_id) {
        return Ok(());
    }
    tracing::debug!(user_id = %user.id, owner_id, action, "ownership check failed");
    Err(Error::Forbidden(format!(
        "User {} is not authorized to {action}",
        user.id
    )))
}
