//! Accounts and roles

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validate::{is_valid_email, Violations};
use super::{timestamp, to_document, Model};
use crate::error::Result;
use crate::store::Document;

/// Users collection
pub const USERS: &str = "users";

/// Fields never returned to clients
pub const USER_HIDDEN_FIELDS: &[&str] = &["password", "resetPasswordToken", "resetPasswordExpire"];

/// Account role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Can write reviews
    #[default]
    User,
    /// Can publish a bootcamp and its courses
    Publisher,
    /// Can do anything
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Publisher => write!(f, "publisher"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: Role,
    /// Argon2id PHC string
    #[serde(default)]
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_password_token: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "timestamp::option"
    )]
    pub reset_password_expire: Option<DateTime<Utc>>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl User {
    /// The document clients see: no password or reset fields
    pub fn public_document(&self) -> Result<Document> {
        let mut doc = to_document(self)?;
        for field in USER_HIDDEN_FIELDS {
            doc.remove(*field);
        }
        Ok(doc)
    }

    /// Whether the user may act on a resource owned by `owner_id`
    pub fn can_modify(&self, owner_id: &str) -> bool {
        self.role == Role::Admin || self.id == owner_id
    }
}

impl Model for User {
    const COLLECTION: &'static str = USERS;
    const NAME: &'static str = "User";

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<()> {
        Violations::new()
            .require(&self.name, "Please add a name")
            .require(&self.email, "Please add an email")
            .check(
                self.email.is_empty() || is_valid_email(&self.email),
                "Please add a valid email",
            )
            .require(&self.password, "Please add a password")
            .finish()
    }
}
