//! Typed documents: bootcamps, courses, reviews and users
//!
//! Models are plain serde structs stored as JSON documents. Creating or updating
//! one always goes through the same path: merge client fields onto a base
//! document, decode into the struct, then [`Model::validate`].

mod aggregate;
mod bootcamp;
mod course;
mod repository;
mod review;
mod user;
pub mod validate;

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub use aggregate::{refresh_average_cost, refresh_average_rating};
pub use bootcamp::{slugify, Bootcamp, Career, Location, BOOTCAMPS, DEFAULT_PHOTO};
pub use course::{Course, MinimumSkill, COURSES};
pub use repository::Repository;
pub use review::{Review, REVIEWS};
pub use user::{Role, User, USERS, USER_HIDDEN_FIELDS};

use crate::error::{Error, Result};
use crate::store::{Document, RepositoryError, RepositoryOperation};

/// A document type living in one collection
pub trait Model: Serialize + DeserializeOwned + Send + Sync {
    /// Collection name
    const COLLECTION: &'static str;

    /// Human readable name used in error messages
    const NAME: &'static str;

    /// The `_id` of this document
    fn id(&self) -> &str;

    /// Check field constraints
    fn validate(&self) -> Result<()>;
}

/// Serialize a model into a document
pub fn to_document<M: Model>(model: &M) -> Result<Document> {
    match serde_json::to_value(model) {
        Ok(Value::Object(doc)) => Ok(doc),
        Ok(_) => Err(RepositoryError::serialization_error(
            RepositoryOperation::Insert,
            format!("{} did not serialize to an object", M::NAME),
        )
        .into()),
        Err(e) => Err(RepositoryError::serialization_error(RepositoryOperation::Insert, e.to_string()).into()),
    }
}

/// Decode a stored document. Failures are server errors.
pub fn from_document<M: Model>(doc: Document) -> Result<M> {
    serde_json::from_value(Value::Object(doc)).map_err(|e| {
        RepositoryError::serialization_error(RepositoryOperation::Find, e.to_string())
            .with_entity(M::NAME, "decode")
            .into()
    })
}

/// Copy client fields onto `base`, skipping `protected` keys
pub fn merge_fields(base: &mut Document, patch: Document, protected: &[&str]) {
    for (key, value) in patch {
        if !protected.contains(&key.as_str()) {
            base.insert(key, value);
        }
    }
}

/// Decode a document built from client input and validate it. Failures are 400s.
pub fn decode_input<M: Model>(doc: Document) -> Result<M> {
    let model: M = serde_json::from_value(Value::Object(doc))
        .map_err(|e| Error::ValidationError(e.to_string()))?;
    model.validate()?;
    Ok(model)
}

/// Accept `"12"` or `12` for a string field
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(n) => n.to_string(),
    })
}

/// RFC 3339 timestamps with millisecond precision
pub(crate) mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::store::format_timestamp;

    fn parse<E: serde::de::Error>(raw: &str) -> Result<DateTime<Utc>, E> {
        DateTime::parse_from_rfc3339(raw)
            .map(|at| at.with_timezone(&Utc))
            .map_err(E::custom)
    }

    pub fn serialize<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_timestamp(*at))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        parse(&String::deserialize(deserializer)?)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            at: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match at {
                Some(at) => serializer.serialize_some(&format_timestamp(*at)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| parse(&raw))
                .transpose()
        }
    }
}
