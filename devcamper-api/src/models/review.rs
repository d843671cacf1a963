//! Student reviews, at most one per user and bootcamp

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validate::Violations;
use super::{timestamp, Model};
use crate::error::Result;

/// Reviews collection
pub const REVIEWS: &str = "reviews";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    pub bootcamp: String,
    pub user: String,
}

impl Model for Review {
    const COLLECTION: &'static str = REVIEWS;
    const NAME: &'static str = "Review";

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<()> {
        Violations::new()
            .require(&self.title, "Please add a title for the review")
            .max_len(&self.title, 100, "Title can not be more than 100 characters")
            .require(&self.text, "Please add some text")
            .check(
                self.rating.is_some_and(|r| (1..=10).contains(&r)),
                "Please add a rating between 1 and 10",
            )
            .finish()
    }
}
