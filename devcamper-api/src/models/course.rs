//! Courses offered by a bootcamp

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validate::Violations;
use super::{string_or_number, timestamp, Model};
use crate::error::Result;

/// Courses collection
pub const COURSES: &str = "courses";

/// Skill level a course expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MinimumSkill {
    /// No prior experience
    Beginner,
    /// Some experience
    Intermediate,
    /// Working knowledge
    Advanced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub weeks: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tuition: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_skill: Option<MinimumSkill>,
    #[serde(default)]
    pub scholarship_available: bool,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    pub bootcamp: String,
    pub user: String,
}

impl Model for Course {
    const COLLECTION: &'static str = COURSES;
    const NAME: &'static str = "Course";

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<()> {
        Violations::new()
            .require(&self.title, "Please add a course title")
            .require(&self.description, "Please add a description")
            .require(&self.weeks, "Please add number of weeks")
            .check(self.tuition.is_some(), "Please add a tuition cost")
            .check(
                self.tuition.map_or(true, |t| t.is_finite() && t >= 0.0),
                "Tuition cost can not be negative",
            )
            .check(self.minimum_skill.is_some(), "Please add a minimum skill")
            .finish()
    }
}
