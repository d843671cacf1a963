//! Bootcamps: the listing every course and review hangs off

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validate::{is_valid_email, is_valid_url, Violations};
use super::{timestamp, Model};
use crate::error::Result;
use crate::geo::GeoLocation;

/// Bootcamps collection
pub const BOOTCAMPS: &str = "bootcamps";

/// Photo of a bootcamp that never had one uploaded
pub const DEFAULT_PHOTO: &str = "no-photo.jpg";

/// Career tracks a bootcamp can offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Career {
    /// Web Development
    #[serde(rename = "Web Development")]
    WebDevelopment,
    /// Mobile Development
    #[serde(rename = "Mobile Development")]
    MobileDevelopment,
    /// UI/UX
    #[serde(rename = "UI/UX")]
    UiUx,
    /// Data Science
    #[serde(rename = "Data Science")]
    DataScience,
    /// Business
    Business,
    /// Other
    Other,
}

/// GeoJSON point plus the address parts the geocoder returned
/// A bootcamp as stored in the `bootcamps` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// Always `Point`
    #[serde(rename = "type")]
    pub kind: String,
    /// `[longitude, latitude]`
    pub coordinates: [f64; 2],
    /// Single line address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_address: Option<String>,
    /// Street line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    /// City
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// State
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Postal code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zipcode: Option<String>,
    /// Country code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl From<GeoLocation> for Location {
    fn from(geo: GeoLocation) -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: [geo.longitude, geo.latitude],
            formatted_address: geo.formatted_address,
            street: geo.street,
            city: geo.city,
            state: geo.state,
            zipcode: geo.zipcode,
            country: geo.country_code,
        }
    }
}

/// A bootcamp as stored in the `bootcamps` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bootcamp {
    #[serde(rename = "_id")]
    pub id: String,
    /// Unique, at most 50 characters
    #[serde(default)]
    pub name: String,
    /// Derived from `name` on every save
    #[serde(default)]
    pub slug: String,
    /// At most 500 characters
    #[serde(default)]
    pub description: String,
    /// HTTP or HTTPS URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    /// At most 20 characters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Contact address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Geocoded from the `address` given on create or update
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// At least one career track
    #[serde(default)]
    pub careers: Vec<Career>,
    /// Mean review rating, maintained by the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
    /// Mean course tuition rounded up to a multiple of 10, maintained by the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_cost: Option<f64>,
    /// Uploaded file name under the uploads directory
    #[serde(default = "default_photo")]
    pub photo: String,
    #[serde(default)]
    pub housing: bool,
    #[serde(default)]
    pub job_assistance: bool,
    #[serde(default)]
    pub job_guarantee: bool,
    #[serde(default)]
    pub accept_gi: bool,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    /// Id of the publisher who owns it
    pub user: String,
}

fn default_photo() -> String {
    DEFAULT_PHOTO.to_string()
}

/// Lowercase, dash separated URL slug
///
/// ```rust
/// use devcamper_api::models::slugify;
///
/// assert_eq!(slugify("Devworks Bootcamp"), "devworks-bootcamp");
/// assert_eq!(slugify("  UI/UX -- Academy! "), "ui-ux-academy");
/// ```
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

impl Model for Bootcamp {
    const COLLECTION: &'static str = BOOTCAMPS;
    const NAME: &'static str = "Bootcamp";

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<()> {
        let mut violations = Violations::new();
        violations
            .require(&self.name, "Please add a name")
            .max_len(&self.name, 50, "Name can not be more than 50 characters")
            .require(&self.description, "Please add a description")
            .max_len(
                &self.description,
                500,
                "Description can not be more than 500 characters",
            )
            .check(!self.careers.is_empty(), "Please add at least one career")
            .check(
                self.website.as_deref().map_or(true, is_valid_url),
                "Please use a valid URL with HTTP or HTTPS",
            )
            .check(
                self.email.as_deref().map_or(true, is_valid_email),
                "Please add a valid email",
            )
            .max_len(
                self.phone.as_deref().unwrap_or_default(),
                20,
                "Phone number can not be longer than 20 characters",
            )
            .check(
                self.average_rating
                    .map_or(true, |r| (1.0..=10.0).contains(&r)),
                "Rating must be between 1 and 10",
            );
        violations.finish()
    }
}
