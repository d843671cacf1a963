//! Geocoding providers

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{GeocoderConfig, GeocoderProvider};
use crate::error::{Error, Result};

const MAPQUEST_BASE_URL: &str = "https://www.mapquestapi.com";

/// One geocoding match
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoLocation {
    /// Degrees north
    pub latitude: f64,
    /// Degrees east
    pub longitude: f64,
    /// Single line address
    pub formatted_address: Option<String>,
    /// Street line
    pub street: Option<String>,
    /// City
    pub city: Option<String>,
    /// State or region code
    pub state: Option<String>,
    /// Postal code
    pub zipcode: Option<String>,
    /// ISO country code
    pub country_code: Option<String>,
}

impl GeoLocation {
    /// A bare coordinate match
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            ..Self::default()
        }
    }
}

/// Turns free text (an address or a zipcode) into locations
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Look up a query. An empty result means nothing matched.
    async fn geocode(&self, query: &str) -> Result<Vec<GeoLocation>>;
}

/// MapQuest geocoding API client
#[derive(Debug, Clone)]
pub struct MapQuestGeocoder {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct MapQuestResponse {
    #[serde(default)]
    results: Vec<MapQuestResult>,
}

#[derive(Debug, Deserialize)]
struct MapQuestResult {
    #[serde(default)]
    locations: Vec<MapQuestLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapQuestLocation {
    lat_lng: MapQuestLatLng,
    #[serde(default)]
    street: Option<String>,
    #[serde(default)]
    admin_area5: Option<String>,
    #[serde(default)]
    admin_area3: Option<String>,
    #[serde(default)]
    admin_area1: Option<String>,
    #[serde(default)]
    postal_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MapQuestLatLng {
    lat: f64,
    lng: f64,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl From<MapQuestLocation> for GeoLocation {
    fn from(location: MapQuestLocation) -> Self {
        let street = non_empty(location.street);
        let city = non_empty(location.admin_area5);
        let state = non_empty(location.admin_area3);
        let zipcode = non_empty(location.postal_code);
        let country_code = non_empty(location.admin_area1);

        let region = [state.as_deref(), zipcode.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        let parts: Vec<&str> = [street.as_deref(), city.as_deref(), Some(region.as_str()), country_code.as_deref()]
            .into_iter()
            .flatten()
            .filter(|p| !p.is_empty())
            .collect();

        Self {
            latitude: location.lat_lng.lat,
            longitude: location.lat_lng.lng,
            formatted_address: (!parts.is_empty()).then(|| parts.join(", ")),
            street,
            city,
            state,
            zipcode,
            country_code,
        }
    }
}

impl MapQuestGeocoder {
    /// Create a client for the given key
    pub fn new(api_key: impl Into<String>, base_url: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.unwrap_or_else(|| MAPQUEST_BASE_URL.to_string()),
        })
    }
}

#[async_trait]
impl Geocoder for MapQuestGeocoder {
    async fn geocode(&self, query: &str) -> Result<Vec<GeoLocation>> {
        let url = format!("{}/geocoding/v1/address", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .query(&[("key", self.api_key.as_str()), ("location", query)])
            .send()
            .await?
            .error_for_status()?;
        let body: MapQuestResponse = response.json().await?;

        Ok(body
            .results
            .into_iter()
            .flat_map(|result| result.locations)
            .map(GeoLocation::from)
            .collect())
    }
}

/// Geocoder backed by a fixed table, for development and tests
#[derive(Debug, Clone, Default)]
pub struct StaticGeocoder {
    entries: HashMap<String, GeoLocation>,
}

impl StaticGeocoder {
    /// Add or replace an entry
    #[must_use]
    pub fn with_entry(mut self, query: impl Into<String>, location: GeoLocation) -> Self {
        self.entries.insert(normalize(&query.into()), location);
        self
    }
}

fn normalize(query: &str) -> String {
    query.trim().to_lowercase()
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn geocode(&self, query: &str) -> Result<Vec<GeoLocation>> {
        Ok(self.entries.get(&normalize(query)).cloned().into_iter().collect())
    }
}

/// Build the configured geocoder
pub fn from_config(config: &GeocoderConfig) -> Result<Arc<dyn Geocoder>> {
    match config.provider {
        GeocoderProvider::Mapquest => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                Error::Internal("geocoder.api_key is required for the mapquest provider".into())
            })?;
            Ok(Arc::new(MapQuestGeocoder::new(
                api_key,
                config.base_url.clone(),
                Duration::from_secs(config.timeout_secs),
            )?))
        }
        GeocoderProvider::Static => {
            let geocoder = config
                .entries
                .iter()
                .fold(StaticGeocoder::default(), |geocoder, (query, [lat, lng])| {
                    geocoder.with_entry(query.clone(), GeoLocation::at(*lat, *lng))
                });
            Ok(Arc::new(geocoder))
        }
    }
}
