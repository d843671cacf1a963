//! Spherical distance helpers and the radius lookup

use serde::{Deserialize, Serialize};

use super::Geocoder;
use crate::error::{Error, Result};
use crate::query::Filter;

/// Earth's radius in miles, used to turn a distance into radians
pub const EARTH_RADIUS_MILES: f64 = 3963.0;

/// Longitude/latitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Degrees east
    pub longitude: f64,
    /// Degrees north
    pub latitude: f64,
}

impl GeoPoint {
    /// Create a point from GeoJSON order: longitude first
    pub const fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }
}

/// Great-circle angle between two points in radians (haversine)
pub fn central_angle(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat1, lat2) = (a.latitude.to_radians(), b.latitude.to_radians());
    let d_lat = lat2 - lat1;
    let d_lng = (b.longitude - a.longitude).to_radians();
    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * h.sqrt().min(1.0).asin()
}

/// A zipcode plus a distance in miles
#[derive(Debug, Clone, PartialEq)]
pub struct RadiusQuery {
    zipcode: String,
    distance_miles: f64,
}

impl RadiusQuery {
    /// Validate the raw path segments
    pub fn parse(zipcode: &str, distance: &str) -> Result<Self> {
        let distance_miles = distance
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|d| d.is_finite() && *d >= 0.0)
            .ok_or_else(|| {
                Error::BadRequest(format!("Distance must be a non-negative number, got '{distance}'"))
            })?;
        Ok(Self {
            zipcode: zipcode.trim().to_string(),
            distance_miles,
        })
    }

    /// Zipcode being searched around
    pub fn zipcode(&self) -> &str {
        &self.zipcode
    }

    /// `distance / 3963`
    pub fn radius_radians(&self) -> f64 {
        self.distance_miles / EARTH_RADIUS_MILES
    }

    /// Geocode the zipcode and build a containment filter on `field`
    pub async fn resolve(&self, geocoder: &dyn Geocoder, field: &str) -> Result<Filter> {
        let first = geocoder
            .geocode(&self.zipcode)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::ZipcodeNotFound(self.zipcode.clone()))?;

        let center = GeoPoint::new(first.longitude, first.latitude);
        tracing::debug!(
            zipcode = %self.zipcode,
            lat = center.latitude,
            lng = center.longitude,
            radius = self.radius_radians(),
            "radius lookup"
        );
        Ok(Filter::new().within_sphere(field, center, self.radius_radians()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{GeoLocation, StaticGeocoder};
    use crate::query::Predicate;

    #[test]
    fn test_central_angle_known_distance() {
        let boston = GeoPoint::new(-71.0589, 42.3601);
        let nyc = GeoPoint::new(-74.0060, 40.7128);
        let miles = central_angle(boston, nyc) * EARTH_RADIUS_MILES;
        assert!((miles - 190.0).abs() < 5.0, "{miles}");
        assert_eq!(central_angle(boston, boston), 0.0);
    }

    #[test]
    fn test_distance_validation() {
        assert!(RadiusQuery::parse("02118", "10").is_ok());
        assert!(RadiusQuery::parse("02118", "0").is_ok());
        for bad in ["-1", "abc", "NaN", "inf", ""] {
            assert!(
                matches!(RadiusQuery::parse("02118", bad), Err(Error::BadRequest(_))),
                "{bad}"
            );
        }
    }

    #[tokio::test]
    async fn test_unknown_zipcode_is_named_error() {
        let geocoder = StaticGeocoder::default();
        let query = RadiusQuery::parse("99999", "10").unwrap();
        let err = query.resolve(&geocoder, "location").await.unwrap_err();
        assert!(matches!(err, Error::ZipcodeNotFound(z) if z == "99999"));
    }

    #[tokio::test]
    async fn test_resolve_builds_sphere_filter() {
        let geocoder =
            StaticGeocoder::default().with_entry("02118", GeoLocation::at(42.3406, -71.0726));
        let query = RadiusQuery::parse("02118", "3963").unwrap();
        let filter = query.resolve(&geocoder, "location").await.unwrap();
        match &filter.predicates()[0] {
            Predicate::WithinSphere {
                field,
                center,
                radius,
            } => {
                assert_eq!(field, "location");
                assert_eq!(*center, GeoPoint::new(-71.0726, 42.3406));
                assert!((radius - 1.0).abs() < f64::EPSILON);
            }
            other => panic!("unexpected predicate {other:?}"),
        }
    }
}
