//! Geocoding and spherical radius queries

mod geocoder;
mod radius;

pub use geocoder::{from_config, GeoLocation, Geocoder, MapQuestGeocoder, StaticGeocoder};
pub use radius::{central_angle, GeoPoint, RadiusQuery, EARTH_RADIUS_MILES};
