//! Coordinates, great-circle distance, and bounding boxes.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Mean Earth radius in metres (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Metres per degree of latitude on the mean sphere.
const METERS_PER_DEGREE_LAT: f64 = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;

/// A validated WGS84 position.
///
/// Construct through [`Coordinates::new`]; out-of-range or non-finite values
/// yield `None` so that malformed input is treated as absent, never clamped.
/// Deserialization applies the same check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "RawCoordinates")]
pub struct Coordinates {
    lat: f64,
    lng: f64,
}

/// Wire shape of [`Coordinates`] before validation.
#[derive(Deserialize, JsonSchema)]
struct RawCoordinates {
    lat: f64,
    lng: f64,
}

impl TryFrom<RawCoordinates> for Coordinates {
    type Error = String;

    fn try_from(raw: RawCoordinates) -> Result<Self, Self::Error> {
        Self::new(raw.lat, raw.lng)
            .ok_or_else(|| format!("coordinates out of range: lat {}, lng {}", raw.lat, raw.lng))
    }
}

impl Coordinates {
    #[must_use]
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        let valid = lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng);
        valid.then_some(Self { lat, lng })
    }

    /// Build from nullable columns. Either side missing or invalid → `None`.
    #[must_use]
    pub fn from_parts(lat: Option<f64>, lng: Option<f64>) -> Option<Self> {
        Self::new(lat?, lng?)
    }

    #[must_use]
    pub const fn lat(&self) -> f64 {
        self.lat
    }

    #[must_use]
    pub const fn lng(&self) -> f64 {
        self.lng
    }

    /// Great-circle (haversine) distance in metres.
    #[must_use]
    pub fn distance_m(&self, other: &Self) -> f64 {
        let phi1 = self.lat.to_radians();
        let phi2 = other.lat.to_radians();
        let d_phi = (other.lat - self.lat).to_radians();
        let d_lambda = (other.lng - self.lng).to_radians();

        let a = (d_phi / 2.0).sin().powi(2)
            + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_M * c
    }

    /// Point reached by moving `north_m` metres north and `east_m` metres east.
    ///
    /// Flat-earth approximation, accurate for the few-kilometre offsets the
    /// pipeline deals with. Returns `None` when the result leaves the valid range.
    #[must_use]
    pub fn offset_m(&self, north_m: f64, east_m: f64) -> Option<Self> {
        let lat = self.lat + north_m / METERS_PER_DEGREE_LAT;
        let lng = self.lng + east_m / (METERS_PER_DEGREE_LAT * self.lat.to_radians().cos());
        Self::new(lat, lng)
    }
}

/// Axis-aligned latitude/longitude rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lng: f64,
    pub max_lat: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    /// Smallest box enclosing a circle of `radius_m` around `center`.
    #[must_use]
    pub fn around(center: &Coordinates, radius_m: f64) -> Self {
        let d_lat = radius_m / METERS_PER_DEGREE_LAT;
        let cos_lat = center.lat.to_radians().cos().abs().max(1e-6);
        let d_lng = (radius_m / (METERS_PER_DEGREE_LAT * cos_lat)).min(180.0);
        Self {
            min_lat: (center.lat - d_lat).max(-90.0),
            min_lng: (center.lng - d_lng).max(-180.0),
            max_lat: (center.lat + d_lat).min(90.0),
            max_lng: (center.lng + d_lng).min(180.0),
        }
    }

    /// Inclusive containment test.
    #[must_use]
    pub fn contains(&self, point: &Coordinates) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.lat)
            && (self.min_lng..=self.max_lng).contains(&point.lng)
    }
}
