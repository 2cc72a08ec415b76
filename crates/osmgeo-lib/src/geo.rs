//! Great-circle distance and radius-to-box helpers.
//!
//! Boxes are derived with an equirectangular approximation: one degree of
//! latitude is treated as 111 km and one degree of longitude as
//! `111 km * cos(latitude)`. This is accurate to well under a percent for
//! search radii of a few tens of kilometres away from the poles, which covers
//! every tool in this crate. Larger radii or polar centres produce boxes that
//! are too narrow in longitude; a centre on either pole is rejected instead
//! of silently producing an unbounded box. Derived boxes are clamped to
//! [-90, 90] latitude and [-180, 180] longitude, so a search near the
//! antimeridian only covers the side the centre lies on.
//!
//! The meeting-point centre is likewise a plain arithmetic mean of the input
//! coordinates, valid for points that are geographically close and do not
//! straddle the antimeridian.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Mean Earth radius used by the haversine formula, in metres.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Approximate length of one degree of latitude, in metres.
pub const METERS_PER_DEGREE: f64 = 111_000.0;

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "mcp", derive(schemars::JsonSchema))]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Build a coordinate, rejecting values outside the WGS84 ranges.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(Error::invalid_argument(
                "latitude",
                format!("{} is outside [-90, 90]", latitude),
            ));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(Error::invalid_argument(
                "longitude",
                format!("{} is outside [-180, 180]", longitude),
            ));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// Axis-aligned latitude/longitude rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub min_longitude: f64,
    pub max_latitude: f64,
    pub max_longitude: f64,
}

impl BoundingBox {
    /// Build a box from explicit bounds.
    pub fn new(
        min_latitude: f64,
        min_longitude: f64,
        max_latitude: f64,
        max_longitude: f64,
    ) -> Result<Self> {
        let south_west = Coordinate::new(min_latitude, min_longitude)?;
        let north_east = Coordinate::new(max_latitude, max_longitude)?;
        if south_west.latitude > north_east.latitude {
            return Err(Error::invalid_argument(
                "min_latitude",
                "must not exceed max_latitude",
            ));
        }
        if south_west.longitude > north_east.longitude {
            return Err(Error::invalid_argument(
                "min_longitude",
                "must not exceed max_longitude",
            ));
        }
        Ok(Self {
            min_latitude,
            min_longitude,
            max_latitude,
            max_longitude,
        })
    }

    /// Derive the search box for a radius around `center`.
    pub fn from_radius(center: Coordinate, radius_meters: f64) -> Result<Self> {
        if !radius_meters.is_finite() || radius_meters <= 0.0 {
            return Err(Error::invalid_argument(
                "radius",
                format!("{} must be a positive number of meters", radius_meters),
            ));
        }
        if center.latitude.abs() >= 90.0 {
            return Err(Error::invalid_argument(
                "latitude",
                format!(
                    "{} is a pole; longitude span is unbounded",
                    center.latitude
                ),
            ));
        }

        let lat_delta = radius_meters / METERS_PER_DEGREE;
        let lon_delta = radius_meters / (METERS_PER_DEGREE * center.latitude.to_radians().cos());

        Ok(Self {
            min_latitude: (center.latitude - lat_delta).max(-90.0),
            min_longitude: (center.longitude - lon_delta).max(-180.0),
            max_latitude: (center.latitude + lat_delta).min(90.0),
            max_longitude: (center.longitude + lon_delta).min(180.0),
        })
    }

    pub fn contains(&self, point: Coordinate) -> bool {
        (self.min_latitude..=self.max_latitude).contains(&point.latitude)
            && (self.min_longitude..=self.max_longitude).contains(&point.longitude)
    }

    /// Render as the `south,west,north,east` filter used by the tag-query engine.
    pub fn to_overpass(&self) -> String {
        format!(
            "{},{},{},{}",
            self.min_latitude, self.min_longitude, self.max_latitude, self.max_longitude
        )
    }
}

/// Great-circle distance between two coordinates using the haversine formula.
pub fn haversine_distance_meters(a: Coordinate, b: Coordinate) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos() * b.latitude.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    // Rounding can push h marginally above 1 for antipodal points.
    2.0 * EARTH_RADIUS_METERS * h.sqrt().min(1.0).asin()
}

/// Arithmetic mean of the given coordinates.
pub fn mean_center(points: &[Coordinate]) -> Result<Coordinate> {
    if points.is_empty() {
        return Err(Error::invalid_argument("locations", "cannot be empty"));
    }
    let n = points.len() as f64;
    let latitude = points.iter().map(|p| p.latitude).sum::<f64>() / n;
    let longitude = points.iter().map(|p| p.longitude).sum::<f64>() / n;
    Ok(Coordinate {
        latitude,
        longitude,
    })
}

/// Round to a fixed number of decimal places for presentation.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
