//! osmgeo library entry points.
//!
//! This crate wraps the public OpenStreetMap services (Nominatim geocoding,
//! OSRM routing, the Overpass tag-query engine and tile servers) behind a
//! single connected [`OsmClient`], normalizes their results into
//! [`PlaceFeature`] records, and composes them into the aggregation tools in
//! [`tools`]. Protocol adapters (the MCP server) should only depend on the
//! items exported here instead of talking to the upstream services directly.
//!

#![deny(warnings)]

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod geo;
pub mod model;
pub mod normalize;
pub mod report;
pub mod tools;

pub use client::{build_overpass_query, OsmClient, GEOCODE_LIMIT};
pub use config::OsmConfig;
pub use context::AppContext;
pub use error::{Error, Result};
pub use geo::{haversine_distance_meters, mean_center, BoundingBox, Coordinate};
pub use model::{
    ElementType, Overview, RawFeature, RawPlace, RawRoute, RouteOptions, TagFilter, Tile,
    TileStyle, TravelMode,
};
pub use normalize::{FeatureKind, PlaceFeature};
pub use report::{RecordingReporter, ReportEvent, Reporter, TracingReporter};
