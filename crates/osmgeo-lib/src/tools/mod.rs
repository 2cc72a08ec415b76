//! Tool workflows composed from the client and the normalizer.
//!
//! Each tool takes a typed request (deserialized from caller arguments with
//! the documented defaults), the shared client and a [`Reporter`], and
//! returns a serializable result. Single-call tools propagate every error;
//! the multi-category tools downgrade upstream failures per category.
//!
//! [`Reporter`]: crate::report::Reporter

pub mod analysis;
pub mod extras;
pub mod geocoding;
pub mod routing;
pub mod search;

use crate::error::Result;
use crate::geo::{BoundingBox, Coordinate};

pub use analysis::{
    analyze_neighborhood, category_score, explore_area, AreaProfile, ExploreAreaRequest,
    NeighborhoodAnalysis, NeighborhoodRequest,
};
pub use extras::{
    find_ev_charging_stations, find_parking_facilities, find_schools_nearby,
    suggest_meeting_point, ChargingStationsRequest, MeetingPointRequest, ParkingRequest,
    SchoolsRequest,
};
pub use geocoding::{geocode_address, reverse_geocode, GeocodeRequest, ReverseGeocodeRequest};
pub use routing::{
    analyze_commute, get_route_directions, resolve_mode, CommuteRequest, RouteDirectionsRequest,
};
pub use search::{find_nearby_places, search_category, NearbyPlacesRequest, SearchCategoryRequest};

/// Validated centre plus the search box for `radius` around it.
pub(crate) fn search_area(
    latitude: f64,
    longitude: f64,
    radius: f64,
) -> Result<(Coordinate, BoundingBox)> {
    let center = Coordinate::new(latitude, longitude)?;
    let bbox = BoundingBox::from_radius(center, radius)?;
    Ok((center, bbox))
}

pub(crate) fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
