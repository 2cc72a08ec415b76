//! Purpose-built searches: schools, EV charging, parking and meeting points.
//!
//! Each issues one broad tag query and applies its precise filters to the
//! normalized features, then sorts by distance from the query centre.

use serde::{Deserialize, Serialize};

use crate::client::OsmClient;
use crate::error::{Error, Result};
use crate::geo::{mean_center, BoundingBox, Coordinate};
use crate::model::TagFilter;
use crate::normalize::{
    connectors, has_any_connector, matches_parking_type, max_power, meets_min_power,
    normalize_features, sort_by_distance, Address, Connector, PlaceFeature,
};
use crate::report::Reporter;
use crate::tools::search_area;

pub const SCHOOL_AMENITIES: [&str; 4] = ["school", "university", "kindergarten", "college"];

/// Venues returned by [`suggest_meeting_point`].
pub const MAX_SUGGESTED_VENUES: usize = 5;

/// First search radius around the meeting centre; doubled once if empty.
pub const MEETING_RADIUS_METERS: f64 = 500.0;

const UNNAMED_SCHOOL: &str = "Unnamed School";
const UNNAMED_STATION: &str = "Unnamed Charging Station";
const UNNAMED_PARKING: &str = "Unnamed Parking";
const UNNAMED_VENUE: &str = "Unnamed Venue";

const UNKNOWN: &str = "Unknown";

fn default_school_radius() -> f64 {
    2000.0
}

fn default_charging_radius() -> f64 {
    5000.0
}

fn default_parking_radius() -> f64 {
    1000.0
}

fn default_venue_type() -> String {
    "cafe".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "mcp", derive(schemars::JsonSchema))]
pub struct SchoolsRequest {
    /// Centre latitude (decimal degrees)
    pub latitude: f64,
    /// Centre longitude (decimal degrees)
    pub longitude: f64,
    /// Search radius in metres (default 2000)
    #[serde(default = "default_school_radius")]
    pub radius: f64,
    /// Keep only these values of the `school` tag, e.g. ["primary", "secondary"]
    #[serde(default)]
    pub education_levels: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "mcp", derive(schemars::JsonSchema))]
pub struct ChargingStationsRequest {
    /// Centre latitude (decimal degrees)
    pub latitude: f64,
    /// Centre longitude (decimal degrees)
    pub longitude: f64,
    /// Search radius in metres (default 5000)
    #[serde(default = "default_charging_radius")]
    pub radius: f64,
    /// Keep stations offering any of these connectors, e.g. ["type2", "chademo"]
    #[serde(default)]
    pub connector_types: Option<Vec<String>>,
    /// Minimum `maxpower` in kW
    #[serde(default)]
    pub min_power: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "mcp", derive(schemars::JsonSchema))]
pub struct ParkingRequest {
    /// Centre latitude (decimal degrees)
    pub latitude: f64,
    /// Centre longitude (decimal degrees)
    pub longitude: f64,
    /// Search radius in metres (default 1000)
    #[serde(default = "default_parking_radius")]
    pub radius: f64,
    /// Exact `parking` tag value, e.g. "surface", "underground" or "multi-storey"
    #[serde(default)]
    pub parking_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "mcp", derive(schemars::JsonSchema))]
pub struct MeetingPointRequest {
    /// Two or more starting points
    pub locations: Vec<Coordinate>,
    /// `amenity` value of the venue to suggest (default "cafe")
    #[serde(default = "default_venue_type")]
    pub venue_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct School {
    #[serde(flatten)]
    pub place: PlaceFeature,
    pub amenity_type: String,
    pub school_type: String,
    pub education_level: String,
    pub address: Address,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchoolsNearby {
    pub query: SchoolsRequest,
    pub schools: Vec<School>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChargingStation {
    #[serde(flatten)]
    pub place: PlaceFeature,
    pub operator: String,
    pub connectors: Vec<Connector>,
    pub capacity: String,
    /// kW from `maxpower`.
    pub power: Option<f64>,
    pub fee: String,
    pub access: String,
    pub opening_hours: String,
    pub address: Address,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChargingStations {
    pub query: ChargingStationsRequest,
    pub stations: Vec<ChargingStation>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParkingFacility {
    #[serde(flatten)]
    pub place: PlaceFeature,
    pub parking_type: String,
    pub capacity: String,
    pub fee: String,
    pub access: String,
    pub opening_hours: String,
    pub levels: String,
    pub address: Address,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParkingFacilities {
    pub query: ParkingRequest,
    pub parking_facilities: Vec<ParkingFacility>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeetingPoint {
    pub center_point: Coordinate,
    pub suggested_venues: Vec<PlaceFeature>,
    pub venue_type: String,
    pub total_options: usize,
}

/// Only features whose `school` tag is present and unlisted are excluded.
fn matches_education_level(place: &PlaceFeature, levels: Option<&[String]>) -> bool {
    match (levels, place.tag("school")) {
        (Some(levels), Some(school)) if !levels.is_empty() && !school.is_empty() => {
            levels.iter().any(|l| l == school)
        }
        _ => true,
    }
}

async fn nearby_features(
    client: &OsmClient,
    bbox: &BoundingBox,
    center: Coordinate,
    filter: TagFilter,
    default_name: &str,
) -> Result<Vec<PlaceFeature>> {
    let raws = client
        .search_features(bbox, std::slice::from_ref(&filter))
        .await?;
    Ok(normalize_features(&raws, default_name, Some(center)))
}

pub async fn find_schools_nearby(
    client: &OsmClient,
    request: SchoolsRequest,
    reporter: &dyn Reporter,
) -> Result<SchoolsNearby> {
    let (center, bbox) = search_area(request.latitude, request.longitude, request.radius)?;
    reporter.info(&format!(
        "Searching for schools within {}m of ({}, {})",
        request.radius, center.latitude, center.longitude
    ));

    let filter = TagFilter::one_of("amenity", SCHOOL_AMENITIES);
    let mut places = nearby_features(client, &bbox, center, filter, UNNAMED_SCHOOL).await?;
    places.retain(|p| matches_education_level(p, request.education_levels.as_deref()));
    sort_by_distance(&mut places);

    let schools: Vec<School> = places
        .into_iter()
        .map(|place| School {
            amenity_type: place.tag_or("amenity", "").to_string(),
            school_type: place.tag_or("school", "").to_string(),
            education_level: place.tag_or("isced", "").to_string(),
            address: Address::from_tags(&place.tags),
            place,
        })
        .collect();

    Ok(SchoolsNearby {
        count: schools.len(),
        query: request,
        schools,
    })
}

pub async fn find_ev_charging_stations(
    client: &OsmClient,
    request: ChargingStationsRequest,
    reporter: &dyn Reporter,
) -> Result<ChargingStations> {
    let (center, bbox) = search_area(request.latitude, request.longitude, request.radius)?;
    if let Some(min_power) = request.min_power {
        if !min_power.is_finite() {
            return Err(Error::invalid_argument("min_power", "must be a finite number"));
        }
    }
    reporter.info(&format!(
        "Searching for charging stations within {}m of ({}, {})",
        request.radius, center.latitude, center.longitude
    ));

    let filter = TagFilter::one_of("amenity", ["charging_station"]);
    let mut places = nearby_features(client, &bbox, center, filter, UNNAMED_STATION).await?;
    sort_by_distance(&mut places);

    let wanted = request.connector_types.as_deref().filter(|c| !c.is_empty());
    let stations: Vec<ChargingStation> = places
        .into_iter()
        .filter_map(|place| {
            let found = connectors(&place.tags);
            if let Some(wanted) = wanted {
                if !has_any_connector(&found, wanted) {
                    return None;
                }
            }
            if let Some(min_power) = request.min_power {
                if !meets_min_power(&place.tags, min_power) {
                    return None;
                }
            }
            Some(ChargingStation {
                operator: place.tag_or("operator", UNKNOWN).to_string(),
                connectors: found,
                capacity: place.tag_or("capacity", UNKNOWN).to_string(),
                power: max_power(&place.tags),
                fee: place.tag_or("fee", UNKNOWN).to_string(),
                access: place.tag_or("access", "public").to_string(),
                opening_hours: place.tag_or("opening_hours", UNKNOWN).to_string(),
                address: Address::from_tags(&place.tags),
                place,
            })
        })
        .collect();

    Ok(ChargingStations {
        count: stations.len(),
        query: request,
        stations,
    })
}

pub async fn find_parking_facilities(
    client: &OsmClient,
    request: ParkingRequest,
    reporter: &dyn Reporter,
) -> Result<ParkingFacilities> {
    let (center, bbox) = search_area(request.latitude, request.longitude, request.radius)?;
    reporter.info(&format!(
        "Searching for parking within {}m of ({}, {})",
        request.radius, center.latitude, center.longitude
    ));

    let filter = TagFilter::one_of("amenity", ["parking"]);
    let mut places = nearby_features(client, &bbox, center, filter, UNNAMED_PARKING).await?;
    if let Some(parking_type) = request.parking_type.as_deref().filter(|t| !t.is_empty()) {
        places.retain(|p| matches_parking_type(&p.tags, parking_type));
    }
    sort_by_distance(&mut places);

    let parking_facilities: Vec<ParkingFacility> = places
        .into_iter()
        .map(|place| ParkingFacility {
            parking_type: place.tag_or("parking", "surface").to_string(),
            capacity: place.tag_or("capacity", UNKNOWN).to_string(),
            fee: place.tag_or("fee", UNKNOWN).to_string(),
            access: place.tag_or("access", "public").to_string(),
            opening_hours: place.tag_or("opening_hours", UNKNOWN).to_string(),
            levels: place.tag_or("levels", "1").to_string(),
            address: Address::from_tags(&place.tags),
            place,
        })
        .collect();

    Ok(ParkingFacilities {
        count: parking_facilities.len(),
        query: request,
        parking_facilities,
    })
}

pub async fn suggest_meeting_point(
    client: &OsmClient,
    request: MeetingPointRequest,
    reporter: &dyn Reporter,
) -> Result<MeetingPoint> {
    if request.locations.len() < 2 {
        return Err(Error::invalid_argument(
            "locations",
            "need at least two locations to suggest a meeting point",
        ));
    }
    let locations = request
        .locations
        .iter()
        .map(|l| Coordinate::new(l.latitude, l.longitude))
        .collect::<Result<Vec<_>>>()?;
    let venue_type = request.venue_type.trim().to_string();
    if venue_type.is_empty() {
        return Err(Error::invalid_argument("venue_type", "cannot be empty"));
    }

    let center = mean_center(&locations)?;
    reporter.info(&format!(
        "Calculating center point for {} locations: ({}, {})",
        locations.len(),
        center.latitude,
        center.longitude
    ));

    let mut radius = MEETING_RADIUS_METERS;
    let mut venues = venues_near(client, center, radius, &venue_type).await?;
    if venues.is_empty() {
        radius *= 2.0;
        reporter.info(&format!(
            "No {} found within {}m, expanding search to {}m",
            venue_type, MEETING_RADIUS_METERS, radius
        ));
        venues = venues_near(client, center, radius, &venue_type).await?;
    }

    let total_options = venues.len();
    venues.truncate(MAX_SUGGESTED_VENUES);
    Ok(MeetingPoint {
        center_point: center,
        suggested_venues: venues,
        venue_type,
        total_options,
    })
}

async fn venues_near(
    client: &OsmClient,
    center: Coordinate,
    radius: f64,
    venue_type: &str,
) -> Result<Vec<PlaceFeature>> {
    let bbox = BoundingBox::from_radius(center, radius)?;
    let filter = TagFilter::one_of("amenity", [venue_type]);
    let mut venues = nearby_features(client, &bbox, center, filter, UNNAMED_VENUE).await?;
    venues.retain(|v| v.tag("amenity") == Some(venue_type));
    sort_by_distance(&mut venues);
    Ok(venues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OsmConfig;
    use crate::model::ElementType;
    use crate::normalize::FeatureKind;
    use crate::report::RecordingReporter;

    fn school(pairs: &[(&str, &str)]) -> PlaceFeature {
        PlaceFeature {
            id: 1,
            element_type: ElementType::Node,
            kind: FeatureKind::Point,
            name: UNNAMED_SCHOOL.to_string(),
            coordinates: Coordinate::new(0.0, 0.0).unwrap(),
            distance: Some(0.0),
            tags: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn education_filter_keeps_untagged_schools() {
        let levels = vec!["primary".to_string()];
        assert!(matches_education_level(&school(&[("school", "primary")]), Some(&levels)));
        assert!(!matches_education_level(&school(&[("school", "secondary")]), Some(&levels)));
        assert!(matches_education_level(&school(&[]), Some(&levels)));
        assert!(matches_education_level(&school(&[("school", "secondary")]), None));
    }

    #[test]
    fn request_defaults() {
        let schools: SchoolsRequest =
            serde_json::from_value(serde_json::json!({"latitude": 1.0, "longitude": 2.0})).unwrap();
        assert_eq!(schools.radius, 2000.0);

        let stations: ChargingStationsRequest =
            serde_json::from_value(serde_json::json!({"latitude": 1.0, "longitude": 2.0})).unwrap();
        assert_eq!(stations.radius, 5000.0);
        assert!(stations.min_power.is_none());

        let parking: ParkingRequest =
            serde_json::from_value(serde_json::json!({"latitude": 1.0, "longitude": 2.0})).unwrap();
        assert_eq!(parking.radius, 1000.0);

        let meeting: MeetingPointRequest = serde_json::from_value(serde_json::json!({
            "locations": [{"latitude": 1.0, "longitude": 2.0}]
        }))
        .unwrap();
        assert_eq!(meeting.venue_type, "cafe");
    }

    #[tokio::test]
    async fn meeting_point_needs_two_locations() {
        let client = OsmClient::new(OsmConfig::default());
        let request = MeetingPointRequest {
            locations: vec![Coordinate::new(1.0, 1.0).unwrap()],
            venue_type: default_venue_type(),
        };
        let err = suggest_meeting_point(&client, request, &RecordingReporter::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }
}
