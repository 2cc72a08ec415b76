use serde::Deserialize;
use serde_json::json;

use crate::client::OsmClient;
use crate::error::{Error, Result};
use crate::geo::Coordinate;
use crate::model::RawPlace;
use crate::report::Reporter;

#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "mcp", derive(schemars::JsonSchema))]
pub struct GeocodeRequest {
    /// Address, place name or landmark, e.g. "Empire State Building"
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "mcp", derive(schemars::JsonSchema))]
pub struct ReverseGeocodeRequest {
    /// Latitude in decimal degrees (WGS84)
    pub latitude: f64,
    /// Longitude in decimal degrees (WGS84)
    pub longitude: f64,
}

/// Ranked candidates for free text, each with a numeric `coordinates` object
/// added next to the provider's string `lat`/`lon`.
pub async fn geocode_address(
    client: &OsmClient,
    request: GeocodeRequest,
    reporter: &dyn Reporter,
) -> Result<Vec<RawPlace>> {
    let address = request.address.trim();
    if address.is_empty() {
        return Err(Error::invalid_argument("address", "cannot be empty"));
    }
    reporter.info(&format!("Geocoding '{}'", address));

    let mut candidates = client.geocode(address).await?;
    for candidate in &mut candidates {
        if let Some(coord) = candidate.coordinate() {
            candidate.0.insert(
                "coordinates".to_string(),
                json!({"latitude": coord.latitude, "longitude": coord.longitude}),
            );
        }
    }
    Ok(candidates)
}

pub async fn reverse_geocode(
    client: &OsmClient,
    request: ReverseGeocodeRequest,
    reporter: &dyn Reporter,
) -> Result<RawPlace> {
    let coord = Coordinate::new(request.latitude, request.longitude)?;
    reporter.info(&format!(
        "Reverse geocoding ({}, {})",
        coord.latitude, coord.longitude
    ));
    client.reverse_geocode(coord).await
}

/// Display name for `coord`, or `"Unknown location"` when the lookup fails
/// upstream or finds nothing. Other failures propagate.
pub(crate) async fn best_effort_address(
    client: &OsmClient,
    coord: Coordinate,
    reporter: &dyn Reporter,
) -> Result<String> {
    match client.reverse_geocode(coord).await {
        Ok(place) => Ok(place
            .display_name()
            .unwrap_or("Unknown location")
            .to_string()),
        Err(e) if e.is_recoverable() => {
            reporter.warning(&format!(
                "Could not resolve address for ({}, {}): {}",
                coord.latitude, coord.longitude, e
            ));
            Ok("Unknown location".to_string())
        }
        Err(e) => Err(e),
    }
}
