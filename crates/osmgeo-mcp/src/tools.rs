//! MCP tool registry and dispatch
//!
//! Every tool maps one-to-one onto a workflow in `osmgeo_lib::tools`. Input
//! schemas are generated from the library request types, so the defaults a
//! caller sees in `tools/list` are the ones serde applies on `tools/call`.

use std::future::Future;

use osmgeo_lib::tools::{
    self as workflows, ChargingStationsRequest, CommuteRequest, ExploreAreaRequest,
    GeocodeRequest, MeetingPointRequest, NearbyPlacesRequest, NeighborhoodRequest,
    ParkingRequest, ReverseGeocodeRequest, RouteDirectionsRequest, SchoolsRequest,
    SearchCategoryRequest,
};
use osmgeo_lib::{OsmClient, Reporter};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::types::ToolDescriptor;
use crate::Error;

/// Why a `tools/call` did not produce a result value.
#[derive(Debug)]
pub enum CallError {
    /// No tool is registered under this name.
    UnknownTool(String),
    /// Arguments did not match the tool's input schema.
    InvalidArguments { tool: String, reason: String },
    /// The tool ran and failed.
    Failed(Error),
}

fn descriptor<T: JsonSchema>(name: &'static str, description: &'static str) -> ToolDescriptor {
    let schema = schemars::schema_for!(T);
    ToolDescriptor {
        name,
        description,
        input_schema: serde_json::to_value(schema).unwrap_or_else(|_| json!({"type": "object"})),
    }
}

/// Descriptors for `tools/list`, in registration order.
pub fn tool_descriptors() -> Vec<ToolDescriptor> {
    vec![
        descriptor::<GeocodeRequest>(
            "geocode_address",
            "Convert an address or place name into ranked candidate coordinates.",
        ),
        descriptor::<ReverseGeocodeRequest>(
            "reverse_geocode",
            "Find the nearest addressable place for a coordinate.",
        ),
        descriptor::<RouteDirectionsRequest>(
            "get_route_directions",
            "Route between two points by car, bike or foot with optional turn-by-turn steps.",
        ),
        descriptor::<CommuteRequest>(
            "analyze_commute",
            "Compare travel modes between home and work and report the fastest.",
        ),
        descriptor::<NearbyPlacesRequest>(
            "find_nearby_places",
            "List points of interest around a point, grouped by category and subcategory.",
        ),
        descriptor::<SearchCategoryRequest>(
            "search_category",
            "Find places of one tag category inside a bounding box.",
        ),
        descriptor::<ExploreAreaRequest>(
            "explore_area",
            "Profile an area across amenity, shop, tourism, leisure, natural, historic and transit features.",
        ),
        descriptor::<NeighborhoodRequest>(
            "analyze_neighborhood",
            "Score a neighbourhood's livability per category plus overall and walkability scores.",
        ),
        descriptor::<SchoolsRequest>(
            "find_schools_nearby",
            "Find schools, colleges, universities and kindergartens near a point.",
        ),
        descriptor::<ChargingStationsRequest>(
            "find_ev_charging_stations",
            "Find EV charging stations, optionally filtered by connector type and minimum power.",
        ),
        descriptor::<ParkingRequest>(
            "find_parking_facilities",
            "Find parking near a point, optionally filtered by parking type.",
        ),
        descriptor::<MeetingPointRequest>(
            "suggest_meeting_point",
            "Suggest venues near the centre of two or more locations.",
        ),
    ]
}

fn parse<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, CallError> {
    serde_json::from_value(arguments).map_err(|e| CallError::InvalidArguments {
        tool: tool.to_string(),
        reason: e.to_string(),
    })
}

async fn run<T, F>(workflow: F) -> Result<Value, CallError>
where
    T: Serialize,
    F: Future<Output = osmgeo_lib::Result<T>>,
{
    let output = workflow.await.map_err(|e| CallError::Failed(e.into()))?;
    serde_json::to_value(output).map_err(|e| CallError::Failed(Error::internal(e.to_string())))
}

/// Run the named tool. Missing arguments are treated as an empty object.
pub async fn call_tool(
    client: &OsmClient,
    name: &str,
    arguments: Option<Value>,
    reporter: &dyn Reporter,
) -> Result<Value, CallError> {
    let arguments = match arguments {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(value) => value,
    };
    debug!("calling tool {} with {}", name, arguments);

    match name {
        "geocode_address" => {
            run(workflows::geocode_address(client, parse(name, arguments)?, reporter)).await
        }
        "reverse_geocode" => {
            run(workflows::reverse_geocode(client, parse(name, arguments)?, reporter)).await
        }
        "get_route_directions" => {
            run(workflows::get_route_directions(client, parse(name, arguments)?, reporter)).await
        }
        "analyze_commute" => {
            run(workflows::analyze_commute(client, parse(name, arguments)?, reporter)).await
        }
        "find_nearby_places" => {
            run(workflows::find_nearby_places(client, parse(name, arguments)?, reporter)).await
        }
        "search_category" => {
            run(workflows::search_category(client, parse(name, arguments)?, reporter)).await
        }
        "explore_area" => {
            run(workflows::explore_area(client, parse(name, arguments)?, reporter)).await
        }
        "analyze_neighborhood" => {
            run(workflows::analyze_neighborhood(client, parse(name, arguments)?, reporter)).await
        }
        "find_schools_nearby" => {
            run(workflows::find_schools_nearby(client, parse(name, arguments)?, reporter)).await
        }
        "find_ev_charging_stations" => {
            run(workflows::find_ev_charging_stations(
                client,
                parse(name, arguments)?,
                reporter,
            ))
            .await
        }
        "find_parking_facilities" => {
            run(workflows::find_parking_facilities(client, parse(name, arguments)?, reporter))
                .await
        }
        "suggest_meeting_point" => {
            run(workflows::suggest_meeting_point(client, parse(name, arguments)?, reporter)).await
        }
        other => Err(CallError::UnknownTool(other.to_string())),
    }
}
