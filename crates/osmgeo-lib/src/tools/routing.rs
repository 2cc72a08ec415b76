//! Single-route directions and multi-mode commute comparison.

use std::cmp::Ordering;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::OsmClient;
use crate::error::{Error, Result};
use crate::geo::{round_to, Coordinate};
use crate::model::{Overview, RawRoute, RouteCandidate, RouteOptions, TravelMode};
use crate::report::Reporter;
use crate::tools::geocoding::best_effort_address;

fn default_mode() -> String {
    TravelMode::Car.as_str().to_string()
}

fn default_overview() -> String {
    Overview::Simplified.as_str().to_string()
}

fn default_commute_modes() -> Vec<String> {
    ["car", "foot", "bike"].iter().map(|m| m.to_string()).collect()
}

#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "mcp", derive(schemars::JsonSchema))]
pub struct RouteDirectionsRequest {
    /// Starting point latitude (decimal degrees)
    pub from_latitude: f64,
    /// Starting point longitude (decimal degrees)
    pub from_longitude: f64,
    /// Destination latitude (decimal degrees)
    pub to_latitude: f64,
    /// Destination longitude (decimal degrees)
    pub to_longitude: f64,
    /// Transportation mode: "car", "bike" or "foot" (default "car")
    #[serde(default = "default_mode")]
    pub mode: String,
    /// Include turn-by-turn instructions (default false)
    #[serde(default)]
    pub steps: bool,
    /// Geometry detail: "full", "simplified" or "false" (default "simplified")
    #[serde(default = "default_overview")]
    pub overview: String,
    /// Include per-segment annotations (default false)
    #[serde(default)]
    pub annotations: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "mcp", derive(schemars::JsonSchema))]
pub struct CommuteRequest {
    /// Home latitude (decimal degrees)
    pub home_latitude: f64,
    /// Home longitude (decimal degrees)
    pub home_longitude: f64,
    /// Workplace latitude (decimal degrees)
    pub work_latitude: f64,
    /// Workplace longitude (decimal degrees)
    pub work_longitude: f64,
    /// Modes to compare (default ["car", "foot", "bike"])
    #[serde(default = "default_commute_modes")]
    pub modes: Vec<String>,
    /// Optional departure time, "HH:MM"
    #[serde(default)]
    pub depart_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Direction {
    pub instruction: String,
    pub distance: f64,
    pub duration: f64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSummary {
    /// Metres.
    pub distance: f64,
    /// Seconds.
    pub duration: f64,
    pub mode: TravelMode,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteDirections {
    pub summary: RouteSummary,
    pub directions: Vec<Direction>,
    pub geometry: Option<Value>,
    pub waypoints: Vec<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommuteEndpoint {
    pub coordinates: Coordinate,
    pub address: String,
}

/// One mode's outcome; failed modes carry only `mode` and `error`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommuteOption {
    pub mode: TravelMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directions: Option<Vec<Direction>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommuteOption {
    fn failed(mode: TravelMode, error: String) -> Self {
        Self {
            mode,
            distance_km: None,
            duration_minutes: None,
            directions: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommuteAnalysis {
    pub home: CommuteEndpoint,
    pub work: CommuteEndpoint,
    pub commute_options: Vec<CommuteOption>,
    pub fastest_option: Option<TravelMode>,
    pub depart_at: Option<String>,
}

/// Parse a travel mode, substituting `car` (with a warning) for anything
/// outside the supported set.
pub fn resolve_mode(raw: &str, reporter: &dyn Reporter) -> TravelMode {
    TravelMode::parse(raw).unwrap_or_else(|| {
        reporter.warning(&format!("Invalid mode '{}'. Using 'car' instead.", raw));
        TravelMode::Car
    })
}

fn resolve_overview(raw: &str, reporter: &dyn Reporter) -> Overview {
    Overview::parse(raw).unwrap_or_else(|| {
        reporter.warning(&format!(
            "Invalid overview '{}'. Using 'simplified' instead.",
            raw
        ));
        Overview::Simplified
    })
}

/// Flatten every leg's steps into one instruction list.
fn extract_directions(route: &RouteCandidate) -> Vec<Direction> {
    route
        .legs
        .iter()
        .flat_map(|leg| leg.steps.iter())
        .map(|step| Direction {
            instruction: step.instruction(),
            distance: step.distance,
            duration: step.duration,
            name: step.name.clone(),
        })
        .collect()
}

fn first_route(raw: RawRoute) -> Result<(RouteCandidate, Vec<Value>)> {
    let RawRoute {
        code,
        routes,
        waypoints,
    } = raw;
    match routes.into_iter().next() {
        Some(route) => Ok((route, waypoints)),
        None => Err(Error::no_result(match code {
            Some(code) if code != "Ok" => format!("route ({})", code),
            _ => "route".to_string(),
        })),
    }
}

pub async fn get_route_directions(
    client: &OsmClient,
    request: RouteDirectionsRequest,
    reporter: &dyn Reporter,
) -> Result<RouteDirections> {
    let from = Coordinate::new(request.from_latitude, request.from_longitude)?;
    let to = Coordinate::new(request.to_latitude, request.to_longitude)?;
    let mode = resolve_mode(&request.mode, reporter);
    let options = RouteOptions {
        steps: request.steps,
        overview: resolve_overview(&request.overview, reporter),
        annotations: request.annotations,
    };

    reporter.info(&format!(
        "Calculating {} route from ({}, {}) to ({}, {})",
        mode, from.latitude, from.longitude, to.latitude, to.longitude
    ));

    let raw = client.route(from, to, mode, options).await?;
    let (route, waypoints) = first_route(raw)?;

    Ok(RouteDirections {
        summary: RouteSummary {
            distance: route.distance,
            duration: route.duration,
            mode,
        },
        directions: extract_directions(&route),
        geometry: route.geometry,
        waypoints,
    })
}

/// Ascending duration; failed options (no duration) sort last, ties keep
/// request order.
pub fn order_commute_options(options: &mut [CommuteOption]) {
    options.sort_by(|a, b| {
        let a = a.duration_minutes.unwrap_or(f64::INFINITY);
        let b = b.duration_minutes.unwrap_or(f64::INFINITY);
        a.partial_cmp(&b).unwrap_or(Ordering::Equal)
    });
}

fn validate_depart_at(depart_at: Option<&str>) -> Result<()> {
    if let Some(raw) = depart_at {
        NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(|_| {
            Error::invalid_argument("depart_at", format!("'{}' is not in HH:MM format", raw))
        })?;
    }
    Ok(())
}

pub async fn analyze_commute(
    client: &OsmClient,
    request: CommuteRequest,
    reporter: &dyn Reporter,
) -> Result<CommuteAnalysis> {
    let home = Coordinate::new(request.home_latitude, request.home_longitude)?;
    let work = Coordinate::new(request.work_latitude, request.work_longitude)?;
    validate_depart_at(request.depart_at.as_deref())?;
    if request.modes.is_empty() {
        return Err(Error::invalid_argument("modes", "at least one mode is required"));
    }

    let home_address = best_effort_address(client, home, reporter).await?;
    let work_address = best_effort_address(client, work, reporter).await?;

    let total = request.modes.len();
    let options = RouteOptions {
        steps: true,
        ..RouteOptions::default()
    };
    let mut commute_options = Vec::with_capacity(total);

    for (index, raw_mode) in request.modes.iter().enumerate() {
        reporter.progress(index, total);
        let mode = resolve_mode(raw_mode, reporter);
        reporter.info(&format!("Calculating {} route for commute analysis", mode));

        let outcome = client
            .route(home, work, mode, options)
            .await
            .and_then(first_route);
        match outcome {
            Ok((route, _)) => commute_options.push(CommuteOption {
                mode,
                distance_km: Some(round_to(route.distance / 1000.0, 2)),
                duration_minutes: Some(round_to(route.duration / 60.0, 1)),
                directions: Some(extract_directions(&route)),
                error: None,
            }),
            Err(e) if e.is_recoverable() => {
                reporter.warning(&format!("Error getting {} route: {}", mode, e));
                commute_options.push(CommuteOption::failed(mode, e.to_string()));
            }
            Err(e) => return Err(e),
        }
    }
    reporter.progress(total, total);

    order_commute_options(&mut commute_options);
    let fastest_option = commute_options
        .iter()
        .find(|o| o.error.is_none())
        .map(|o| o.mode);

    Ok(CommuteAnalysis {
        home: CommuteEndpoint {
            coordinates: home,
            address: home_address,
        },
        work: CommuteEndpoint {
            coordinates: work,
            address: work_address,
        },
        commute_options,
        fastest_option,
        depart_at: request.depart_at,
    })
}
