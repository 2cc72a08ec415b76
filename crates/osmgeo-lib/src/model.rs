//! Upstream request and response shapes.
//!
//! The geocoder payloads are open-ended and are passed through to callers, so
//! they stay as JSON maps. Routing and tag-query responses are decoded into
//! typed records that carry only the members the tools consume.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::geo::Coordinate;

/// One geocoder candidate, kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawPlace(pub Map<String, Value>);

impl RawPlace {
    /// Position of the candidate. The geocoder encodes `lat`/`lon` as strings.
    pub fn coordinate(&self) -> Option<Coordinate> {
        let latitude = parse_degrees(self.0.get("lat")?)?;
        let longitude = parse_degrees(self.0.get("lon")?)?;
        Coordinate::new(latitude, longitude).ok()
    }

    pub fn display_name(&self) -> Option<&str> {
        self.0.get("display_name").and_then(Value::as_str)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

fn parse_degrees(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// Element kind in the tag-query data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Node,
    Way,
    Relation,
    #[serde(other)]
    Other,
}

impl ElementType {
    pub fn as_str(self) -> &'static str {
        match self {
            ElementType::Node => "node",
            ElementType::Way => "way",
            ElementType::Relation => "relation",
            ElementType::Other => "other",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

/// A point, way or relation returned by the tag-query engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFeature {
    #[serde(rename = "type")]
    pub element_type: ElementType,
    pub id: i64,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    /// Provider-computed centroid for ways and relations.
    #[serde(default)]
    pub center: Option<LatLon>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<RawFeature>,
}

/// Key plus optional exact values; absent values match any value for the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFilter {
    pub key: String,
    pub values: Option<Vec<String>>,
}

impl TagFilter {
    pub fn any(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            values: None,
        }
    }

    pub fn one_of<I, S>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: key.into(),
            values: Some(values.into_iter().map(Into::into).collect()),
        }
    }

    /// Parse a `key=value` pair.
    pub fn parse_pair(pair: &str) -> Option<Self> {
        let (key, value) = pair.split_once('=')?;
        Some(Self::one_of(key.trim(), [value.trim()]))
    }

    /// Overpass QL attribute selectors, one per alternative.
    pub(crate) fn selectors(&self) -> Vec<String> {
        let key = escape_ql(&self.key);
        match &self.values {
            None => vec![format!("[\"{}\"]", key)],
            Some(values) if values.is_empty() => vec![format!("[\"{}\"]", key)],
            Some(values) => values
                .iter()
                .map(|v| format!("[\"{}\"=\"{}\"]", key, escape_ql(v)))
                .collect(),
        }
    }
}

fn escape_ql(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Closed set of routing profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    Car,
    Bike,
    Foot,
}

impl TravelMode {
    pub const ALL: [TravelMode; 3] = [TravelMode::Car, TravelMode::Bike, TravelMode::Foot];

    pub fn as_str(self) -> &'static str {
        match self {
            TravelMode::Car => "car",
            TravelMode::Bike => "bike",
            TravelMode::Foot => "foot",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        TravelMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == raw.trim().to_ascii_lowercase())
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Route geometry detail requested from the routing engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Overview {
    Full,
    #[default]
    Simplified,
    False,
}

impl Overview {
    pub fn as_str(self) -> &'static str {
        match self {
            Overview::Full => "full",
            Overview::Simplified => "simplified",
            Overview::False => "false",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "full" => Some(Overview::Full),
            "simplified" => Some(Overview::Simplified),
            "false" => Some(Overview::False),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RouteOptions {
    pub steps: bool,
    pub overview: Overview,
    pub annotations: bool,
}

/// Routing engine response.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRoute {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub routes: Vec<RouteCandidate>,
    #[serde(default)]
    pub waypoints: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteCandidate {
    #[serde(default)]
    pub distance: f64,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub geometry: Option<Value>,
    #[serde(default)]
    pub legs: Vec<RouteLeg>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteLeg {
    #[serde(default)]
    pub steps: Vec<RouteStep>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteStep {
    #[serde(default)]
    pub distance: f64,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub maneuver: Maneuver,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Maneuver {
    #[serde(default)]
    pub instruction: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub modifier: Option<String>,
}

impl RouteStep {
    /// Provider instruction, or one composed from the maneuver type/modifier.
    pub fn instruction(&self) -> String {
        if let Some(text) = self.maneuver.instruction.as_deref() {
            return text.to_string();
        }
        let mut parts: Vec<&str> = Vec::new();
        if let Some(kind) = self.maneuver.kind.as_deref() {
            parts.push(kind);
        }
        if let Some(modifier) = self.maneuver.modifier.as_deref() {
            parts.push(modifier);
        }
        let mut text = parts.join(" ");
        if !text.is_empty() && !self.name.is_empty() {
            text.push_str(" onto ");
            text.push_str(&self.name);
        }
        text
    }
}

/// Map tile styles offered by the tile resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileStyle {
    Standard,
    Cycle,
    Transport,
    Landscape,
    Outdoor,
}

impl TileStyle {
    /// Resolve a style name; unknown names fall back to [`TileStyle::Standard`].
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "cycle" => TileStyle::Cycle,
            "transport" => TileStyle::Transport,
            "landscape" => TileStyle::Landscape,
            "outdoor" => TileStyle::Outdoor,
            _ => TileStyle::Standard,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TileStyle::Standard => "standard",
            TileStyle::Cycle => "cycle",
            TileStyle::Transport => "transport",
            TileStyle::Landscape => "landscape",
            TileStyle::Outdoor => "outdoor",
        }
    }

    /// Path segment on the Thunderforest tile host; `None` for OSM tiles.
    pub(crate) fn thunderforest_path(self) -> Option<&'static str> {
        match self {
            TileStyle::Standard => None,
            TileStyle::Cycle => Some("cycle"),
            TileStyle::Transport => Some("transport"),
            TileStyle::Landscape => Some("landscape"),
            TileStyle::Outdoor => Some("outdoors"),
        }
    }
}

/// Raw tile bytes plus MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_place_parses_string_coordinates() {
        let place: RawPlace = serde_json::from_value(json!({
            "lat": "51.5007", "lon": "-0.1246", "display_name": "Big Ben"
        }))
        .unwrap();
        let coord = place.coordinate().unwrap();
        assert_eq!(coord.latitude, 51.5007);
        assert_eq!(coord.longitude, -0.1246);
        assert_eq!(place.display_name(), Some("Big Ben"));
    }

    #[test]
    fn raw_place_without_coordinates() {
        let place: RawPlace = serde_json::from_value(json!({"lat": "north"})).unwrap();
        assert!(place.coordinate().is_none());
    }

    #[test]
    fn feature_decodes_way_with_center() {
        let feature: RawFeature = serde_json::from_value(json!({
            "type": "way", "id": 42,
            "center": {"lat": 1.0, "lon": 2.0},
            "tags": {"amenity": "parking"}
        }))
        .unwrap();
        assert_eq!(feature.element_type, ElementType::Way);
        assert_eq!(feature.center, Some(LatLon { lat: 1.0, lon: 2.0 }));
        assert_eq!(feature.tags["amenity"], "parking");
        assert!(feature.lat.is_none());
    }

    #[test]
    fn unknown_element_type_is_tolerated() {
        let feature: RawFeature =
            serde_json::from_value(json!({"type": "area", "id": 7})).unwrap();
        assert_eq!(feature.element_type, ElementType::Other);
        assert!(feature.tags.is_empty());
    }

    #[test]
    fn tag_filter_selectors() {
        assert_eq!(TagFilter::any("shop").selectors(), vec!["[\"shop\"]"]);
        assert_eq!(
            TagFilter::one_of("amenity", ["cafe", "bar"]).selectors(),
            vec!["[\"amenity\"=\"cafe\"]", "[\"amenity\"=\"bar\"]"]
        );
        assert_eq!(
            TagFilter::one_of("name", ["say \"hi\""]).selectors(),
            vec!["[\"name\"=\"say \\\"hi\\\"\"]"]
        );
    }

    #[test]
    fn tag_filter_parses_pairs() {
        let filter = TagFilter::parse_pair("railway=station").unwrap();
        assert_eq!(filter.key, "railway");
        assert_eq!(filter.values, Some(vec!["station".to_string()]));
        assert!(TagFilter::parse_pair("railway").is_none());
    }

    #[test]
    fn travel_mode_parse() {
        assert_eq!(TravelMode::parse("bike"), Some(TravelMode::Bike));
        assert_eq!(TravelMode::parse(" FOOT "), Some(TravelMode::Foot));
        assert_eq!(TravelMode::parse("teleport"), None);
    }

    #[test]
    fn tile_style_falls_back_to_standard() {
        assert_eq!(TileStyle::from_name("cycle"), TileStyle::Cycle);
        assert_eq!(TileStyle::from_name("watercolor"), TileStyle::Standard);
        assert_eq!(TileStyle::Outdoor.thunderforest_path(), Some("outdoors"));
        assert_eq!(TileStyle::Standard.thunderforest_path(), None);
    }

    #[test]
    fn step_instruction_prefers_provider_text() {
        let step: RouteStep = serde_json::from_value(json!({
            "distance": 10.0, "duration": 2.0, "name": "Main St",
            "maneuver": {"instruction": "Head north", "type": "depart"}
        }))
        .unwrap();
        assert_eq!(step.instruction(), "Head north");
    }

    #[test]
    fn step_instruction_composed_from_maneuver() {
        let step: RouteStep = serde_json::from_value(json!({
            "distance": 10.0, "duration": 2.0, "name": "Main St",
            "maneuver": {"type": "turn", "modifier": "left"}
        }))
        .unwrap();
        assert_eq!(step.instruction(), "turn left onto Main St");
    }
}
