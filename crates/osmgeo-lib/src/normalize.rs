//! Uniform place records built from raw tag-query elements, plus the local
//! filters applied after a broad upstream query.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::geo::{haversine_distance_meters, round_to, Coordinate};
use crate::model::{ElementType, RawFeature};

pub const UNNAMED: &str = "Unnamed";

const SOCKET_PREFIX: &str = "socket:";

/// How a feature's position was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    /// A node with its own latitude/longitude.
    Point,
    /// A way or relation positioned at its provider centroid.
    Centroid,
}

/// Normalized place record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceFeature {
    pub id: i64,
    #[serde(rename = "type")]
    pub element_type: ElementType,
    pub kind: FeatureKind,
    pub name: String,
    pub coordinates: Coordinate,
    /// Metres from the query centre, rounded to 0.1 m.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    pub tags: BTreeMap<String, String>,
}

impl PlaceFeature {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn tag_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.tag(key).unwrap_or(default)
    }
}

/// Position of a raw element: nodes use their own coordinates, ways and
/// relations the provider centroid. Elements with neither yield `None`.
pub fn extract_coordinates(raw: &RawFeature) -> Option<(Coordinate, FeatureKind)> {
    if let (Some(lat), Some(lon)) = (raw.lat, raw.lon) {
        if let Ok(coord) = Coordinate::new(lat, lon) {
            return Some((coord, FeatureKind::Point));
        }
    }
    let center = raw.center?;
    let coord = Coordinate::new(center.lat, center.lon).ok()?;
    Some((coord, FeatureKind::Centroid))
}

/// Build a place record, or `None` when the element has no usable position.
pub fn to_place_feature(
    raw: &RawFeature,
    default_name: &str,
    center: Option<Coordinate>,
) -> Option<PlaceFeature> {
    let (coordinates, kind) = extract_coordinates(raw)?;
    let name = raw
        .tags
        .get("name")
        .cloned()
        .unwrap_or_else(|| default_name.to_string());
    let distance = center.map(|c| round_to(haversine_distance_meters(c, coordinates), 1));

    Some(PlaceFeature {
        id: raw.id,
        element_type: raw.element_type,
        kind,
        name,
        coordinates,
        distance,
        tags: raw.tags.clone(),
    })
}

/// Normalize a batch, dropping elements without a position and keeping
/// upstream order.
pub fn normalize_features(
    raws: &[RawFeature],
    default_name: &str,
    center: Option<Coordinate>,
) -> Vec<PlaceFeature> {
    raws.iter()
        .filter_map(|raw| to_place_feature(raw, default_name, center))
        .collect()
}

/// Stable ascending sort by distance; features without a distance go last.
pub fn sort_by_distance(features: &mut [PlaceFeature]) {
    features.sort_by(|a, b| match (a.distance, b.distance) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// Feature has `key`, and when `subcategories` is given its value is one of them.
pub fn matches_category(
    tags: &BTreeMap<String, String>,
    key: &str,
    subcategories: Option<&[String]>,
) -> bool {
    match (tags.get(key), subcategories) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(_), Some([])) => true,
        (Some(value), Some(allowed)) => allowed.iter().any(|s| s == value),
    }
}

/// One charging connector advertised through a `socket:<type>` tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Connector {
    #[serde(rename = "type")]
    pub connector_type: String,
    pub count: u32,
}

/// Connectors from `socket:<type>` keys. Sub-keys such as
/// `socket:type2:output` describe an existing connector and are skipped.
pub fn connectors(tags: &BTreeMap<String, String>) -> Vec<Connector> {
    tags.iter()
        .filter_map(|(key, value)| {
            let connector_type = key.strip_prefix(SOCKET_PREFIX)?;
            if connector_type.is_empty() || connector_type.contains(':') {
                return None;
            }
            let count = value
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|_| value.trim().chars().all(|c| c.is_ascii_digit()))
                .unwrap_or(1);
            Some(Connector {
                connector_type: connector_type.to_string(),
                count,
            })
        })
        .collect()
}

pub fn has_any_connector(connectors: &[Connector], wanted: &[String]) -> bool {
    connectors
        .iter()
        .any(|c| wanted.iter().any(|w| *w == c.connector_type))
}

/// Numeric `maxpower` tag, if present and parseable.
pub fn max_power(tags: &BTreeMap<String, String>) -> Option<f64> {
    tags.get("maxpower")?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite())
}

/// Missing or non-numeric power fails any threshold.
pub fn meets_min_power(tags: &BTreeMap<String, String>, min_power: f64) -> bool {
    max_power(tags).is_some_and(|p| p >= min_power)
}

pub fn matches_parking_type(tags: &BTreeMap<String, String>, parking_type: &str) -> bool {
    tags.get("parking").map(String::as_str) == Some(parking_type)
}

/// Street address assembled from `addr:*` tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Address {
    pub street: String,
    pub housenumber: String,
    pub city: String,
    pub postcode: String,
}

impl Address {
    pub fn from_tags(tags: &BTreeMap<String, String>) -> Self {
        let get = |key: &str| tags.get(key).cloned().unwrap_or_default();
        Self {
            street: get("addr:street"),
            housenumber: get("addr:housenumber"),
            city: get("addr:city"),
            postcode: get("addr:postcode"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LatLon;

    fn tags(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn node(id: i64, lat: f64, lon: f64, pairs: &[(&str, &str)]) -> RawFeature {
        RawFeature {
            element_type: ElementType::Node,
            id,
            lat: Some(lat),
            lon: Some(lon),
            center: None,
            tags: tags(pairs),
        }
    }

    fn way(id: i64, center: Option<LatLon>) -> RawFeature {
        RawFeature {
            element_type: ElementType::Way,
            id,
            lat: None,
            lon: None,
            center,
            tags: BTreeMap::new(),
        }
    }

    #[test]
    fn node_uses_own_coordinates() {
        let (coord, kind) = extract_coordinates(&node(1, 10.0, 20.0, &[])).unwrap();
        assert_eq!(coord, Coordinate::new(10.0, 20.0).unwrap());
        assert_eq!(kind, FeatureKind::Point);
    }

    #[test]
    fn way_uses_center() {
        let raw = way(2, Some(LatLon { lat: 5.0, lon: 6.0 }));
        let (coord, kind) = extract_coordinates(&raw).unwrap();
        assert_eq!(coord.latitude, 5.0);
        assert_eq!(kind, FeatureKind::Centroid);
    }

    #[test]
    fn features_without_position_are_dropped() {
        let raws = vec![
            node(1, 10.0, 20.0, &[("name", "Cafe")]),
            way(2, None),
            way(3, Some(LatLon { lat: 10.001, lon: 20.0 })),
        ];
        let features = normalize_features(&raws, UNNAMED, None);
        assert_eq!(features.iter().map(|f| f.id).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(features[0].name, "Cafe");
        assert_eq!(features[1].name, "Unnamed");
        assert!(features.iter().all(|f| f.distance.is_none()));
    }

    #[test]
    fn distance_populated_when_center_known() {
        let center = Coordinate::new(0.0, 0.0).unwrap();
        let feature = to_place_feature(&node(1, 0.0, 1.0, &[]), "Unnamed Venue", Some(center)).unwrap();
        let distance = feature.distance.unwrap();
        assert!((distance - 111_195.0).abs() < 50.0);
        assert_eq!(feature.name, "Unnamed Venue");
    }

    #[test]
    fn sort_is_stable_and_puts_unknown_last() {
        let center = Coordinate::new(0.0, 0.0).unwrap();
        let mut features = normalize_features(
            &[
                node(1, 0.0, 0.02, &[]),
                node(2, 0.0, 0.01, &[]),
                node(3, 0.0, -0.01, &[]),
            ],
            UNNAMED,
            Some(center),
        );
        let mut unknown = to_place_feature(&node(4, 0.0, 0.0, &[]), UNNAMED, None).unwrap();
        unknown.distance = None;
        features.insert(0, unknown);

        sort_by_distance(&mut features);
        assert_eq!(
            features.iter().map(|f| f.id).collect::<Vec<_>>(),
            vec![2, 3, 1, 4]
        );
    }

    #[test]
    fn category_match() {
        let t = tags(&[("amenity", "cafe")]);
        assert!(matches_category(&t, "amenity", None));
        assert!(matches_category(&t, "amenity", Some(&["cafe".to_string()])));
        assert!(!matches_category(&t, "amenity", Some(&["bar".to_string()])));
        assert!(!matches_category(&t, "shop", None));
    }

    #[test]
    fn connectors_from_socket_keys() {
        let t = tags(&[
            ("socket:type2", "4"),
            ("socket:type2:output", "22 kW"),
            ("socket:chademo", "yes"),
            ("amenity", "charging_station"),
        ]);
        let found = connectors(&t);
        assert_eq!(
            found,
            vec![
                Connector {
                    connector_type: "chademo".into(),
                    count: 1
                },
                Connector {
                    connector_type: "type2".into(),
                    count: 4
                },
            ]
        );
        assert!(has_any_connector(&found, &["type2".to_string()]));
        assert!(!has_any_connector(&found, &["tesla".to_string()]));
    }

    #[test]
    fn power_threshold() {
        assert!(meets_min_power(&tags(&[("maxpower", "50")]), 22.0));
        assert!(!meets_min_power(&tags(&[("maxpower", "11")]), 22.0));
        assert!(!meets_min_power(&tags(&[("maxpower", "50 kW")]), 22.0));
        assert!(!meets_min_power(&tags(&[]), 0.0));
    }

    #[test]
    fn parking_type_exact_match() {
        let t = tags(&[("parking", "underground")]);
        assert!(matches_parking_type(&t, "underground"));
        assert!(!matches_parking_type(&t, "surface"));
        assert!(!matches_parking_type(&tags(&[]), "surface"));
    }

    #[test]
    fn address_from_tags_defaults_to_empty() {
        let address = Address::from_tags(&tags(&[("addr:city", "Kassel")]));
        assert_eq!(address.city, "Kassel");
        assert_eq!(address.street, "");
    }
}
