//! Multi-category aggregation: area profiles and neighbourhood scoring.
//!
//! Both workflows walk a fixed category list one upstream query at a time,
//! reporting `(index, total)` progress before each query and `(total, total)`
//! at the end. An upstream failure only degrades its own category.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::client::OsmClient;
use crate::error::Result;
use crate::geo::{haversine_distance_meters, round_to, Coordinate};
use crate::model::TagFilter;
use crate::normalize::{normalize_features, sort_by_distance, PlaceFeature, UNNAMED};
use crate::report::Reporter;
use crate::tools::geocoding::best_effort_address;
use crate::tools::search::RadiusQuery;
use crate::tools::{search_area, timestamp};

/// Tag keys profiled by [`explore_area`], in query order.
pub const EXPLORE_CATEGORIES: [&str; 7] = [
    "amenity",
    "shop",
    "tourism",
    "leisure",
    "natural",
    "historic",
    "public_transport",
];

/// Distance a feature must be within to count towards walkability, in metres.
pub const WALKING_DISTANCE_METERS: f64 = 500.0;

/// Cap on the walkability score.
pub const MAX_WALKABILITY: usize = 10;

/// Nearest features kept per neighbourhood category.
const FEATURES_PER_CATEGORY: usize = 10;

/// A scored neighbourhood category: a name plus the `key=value` pairs it unions.
#[derive(Debug, Clone, Copy)]
pub struct NeighborhoodCategory {
    pub name: &'static str,
    pub tags: &'static [(&'static str, &'static [&'static str])],
}

impl NeighborhoodCategory {
    fn filters(&self) -> Vec<TagFilter> {
        self.tags
            .iter()
            .map(|(key, values)| TagFilter::one_of(*key, values.iter().copied()))
            .collect()
    }
}

pub const NEIGHBORHOOD_CATEGORIES: [NeighborhoodCategory; 10] = [
    NeighborhoodCategory {
        name: "groceries",
        tags: &[("shop", &["supermarket", "convenience", "grocery"])],
    },
    NeighborhoodCategory {
        name: "restaurants",
        tags: &[("amenity", &["restaurant", "cafe", "fast_food"])],
    },
    NeighborhoodCategory {
        name: "healthcare",
        tags: &[("amenity", &["hospital", "doctors", "pharmacy"])],
    },
    NeighborhoodCategory {
        name: "education",
        tags: &[("amenity", &["school", "kindergarten", "university"])],
    },
    NeighborhoodCategory {
        name: "public_transport",
        tags: &[
            ("public_transport", &["stop_position"]),
            ("railway", &["station"]),
            ("amenity", &["bus_station"]),
        ],
    },
    NeighborhoodCategory {
        name: "parks",
        tags: &[("leisure", &["park", "garden", "playground"])],
    },
    NeighborhoodCategory {
        name: "sports",
        tags: &[("leisure", &["sports_centre", "fitness_centre", "swimming_pool"])],
    },
    NeighborhoodCategory {
        name: "entertainment",
        tags: &[("amenity", &["theatre", "cinema", "arts_centre"])],
    },
    NeighborhoodCategory {
        name: "shopping",
        tags: &[("shop", &["mall", "department_store", "clothes"])],
    },
    NeighborhoodCategory {
        name: "services",
        tags: &[("amenity", &["bank", "post_office", "atm"])],
    },
];

fn default_explore_radius() -> f64 {
    500.0
}

fn default_neighborhood_radius() -> f64 {
    1000.0
}

#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "mcp", derive(schemars::JsonSchema))]
pub struct ExploreAreaRequest {
    /// Centre latitude (decimal degrees)
    pub latitude: f64,
    /// Centre longitude (decimal degrees)
    pub longitude: f64,
    /// Search radius in metres (default 500)
    #[serde(default = "default_explore_radius")]
    pub radius: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "mcp", derive(schemars::JsonSchema))]
pub struct NeighborhoodRequest {
    /// Centre latitude (decimal degrees)
    pub latitude: f64,
    /// Centre longitude (decimal degrees)
    pub longitude: f64,
    /// Analysis radius in metres (default 1000)
    #[serde(default = "default_neighborhood_radius")]
    pub radius: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AreaProfile {
    pub query: RadiusQuery,
    /// Provider reverse-geocode object, or `{"error": ...}` when unavailable.
    pub address: Value,
    /// category → subcategory → features.
    pub categories: BTreeMap<String, BTreeMap<String, Vec<PlaceFeature>>>,
    pub total_features: usize,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistanceMetrics {
    pub total_count: usize,
    pub avg_distance: Option<f64>,
    pub min_distance: Option<f64>,
}

/// Per-category outcome; a failed category carries only `error`.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CategoryReport {
    Found {
        count: usize,
        features: Vec<PlaceFeature>,
        metrics: DistanceMetrics,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct NeighborhoodLocation {
    pub coordinates: Coordinate,
    pub address: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NeighborhoodScores {
    pub overall: f64,
    pub walkability: usize,
    pub categories: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NeighborhoodAnalysis {
    pub location: NeighborhoodLocation,
    pub scores: NeighborhoodScores,
    pub categories: BTreeMap<String, CategoryReport>,
    pub analysis_radius: f64,
    pub timestamp: String,
}

/// Score in `[0, 10]`: up to 5 points for having five or more features and
/// up to 5 for how close the nearest one is relative to `radius`.
pub fn category_score(count: usize, min_distance: f64, radius: f64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    let count_score = (count as f64 / 5.0).min(1.0) * 5.0;
    let ratio = if radius > 0.0 {
        (min_distance.max(0.0) / radius).min(1.0)
    } else {
        1.0
    };
    count_score + (5.0 - ratio * 5.0)
}

/// `min(walkable features + categories with at least one, 10)`.
pub fn walkability_score<'a, I>(categories: I) -> usize
where
    I: IntoIterator<Item = &'a [PlaceFeature]>,
{
    let mut features = 0;
    let mut categories_with_any = 0;
    for places in categories {
        let walkable = places
            .iter()
            .filter(|p| p.distance.is_some_and(|d| d <= WALKING_DISTANCE_METERS))
            .count();
        if walkable > 0 {
            features += walkable;
            categories_with_any += 1;
        }
    }
    (features + categories_with_any).min(MAX_WALKABILITY)
}

/// Metrics over unrounded distances; rounding applies to the reported values only.
fn distance_metrics(distances: &[f64]) -> DistanceMetrics {
    let (avg, min) = if distances.is_empty() {
        (None, None)
    } else {
        let sum: f64 = distances.iter().sum();
        (Some(sum / distances.len() as f64), nearest(distances))
    };
    DistanceMetrics {
        total_count: distances.len(),
        avg_distance: avg.map(|d| round_to(d, 1)),
        min_distance: min.map(|d| round_to(d, 1)),
    }
}

fn nearest(distances: &[f64]) -> Option<f64> {
    distances.iter().copied().reduce(f64::min)
}

/// [`category_score`] from unrounded distances.
fn score_distances(distances: &[f64], radius: f64) -> f64 {
    nearest(distances)
        .map(|min| category_score(distances.len(), min, radius))
        .unwrap_or(0.0)
}

pub async fn explore_area(
    client: &OsmClient,
    request: ExploreAreaRequest,
    reporter: &dyn Reporter,
) -> Result<AreaProfile> {
    let (center, bbox) = search_area(request.latitude, request.longitude, request.radius)?;
    let total = EXPLORE_CATEGORIES.len();
    let mut categories = BTreeMap::new();

    for (index, category) in EXPLORE_CATEGORIES.iter().enumerate() {
        reporter.progress(index, total);
        reporter.info(&format!("Exploring {} features...", category));

        let mut grouped: BTreeMap<String, Vec<PlaceFeature>> = BTreeMap::new();
        match client.search_features_by_tag(&bbox, category, None).await {
            Ok(raws) => {
                for place in normalize_features(&raws, UNNAMED, Some(center)) {
                    if let Some(subcategory) = place.tag(category) {
                        grouped
                            .entry(subcategory.to_string())
                            .or_default()
                            .push(place);
                    }
                }
            }
            Err(e) if e.is_upstream() => {
                reporter.warning(&format!("Error fetching {} features: {}", category, e));
            }
            Err(e) => return Err(e),
        }
        categories.insert(category.to_string(), grouped);
    }

    let address = match client.reverse_geocode(center).await {
        Ok(place) => place.into_value(),
        Err(e) if e.is_recoverable() => {
            reporter.warning(&format!("Could not retrieve address information: {}", e));
            json!({"error": "Could not retrieve address information"})
        }
        Err(e) => return Err(e),
    };
    reporter.progress(total, total);

    let total_features = categories
        .values()
        .flat_map(|subs| subs.values())
        .map(Vec::len)
        .sum();

    Ok(AreaProfile {
        query: RadiusQuery {
            latitude: center.latitude,
            longitude: center.longitude,
            radius: request.radius,
        },
        address,
        categories,
        total_features,
        timestamp: timestamp(),
    })
}

pub async fn analyze_neighborhood(
    client: &OsmClient,
    request: NeighborhoodRequest,
    reporter: &dyn Reporter,
) -> Result<NeighborhoodAnalysis> {
    let (center, bbox) = search_area(request.latitude, request.longitude, request.radius)?;
    let address = best_effort_address(client, center, reporter).await?;

    let total = NEIGHBORHOOD_CATEGORIES.len();
    let mut reports = BTreeMap::new();
    let mut scores = BTreeMap::new();
    let mut nearby: Vec<Vec<PlaceFeature>> = Vec::with_capacity(total);

    for (index, category) in NEIGHBORHOOD_CATEGORIES.iter().enumerate() {
        reporter.progress(index, total);
        reporter.info(&format!("Analyzing {} in neighborhood...", category.name));

        match client.search_features(&bbox, &category.filters()).await {
            Ok(raws) => {
                let mut places = normalize_features(&raws, UNNAMED, Some(center));
                sort_by_distance(&mut places);

                let distances: Vec<f64> = places
                    .iter()
                    .map(|p| haversine_distance_meters(center, p.coordinates))
                    .collect();
                let metrics = distance_metrics(&distances);
                let score = score_distances(&distances, request.radius);
                scores.insert(category.name.to_string(), score);

                let features = places.iter().take(FEATURES_PER_CATEGORY).cloned().collect();
                reports.insert(
                    category.name.to_string(),
                    CategoryReport::Found {
                        count: places.len(),
                        features,
                        metrics,
                    },
                );
                nearby.push(places);
            }
            Err(e) if e.is_upstream() => {
                reporter.warning(&format!("Error analyzing {}: {}", category.name, e));
                scores.insert(category.name.to_string(), 0.0);
                reports.insert(
                    category.name.to_string(),
                    CategoryReport::Failed {
                        error: e.to_string(),
                    },
                );
            }
            Err(e) => return Err(e),
        }
    }
    reporter.progress(total, total);

    let overall = if scores.is_empty() {
        0.0
    } else {
        scores.values().sum::<f64>() / scores.len() as f64
    };
    let walkability = walkability_score(nearby.iter().map(Vec::as_slice));

    Ok(NeighborhoodAnalysis {
        location: NeighborhoodLocation {
            coordinates: center,
            address,
        },
        scores: NeighborhoodScores {
            overall: round_to(overall, 1),
            walkability,
            categories: scores
                .into_iter()
                .map(|(name, score)| (name, round_to(score, 1)))
                .collect(),
        },
        categories: reports,
        analysis_radius: request.radius,
        timestamp: timestamp(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ElementType;
    use crate::normalize::FeatureKind;

    fn at(distance: f64) -> PlaceFeature {
        PlaceFeature {
            id: 1,
            element_type: ElementType::Node,
            kind: FeatureKind::Point,
            name: UNNAMED.to_string(),
            coordinates: Coordinate::new(0.0, 0.0).unwrap(),
            distance: Some(distance),
            tags: BTreeMap::new(),
        }
    }

    #[test]
    fn score_is_zero_without_features() {
        assert_eq!(category_score(0, 0.0, 1000.0), 0.0);
        assert_eq!(category_score(0, 10.0, 1000.0), 0.0);
    }

    #[test]
    fn score_grows_with_count() {
        let mut previous = 0.0;
        for count in 0..12 {
            let score = category_score(count, 400.0, 1000.0);
            assert!(score >= previous, "count {} dropped the score", count);
            previous = score;
        }
    }

    #[test]
    fn score_grows_as_nearest_gets_closer() {
        let mut previous = 0.0;
        for min in [2000.0, 1000.0, 750.0, 500.0, 100.0, 0.0] {
            let score = category_score(3, min, 1000.0);
            assert!(score >= previous, "min distance {} dropped the score", min);
            previous = score;
        }
    }

    #[test]
    fn score_is_bounded() {
        for count in [1, 5, 50] {
            for min in [0.0, 10.0, 999.0, 5000.0] {
                let score = category_score(count, min, 1000.0);
                assert!((0.0..=10.0).contains(&score));
            }
        }
        assert_eq!(category_score(5, 0.0, 1000.0), 10.0);
        assert_eq!(category_score(5, 1000.0, 1000.0), 5.0);
    }

    #[test]
    fn walkability_counts_features_and_categories() {
        let groceries = vec![at(100.0), at(600.0)];
        let parks = vec![at(500.0), at(20.0)];
        let none: Vec<PlaceFeature> = vec![at(900.0)];
        let score = walkability_score([groceries.as_slice(), parks.as_slice(), none.as_slice()]);
        assert_eq!(score, 3 + 2);
    }

    #[test]
    fn walkability_is_capped() {
        let many: Vec<PlaceFeature> = (0..20).map(|_| at(10.0)).collect();
        assert_eq!(walkability_score([many.as_slice()]), MAX_WALKABILITY);
    }

    #[test]
    fn metrics_round_to_one_decimal() {
        let metrics = distance_metrics(&[100.04, 200.16]);
        assert_eq!(metrics.total_count, 2);
        assert_eq!(metrics.min_distance, Some(100.0));
        assert_eq!(metrics.avg_distance, Some(150.1));

        let empty = distance_metrics(&[]);
        assert_eq!(empty.avg_distance, None);
    }

    #[test]
    fn score_uses_unrounded_nearest_distance() {
        let score = score_distances(&[1200.0, 949.96], 1000.0);
        assert_eq!(score, category_score(2, 949.96, 1000.0));
        assert_ne!(score, category_score(2, 950.0, 1000.0));
        assert_eq!(score_distances(&[], 1000.0), 0.0);
    }

    #[test]
    fn public_transport_unions_three_keys() {
        let category = NEIGHBORHOOD_CATEGORIES
            .iter()
            .find(|c| c.name == "public_transport")
            .unwrap();
        let keys: Vec<_> = category.filters().into_iter().map(|f| f.key).collect();
        assert_eq!(keys, vec!["public_transport", "railway", "amenity"]);
    }

    #[test]
    fn failed_category_serializes_as_error_only() {
        let report = CategoryReport::Failed {
            error: "overpass request failed".into(),
        };
        assert_eq!(
            serde_json::to_value(report).unwrap(),
            json!({"error": "overpass request failed"})
        );
    }
}
