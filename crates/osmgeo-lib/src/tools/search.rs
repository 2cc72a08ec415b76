use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::client::OsmClient;
use crate::error::{Error, Result};
use crate::geo::BoundingBox;
use crate::model::TagFilter;
use crate::normalize::{
    matches_category, normalize_features, sort_by_distance, PlaceFeature, UNNAMED,
};
use crate::report::Reporter;
use crate::tools::search_area;

/// Categories searched when the caller names none.
pub const DEFAULT_NEARBY_CATEGORIES: [&str; 4] = ["amenity", "shop", "tourism", "leisure"];

fn default_nearby_radius() -> f64 {
    1000.0
}

fn default_limit() -> usize {
    20
}

#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "mcp", derive(schemars::JsonSchema))]
pub struct NearbyPlacesRequest {
    /// Centre latitude (decimal degrees)
    pub latitude: f64,
    /// Centre longitude (decimal degrees)
    pub longitude: f64,
    /// Search radius in metres (default 1000)
    #[serde(default = "default_nearby_radius")]
    pub radius: f64,
    /// Tag keys to search, e.g. ["amenity", "shop"] (default amenity, shop, tourism, leisure)
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    /// Maximum number of places before grouping (default 20)
    #[serde(default = "default_limit")]
    pub limit: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "mcp", derive(schemars::JsonSchema))]
pub struct SearchCategoryRequest {
    /// Tag key to search, e.g. "amenity" or "shop"
    pub category: String,
    /// Southern boundary (decimal degrees)
    pub min_latitude: f64,
    /// Western boundary (decimal degrees)
    pub min_longitude: f64,
    /// Northern boundary (decimal degrees)
    pub max_latitude: f64,
    /// Eastern boundary (decimal degrees)
    pub max_longitude: f64,
    /// Optional values to keep, e.g. ["restaurant", "cafe"]
    #[serde(default)]
    pub subcategories: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadiusQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub radius: f64,
}

/// category → subcategory (tag value) → places.
pub type GroupedPlaces = BTreeMap<String, BTreeMap<String, Vec<PlaceFeature>>>;

#[derive(Debug, Clone, Serialize)]
pub struct NearbyPlaces {
    pub query: RadiusQuery,
    pub categories: GroupedPlaces,
    pub total_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryQuery {
    pub category: String,
    pub subcategories: Option<Vec<String>>,
    pub bbox: BoundingBox,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryMatch {
    #[serde(flatten)]
    pub place: PlaceFeature,
    pub category: String,
    pub subcategory: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryResults {
    pub query: CategoryQuery,
    pub results: Vec<CategoryMatch>,
    pub count: usize,
}

/// Group places under every requested category key they carry.
pub fn group_by_category(places: &[PlaceFeature], categories: &[String]) -> GroupedPlaces {
    let mut grouped = GroupedPlaces::new();
    for place in places {
        for category in categories {
            if let Some(subcategory) = place.tag(category) {
                grouped
                    .entry(category.clone())
                    .or_default()
                    .entry(subcategory.to_string())
                    .or_default()
                    .push(place.clone());
            }
        }
    }
    grouped
}

/// Sum of leaf list lengths.
pub fn grouped_count(grouped: &GroupedPlaces) -> usize {
    grouped
        .values()
        .flat_map(|subs| subs.values())
        .map(Vec::len)
        .sum()
}

pub async fn find_nearby_places(
    client: &OsmClient,
    request: NearbyPlacesRequest,
    reporter: &dyn Reporter,
) -> Result<NearbyPlaces> {
    let (center, bbox) = search_area(request.latitude, request.longitude, request.radius)?;
    let categories: Vec<String> = match request.categories {
        Some(categories) if !categories.is_empty() => categories,
        _ => DEFAULT_NEARBY_CATEGORIES
            .iter()
            .map(|c| c.to_string())
            .collect(),
    };
    if let Some(blank) = categories.iter().find(|c| c.trim().is_empty()) {
        return Err(Error::invalid_argument(
            "categories",
            format!("'{}' is not a tag key", blank),
        ));
    }

    reporter.info(&format!(
        "Searching for places within {}m of ({}, {})",
        request.radius, center.latitude, center.longitude
    ));

    let filters: Vec<TagFilter> = categories.iter().map(TagFilter::any).collect();
    let raws = client.search_features(&bbox, &filters).await?;

    let mut places = normalize_features(&raws, UNNAMED, Some(center));
    sort_by_distance(&mut places);
    places.truncate(request.limit);

    let grouped = group_by_category(&places, &categories);
    let total_count = grouped_count(&grouped);
    Ok(NearbyPlaces {
        query: RadiusQuery {
            latitude: center.latitude,
            longitude: center.longitude,
            radius: request.radius,
        },
        categories: grouped,
        total_count,
    })
}

pub async fn search_category(
    client: &OsmClient,
    request: SearchCategoryRequest,
    reporter: &dyn Reporter,
) -> Result<CategoryResults> {
    let category = request.category.trim().to_string();
    if category.is_empty() {
        return Err(Error::invalid_argument("category", "cannot be empty"));
    }
    let bbox = BoundingBox::new(
        request.min_latitude,
        request.min_longitude,
        request.max_latitude,
        request.max_longitude,
    )?;
    let subcategories = request.subcategories.filter(|s| !s.is_empty());

    reporter.info(&format!("Searching for {} in bounding box", category));
    let raws = client
        .search_features_by_tag(&bbox, &category, subcategories.as_deref())
        .await?;

    let results: Vec<CategoryMatch> = normalize_features(&raws, UNNAMED, None)
        .into_iter()
        .filter(|place| matches_category(&place.tags, &category, subcategories.as_deref()))
        .map(|place| {
            let subcategory = place.tag_or(&category, "").to_string();
            CategoryMatch {
                place,
                category: category.clone(),
                subcategory,
            }
        })
        .collect();

    Ok(CategoryResults {
        count: results.len(),
        query: CategoryQuery {
            category,
            subcategories,
            bbox,
        },
        results,
    })
}
