//! HTTP client for the geocoder, routing engine, tag-query engine and tile
//! servers.
//!
//! One [`OsmClient`] owns a single pooled `reqwest::Client` for the lifetime of
//! the process. Every operation is one network round trip with no retry; a
//! non-success status or transport failure surfaces as [`Error::Upstream`].
//! Calling any operation before [`OsmClient::connect`] or after
//! [`OsmClient::disconnect`] fails with [`Error::NotConnected`].

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::OsmConfig;
use crate::error::{Error, Result};
use crate::geo::{BoundingBox, Coordinate};
use crate::model::{
    OverpassResponse, RawFeature, RawPlace, RawRoute, RouteOptions, TagFilter, Tile, TileStyle,
    TravelMode,
};

const NOMINATIM: &str = "nominatim";
const OSRM: &str = "osrm";
const OVERPASS: &str = "overpass";
const TILES: &str = "tile server";

/// Candidates requested from the geocoder for free-text searches.
pub const GEOCODE_LIMIT: usize = 5;

/// Server-side time limit embedded in every tag-query program, in seconds.
const OVERPASS_TIMEOUT_SECS: u64 = 25;

/// Element types included in every tag-query union.
const ELEMENT_TYPES: [&str; 3] = ["node", "way", "relation"];

/// Longest upstream error body echoed back in an error message.
const ERROR_BODY_LIMIT: usize = 200;

pub struct OsmClient {
    config: OsmConfig,
    session: RwLock<Option<Client>>,
}

impl OsmClient {
    /// Create a disconnected client.
    pub fn new(config: OsmConfig) -> Self {
        Self {
            config,
            session: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &OsmConfig {
        &self.config
    }

    /// Open the HTTP session. Calling this twice replaces the session.
    pub async fn connect(&self) -> Result<()> {
        let client = Client::builder()
            .user_agent(self.config.user_agent.clone())
            .timeout(self.config.timeout)
            .build()
            .map_err(|e| Error::upstream("http client", None, e.to_string()))?;
        *self.session.write().await = Some(client);
        info!(
            "OSM client connected (user agent {:?}, timeout {:?})",
            self.config.user_agent, self.config.timeout
        );
        Ok(())
    }

    /// Drop the HTTP session. Subsequent calls fail with `NotConnected`.
    pub async fn disconnect(&self) {
        if self.session.write().await.take().is_some() {
            info!("OSM client disconnected");
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.session.read().await.is_some()
    }

    async fn session(&self) -> Result<Client> {
        self.session.read().await.clone().ok_or(Error::NotConnected)
    }

    /// Free-text search; candidates keep the provider's ranking.
    pub async fn geocode(&self, query: &str) -> Result<Vec<RawPlace>> {
        let value = self.search_place_raw(query, GEOCODE_LIMIT).await?;
        serde_json::from_value(value).map_err(|e| {
            Error::upstream(NOMINATIM, None, format!("unexpected search response: {}", e))
        })
    }

    /// Free-text search returning the provider payload untouched.
    pub async fn search_place_raw(&self, query: &str, limit: usize) -> Result<Value> {
        let session = self.session().await?;
        let url = format!("{}/search", self.config.nominatim_url.trim_end_matches('/'));
        debug!("geocoding {:?} via {}", query, url);

        let response = session
            .get(&url)
            .query(&[
                ("q", query.to_string()),
                ("format", "json".to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await
            .map_err(|e| Error::from_http(NOMINATIM, e))?;
        let response = ensure_success(NOMINATIM, response).await?;
        response
            .json::<Value>()
            .await
            .map_err(|e| Error::from_http(NOMINATIM, e))
    }

    /// Nearest addressable place to `coord`.
    pub async fn reverse_geocode(&self, coord: Coordinate) -> Result<RawPlace> {
        let session = self.session().await?;
        let url = format!("{}/reverse", self.config.nominatim_url.trim_end_matches('/'));
        debug!(
            "reverse geocoding ({}, {}) via {}",
            coord.latitude, coord.longitude, url
        );

        let response = session
            .get(&url)
            .query(&[
                ("lat", coord.latitude.to_string()),
                ("lon", coord.longitude.to_string()),
                ("format", "json".to_string()),
            ])
            .send()
            .await
            .map_err(|e| Error::from_http(NOMINATIM, e))?;
        let response = ensure_success(NOMINATIM, response).await?;
        let place: RawPlace = response
            .json()
            .await
            .map_err(|e| Error::from_http(NOMINATIM, e))?;

        if place.0.contains_key("error") || place.0.is_empty() {
            return Err(Error::no_result(format!(
                "address at ({}, {})",
                coord.latitude, coord.longitude
            )));
        }
        Ok(place)
    }

    /// Route between two points for one travel mode.
    pub async fn route(
        &self,
        from: Coordinate,
        to: Coordinate,
        mode: TravelMode,
        options: RouteOptions,
    ) -> Result<RawRoute> {
        let session = self.session().await?;
        let url = format!(
            "{}/route/v1/{}/{},{};{},{}",
            self.config.osrm_url.trim_end_matches('/'),
            mode,
            from.longitude,
            from.latitude,
            to.longitude,
            to.latitude
        );
        debug!("requesting {} route via {}", mode, url);

        let response = session
            .get(&url)
            .query(&[
                ("overview", options.overview.as_str()),
                ("geometries", "geojson"),
                ("steps", bool_param(options.steps)),
                ("annotations", bool_param(options.annotations)),
            ])
            .send()
            .await
            .map_err(|e| Error::from_http(OSRM, e))?;
        let response = ensure_success(OSRM, response).await?;
        response.json().await.map_err(|e| Error::from_http(OSRM, e))
    }

    /// Features inside `bbox` matching any of `filters`.
    pub async fn search_features(
        &self,
        bbox: &BoundingBox,
        filters: &[TagFilter],
    ) -> Result<Vec<RawFeature>> {
        let query = build_overpass_query(bbox, filters)?;
        let session = self.session().await?;
        debug!("overpass query:\n{}", query);

        let response = session
            .post(&self.config.overpass_url)
            .body(query)
            .send()
            .await
            .map_err(|e| Error::from_http(OVERPASS, e))?;
        let response = ensure_success(OVERPASS, response).await?;
        let body: OverpassResponse = response
            .json()
            .await
            .map_err(|e| Error::from_http(OVERPASS, e))?;
        debug!("overpass returned {} elements", body.elements.len());
        Ok(body.elements)
    }

    /// Features carrying `tag_key`, optionally restricted to exact `tag_values`.
    pub async fn search_features_by_tag(
        &self,
        bbox: &BoundingBox,
        tag_key: &str,
        tag_values: Option<&[String]>,
    ) -> Result<Vec<RawFeature>> {
        let filter = match tag_values {
            Some(values) if !values.is_empty() => TagFilter::one_of(tag_key, values.iter().cloned()),
            _ => TagFilter::any(tag_key),
        };
        self.search_features(bbox, std::slice::from_ref(&filter))
            .await
    }

    /// Fetch one map tile; the bytes are passed through unchanged.
    pub async fn fetch_tile(&self, style: TileStyle, z: u32, x: u32, y: u32) -> Result<Tile> {
        let session = self.session().await?;
        let url = match style.thunderforest_path() {
            None => format!(
                "{}/{}/{}/{}.png",
                self.config.tile_url.trim_end_matches('/'),
                z,
                x,
                y
            ),
            Some(path) => format!(
                "{}/{}/{}/{}/{}.png",
                self.config.thunderforest_url.trim_end_matches('/'),
                path,
                z,
                x,
                y
            ),
        };
        debug!("fetching {} tile {}", style.as_str(), url);

        let mut request = session.get(&url);
        if let (Some(key), Some(_)) = (&self.config.thunderforest_api_key, style.thunderforest_path())
        {
            request = request.query(&[("apikey", key)]);
        }
        let response = request
            .send()
            .await
            .map_err(|e| Error::from_http(TILES, e))?;
        let response = ensure_success(TILES, response).await?;

        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| v.starts_with("image/"))
            .unwrap_or("image/png")
            .to_string();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::from_http(TILES, e))?;
        Ok(Tile {
            bytes: bytes.to_vec(),
            mime_type,
        })
    }
}

/// Build the tag-query program for a union of `filters` inside `bbox`.
///
/// Every filter alternative is queried for nodes, ways and relations, and the
/// output asks for centroids so non-point features carry a position.
pub fn build_overpass_query(bbox: &BoundingBox, filters: &[TagFilter]) -> Result<String> {
    if filters.is_empty() {
        return Err(Error::invalid_argument(
            "filters",
            "at least one tag filter is required",
        ));
    }
    let area = bbox.to_overpass();
    let mut statements = Vec::new();
    for filter in filters {
        for selector in filter.selectors() {
            for element in ELEMENT_TYPES {
                statements.push(format!("  {}{}({});", element, selector, area));
            }
        }
    }
    Ok(format!(
        "[out:json][timeout:{}];\n(\n{}\n);\nout center;",
        OVERPASS_TIMEOUT_SECS,
        statements.join("\n")
    ))
}

fn bool_param(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

async fn ensure_success(service: &'static str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let mut message = body.trim().chars().take(ERROR_BODY_LIMIT).collect::<String>();
    if message.is_empty() {
        message = status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_string();
    }
    Err(Error::upstream(service, Some(status.as_u16()), message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overpass_query_unions_every_element_type() {
        let bbox = BoundingBox::new(1.0, 2.0, 3.0, 4.0).unwrap();
        let query = build_overpass_query(&bbox, &[TagFilter::any("amenity")]).unwrap();

        assert!(query.starts_with("[out:json][timeout:25];"));
        assert!(query.contains("node[\"amenity\"](1,2,3,4);"));
        assert!(query.contains("way[\"amenity\"](1,2,3,4);"));
        assert!(query.contains("relation[\"amenity\"](1,2,3,4);"));
        assert!(query.trim_end().ends_with("out center;"));
    }

    #[test]
    fn overpass_query_ors_values_and_filters() {
        let bbox = BoundingBox::new(1.0, 2.0, 3.0, 4.0).unwrap();
        let filters = [
            TagFilter::one_of("shop", ["supermarket", "grocery"]),
            TagFilter::one_of("railway", ["station"]),
        ];
        let query = build_overpass_query(&bbox, &filters).unwrap();

        assert!(query.contains("node[\"shop\"=\"supermarket\"](1,2,3,4);"));
        assert!(query.contains("way[\"shop\"=\"grocery\"](1,2,3,4);"));
        assert!(query.contains("relation[\"railway\"=\"station\"](1,2,3,4);"));
        assert_eq!(query.matches("(1,2,3,4);").count(), 9);
    }

    #[test]
    fn overpass_query_requires_a_filter() {
        let bbox = BoundingBox::new(1.0, 2.0, 3.0, 4.0).unwrap();
        assert!(matches!(
            build_overpass_query(&bbox, &[]),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[tokio::test]
    async fn calls_fail_before_connect() {
        let client = OsmClient::new(OsmConfig::default());
        assert!(!client.is_connected().await);
        let err = client.geocode("Berlin").await.unwrap_err();
        assert!(matches!(err, Error::NotConnected));
    }

    #[tokio::test]
    async fn calls_fail_after_disconnect() {
        let client = OsmClient::new(OsmConfig::default());
        client.connect().await.unwrap();
        assert!(client.is_connected().await);
        client.disconnect().await;

        let coord = Coordinate::new(1.0, 1.0).unwrap();
        let err = client.reverse_geocode(coord).await.unwrap_err();
        assert!(matches!(err, Error::NotConnected));
    }
}
