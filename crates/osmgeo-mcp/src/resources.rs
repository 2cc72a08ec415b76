//! MCP resource implementations for place lookups and map tiles
//!
//! This module defines the two resource templates exposed by the server:
//! - `location://place/{query}`: geocoder JSON for a percent-encoded query
//! - `location://map/{style}/{z}/{x}/{y}`: one map tile, base64 encoded

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use osmgeo_lib::{OsmClient, TileStyle};
use tracing::debug;

use crate::types::{ResourceContents, ResourceTemplate};
use crate::{Error, Result};

pub const PLACE_TEMPLATE: &str = "location://place/{query}";
pub const MAP_TEMPLATE: &str = "location://map/{style}/{z}/{x}/{y}";

const PLACE_PREFIX: &str = "location://place/";
const MAP_PREFIX: &str = "location://map/";

/// Candidates returned by the place resource.
const PLACE_LIMIT: usize = 1;

pub fn resource_templates() -> Vec<ResourceTemplate> {
    vec![
        ResourceTemplate {
            uri_template: PLACE_TEMPLATE,
            name: "Place lookup",
            description: "Geocoder result for a free-text place query",
            mime_type: "application/json",
        },
        ResourceTemplate {
            uri_template: MAP_TEMPLATE,
            name: "Map tile",
            description: "Map tile image; styles: standard, cycle, transport, landscape, outdoor",
            mime_type: "image/png",
        },
    ]
}

/// A parsed resource URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceUri {
    Place {
        query: String,
    },
    Map {
        style: TileStyle,
        z: u32,
        x: u32,
        y: u32,
    },
}

impl ResourceUri {
    pub fn parse(uri: &str) -> Result<Self> {
        if let Some(raw) = uri.strip_prefix(PLACE_PREFIX) {
            let query = percent_decode(raw)?;
            if query.trim().is_empty() {
                return Err(Error::invalid_param("query", "cannot be empty"));
            }
            return Ok(ResourceUri::Place { query });
        }

        if let Some(rest) = uri.strip_prefix(MAP_PREFIX) {
            let parts: Vec<&str> = rest.split('/').collect();
            let [style, z, x, y] = parts.as_slice() else {
                return Err(Error::resource_not_found(uri));
            };
            return Ok(ResourceUri::Map {
                style: TileStyle::from_name(style),
                z: tile_index("z", z)?,
                x: tile_index("x", x)?,
                y: tile_index("y", y.trim_end_matches(".png"))?,
            });
        }

        Err(Error::resource_not_found(uri))
    }
}

fn tile_index(name: &str, raw: &str) -> Result<u32> {
    raw.parse::<u32>()
        .map_err(|_| Error::invalid_param(name, format!("'{}' is not a tile index", raw)))
}

/// Decode `%XX` escapes in a URI path segment.
pub fn percent_decode(raw: &str) -> Result<String> {
    let bytes = raw.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| Error::invalid_param("query", "malformed percent escape"))?;
            decoded.push(hex);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(decoded).map_err(|_| Error::invalid_param("query", "not valid UTF-8"))
}

/// Place lookup resource
pub struct PlaceResource;

impl PlaceResource {
    pub async fn read(client: &OsmClient, uri: &str, query: &str) -> Result<ResourceContents> {
        debug!("reading place resource for {:?}", query);
        let payload = client.search_place_raw(query, PLACE_LIMIT).await?;
        let text =
            serde_json::to_string_pretty(&payload).map_err(|e| Error::internal(e.to_string()))?;
        Ok(ResourceContents::Text {
            uri: uri.to_string(),
            mime_type: "application/json".to_string(),
            text,
        })
    }
}

/// Map tile resource
pub struct MapTileResource;

impl MapTileResource {
    pub async fn read(
        client: &OsmClient,
        uri: &str,
        style: TileStyle,
        z: u32,
        x: u32,
        y: u32,
    ) -> Result<ResourceContents> {
        debug!("reading {} tile {}/{}/{}", style.as_str(), z, x, y);
        let tile = client.fetch_tile(style, z, x, y).await?;
        Ok(ResourceContents::Blob {
            uri: uri.to_string(),
            mime_type: tile.mime_type,
            blob: STANDARD.encode(&tile.bytes),
        })
    }
}

/// Resolve and read any supported resource URI.
pub async fn read_resource(client: &OsmClient, uri: &str) -> Result<ResourceContents> {
    match ResourceUri::parse(uri)? {
        ResourceUri::Place { query } => PlaceResource::read(client, uri, &query).await,
        ResourceUri::Map { style, z, x, y } => {
            MapTileResource::read(client, uri, style, z, x, y).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn place_uri_is_percent_decoded() {
        assert_eq!(
            ResourceUri::parse("location://place/Caf%C3%A9%20de%20Flore").unwrap(),
            ResourceUri::Place {
                query: "Café de Flore".into()
            }
        );
    }

    #[test]
    fn malformed_escape_is_invalid() {
        let err = ResourceUri::parse("location://place/100%").unwrap_err();
        assert_eq!(err.code, 400);
        assert!(percent_decode("%zz").is_err());
    }

    #[test]
    fn map_uri_parses_indices_and_falls_back_to_standard() {
        assert_eq!(
            ResourceUri::parse("location://map/outdoor/12/2200/1343").unwrap(),
            ResourceUri::Map {
                style: TileStyle::Outdoor,
                z: 12,
                x: 2200,
                y: 1343
            }
        );
        assert_eq!(
            ResourceUri::parse("location://map/watercolor/1/0/1").unwrap(),
            ResourceUri::Map {
                style: TileStyle::Standard,
                z: 1,
                x: 0,
                y: 1
            }
        );
    }

    #[test]
    fn non_numeric_tile_index_is_invalid() {
        let err = ResourceUri::parse("location://map/standard/one/0/0").unwrap_err();
        assert_eq!(err.code, 400);
        assert_eq!(err.context.unwrap()["parameter"], "z");
    }

    #[test]
    fn unknown_uri_is_not_found() {
        assert_eq!(ResourceUri::parse("location://weather/today").unwrap_err().code, 404);
        assert_eq!(ResourceUri::parse("location://map/standard/1/0").unwrap_err().code, 404);
    }

    #[test]
    fn templates_are_advertised() {
        let uris: Vec<_> = resource_templates().iter().map(|t| t.uri_template).collect();
        assert_eq!(uris, vec![PLACE_TEMPLATE, MAP_TEMPLATE]);
    }
}
