//! Upstream endpoint configuration.
//!
//! Defaults point at the public OpenStreetMap-ecosystem services. Each value
//! can be overridden through the environment:
//!
//! - `OSMGEO_NOMINATIM_URL`: geocoder base URL
//! - `OSMGEO_OSRM_URL`: routing engine base URL
//! - `OSMGEO_OVERPASS_URL`: tag-query interpreter URL
//! - `OSMGEO_TILE_URL`: standard tile server base URL
//! - `OSMGEO_THUNDERFOREST_URL`: Thunderforest tile base URL
//! - `OSMGEO_THUNDERFOREST_API_KEY`: optional Thunderforest API key
//! - `OSMGEO_USER_AGENT`: identifying header sent on every request
//! - `OSMGEO_HTTP_TIMEOUT_SECS`: per-request timeout in seconds

use std::time::Duration;

use tracing::warn;

pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_OSRM_URL: &str = "http://router.project-osrm.org";
pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";
pub const DEFAULT_TILE_URL: &str = "https://tile.openstreetmap.org";
pub const DEFAULT_THUNDERFOREST_URL: &str = "https://tile.thunderforest.com";
pub const DEFAULT_USER_AGENT: &str = "OSM-MCP-Server/1.0";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const NOMINATIM_URL_ENV: &str = "OSMGEO_NOMINATIM_URL";
const OSRM_URL_ENV: &str = "OSMGEO_OSRM_URL";
const OVERPASS_URL_ENV: &str = "OSMGEO_OVERPASS_URL";
const TILE_URL_ENV: &str = "OSMGEO_TILE_URL";
const THUNDERFOREST_URL_ENV: &str = "OSMGEO_THUNDERFOREST_URL";
const THUNDERFOREST_KEY_ENV: &str = "OSMGEO_THUNDERFOREST_API_KEY";
const USER_AGENT_ENV: &str = "OSMGEO_USER_AGENT";
const TIMEOUT_ENV: &str = "OSMGEO_HTTP_TIMEOUT_SECS";

/// Base URLs and transport settings for the upstream services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsmConfig {
    pub nominatim_url: String,
    pub osrm_url: String,
    pub overpass_url: String,
    pub tile_url: String,
    pub thunderforest_url: String,
    pub thunderforest_api_key: Option<String>,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for OsmConfig {
    fn default() -> Self {
        Self {
            nominatim_url: DEFAULT_NOMINATIM_URL.to_string(),
            osrm_url: DEFAULT_OSRM_URL.to_string(),
            overpass_url: DEFAULT_OVERPASS_URL.to_string(),
            tile_url: DEFAULT_TILE_URL.to_string(),
            thunderforest_url: DEFAULT_THUNDERFOREST_URL.to_string(),
            thunderforest_api_key: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl OsmConfig {
    /// Defaults overlaid with any `OSMGEO_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`OsmConfig::from_env`] but reads values through `lookup`, so
    /// tests can supply variables without touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = read(NOMINATIM_URL_ENV) {
            config.nominatim_url = url;
        }
        if let Some(url) = read(OSRM_URL_ENV) {
            config.osrm_url = url;
        }
        if let Some(url) = read(OVERPASS_URL_ENV) {
            config.overpass_url = url;
        }
        if let Some(url) = read(TILE_URL_ENV) {
            config.tile_url = url;
        }
        if let Some(url) = read(THUNDERFOREST_URL_ENV) {
            config.thunderforest_url = url;
        }
        config.thunderforest_api_key = read(THUNDERFOREST_KEY_ENV);
        if let Some(agent) = read(USER_AGENT_ENV) {
            config.user_agent = agent;
        }
        if let Some(raw) = read(TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.timeout = Duration::from_secs(secs),
                _ => warn!(
                    "ignoring {}={:?}; expected a positive number of seconds",
                    TIMEOUT_ENV, raw
                ),
            }
        }
        config
    }

    /// Point every service at the same base URL (mock servers in tests).
    pub fn with_base_url(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.nominatim_url = base.to_string();
        self.osrm_url = base.to_string();
        self.overpass_url = format!("{}/api/interpreter", base);
        self.tile_url = base.to_string();
        self.thunderforest_url = base.to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_use_public_services() {
        let config = OsmConfig::default();
        assert_eq!(config.nominatim_url, DEFAULT_NOMINATIM_URL);
        assert_eq!(config.overpass_url, DEFAULT_OVERPASS_URL);
        assert_eq!(config.user_agent, "OSM-MCP-Server/1.0");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.thunderforest_api_key.is_none());
    }

    #[test]
    fn lookup_overrides_defaults() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("OSMGEO_OSRM_URL", "http://localhost:5000"),
            ("OSMGEO_USER_AGENT", "test-agent/0.1"),
            ("OSMGEO_HTTP_TIMEOUT_SECS", "5"),
            ("OSMGEO_THUNDERFOREST_API_KEY", "abc123"),
        ]);
        let config = OsmConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.osrm_url, "http://localhost:5000");
        assert_eq!(config.user_agent, "test-agent/0.1");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.thunderforest_api_key.as_deref(), Some("abc123"));
        assert_eq!(config.nominatim_url, DEFAULT_NOMINATIM_URL);
    }

    #[test]
    fn invalid_timeout_keeps_default() {
        let config = OsmConfig::from_lookup(|k| {
            (k == "OSMGEO_HTTP_TIMEOUT_SECS").then(|| "soon".to_string())
        });
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn base_url_override_points_everything_at_one_host() {
        let config = OsmConfig::default().with_base_url("http://127.0.0.1:9999/");
        assert_eq!(config.nominatim_url, "http://127.0.0.1:9999");
        assert_eq!(config.osrm_url, "http://127.0.0.1:9999");
        assert_eq!(config.overpass_url, "http://127.0.0.1:9999/api/interpreter");
    }
}
