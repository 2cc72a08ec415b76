use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use osmgeo_lib::{AppContext, OsmConfig};
use osmgeo_mcp::{run_server_loop, McpServerState};
use tokio::io::{stdin, stdout};

#[derive(Parser, Debug)]
#[command(author, version, about = "OpenStreetMap geospatial tools over MCP (stdio)")]
struct Cli {
    /// Tracing filter, e.g. `debug` or `osmgeo_lib=trace`. Defaults to RUST_LOG, then `info`.
    #[arg(long)]
    log_level: Option<String>,

    /// Geocoder base URL.
    #[arg(long)]
    nominatim_url: Option<String>,

    /// Routing engine base URL.
    #[arg(long)]
    osrm_url: Option<String>,

    /// Tag-query interpreter URL.
    #[arg(long)]
    overpass_url: Option<String>,

    /// Standard map tile base URL.
    #[arg(long)]
    tile_url: Option<String>,

    /// Thunderforest tile base URL.
    #[arg(long)]
    thunderforest_url: Option<String>,

    /// Thunderforest API key for the cycle, transport, landscape and outdoor styles.
    #[arg(long)]
    thunderforest_api_key: Option<String>,

    /// User-Agent header sent to every upstream service.
    #[arg(long)]
    user_agent: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,
}

impl Cli {
    /// Command-line values win over `OSMGEO_*` environment variables.
    fn into_config(self) -> OsmConfig {
        let mut config = OsmConfig::from_env();
        if let Some(url) = self.nominatim_url {
            config.nominatim_url = url;
        }
        if let Some(url) = self.osrm_url {
            config.osrm_url = url;
        }
        if let Some(url) = self.overpass_url {
            config.overpass_url = url;
        }
        if let Some(url) = self.tile_url {
            config.tile_url = url;
        }
        if let Some(url) = self.thunderforest_url {
            config.thunderforest_url = url;
        }
        if let Some(key) = self.thunderforest_api_key {
            config.thunderforest_api_key = Some(key);
        }
        if let Some(agent) = self.user_agent {
            config.user_agent = agent;
        }
        if let Some(secs) = self.timeout_secs.filter(|s| *s > 0) {
            config.timeout = Duration::from_secs(secs);
        }
        config
    }
}

/// Configure tracing to write only to stderr. `LOG_FORMAT=json` switches to
/// JSON lines.
fn configure_tracing(log_level: Option<&str>) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = if let Some(level) = log_level {
        EnvFilter::new(level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_target(false);

    let installed = if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.compact().finish())
    };
    installed.context("Failed to set tracing subscriber")?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    configure_tracing(cli.log_level.as_deref())?;

    let config = cli.into_config();
    tracing::info!(
        "Starting osmgeo MCP server (nominatim {}, osrm {}, overpass {})",
        config.nominatim_url,
        config.osrm_url,
        config.overpass_url
    );

    let context = AppContext::start(config)
        .await
        .context("Failed to connect the OSM client")?;
    let state = Arc::new(McpServerState::new(context));

    run_server_loop(stdin(), stdout(), state).await
}
