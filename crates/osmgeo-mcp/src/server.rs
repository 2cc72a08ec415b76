//! MCP server lifecycle and state management
//!
//! Holds the shared application context plus the catalogue advertised to
//! clients. One state is built at startup and shared with every handler
//! through an `Arc`.

use osmgeo_lib::{AppContext, OsmClient};
use serde_json::{json, Value};
use tracing::info;

use crate::resources::resource_templates;
use crate::tools::tool_descriptors;
use crate::types::{ResourceTemplate, ToolDescriptor, PROTOCOL_VERSION};

/// Name reported in `serverInfo`.
pub const SERVER_NAME: &str = "osmgeo";

/// Main server state holding all runtime resources
pub struct McpServerState {
    context: AppContext,

    /// Server initialization timestamp for metadata
    pub initialized_at: chrono::DateTime<chrono::Utc>,

    tools: Vec<ToolDescriptor>,
}

impl McpServerState {
    pub fn new(context: AppContext) -> Self {
        let tools = tool_descriptors();
        info!("MCP server state ready with {} tools", tools.len());
        Self {
            context,
            initialized_at: chrono::Utc::now(),
            tools,
        }
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub fn client(&self) -> &OsmClient {
        self.context.client()
    }

    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn resource_templates(&self) -> Vec<ResourceTemplate> {
        resource_templates()
    }

    /// Result payload for `initialize`.
    pub fn initialize_result(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "serverInfo": {"name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION")},
            "capabilities": {"tools": {}, "resources": {}, "logging": {}},
            "instructions": format!(
                "OpenStreetMap geocoding, routing and place search. Up since {}.",
                self.initialized_at.to_rfc3339()
            )
        })
    }

    /// Release the upstream session.
    pub async fn shutdown(&self) {
        info!("Releasing OSM client session");
        self.context.shutdown().await;
    }
}
