//! Error types and RFC 9457-style problem details for the MCP server
//!
//! Library failures are converted into a problem document (status-like code,
//! message, type URI, context) that is returned to the caller inside an
//! `isError` tool result or as the `data` of a JSON-RPC error.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::types::{JsonRpcError, INTERNAL_ERROR, INVALID_PARAMS, RESOURCE_NOT_FOUND};

/// Result type for MCP operations
pub type Result<T> = std::result::Result<T, Error>;

const TYPE_BASE: &str = "https://osmgeo.local/errors";

/// MCP Server error type implementing RFC 9457 Problem Details
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq)]
#[error("{message}")]
pub struct Error {
    /// HTTP status-like code (e.g., 400, 404, 502)
    pub code: i32,

    /// Human-readable error message
    pub message: String,

    /// Machine-readable problem type URI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,

    /// Additional error context (e.g., parameter name, upstream service)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl Error {
    /// Create a new error with a code and message
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            r#type: None,
            context: None,
        }
    }

    /// Add a problem type URI
    pub fn with_type(mut self, type_uri: impl Into<String>) -> Self {
        self.r#type = Some(type_uri.into());
        self
    }

    /// Add context information as JSON
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    pub fn not_connected() -> Self {
        Self::new(503, "OSM client not connected")
            .with_type(format!("{}/not-connected", TYPE_BASE))
    }

    /// An upstream service failed or was unreachable
    pub fn upstream(service: &str, status: Option<u16>, detail: impl Into<String>) -> Self {
        Self::new(502, format!("Upstream {} request failed", service))
            .with_type(format!("{}/upstream-failure", TYPE_BASE))
            .with_context(json!({
                "service": service,
                "status": status,
                "detail": detail.into()
            }))
    }

    pub fn no_result(what: impl Into<String>) -> Self {
        let what = what.into();
        Self::new(404, format!("No {} found", what))
            .with_type(format!("{}/no-result", TYPE_BASE))
            .with_context(json!({ "what": what }))
    }

    /// Invalid parameter error
    pub fn invalid_param(param: impl Into<String>, reason: impl Into<String>) -> Self {
        let p = param.into();
        Self::new(400, format!("Invalid parameter: {}", p))
            .with_type(format!("{}/invalid-parameter", TYPE_BASE))
            .with_context(json!({
                "parameter": p,
                "reason": reason.into()
            }))
    }

    pub fn resource_not_found(uri: impl Into<String>) -> Self {
        let uri = uri.into();
        Self::new(404, format!("Resource '{}' not found", uri))
            .with_type(format!("{}/resource-not-found", TYPE_BASE))
            .with_context(json!({
                "uri": uri,
                "templates": ["location://place/{query}", "location://map/{style}/{z}/{x}/{y}"]
            }))
    }

    /// Internal server error
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::new(500, format!("Internal server error: {}", reason.into()))
            .with_type(format!("{}/internal-error", TYPE_BASE))
    }

    /// Problem document as pretty JSON, for `isError` tool results.
    pub fn to_problem_text(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| self.message.clone())
    }

    /// JSON-RPC error carrying this problem as `data`.
    pub fn to_json_rpc(&self) -> JsonRpcError {
        let code = match self.code {
            400 => INVALID_PARAMS,
            404 if self.is_resource_not_found() => RESOURCE_NOT_FOUND,
            _ => INTERNAL_ERROR,
        };
        JsonRpcError::new(code, self.message.clone())
            .with_data(serde_json::to_value(self).unwrap_or(Value::Null))
    }

    fn is_resource_not_found(&self) -> bool {
        self.r#type
            .as_deref()
            .is_some_and(|t| t.ends_with("/resource-not-found"))
    }
}

impl From<osmgeo_lib::Error> for Error {
    fn from(err: osmgeo_lib::Error) -> Self {
        match err {
            osmgeo_lib::Error::NotConnected => Error::not_connected(),
            osmgeo_lib::Error::Upstream {
                service,
                status,
                message,
            } => Error::upstream(service, status, message),
            osmgeo_lib::Error::NoResult { what } => Error::no_result(what),
            osmgeo_lib::Error::InvalidArgument { parameter, reason } => {
                Error::invalid_param(parameter, reason)
            }
        }
    }
}
