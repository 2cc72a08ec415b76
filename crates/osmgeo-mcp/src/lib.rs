//! MCP (Model Context Protocol) server for OpenStreetMap geospatial tools
//!
//! This crate exposes the `osmgeo-lib` workflows (geocoding, routing, place
//! search and area analysis) to AI assistants over the Model Context
//! Protocol.
//!
//! # Architecture
//!
//! - `server`: shared state, capability advertisement and shutdown
//! - `tools`: tool registry, input schemas and dispatch
//! - `resources`: place lookup and map tile resources
//! - `notify`: progress and log notifications for running tools
//! - `transport`: newline-delimited JSON-RPC loop
//! - `error`: error types and RFC 9457 problem details
//!
//! # Transport
//!
//! The server communicates via stdio using JSON-RPC 2.0 messages, one per
//! line. All logging is redirected to stderr to prevent stdout protocol
//! corruption.

pub mod error;
pub mod notify;
pub mod resources;
pub mod server;
pub mod tools;
pub mod transport;
pub mod types;

pub use error::{Error, Result};
pub use server::McpServerState;
pub use transport::run_server_loop;
