//! MCP (Model Context Protocol) host support for mcphost
//!
//! The model asks for external data through marker blocks in its replies; this
//! module connects to the configured MCP servers and fulfills those requests.
//!
//! # Module Layout
//!
//! - `types`      -- Capability requests, wire requests, results and bundles
//! - `config`     -- Server and transport configuration
//! - `transport`  -- `Transport` trait and the stdio, SSE and HTTP clients
//! - `registry`   -- Initialized servers and their discovered capabilities
//! - `marker`     -- Marker extraction and prompt rendering
//! - `dispatcher` -- Concurrent fulfillment of request batches

pub mod config;
pub mod dispatcher;
pub mod marker;
pub mod registry;
pub mod transport;
pub mod types;

pub use dispatcher::Dispatcher;
pub use registry::{ServerFailure, ServerRegistry};
pub use types::{CapabilityRequest, FulfillmentBundle, RequestKind, ServerCapabilities};
