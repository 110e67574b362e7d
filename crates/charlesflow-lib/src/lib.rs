// CharlesFlow Shared Library
// Models, services, and utilities shared by the MCP server
//
// This library drives a locally running Charles proxy through its HTTP
// control API, protects the proxy's on-disk configuration around a session,
// and keeps a local cache of exported capture sessions.

pub mod models;
pub mod services;
pub mod utils;

pub use models::*;
