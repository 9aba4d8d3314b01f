//! Data Transfer Objects
//!
//! Response types for the HTTP endpoints.

use serde::{Deserialize, Serialize};

/// Full health status response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "healthy", or "saturated" when the connection limit is reached
    pub status: String,
    /// Live WebSocket connections
    pub connections: usize,
    /// Connections that have named themselves
    pub sources: usize,
    /// Seconds since the server started
    pub uptime_seconds: u64,
    /// Crate version
    pub version: String,
}
