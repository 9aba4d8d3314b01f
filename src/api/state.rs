//! Application State
//!
//! Shared state accessible by all HTTP and WebSocket handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;

use crate::config::ServerConfig;
use crate::websocket::{HubConfig, RelayHub};

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Relay hub owning the connection registry
    pub hub: Arc<RelayHub>,
    /// Server configuration
    pub config: Arc<ServerConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    /// Create state around an existing hub
    pub fn new(hub: Arc<RelayHub>, config: ServerConfig) -> Self {
        Self {
            hub,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Create state with a fresh hub
    pub fn with_hub_config(config: ServerConfig, hub_config: HubConfig) -> Self {
        Self::new(Arc::new(RelayHub::new(hub_config)), config)
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
