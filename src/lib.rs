//! # ECG Hub
//!
//! A real-time pub/sub relay for ECG-style sample streams over WebSocket.
//!
//! ## Features
//!
//! - **Sources**: any connection becomes a source by sending `{"name": ...}`
//! - **Subscriptions**: clients subscribe to a source by its uuid
//! - **Fan-out**: every published sample reaches the source's current listeners
//! - **Live source list**: pushed to every client on connect, rename and disconnect
//!
//! ## Modules
//!
//! - [`websocket`]: Registry, command routing and broadcast
//! - [`api`]: HTTP server with Axum (WebSocket endpoint, static assets, health)
//! - [`config`]: TOML and environment configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ecg_hub::{serve, AppState, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let state = AppState::with_hub_config(config.server.clone(), config.hub.clone());
//!     serve(state, &config.server).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod websocket;

pub use api::{build_router, serve, AppState, ServerError, ServerResult};

pub use config::{Config, ConfigError, LoggingConfig, ServerConfig};

pub use websocket::{
    websocket_handler, ClientDescription, CodecError, Command, ConnectionId, HubConfig,
    HubError, RelayHub, ServerMessage,
};
