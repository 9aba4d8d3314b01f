//! Relay Hub
//!
//! Owns the connection registry and applies client commands to it.
//! All registry access goes through one `RwLock`: mutations take the write
//! lock, snapshots take the read lock.

use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::RwLock;

use super::broadcast::{self, Delivery};
use super::messages::{ClientDescription, CodecError, Command, ServerMessage};
use super::registry::{ConnectionId, Outbox, Registry};

/// Configuration for the relay hub
#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    /// Maximum number of concurrent connections
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

fn default_max_connections() -> usize {
    1000
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
        }
    }
}

/// Routes client commands against the shared registry
pub struct RelayHub {
    registry: RwLock<Registry>,
    next_id: AtomicU64,
    config: HubConfig,
}

impl RelayHub {
    /// Create a new hub with an empty registry
    pub fn new(config: HubConfig) -> Self {
        Self {
            registry: RwLock::new(Registry::new()),
            next_id: AtomicU64::new(1),
            config,
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Register a new connection
    ///
    /// The connection's uuid is queued on `outbox` before the lock is
    /// released, so it is always the first message the client sees. The
    /// refreshed source list follows, sent to everyone.
    pub async fn connect(&self, outbox: Outbox) -> Result<(ConnectionId, String), HubError> {
        let mut registry = self.registry.write().await;
        if registry.len() >= self.config.max_connections {
            return Err(HubError::TooManyConnections {
                limit: self.config.max_connections,
            });
        }

        let id = ConnectionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let uuid = registry.add(id, outbox.clone());

        let hello = ServerMessage::Connect { uuid: uuid.clone() }.encode()?;
        if outbox.send(hello).is_err() {
            registry.remove(id);
            return Err(HubError::SendFailed);
        }

        tracing::info!(connection_id = %id, uuid = %uuid, "Client connected");
        Self::push_locked(&registry);
        Ok((id, uuid))
    }

    /// Unregister a connection and drop it from every listener set
    ///
    /// Returns false if the connection was not registered.
    pub async fn disconnect(&self, id: ConnectionId) -> bool {
        let mut registry = self.registry.write().await;
        let Some(entry) = registry.remove(id) else {
            return false;
        };

        tracing::info!(
            connection_id = %id,
            uuid = %entry.uuid(),
            was_source = entry.is_source,
            "Client disconnected"
        );
        Self::push_locked(&registry);
        true
    }

    /// Decode and apply one inbound text frame
    ///
    /// Frames that match no command are logged and dropped.
    pub async fn handle_text(&self, id: ConnectionId, text: &str) {
        match Command::decode(text) {
            Ok(command) => self.dispatch(id, command).await,
            Err(e) => {
                tracing::debug!(
                    connection_id = %id,
                    error = %e,
                    text = %text,
                    "Dropping unrecognized frame"
                );
            }
        }
    }

    /// Apply a decoded command on behalf of `id`
    pub async fn dispatch(&self, id: ConnectionId, command: Command) {
        tracing::trace!(connection_id = %id, command = command.field(), "Dispatching command");
        match command {
            Command::Publish { value } => {
                self.publish(id, value).await;
            }
            Command::Subscribe { target } => {
                self.subscribe(id, &target).await;
            }
            Command::Unsubscribe { target } => {
                self.unsubscribe(id, &target).await;
            }
            Command::SetName { name } => {
                self.set_name(id, name).await;
            }
        }
    }

    /// Forward a sample from `source` to its listeners
    pub async fn publish(&self, source: ConnectionId, value: f64) -> Delivery {
        let listeners = self.registry.read().await.listeners_of(source);
        let Some(listeners) = listeners else {
            tracing::debug!(connection_id = %source, "Publish from unregistered connection");
            return Delivery::default();
        };
        if listeners.is_empty() {
            return Delivery::default();
        }

        let text = match (ServerMessage::Publish { publish: value }).encode() {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(connection_id = %source, error = %e, "Failed to encode sample");
                return Delivery::default();
            }
        };

        let delivery = broadcast::forward(&listeners, &text);
        tracing::trace!(
            connection_id = %source,
            listeners = delivery.sent,
            "Forwarded sample"
        );
        delivery
    }

    /// Add `listener` to the listeners of the source with uuid `target`
    ///
    /// Returns false (and does nothing) if no connection has that uuid.
    pub async fn subscribe(&self, listener: ConnectionId, target: &str) -> bool {
        let found = self.registry.write().await.add_listener(target, listener);
        if found {
            tracing::debug!(connection_id = %listener, target = %target, "Subscribed");
        } else {
            tracing::debug!(connection_id = %listener, target = %target, "Subscribe to unknown target ignored");
        }
        found
    }

    /// Remove `listener` from the listeners of the source with uuid `target`
    pub async fn unsubscribe(&self, listener: ConnectionId, target: &str) -> bool {
        let found = self.registry.write().await.remove_listener(target, listener);
        if found {
            tracing::debug!(connection_id = %listener, target = %target, "Unsubscribed");
        } else {
            tracing::debug!(connection_id = %listener, target = %target, "Unsubscribe from unknown target ignored");
        }
        found
    }

    /// Name a connection, making it a source, and push the new source list
    pub async fn set_name(&self, id: ConnectionId, name: impl Into<String>) -> bool {
        let name = name.into();
        let mut registry = self.registry.write().await;
        if !registry.set_name(id, name.clone()) {
            tracing::debug!(connection_id = %id, "Name from unregistered connection ignored");
            return false;
        }

        tracing::info!(connection_id = %id, name = %name, "Source named");
        Self::push_locked(&registry);
        true
    }

    /// Send the current source list to every connection
    pub async fn push_source_list(&self) -> Delivery {
        let registry = self.registry.read().await;
        Self::push_locked(&registry)
    }

    fn push_locked(registry: &Registry) -> Delivery {
        match broadcast::push_source_list(registry) {
            Ok(delivery) => delivery,
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode source list");
                Delivery::default()
            }
        }
    }

    /// Snapshot of the current sources
    pub async fn sources(&self) -> Vec<ClientDescription> {
        self.registry.read().await.source_list()
    }

    /// Get the current connection count
    pub async fn connection_count(&self) -> usize {
        self.registry.read().await.len()
    }

    /// Get the current source count
    pub async fn source_count(&self) -> usize {
        self.registry.read().await.source_count()
    }

    /// Number of listeners subscribed to the source with `uuid`
    pub async fn listener_count(&self, uuid: &str) -> Option<usize> {
        self.registry
            .read()
            .await
            .find_by_uuid(uuid)
            .map(|(_, entry)| entry.listeners.len())
    }
}

/// Errors that can occur in the relay hub
#[derive(Debug, Error)]
pub enum HubError {
    #[error("Too many connections (limit: {limit})")]
    TooManyConnections { limit: usize },

    #[error("Failed to send message")]
    SendFailed,

    #[error(transparent)]
    Codec(#[from] CodecError),
}
