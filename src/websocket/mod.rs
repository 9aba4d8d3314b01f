//! WebSocket Relay
//!
//! The pub/sub core of the hub. Clients connect to `/ws`; a client becomes a
//! source by naming itself, and any client can subscribe to a source by its
//! uuid to receive every sample the source publishes afterwards.
//!
//! ## Architecture
//!
//! - **Messages**: Wire shapes and the ordered, tag-free command decoder
//! - **Registry**: Live connections, their descriptions and listener sets
//! - **RelayHub**: Applies commands to the registry under a single lock
//! - **Broadcast**: Per-recipient fan-out with failure isolation
//! - **Handler**: WebSocket upgrade and per-connection lifecycle
//!
//! ## Protocol
//!
//! ```text
//! client                          hub
//!   | ---- connect --------------> |
//!   | <--- {"uuid": "..."} ------- |
//!   | <--- {"sources": [...]} ---- |   (to every client)
//!   | ---- {"name": "ECG-1"} ----> |
//!   | <--- {"sources": [...]} ---- |   (to every client)
//!   | ---- {"subscribe": uuid} --> |
//!   | ---- {"unsubscribe": uuid} > |
//!   | ---- {"publish": 72.5} ----> |   (forwarded to the sender's listeners)
//! ```
//!
//! ## Example
//!
//! ```javascript
//! // Browser
//! const ws = new WebSocket('ws://localhost:8888/ws');
//!
//! ws.onmessage = (event) => {
//!   const msg = JSON.parse(event.data);
//!   if ('sources' in msg) {
//!     ws.send(JSON.stringify({subscribe: msg.sources[0].uuid}));
//!   }
//!   if ('publish' in msg) {
//!     console.log('Sample:', msg.publish);
//!   }
//! };
//! ```

pub mod broadcast;
mod handler;
mod hub;
mod messages;
mod registry;

pub use broadcast::Delivery;
pub use handler::websocket_handler;
pub use hub::{HubConfig, HubError, RelayHub};
pub use messages::{ClientDescription, CodecError, Command, ServerMessage};
pub use registry::{ClientEntry, ConnectionId, Outbox, Recipient, Registry};
