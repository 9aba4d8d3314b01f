//! Broadcast Engine
//!
//! Fan-out of encoded frames to a set of recipients. Sending only enqueues
//! onto each connection's outbound queue; the socket write happens in that
//! connection's own writer task. A failed enqueue means the recipient's
//! writer is gone. It is logged and skipped, and the recipient is left for
//! its handler to unregister.

use super::messages::{CodecError, ServerMessage};
use super::registry::{Recipient, Registry};

/// Outcome of one fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    pub sent: usize,
    pub failed: usize,
}

/// Send `text` to every recipient, isolating failures per recipient
pub fn fan_out(recipients: &[Recipient], text: &str) -> Delivery {
    let mut delivery = Delivery::default();

    for recipient in recipients {
        if recipient.outbox.send(text.to_string()).is_ok() {
            delivery.sent += 1;
        } else {
            tracing::warn!(
                connection_id = %recipient.id,
                "Dropping message for closed connection"
            );
            delivery.failed += 1;
        }
    }

    delivery
}

/// Forward a source's sample text to its listeners
pub fn forward(listeners: &[Recipient], text: &str) -> Delivery {
    fan_out(listeners, text)
}

/// Push the current source list to every registered connection
///
/// Reads the registry as given; callers hold the hub lock so that pushes go
/// out in the same order as the mutations that caused them.
pub fn push_source_list(registry: &Registry) -> Result<Delivery, CodecError> {
    let text = ServerMessage::Sources {
        sources: registry.source_list(),
    }
    .encode()?;

    Ok(fan_out(&registry.recipients(), &text))
}
