//! Webhook ingestion: raw body in, classified events out.

use {
    messenger_protocol::{InboundEvent, Receive},
    tracing::{debug, warn},
};

use crate::Result;

const KNOWN_OBJECTS: [&str; 2] = ["page", "instagram"];

/// Decode a webhook body and classify every event it carries, in delivery
/// order across all entries.
pub fn parse_events(body: &[u8]) -> Result<Vec<InboundEvent>> {
    let receive = Receive::from_slice(body)?;
    if !KNOWN_OBJECTS.contains(&receive.object.as_str()) {
        warn!(object = %receive.object, "webhook for unexpected object type");
    }

    let mut events = Vec::new();
    for entry in receive.entry {
        for info in entry.messaging {
            let populated = info.populated_payloads();
            if populated > 1 {
                warn!(
                    page_id = entry.id,
                    sender_id = info.sender.id,
                    populated,
                    action = %info.action(),
                    "event carries several payloads, classified by priority"
                );
            }
            let event = info.into_event();
            debug!(
                page_id = entry.id,
                sender_id = event.sender.id,
                action = %event.action(),
                "webhook event"
            );
            events.push(event);
        }
    }
    Ok(events)
}
