//! Events consumed by the dispatcher loop

use crate::transport::InboundMessage;

/// Work items for the dispatcher, processed strictly one at a time
#[derive(Debug, Clone)]
pub enum Event {
    /// A message arrived from the transport
    Inbound(InboundMessage),
    /// An inactivity timer fired
    Expired { jid: String, generation: u64 },
}
