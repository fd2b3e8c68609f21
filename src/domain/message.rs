//! Message payloads and the envelope carried by pipeline channels.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Booking, Payment};

/// Correlation id tagging a synchronous gateway request.
///
/// Generated per call; the first reply bearing it fulfils the caller's
/// one-shot reply slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(uuid::Uuid);

impl CorrelationId {
    /// Creates a new random `CorrelationId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Payload of a pipeline message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Message {
    /// A booking moving through creation, confirmation or payout.
    Booking(Booking),
    /// A payment confirmation moving through the confirmation flow.
    Payment(Payment),
}

impl Message {
    /// Short payload type name for logs and error reporting.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Booking(_) => "booking",
            Self::Payment(_) => "payment",
        }
    }
}

/// What a channel actually carries: a payload plus optional correlation.
///
/// Fire-and-forget sends leave `correlation` empty; the gateway's
/// synchronous operations tag it so the completing flow can fulfil the
/// caller's reply slot.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// The message being processed.
    pub message: Message,
    /// Reply correlation for synchronous gateway calls.
    pub correlation: Option<CorrelationId>,
}

impl Envelope {
    /// Wraps a message with no reply expectation.
    #[must_use]
    pub const fn fire_and_forget(message: Message) -> Self {
        Self {
            message,
            correlation: None,
        }
    }

    /// Wraps a message tagged for a correlated reply.
    #[must_use]
    pub const fn correlated(message: Message, correlation: CorrelationId) -> Self {
        Self {
            message,
            correlation: Some(correlation),
        }
    }
}
