//! Correlation table of one-shot reply slots.
//!
//! Each synchronous gateway call registers a slot before sending; the
//! first completing flow bearing the correlation id fulfils it. On timeout
//! the caller cancels the slot, so a late reply finds nothing and is
//! dropped.

use std::collections::HashMap;

use tokio::sync::{Mutex, oneshot};

use crate::domain::{CorrelationId, Message};

/// Registry of pending reply slots, shared between the gateway and the
/// pipeline workers.
#[derive(Debug, Default)]
pub struct ReplyRegistry {
    slots: Mutex<HashMap<CorrelationId, oneshot::Sender<Message>>>,
}

impl ReplyRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a one-shot slot for `correlation` and returns its
    /// receiving half. Registering the same id twice replaces the first
    /// slot (its receiver then resolves to an error).
    pub async fn register(&self, correlation: CorrelationId) -> oneshot::Receiver<Message> {
        let (tx, rx) = oneshot::channel();
        self.slots.lock().await.insert(correlation, tx);
        rx
    }

    /// Fulfils the slot for `correlation` with `message`.
    ///
    /// Returns `false` when no slot is registered (the caller timed out or
    /// never waited) or the receiver was dropped.
    pub async fn fulfil(&self, correlation: CorrelationId, message: Message) -> bool {
        match self.slots.lock().await.remove(&correlation) {
            Some(slot) => slot.send(message).is_ok(),
            None => false,
        }
    }

    /// Discards the slot for `correlation`, if any. Returns `true` when a
    /// slot was removed.
    pub async fn cancel(&self, correlation: CorrelationId) -> bool {
        self.slots.lock().await.remove(&correlation).is_some()
    }

    /// Number of slots currently waiting.
    pub async fn pending(&self) -> usize {
        self.slots.lock().await.len()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::Booking;

    fn message() -> Message {
        Message::Booking(Booking::request(1, 1, 1, 1))
    }

    #[tokio::test]
    async fn fulfil_delivers_to_registered_slot() {
        let registry = ReplyRegistry::new();
        let correlation = CorrelationId::new();
        let rx = registry.register(correlation).await;

        assert!(registry.fulfil(correlation, message()).await);
        let Ok(received) = rx.await else {
            panic!("reply not delivered");
        };
        assert_eq!(received.kind(), "booking");
        assert_eq!(registry.pending().await, 0);
    }

    #[tokio::test]
    async fn fulfil_without_slot_reports_false() {
        let registry = ReplyRegistry::new();
        assert!(!registry.fulfil(CorrelationId::new(), message()).await);
    }

    #[tokio::test]
    async fn cancelled_slot_drops_late_reply() {
        let registry = ReplyRegistry::new();
        let correlation = CorrelationId::new();
        let rx = registry.register(correlation).await;

        assert!(registry.cancel(correlation).await);
        assert!(!registry.fulfil(correlation, message()).await);
        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn fulfil_is_one_shot() {
        let registry = ReplyRegistry::new();
        let correlation = CorrelationId::new();
        let _rx = registry.register(correlation).await;

        assert!(registry.fulfil(correlation, message()).await);
        assert!(!registry.fulfil(correlation, message()).await);
    }
}
