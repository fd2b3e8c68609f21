//! Observability events emitted by the pipeline runtime.
//!
//! [`EventBus`] wraps a [`tokio::sync::broadcast`] channel. The runtime
//! publishes a [`PipelineEvent`] at every routing decision (discard,
//! route, stage failure, flow completion), so rejections are never silent
//! and tests can observe the pipeline without reaching into its channels.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use super::{ChannelName, Message};

/// Event emitted by the pipeline runtime at each routing decision.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// A filter rejected the message. `discard_to` names the discard
    /// channel the message was forwarded to, if one is configured.
    MessageDiscarded {
        /// Channel whose flow rejected the message.
        channel: ChannelName,
        /// Filter stage that evaluated false.
        stage: String,
        /// Discard channel the message was forwarded to, if any.
        discard_to: Option<ChannelName>,
        /// The rejected message.
        message: Message,
        /// When the rejection happened.
        timestamp: DateTime<Utc>,
    },

    /// A flow forwarded the message to a downstream channel.
    MessageRouted {
        /// Channel whose flow finished with a route.
        from: ChannelName,
        /// Downstream entry channel.
        to: ChannelName,
        /// When the hand-off happened.
        timestamp: DateTime<Utc>,
    },

    /// A transform stage failed; the original message and cause went to
    /// the error sink and the flow stopped for this message.
    StageFailed {
        /// Channel whose flow failed.
        channel: ChannelName,
        /// Transform stage that raised.
        stage: String,
        /// The message as it entered the failing stage.
        message: Message,
        /// Rendered cause.
        cause: String,
        /// When the failure happened.
        timestamp: DateTime<Utc>,
    },

    /// A flow ran its whole stage chain without routing onward.
    FlowCompleted {
        /// Entry channel of the completed flow.
        channel: ChannelName,
        /// The message as it left the last stage.
        message: Message,
        /// When the flow completed.
        timestamp: DateTime<Utc>,
    },
}

impl PipelineEvent {
    /// Returns the channel this event concerns (the `from` side for routes).
    #[must_use]
    pub const fn channel(&self) -> ChannelName {
        match self {
            Self::MessageDiscarded { channel, .. }
            | Self::StageFailed { channel, .. }
            | Self::FlowCompleted { channel, .. } => *channel,
            Self::MessageRouted { from, .. } => *from,
        }
    }
}

/// Fan-out bus carrying [`PipelineEvent`]s to any number of observers.
///
/// A thin handle over `tokio::broadcast`. Publication never blocks the
/// flow worker that emits the event; a lagging receiver loses the oldest
/// events once the ring buffer wraps, it is never caught up at the
/// pipeline's expense.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PipelineEvent>,
}

impl EventBus {
    /// Creates a bus whose ring buffer holds `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event, returning how many receivers saw it.
    ///
    /// Zero receivers means the event is dropped on the floor. That is
    /// acceptable here: nothing in the pipeline depends on its own events.
    pub fn publish(&self, event: PipelineEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Opens a receiver positioned at the next event to be published.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.sender.subscribe()
    }

    /// Number of receivers currently subscribed.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
