//! Stage descriptors: the building blocks of a flow.
//!
//! A stage is either a filter (predicate gate), a transform (exactly one
//! collaborator operation) or a route (hand-off to a downstream channel).
//! Stages are type-erased closures so flow definitions stay plain data.

use std::fmt;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::domain::{ChannelName, Message};
use crate::error::PipelineError;

/// Pure predicate over a message. Filters never raise; `false` means
/// discard, not failure.
pub type Predicate = Arc<dyn Fn(&Message) -> bool + Send + Sync>;

/// One collaborator operation applied to a message.
pub type TransformOp =
    Arc<dyn Fn(Message) -> BoxFuture<'static, Result<Message, PipelineError>> + Send + Sync>;

/// One step of a flow's stage chain.
pub enum Stage {
    /// Predicate gate. `false` routes the message to `discard` (when
    /// configured) or drops it observably.
    Filter {
        /// Stage name for logs and events.
        name: &'static str,
        /// The gate itself.
        predicate: Predicate,
        /// Where rejected messages go, if anywhere.
        discard: Option<ChannelName>,
    },

    /// Applies one domain operation, producing the next message. No
    /// internal retry; failures stop the flow for this message.
    Transform {
        /// Stage name for logs and events.
        name: &'static str,
        /// The operation itself.
        op: TransformOp,
    },

    /// Forwards the message to a downstream channel and ends this flow's
    /// processing of it.
    Route {
        /// Downstream entry channel.
        to: ChannelName,
    },
}

impl Stage {
    /// Builds a filter stage with no discard channel; rejections are
    /// logged and dropped.
    pub fn filter<P>(name: &'static str, predicate: P) -> Self
    where
        P: Fn(&Message) -> bool + Send + Sync + 'static,
    {
        Self::Filter {
            name,
            predicate: Arc::new(predicate),
            discard: None,
        }
    }

    /// Builds a filter stage forwarding rejections to `discard`.
    pub fn filter_with_discard<P>(name: &'static str, discard: ChannelName, predicate: P) -> Self
    where
        P: Fn(&Message) -> bool + Send + Sync + 'static,
    {
        Self::Filter {
            name,
            predicate: Arc::new(predicate),
            discard: Some(discard),
        }
    }

    /// Builds a transform stage from an async operation.
    pub fn transform<F, Fut>(name: &'static str, op: F) -> Self
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Message, PipelineError>> + Send + 'static,
    {
        Self::Transform {
            name,
            op: Arc::new(move |message| op(message).boxed()),
        }
    }

    /// Builds a route stage.
    #[must_use]
    pub const fn route(to: ChannelName) -> Self {
        Self::Route { to }
    }

    /// Stage name as used in logs and events.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Filter { name, .. } | Self::Transform { name, .. } => name,
            Self::Route { .. } => "route",
        }
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filter { name, discard, .. } => f
                .debug_struct("Filter")
                .field("name", name)
                .field("discard", discard)
                .finish_non_exhaustive(),
            Self::Transform { name, .. } => f
                .debug_struct("Transform")
                .field("name", name)
                .finish_non_exhaustive(),
            Self::Route { to } => f.debug_struct("Route").field("to", to).finish(),
        }
    }
}
