//! Flow definitions: immutable stage chains bound to an entry channel.
//!
//! A [`FlowDefinition`] is built once, before dispatch begins, and is
//! stateless across messages. The builder makes routing terminal by
//! construction: `route` and `end` both consume the builder.

use crate::domain::ChannelName;

use super::stage::Stage;

/// An ordered stage chain bound to one entry channel.
#[derive(Debug)]
pub struct FlowDefinition {
    /// Channel whose messages this flow consumes.
    pub entry: ChannelName,
    /// Stages executed in order for each message.
    pub stages: Vec<Stage>,
}

impl FlowDefinition {
    /// Starts building a flow consuming from `entry`.
    #[must_use]
    pub const fn from(entry: ChannelName) -> FlowBuilder {
        FlowBuilder {
            entry,
            stages: Vec::new(),
        }
    }
}

/// Builder for a [`FlowDefinition`].
#[derive(Debug)]
pub struct FlowBuilder {
    entry: ChannelName,
    stages: Vec<Stage>,
}

impl FlowBuilder {
    /// Appends a filter stage; rejections are logged and dropped.
    #[must_use]
    pub fn filter<P>(mut self, name: &'static str, predicate: P) -> Self
    where
        P: Fn(&crate::domain::Message) -> bool + Send + Sync + 'static,
    {
        self.stages.push(Stage::filter(name, predicate));
        self
    }

    /// Appends a filter stage forwarding rejections to `discard`.
    #[must_use]
    pub fn filter_with_discard<P>(
        mut self,
        name: &'static str,
        discard: ChannelName,
        predicate: P,
    ) -> Self
    where
        P: Fn(&crate::domain::Message) -> bool + Send + Sync + 'static,
    {
        self.stages.push(Stage::filter_with_discard(name, discard, predicate));
        self
    }

    /// Appends a transform stage.
    #[must_use]
    pub fn transform<F, Fut>(mut self, name: &'static str, op: F) -> Self
    where
        F: Fn(crate::domain::Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<crate::domain::Message, crate::error::PipelineError>>
            + Send
            + 'static,
    {
        self.stages.push(Stage::transform(name, op));
        self
    }

    /// Finishes the flow with a hand-off to a downstream channel.
    #[must_use]
    pub fn route(mut self, to: ChannelName) -> FlowDefinition {
        self.stages.push(Stage::route(to));
        self.end()
    }

    /// Finishes the flow; a correlated message completing here fulfils the
    /// caller's reply slot.
    #[must_use]
    pub fn end(self) -> FlowDefinition {
        FlowDefinition {
            entry: self.entry,
            stages: self.stages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_preserves_stage_order() {
        let flow = FlowDefinition::from(ChannelName::BookingCreation)
            .filter("gate", |_| true)
            .transform("noop", |message| async move { Ok(message) })
            .route(ChannelName::PaymentInitiation);

        assert_eq!(flow.entry, ChannelName::BookingCreation);
        let names: Vec<_> = flow.stages.iter().map(super::Stage::name).collect();
        assert_eq!(names, vec!["gate", "noop", "route"]);
    }

    #[test]
    fn end_can_close_an_empty_chain() {
        let flow = FlowDefinition::from(ChannelName::Payout).end();
        assert!(flow.stages.is_empty());
    }
}
