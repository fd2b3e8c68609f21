//! Channel runtime: named conduits, one worker per flow, error sink.
//!
//! [`PipelineBuilder`] turns a set of [`FlowDefinition`]s into a running
//! [`Pipeline`]: one bounded mpsc channel per entry name (point-to-point,
//! per-producer FIFO) and one worker task per flow. Producers talk to the
//! runtime through a cloneable [`PipelineHandle`] holding only weak
//! senders, so workers never keep their own channels alive and shutdown
//! can drain the topology upstream-first.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::domain::{ChannelName, Envelope, EventBus, Message, PipelineEvent};
use crate::error::PipelineError;

use super::flow::FlowDefinition;
use super::replies::ReplyRegistry;
use super::stage::Stage;

/// A message that failed in a transform stage, forwarded whole to the
/// error sink: the payload as it entered the stage, plus the cause.
#[derive(Debug)]
pub struct FailedMessage {
    /// Entry channel of the flow that failed.
    pub channel: ChannelName,
    /// Stage that raised.
    pub stage: String,
    /// The message as it entered the failing stage, unmodified.
    pub message: Message,
    /// Why the stage failed.
    pub cause: PipelineError,
}

/// Builds a [`Pipeline`] from flow definitions.
///
/// Flows must be registered upstream before downstream: shutdown drains
/// channels in registration order, so an upstream worker must be able to
/// route into channels that are still open.
#[derive(Debug)]
pub struct PipelineBuilder {
    channel_capacity: usize,
    events: EventBus,
    flows: Vec<FlowDefinition>,
}

impl PipelineBuilder {
    /// Creates a builder with the given channel and event-bus capacities.
    #[must_use]
    pub fn new(channel_capacity: usize, event_bus_capacity: usize) -> Self {
        Self {
            channel_capacity,
            events: EventBus::new(event_bus_capacity),
            flows: Vec::new(),
        }
    }

    /// Registers one flow definition.
    #[must_use]
    pub fn flow(mut self, flow: FlowDefinition) -> Self {
        self.flows.push(flow);
        self
    }

    /// Registers several flow definitions in order.
    #[must_use]
    pub fn flows<I>(mut self, flows: I) -> Self
    where
        I: IntoIterator<Item = FlowDefinition>,
    {
        self.flows.extend(flows);
        self
    }

    /// Creates the channels, spawns one worker per flow plus the error
    /// sink, and returns the running pipeline.
    ///
    /// A second flow registered for an already-bound channel is skipped
    /// with a warning: channels are point-to-point, one consumer chain
    /// each.
    #[must_use]
    pub fn build(self) -> Pipeline {
        let mut order = Vec::with_capacity(self.flows.len());
        let mut senders = HashMap::new();
        let mut receivers = Vec::new();

        let mut flows = Vec::with_capacity(self.flows.len());
        for flow in self.flows {
            if senders.contains_key(&flow.entry) {
                tracing::warn!(channel = %flow.entry, "channel already bound, skipping flow");
                continue;
            }
            let (tx, rx) = mpsc::channel(self.channel_capacity);
            order.push(flow.entry);
            senders.insert(flow.entry, tx);
            receivers.push(rx);
            flows.push(flow);
        }

        let (error_tx, error_rx) = mpsc::channel(self.channel_capacity);
        let replies = Arc::new(ReplyRegistry::new());

        let weak: HashMap<_, _> = senders
            .iter()
            .map(|(name, tx)| (*name, tx.downgrade()))
            .collect();
        let handle = PipelineHandle {
            channels: Arc::new(weak),
            error: error_tx.downgrade(),
            replies: Arc::clone(&replies),
            events: self.events.clone(),
        };

        let mut workers = HashMap::new();
        for (flow, rx) in flows.into_iter().zip(receivers) {
            let entry = flow.entry;
            workers.insert(entry, tokio::spawn(run_flow(flow, rx, handle.clone())));
        }
        let error_worker = tokio::spawn(run_error_sink(error_rx));

        tracing::info!(channels = order.len(), "pipeline started");
        Pipeline {
            order,
            senders,
            workers,
            error_tx,
            error_worker,
            handle,
        }
    }
}

/// A running pipeline: owns the strong channel senders and the worker
/// tasks. Dropped senders are what eventually stop the workers, so keep
/// the `Pipeline` alive for as long as messages may be produced.
#[derive(Debug)]
pub struct Pipeline {
    order: Vec<ChannelName>,
    senders: HashMap<ChannelName, mpsc::Sender<Envelope>>,
    workers: HashMap<ChannelName, JoinHandle<()>>,
    error_tx: mpsc::Sender<FailedMessage>,
    error_worker: JoinHandle<()>,
    handle: PipelineHandle,
}

impl Pipeline {
    /// Returns a cloneable producer handle.
    #[must_use]
    pub fn handle(&self) -> PipelineHandle {
        self.handle.clone()
    }

    /// Returns the observability event bus.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.handle.events
    }

    /// Drains and stops the pipeline.
    ///
    /// Channels are closed in registration order (upstream first), joining
    /// each worker before closing the next, so queued messages still reach
    /// open downstream channels. The error sink closes last.
    pub async fn shutdown(self) {
        let Self {
            order,
            mut senders,
            mut workers,
            error_tx,
            error_worker,
            handle,
        } = self;
        drop(handle);

        for channel in order {
            senders.remove(&channel);
            if let Some(worker) = workers.remove(&channel)
                && worker.await.is_err()
            {
                tracing::error!(%channel, "flow worker panicked");
            }
        }

        drop(error_tx);
        if error_worker.await.is_err() {
            tracing::error!("error sink worker panicked");
        }
        tracing::info!("pipeline stopped");
    }
}

/// Cloneable producer-side handle: weak channel senders, the reply
/// registry and the event bus.
#[derive(Debug, Clone)]
pub struct PipelineHandle {
    channels: Arc<HashMap<ChannelName, mpsc::WeakSender<Envelope>>>,
    error: mpsc::WeakSender<FailedMessage>,
    replies: Arc<ReplyRegistry>,
    events: EventBus,
}

impl PipelineHandle {
    /// Sends an envelope to a named channel, awaiting queue capacity.
    ///
    /// # Errors
    ///
    /// [`PipelineError::ChannelNotFound`] when the name was never wired,
    /// [`PipelineError::ChannelClosed`] once the pipeline has shut the
    /// channel down.
    pub async fn send(&self, channel: ChannelName, envelope: Envelope) -> Result<(), PipelineError> {
        let sender = self
            .channels
            .get(&channel)
            .ok_or(PipelineError::ChannelNotFound(channel))?
            .upgrade()
            .ok_or(PipelineError::ChannelClosed(channel))?;
        sender
            .send(envelope)
            .await
            .map_err(|_| PipelineError::ChannelClosed(channel))
    }

    /// Returns the reply registry shared with the gateway.
    #[must_use]
    pub fn replies(&self) -> &Arc<ReplyRegistry> {
        &self.replies
    }

    /// Returns the observability event bus.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Runs one flow's stage chain over one envelope.
    async fn execute(&self, flow: &FlowDefinition, mut envelope: Envelope) {
        for stage in &flow.stages {
            match stage {
                Stage::Filter {
                    name,
                    predicate,
                    discard,
                } => {
                    if predicate(&envelope.message) {
                        continue;
                    }
                    self.events.publish(PipelineEvent::MessageDiscarded {
                        channel: flow.entry,
                        stage: (*name).to_string(),
                        discard_to: *discard,
                        message: envelope.message.clone(),
                        timestamp: Utc::now(),
                    });
                    match discard {
                        Some(target) => {
                            // Discard is terminal: the rejected message
                            // never produces a reply.
                            envelope.correlation = None;
                            if let Err(err) = self.send(*target, envelope).await {
                                tracing::error!(
                                    channel = %flow.entry,
                                    stage = name,
                                    %err,
                                    "failed to forward discarded message"
                                );
                            }
                        }
                        None => tracing::info!(
                            channel = %flow.entry,
                            stage = name,
                            "message discarded"
                        ),
                    }
                    return;
                }

                Stage::Transform { name, op } => {
                    let original = envelope.message.clone();
                    match op(envelope.message).await {
                        Ok(next) => envelope.message = next,
                        Err(cause) => {
                            self.fail(flow.entry, name, original, cause).await;
                            return;
                        }
                    }
                }

                Stage::Route { to } => {
                    let message = envelope.message.clone();
                    match self.send(*to, envelope).await {
                        Ok(()) => {
                            self.events.publish(PipelineEvent::MessageRouted {
                                from: flow.entry,
                                to: *to,
                                timestamp: Utc::now(),
                            });
                        }
                        Err(cause) => self.fail(flow.entry, "route", message, cause).await,
                    }
                    return;
                }
            }
        }

        self.events.publish(PipelineEvent::FlowCompleted {
            channel: flow.entry,
            message: envelope.message.clone(),
            timestamp: Utc::now(),
        });
        if let Some(correlation) = envelope.correlation
            && !self.replies.fulfil(correlation, envelope.message).await
        {
            tracing::debug!(%correlation, "no reply slot; caller gone or timed out");
        }
    }

    /// Forwards a failed message and its cause to the error sink.
    async fn fail(
        &self,
        channel: ChannelName,
        stage: &str,
        message: Message,
        cause: PipelineError,
    ) {
        tracing::warn!(%channel, stage, %cause, "stage failed, forwarding to error sink");
        self.events.publish(PipelineEvent::StageFailed {
            channel,
            stage: stage.to_string(),
            message: message.clone(),
            cause: cause.to_string(),
            timestamp: Utc::now(),
        });

        let failed = FailedMessage {
            channel,
            stage: stage.to_string(),
            message,
            cause,
        };
        match self.error.upgrade() {
            Some(sink) => {
                if sink.send(failed).await.is_err() {
                    tracing::error!(%channel, "error sink closed, failure only logged");
                }
            }
            None => tracing::error!(%channel, "error sink unavailable during shutdown"),
        }
    }
}

/// Worker loop: one per flow, consuming its entry channel in send order.
async fn run_flow(flow: FlowDefinition, mut rx: mpsc::Receiver<Envelope>, handle: PipelineHandle) {
    tracing::debug!(channel = %flow.entry, stages = flow.stages.len(), "flow worker started");
    while let Some(envelope) = rx.recv().await {
        handle.execute(&flow, envelope).await;
    }
    tracing::debug!(channel = %flow.entry, "flow worker stopped");
}

/// Terminal error sink: records failed payloads and causes, never
/// re-injects anything into the pipeline.
async fn run_error_sink(mut rx: mpsc::Receiver<FailedMessage>) {
    while let Some(failed) = rx.recv().await {
        tracing::error!(
            channel = %failed.channel,
            stage = %failed.stage,
            payload = failed.message.kind(),
            cause = %failed.cause,
            "message failed in pipeline"
        );
    }
}
