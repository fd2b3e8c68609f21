//! Synchronous gateway façade over the asynchronous channel substrate.
//!
//! [`BookingGateway`] is what the front end talks to. Synchronous
//! operations tag their message with a fresh correlation id, register a
//! one-shot reply slot, send, and wait with a deadline. A timeout cancels
//! only the wait: the in-flight flow keeps running to completion and any
//! late reply is dropped.

use std::time::Duration;

use crate::config::PipelineConfig;
use crate::domain::{Booking, ChannelName, CorrelationId, Envelope, Message, Payment};
use crate::error::PipelineError;
use crate::pipeline::PipelineHandle;

/// Request/reply and fire-and-forget operations over the pipeline.
#[derive(Debug, Clone)]
pub struct BookingGateway {
    handle: PipelineHandle,
    create_booking_window: Duration,
    complete_booking_window: Duration,
}

impl BookingGateway {
    /// Creates a gateway over `handle` with the configured reply windows.
    #[must_use]
    pub fn new(handle: PipelineHandle, config: &PipelineConfig) -> Self {
        Self {
            handle,
            create_booking_window: Duration::from_millis(config.create_booking_timeout_ms),
            complete_booking_window: Duration::from_millis(config.complete_booking_timeout_ms),
        }
    }

    /// Creates a booking through the creation flow and waits for the
    /// created booking (id, status and payment id populated).
    ///
    /// # Errors
    ///
    /// [`PipelineError::GatewayTimeout`] when no reply arrives within the
    /// configured window (5 000 ms by default), or a send error when the
    /// channel is not wired.
    pub async fn create_booking(&self, booking: Booking) -> Result<Booking, PipelineError> {
        self.request(
            ChannelName::BookingCreation,
            Message::Booking(booking),
            self.create_booking_window,
        )
        .await
        .and_then(expect_booking_reply)
    }

    /// Runs the unified complete-booking workflow and waits for the final
    /// booking.
    ///
    /// # Errors
    ///
    /// [`PipelineError::GatewayTimeout`] when no reply arrives within the
    /// configured window (10 000 ms by default), including when the
    /// request was discarded by validation, which never replies.
    pub async fn process_complete_booking(
        &self,
        booking: Booking,
    ) -> Result<Booking, PipelineError> {
        self.request(
            ChannelName::CompleteBooking,
            Message::Booking(booking),
            self.complete_booking_window,
        )
        .await
        .and_then(expect_booking_reply)
    }

    /// Fire-and-forget booking creation: sends and returns immediately.
    ///
    /// # Errors
    ///
    /// Returns a send error when the creation channel is not wired or the
    /// pipeline has shut down.
    pub async fn create_booking_async(&self, booking: Booking) -> Result<(), PipelineError> {
        self.handle
            .send(
                ChannelName::BookingCreation,
                Envelope::fire_and_forget(Message::Booking(booking)),
            )
            .await
    }

    /// Feeds a provider payment confirmation into the confirmation flow.
    ///
    /// # Errors
    ///
    /// Returns a send error when the confirmation channel is not wired or
    /// the pipeline has shut down.
    pub async fn process_payment_confirmation(
        &self,
        payment: Payment,
    ) -> Result<(), PipelineError> {
        self.handle
            .send(
                ChannelName::PaymentConfirmation,
                Envelope::fire_and_forget(Message::Payment(payment)),
            )
            .await
    }

    /// Triggers the payout flow for a booking.
    ///
    /// # Errors
    ///
    /// Returns a send error when the payout channel is not wired or the
    /// pipeline has shut down.
    pub async fn process_payout(&self, booking: Booking) -> Result<(), PipelineError> {
        self.handle
            .send(
                ChannelName::Payout,
                Envelope::fire_and_forget(Message::Booking(booking)),
            )
            .await
    }

    /// Correlated request with a deadline.
    async fn request(
        &self,
        channel: ChannelName,
        message: Message,
        window: Duration,
    ) -> Result<Message, PipelineError> {
        let correlation = CorrelationId::new();
        let slot = self.handle.replies().register(correlation).await;

        if let Err(err) = self
            .handle
            .send(channel, Envelope::correlated(message, correlation))
            .await
        {
            self.handle.replies().cancel(correlation).await;
            return Err(err);
        }

        match tokio::time::timeout(window, slot).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(PipelineError::ChannelClosed(channel)),
            Err(_) => {
                self.handle.replies().cancel(correlation).await;
                let waited_ms = window.as_millis().try_into().unwrap_or(u64::MAX);
                tracing::warn!(%channel, %correlation, waited_ms, "gateway reply window elapsed");
                Err(PipelineError::GatewayTimeout { channel, waited_ms })
            }
        }
    }
}

fn expect_booking_reply(message: Message) -> Result<Booking, PipelineError> {
    match message {
        Message::Booking(booking) => Ok(booking),
        Message::Payment(_) => Err(PipelineError::UnexpectedPayload {
            stage: "gateway-reply",
            expected: "booking",
        }),
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::pipeline::{FlowDefinition, PipelineBuilder};

    fn short_config() -> PipelineConfig {
        PipelineConfig {
            create_booking_timeout_ms: 100,
            complete_booking_timeout_ms: 100,
            ..PipelineConfig::default()
        }
    }

    #[tokio::test]
    async fn request_to_unwired_channel_fails_fast() {
        let pipeline = PipelineBuilder::new(8, 16).build();
        let gateway = BookingGateway::new(pipeline.handle(), &short_config());

        let result = gateway.create_booking(Booking::request(1, 1, 1, 1)).await;
        assert!(matches!(
            result,
            Err(PipelineError::ChannelNotFound(ChannelName::BookingCreation))
        ));
        assert_eq!(pipeline.handle().replies().pending().await, 0);

        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn silent_flow_times_out_and_clears_slot() {
        // A flow that drops everything: filter false, no discard channel.
        let silent = FlowDefinition::from(ChannelName::CompleteBooking)
            .filter("never", |_| false)
            .end();
        let pipeline = PipelineBuilder::new(8, 16).flow(silent).build();
        let gateway = BookingGateway::new(pipeline.handle(), &short_config());

        let result = gateway
            .process_complete_booking(Booking::request(1, 1, 1, 1))
            .await;
        assert!(matches!(
            result,
            Err(PipelineError::GatewayTimeout { channel: ChannelName::CompleteBooking, waited_ms: 100 })
        ));
        assert_eq!(pipeline.handle().replies().pending().await, 0);

        pipeline.shutdown().await;
    }
}
