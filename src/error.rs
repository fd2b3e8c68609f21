//! Pipeline error types.
//!
//! [`PipelineError`] is the central error type. Filters never produce one;
//! a false predicate is a discard, not an error. Transform failures are
//! caught at the stage boundary and forwarded whole to the error sink;
//! gateway timeouts surface only to the waiting caller.

use crate::domain::{BookingId, ChannelName};

/// Central error enum for the pipeline, its collaborators, and the gateway.
///
/// `Clone` so a failure can be both forwarded to the error sink and
/// rendered into an observability event.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PipelineError {
    /// The named channel was not wired into the running pipeline.
    #[error("channel not found: {0}")]
    ChannelNotFound(ChannelName),

    /// The named channel's worker has shut down.
    #[error("channel closed: {0}")]
    ChannelClosed(ChannelName),

    /// No correlated reply arrived within the configured window. The
    /// in-flight flow keeps running; only the caller's wait is cancelled.
    #[error("no reply from {channel} within {waited_ms} ms")]
    GatewayTimeout {
        /// Channel the request was sent to.
        channel: ChannelName,
        /// Configured wait in milliseconds.
        waited_ms: u64,
    },

    /// A booking failed collaborator-side validation.
    #[error("invalid booking: {0}")]
    InvalidBooking(String),

    /// A payment failed collaborator-side validation.
    #[error("invalid payment: {0}")]
    InvalidPayment(String),

    /// No booking exists for the given id.
    #[error("booking not found: {0}")]
    BookingNotFound(BookingId),

    /// A stage received a payload type it cannot operate on.
    #[error("stage {stage} expected a {expected} payload")]
    UnexpectedPayload {
        /// Stage that received the payload.
        stage: &'static str,
        /// Payload kind the stage operates on.
        expected: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_channel() {
        let err = PipelineError::ChannelNotFound(ChannelName::Payout);
        assert_eq!(err.to_string(), "channel not found: payout");
    }

    #[test]
    fn timeout_reports_window() {
        let err = PipelineError::GatewayTimeout {
            channel: ChannelName::BookingCreation,
            waited_ms: 5000,
        };
        assert_eq!(err.to_string(), "no reply from booking-creation within 5000 ms");
    }
}
