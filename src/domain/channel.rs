//! Names of the pipeline's point-to-point channels.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of channel names.
///
/// Each name identifies one typed, point-to-point conduit with a single
/// bound flow. The set is fixed at compile time; the runtime still reports
/// [`ChannelNotFound`](crate::error::PipelineError::ChannelNotFound) when a
/// name was not wired into the running pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChannelName {
    /// Entry of the booking-creation flow.
    BookingCreation,
    /// Entry of the payment-initiation flow (reply point for creation).
    PaymentInitiation,
    /// Entry of the payment-confirmation flow (webhook-fed).
    PaymentConfirmation,
    /// Entry of the booking-update flow (confirm the booking).
    BookingUpdate,
    /// Entry of the payout flow.
    Payout,
    /// Entry of the unified complete-booking flow.
    CompleteBooking,
    /// Discard sink for bookings rejected by validation filters.
    DiscardedBooking,
}

impl ChannelName {
    /// Returns the kebab-case name used in logs and events.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BookingCreation => "booking-creation",
            Self::PaymentInitiation => "payment-initiation",
            Self::PaymentConfirmation => "payment-confirmation",
            Self::BookingUpdate => "booking-update",
            Self::Payout => "payout",
            Self::CompleteBooking => "complete-booking",
            Self::DiscardedBooking => "discarded-booking",
        }
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
