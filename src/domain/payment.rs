//! Payment entity tied to a booking's transaction.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::BookingId;

/// Unique identifier for a payment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(uuid::Uuid);

impl PaymentId {
    /// Creates a new random `PaymentId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for PaymentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Initiated, awaiting out-of-band confirmation.
    Pending,
    /// Confirmed by the payment provider.
    Completed,
    /// Rejected or failed at the provider.
    Failed,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        };
        write!(f, "{s}")
    }
}

/// A payment transaction belonging to one booking.
///
/// Created `Pending` by payment initiation and driven to `Completed` by the
/// confirmation flow (webhook-fed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Identifier, assigned by the payment collaborator.
    pub id: Option<PaymentId>,
    /// Booking this payment belongs to.
    pub booking_id: BookingId,
    /// Provider-side transaction id (`PAY_…`).
    pub transaction_id: String,
    /// Amount charged to the client.
    pub amount: Decimal,
    /// Lifecycle state.
    pub status: PaymentStatus,
    /// When the payment record was created.
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// Builds a completed-payment confirmation as delivered by the
    /// out-of-scope webhook.
    #[must_use]
    pub fn confirmation(booking_id: BookingId, transaction_id: String, amount: Decimal) -> Self {
        Self {
            id: None,
            booking_id,
            transaction_id,
            amount,
            status: PaymentStatus::Completed,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn confirmation_is_completed() {
        let payment = Payment::confirmation(BookingId::new(), "TXN_12345".to_string(), dec!(100.00));
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert_eq!(payment.transaction_id, "TXN_12345");
        assert!(payment.id.is_none());
    }

    #[test]
    fn payment_serde_round_trip() {
        let payment = Payment::confirmation(BookingId::new(), "TXN_1".to_string(), dec!(42.50));
        let json = serde_json::to_string(&payment).ok();
        let Some(json) = json else {
            panic!("serialization failed");
        };
        let back: Option<Payment> = serde_json::from_str(&json).ok();
        assert_eq!(back, Some(payment));
    }
}
