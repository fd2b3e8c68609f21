//! Booking entity and its status lifecycle.
//!
//! A [`Booking`] enters the pipeline as a bare request (identity fields
//! only), is assigned an id and `PendingPayment` status by the creation
//! flow, and is driven to `Confirmed` by the payment-confirmation flow.
//! The pipeline never deletes a booking.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a booking.
///
/// Wraps a UUID v4. Assigned once by
/// [`BookingService::create_booking`](crate::service::BookingService::create_booking)
/// and immutable thereafter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingId(uuid::Uuid);

impl BookingId {
    /// Creates a new random `BookingId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Creates a `BookingId` from an existing [`uuid::Uuid`].
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for BookingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for BookingId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Lifecycle state of a booking.
///
/// Status only advances forward along a flow: `New` → `PendingPayment`
/// (creation) → `Confirmed` (payment confirmation). `Rejected` is terminal
/// and reached only through the discarded-booking sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    /// Request received, not yet validated or persisted.
    New,
    /// Created and waiting for the payment to complete.
    PendingPayment,
    /// Payment confirmed; eligible for payout.
    Confirmed,
    /// Rejected by a validation filter; never re-enters the pipeline.
    Rejected,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::New => "NEW",
            Self::PendingPayment => "PENDING_PAYMENT",
            Self::Confirmed => "CONFIRMED",
            Self::Rejected => "REJECTED",
        };
        write!(f, "{s}")
    }
}

/// A booking of a deed's schedule slot by a client with a tenant.
///
/// Identity fields are optional because their presence is validated by the
/// first filter of the creation flows, not by the type; an incomplete
/// request must be representable so it can be deliberately discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Identifier, assigned by the booking collaborator on creation.
    pub id: Option<BookingId>,
    /// Client placing the booking.
    pub client_id: Option<u64>,
    /// Tenant whose deed is being booked.
    pub tenant_id: Option<u64>,
    /// Schedule slot being reserved.
    pub schedule_id: Option<u64>,
    /// Deed (service offering) being booked.
    pub deed_id: Option<u64>,
    /// When the booking was created, stamped by the collaborator.
    pub booking_time: Option<DateTime<Utc>>,
    /// Lifecycle state.
    pub status: BookingStatus,
    /// Payment transaction id, set exactly once by payment initiation.
    pub payment_id: Option<String>,
}

impl Booking {
    /// Builds a new booking request with all four identity fields set and
    /// status [`BookingStatus::New`].
    #[must_use]
    pub fn request(client_id: u64, tenant_id: u64, schedule_id: u64, deed_id: u64) -> Self {
        Self {
            id: None,
            client_id: Some(client_id),
            tenant_id: Some(tenant_id),
            schedule_id: Some(schedule_id),
            deed_id: Some(deed_id),
            booking_time: None,
            status: BookingStatus::New,
            payment_id: None,
        }
    }

    /// Returns `true` if both client and tenant are present, the gate of
    /// the booking-creation flow.
    #[must_use]
    pub const fn has_client_and_tenant(&self) -> bool {
        self.client_id.is_some() && self.tenant_id.is_some()
    }

    /// Returns `true` if all four identity fields are present, the gate of
    /// the complete-booking flow.
    #[must_use]
    pub const fn has_required_fields(&self) -> bool {
        self.client_id.is_some()
            && self.tenant_id.is_some()
            && self.schedule_id.is_some()
            && self.deed_id.is_some()
    }
}

impl Default for Booking {
    fn default() -> Self {
        Self {
            id: None,
            client_id: None,
            tenant_id: None,
            schedule_id: None,
            deed_id: None,
            booking_time: None,
            status: BookingStatus::New,
            payment_id: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn request_sets_all_identity_fields() {
        let booking = Booking::request(1, 2, 3, 4);
        assert_eq!(booking.client_id, Some(1));
        assert_eq!(booking.tenant_id, Some(2));
        assert_eq!(booking.schedule_id, Some(3));
        assert_eq!(booking.deed_id, Some(4));
        assert_eq!(booking.status, BookingStatus::New);
        assert!(booking.id.is_none());
        assert!(booking.payment_id.is_none());
    }

    #[test]
    fn default_booking_fails_both_gates() {
        let booking = Booking::default();
        assert!(!booking.has_client_and_tenant());
        assert!(!booking.has_required_fields());
    }

    #[test]
    fn missing_schedule_passes_creation_gate_only() {
        let booking = Booking {
            schedule_id: None,
            ..Booking::request(1, 1, 1, 1)
        };
        assert!(booking.has_client_and_tenant());
        assert!(!booking.has_required_fields());
    }

    #[test]
    fn booking_id_display_is_uuid_format() {
        let id = BookingId::new();
        let s = format!("{id}");
        assert_eq!(s.len(), 36);
        assert!(s.contains('-'));
    }

    #[test]
    fn booking_id_parses_back_from_display() {
        let id = BookingId::new();
        let parsed: Result<BookingId, _> = format!("{id}").parse();
        let Ok(parsed) = parsed else {
            panic!("round trip failed");
        };
        assert_eq!(id, parsed);
    }

    #[test]
    fn status_serializes_screaming_snake() {
        let json = serde_json::to_string(&BookingStatus::PendingPayment).ok();
        assert_eq!(json.as_deref(), Some("\"PENDING_PAYMENT\""));
    }
}
