//! Booking collaborator: creation and confirmation of bookings.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::domain::{Booking, BookingId, BookingStatus, Payment};
use crate::error::PipelineError;

/// Business operations on bookings, free of any pipeline topology
/// knowledge. Implementations own whatever storage they need.
#[async_trait]
pub trait BookingService: Send + Sync {
    /// Creates a booking: validates the identity fields, assigns an id,
    /// stamps the booking time and sets status `PendingPayment`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidBooking`] when a required field is
    /// missing.
    async fn create_booking(&self, booking: Booking) -> Result<Booking, PipelineError>;

    /// Resolves the booking behind `payment.booking_id` and confirms it,
    /// recording the payment's transaction id.
    ///
    /// Idempotent by payment id: a booking already confirmed with the same
    /// transaction id is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::BookingNotFound`] when no booking exists
    /// for the payment.
    async fn confirm_booking(&self, payment: Payment) -> Result<Booking, PipelineError>;
}

/// In-memory booking store standing in for the persistence layer.
#[derive(Debug, Default)]
pub struct InMemoryBookingService {
    bookings: RwLock<HashMap<BookingId, Booking>>,
}

impl InMemoryBookingService {
    /// Creates an empty booking store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the stored booking, if any.
    pub async fn get(&self, id: BookingId) -> Option<Booking> {
        self.bookings.read().await.get(&id).cloned()
    }

    /// Returns the number of stored bookings.
    pub async fn len(&self) -> usize {
        self.bookings.read().await.len()
    }

    /// Returns `true` if no bookings are stored.
    pub async fn is_empty(&self) -> bool {
        self.bookings.read().await.is_empty()
    }
}

fn require(field: Option<u64>, name: &str) -> Result<u64, PipelineError> {
    field.ok_or_else(|| PipelineError::InvalidBooking(format!("{name} cannot be missing")))
}

#[async_trait]
impl BookingService for InMemoryBookingService {
    async fn create_booking(&self, mut booking: Booking) -> Result<Booking, PipelineError> {
        let client_id = require(booking.client_id, "client id")?;
        let tenant_id = require(booking.tenant_id, "tenant id")?;
        require(booking.schedule_id, "schedule id")?;
        require(booking.deed_id, "deed id")?;

        let id = BookingId::new();
        booking.id = Some(id);
        booking.booking_time = Some(Utc::now());
        booking.status = BookingStatus::PendingPayment;

        self.bookings.write().await.insert(id, booking.clone());

        tracing::info!(%id, client_id, tenant_id, "booking created, pending payment");
        Ok(booking)
    }

    async fn confirm_booking(&self, payment: Payment) -> Result<Booking, PipelineError> {
        let mut bookings = self.bookings.write().await;
        let booking = bookings
            .get_mut(&payment.booking_id)
            .ok_or(PipelineError::BookingNotFound(payment.booking_id))?;

        if booking.status == BookingStatus::Confirmed
            && booking.payment_id.as_deref() == Some(payment.transaction_id.as_str())
        {
            tracing::info!(
                booking_id = %payment.booking_id,
                transaction_id = %payment.transaction_id,
                "booking already confirmed for this payment"
            );
            return Ok(booking.clone());
        }

        booking.status = BookingStatus::Confirmed;
        booking.payment_id = Some(payment.transaction_id.clone());

        tracing::info!(
            booking_id = %payment.booking_id,
            transaction_id = %payment.transaction_id,
            "booking confirmed"
        );
        Ok(booking.clone())
    }
}
