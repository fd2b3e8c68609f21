//! Collaborator services invoked by transform stages.
//!
//! The pipeline knows these only through the [`BookingService`] and
//! [`PaymentService`] traits; the in-memory implementations stand in for
//! the out-of-scope persistence and payment-provider layers.

pub mod booking_service;
pub mod payment_service;

pub use booking_service::{BookingService, InMemoryBookingService};
pub use payment_service::{InMemoryPaymentService, PaymentService, PayoutRecord};
