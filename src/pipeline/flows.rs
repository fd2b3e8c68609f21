//! The booking/payment/payout flow topology.
//!
//! [`booking_flows`] wires the fixed set of flows over the collaborator
//! services. Flows that hop through an intermediate channel (the creation
//! flow hands off to payment initiation, confirmation hands off to the
//! booking update and then payout) are decomposed into one definition per
//! entry channel ending in a route stage, so each channel keeps a single
//! bound consumer chain.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::domain::{Booking, BookingStatus, ChannelName, Message, Payment, PaymentStatus};
use crate::error::PipelineError;
use crate::service::{BookingService, PaymentService};

use super::flow::FlowDefinition;

fn expect_booking(stage: &'static str, message: Message) -> Result<Booking, PipelineError> {
    match message {
        Message::Booking(booking) => Ok(booking),
        Message::Payment(_) => Err(PipelineError::UnexpectedPayload {
            stage,
            expected: "booking",
        }),
    }
}

fn expect_payment(stage: &'static str, message: Message) -> Result<Payment, PipelineError> {
    match message {
        Message::Payment(payment) => Ok(payment),
        Message::Booking(_) => Err(PipelineError::UnexpectedPayload {
            stage,
            expected: "payment",
        }),
    }
}

fn is_booking_with_client_and_tenant(message: &Message) -> bool {
    matches!(message, Message::Booking(b) if b.has_client_and_tenant())
}

fn is_complete_booking_request(message: &Message) -> bool {
    matches!(message, Message::Booking(b) if b.has_required_fields())
}

fn is_pending_payment(message: &Message) -> bool {
    matches!(message, Message::Booking(b) if b.status == BookingStatus::PendingPayment)
}

fn is_confirmed_booking(message: &Message) -> bool {
    matches!(message, Message::Booking(b) if b.status == BookingStatus::Confirmed)
}

fn is_completed_payment(message: &Message) -> bool {
    matches!(message, Message::Payment(p) if p.status == PaymentStatus::Completed)
}

/// Builds the full flow topology, upstream flows before downstream ones
/// (the order the runtime drains them in on shutdown).
///
/// `payment_amount` is the charge the unified complete-booking flow settles
/// when it simulates the provider confirmation.
#[must_use]
pub fn booking_flows(
    booking_service: Arc<dyn BookingService>,
    payment_service: Arc<dyn PaymentService>,
    payment_amount: Decimal,
) -> Vec<FlowDefinition> {
    vec![
        complete_booking_flow(
            Arc::clone(&booking_service),
            Arc::clone(&payment_service),
            payment_amount,
        ),
        booking_creation_flow(Arc::clone(&booking_service)),
        payment_initiation_flow(Arc::clone(&payment_service)),
        payment_confirmation_flow(Arc::clone(&payment_service)),
        booking_update_flow(booking_service),
        payout_flow(payment_service),
        discarded_booking_flow(),
    ]
}

/// Validate → create → gate on pending payment → hand off to initiation.
fn booking_creation_flow(booking_service: Arc<dyn BookingService>) -> FlowDefinition {
    FlowDefinition::from(ChannelName::BookingCreation)
        .filter_with_discard(
            "client-and-tenant-present",
            ChannelName::DiscardedBooking,
            is_booking_with_client_and_tenant,
        )
        .transform("create-booking", move |message| {
            let service = Arc::clone(&booking_service);
            async move {
                let booking = expect_booking("create-booking", message)?;
                Ok(Message::Booking(service.create_booking(booking).await?))
            }
        })
        .filter("pending-payment", is_pending_payment)
        .route(ChannelName::PaymentInitiation)
}

/// Initiate payment with the provider; reply point for `create-booking`.
fn payment_initiation_flow(payment_service: Arc<dyn PaymentService>) -> FlowDefinition {
    FlowDefinition::from(ChannelName::PaymentInitiation)
        .transform("initiate-payment", move |message| {
            let service = Arc::clone(&payment_service);
            async move {
                let booking = expect_booking("initiate-payment", message)?;
                Ok(Message::Booking(service.initiate_payment(booking).await?))
            }
        })
        .end()
}

/// Webhook-fed confirmation: gate on completed payments, record, hand off
/// to the booking update.
fn payment_confirmation_flow(payment_service: Arc<dyn PaymentService>) -> FlowDefinition {
    FlowDefinition::from(ChannelName::PaymentConfirmation)
        .filter("payment-completed", is_completed_payment)
        .transform("process-payment-confirmation", move |message| {
            let service = Arc::clone(&payment_service);
            async move {
                let payment = expect_payment("process-payment-confirmation", message)?;
                Ok(Message::Payment(
                    service.process_payment_confirmation(payment).await?,
                ))
            }
        })
        .route(ChannelName::BookingUpdate)
}

/// Confirm the booking behind the payment and hand off to payout.
fn booking_update_flow(booking_service: Arc<dyn BookingService>) -> FlowDefinition {
    FlowDefinition::from(ChannelName::BookingUpdate)
        .transform("confirm-booking", move |message| {
            let service = Arc::clone(&booking_service);
            async move {
                let payment = expect_payment("confirm-booking", message)?;
                Ok(Message::Booking(service.confirm_booking(payment).await?))
            }
        })
        .route(ChannelName::Payout)
}

/// Pay the tenant out for confirmed bookings only.
fn payout_flow(payment_service: Arc<dyn PaymentService>) -> FlowDefinition {
    FlowDefinition::from(ChannelName::Payout)
        .filter("booking-confirmed", is_confirmed_booking)
        .transform("process-payout", move |message| {
            let service = Arc::clone(&payment_service);
            async move {
                let booking = expect_booking("process-payout", message)?;
                Ok(Message::Booking(service.process_payout(booking).await?))
            }
        })
        .end()
}

/// The unified workflow behind the synchronous `complete-booking`
/// operation: create, initiate, settle the provider confirmation inline,
/// confirm and pay out, all in one chain.
fn complete_booking_flow(
    booking_service: Arc<dyn BookingService>,
    payment_service: Arc<dyn PaymentService>,
    payment_amount: Decimal,
) -> FlowDefinition {
    let settle_bookings = Arc::clone(&booking_service);
    let settle_payments = Arc::clone(&payment_service);
    let payout_payments = Arc::clone(&payment_service);

    FlowDefinition::from(ChannelName::CompleteBooking)
        .filter_with_discard(
            "required-fields-present",
            ChannelName::DiscardedBooking,
            is_complete_booking_request,
        )
        .transform("create-booking", move |message| {
            let service = Arc::clone(&booking_service);
            async move {
                let booking = expect_booking("create-booking", message)?;
                Ok(Message::Booking(service.create_booking(booking).await?))
            }
        })
        .filter("pending-payment", is_pending_payment)
        .transform("initiate-payment", move |message| {
            let service = Arc::clone(&payment_service);
            async move {
                let booking = expect_booking("initiate-payment", message)?;
                Ok(Message::Booking(service.initiate_payment(booking).await?))
            }
        })
        .transform("settle-and-confirm", move |message| {
            let bookings = Arc::clone(&settle_bookings);
            let payments = Arc::clone(&settle_payments);
            async move {
                let booking = expect_booking("settle-and-confirm", message)?;
                let booking_id = booking.id.ok_or_else(|| {
                    PipelineError::InvalidBooking("booking has no id to settle".to_string())
                })?;
                let transaction_id = booking.payment_id.clone().ok_or_else(|| {
                    PipelineError::InvalidBooking("no payment initiated for booking".to_string())
                })?;

                tracing::info!(
                    %booking_id,
                    %transaction_id,
                    "settling provider confirmation inline"
                );
                let confirmation =
                    Payment::confirmation(booking_id, transaction_id, payment_amount);
                let payment = payments.process_payment_confirmation(confirmation).await?;
                Ok(Message::Booking(bookings.confirm_booking(payment).await?))
            }
        })
        .transform("process-payout", move |message| {
            let service = Arc::clone(&payout_payments);
            async move {
                let booking = expect_booking("process-payout", message)?;
                Ok(Message::Booking(service.process_payout(booking).await?))
            }
        })
        .end()
}

/// Terminal sink for rejected bookings: record the rejection, produce no
/// further message.
fn discarded_booking_flow() -> FlowDefinition {
    FlowDefinition::from(ChannelName::DiscardedBooking)
        .transform("record-rejection", |message| async move {
            let mut booking = expect_booking("record-rejection", message)?;
            booking.status = BookingStatus::Rejected;
            tracing::warn!(
                client_id = ?booking.client_id,
                tenant_id = ?booking.tenant_id,
                schedule_id = ?booking.schedule_id,
                deed_id = ?booking.deed_id,
                "booking discarded due to missing required fields"
            );
            Ok(Message::Booking(booking))
        })
        .end()
}
