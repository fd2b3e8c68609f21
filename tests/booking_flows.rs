//! End-to-end tests of the booking/payment/payout flow topology.
//!
//! Assertions observe the pipeline through the event bus and the
//! collaborator stores; no test reaches into the channels themselves.

#![allow(clippy::panic)]

use std::sync::Arc;

use rust_decimal_macros::dec;
use tokio::sync::broadcast;

use booking_pipeline::config::PipelineConfig;
use booking_pipeline::domain::{
    Booking, BookingId, BookingStatus, ChannelName, Payment, PipelineEvent,
};
use booking_pipeline::error::PipelineError;
use booking_pipeline::gateway::BookingGateway;
use booking_pipeline::pipeline::{Pipeline, PipelineBuilder, booking_flows};
use booking_pipeline::service::{
    BookingService, InMemoryBookingService, InMemoryPaymentService, PaymentService,
};

struct Harness {
    pipeline: Pipeline,
    gateway: BookingGateway,
    bookings: Arc<InMemoryBookingService>,
    payments: Arc<InMemoryPaymentService>,
}

fn build_harness(config: &PipelineConfig) -> Harness {
    let bookings = Arc::new(InMemoryBookingService::new());
    let payments = Arc::new(InMemoryPaymentService::new(
        config.payment_amount,
        config.payout_fee_bps,
    ));
    let flows = booking_flows(
        Arc::clone(&bookings) as Arc<dyn BookingService>,
        Arc::clone(&payments) as Arc<dyn PaymentService>,
        config.payment_amount,
    );
    let pipeline = PipelineBuilder::new(config.channel_capacity, config.event_bus_capacity)
        .flows(flows)
        .build();
    let gateway = BookingGateway::new(pipeline.handle(), config);
    Harness {
        pipeline,
        gateway,
        bookings,
        payments,
    }
}

fn harness() -> Harness {
    build_harness(&PipelineConfig::default())
}

/// Collects events until one matches `pred` (returned last), panicking
/// after two seconds.
async fn collect_until(
    events: &mut broadcast::Receiver<PipelineEvent>,
    description: &str,
    pred: impl Fn(&PipelineEvent) -> bool,
) -> Vec<PipelineEvent> {
    let mut seen = Vec::new();
    let outcome = tokio::time::timeout(std::time::Duration::from_secs(2), async {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let done = pred(&event);
                    seen.push(event);
                    if done {
                        break true;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break false,
            }
        }
    })
    .await;
    match outcome {
        Ok(true) => seen,
        _ => panic!("timed out waiting for {description}; saw {seen:?}"),
    }
}

fn completed_on(channel: ChannelName) -> impl Fn(&PipelineEvent) -> bool {
    move |event| matches!(event, PipelineEvent::FlowCompleted { channel: c, .. } if *c == channel)
}

#[tokio::test]
async fn create_booking_replies_with_pending_payment_and_payment_id() {
    let h = harness();

    let created = h.gateway.create_booking(Booking::request(1, 1, 1, 1)).await;
    let Ok(created) = created else {
        panic!("create_booking failed: {created:?}");
    };

    assert_eq!(created.status, BookingStatus::PendingPayment);
    let Some(payment_id) = created.payment_id.as_deref() else {
        panic!("payment id not populated");
    };
    assert!(payment_id.starts_with("PAY_"));
    let Some(id) = created.id else {
        panic!("id not populated");
    };
    assert!(h.bookings.get(id).await.is_some());

    h.pipeline.shutdown().await;
}

#[tokio::test]
async fn booking_without_client_or_tenant_is_discarded_never_initiated() {
    let h = harness();
    let mut events = h.pipeline.events().subscribe();

    let incomplete = Booking {
        client_id: None,
        ..Booking::request(1, 1, 1, 1)
    };
    let sent = h.gateway.create_booking_async(incomplete).await;
    assert!(sent.is_ok());

    let seen = collect_until(
        &mut events,
        "discarded-booking flow completion",
        completed_on(ChannelName::DiscardedBooking),
    )
    .await;

    let discards = seen
        .iter()
        .filter(|e| matches!(e, PipelineEvent::MessageDiscarded { .. }))
        .count();
    assert_eq!(discards, 1);
    assert!(!seen.iter().any(|e| matches!(
        e,
        PipelineEvent::MessageRouted { to: ChannelName::PaymentInitiation, .. }
    )));

    // The rejection sink marks the booking rejected; nothing was stored.
    let Some(PipelineEvent::FlowCompleted { message, .. }) = seen.last() else {
        panic!("expected the sink completion last");
    };
    let booking_pipeline::domain::Message::Booking(rejected) = message else {
        panic!("sink completed with a non-booking payload");
    };
    assert_eq!(rejected.status, BookingStatus::Rejected);
    assert!(h.bookings.is_empty().await);

    h.pipeline.shutdown().await;
}

#[tokio::test]
async fn completed_confirmation_confirms_booking_and_reaches_payout() {
    let h = harness();

    let created = h.gateway.create_booking(Booking::request(1, 1, 1, 1)).await;
    let Ok(created) = created else {
        panic!("create_booking failed");
    };
    let (Some(id), Some(transaction_id)) = (created.id, created.payment_id.clone()) else {
        panic!("created booking incomplete");
    };

    let mut events = h.pipeline.events().subscribe();
    let confirmation = Payment::confirmation(id, transaction_id.clone(), dec!(100.00));
    let sent = h.gateway.process_payment_confirmation(confirmation).await;
    assert!(sent.is_ok());

    collect_until(
        &mut events,
        "payout flow completion",
        completed_on(ChannelName::Payout),
    )
    .await;

    let Some(stored) = h.bookings.get(id).await else {
        panic!("booking vanished");
    };
    assert_eq!(stored.status, BookingStatus::Confirmed);
    assert_eq!(stored.payment_id.as_deref(), Some(transaction_id.as_str()));

    let payouts = h.payments.payouts().await;
    assert_eq!(payouts.len(), 1);
    let Some(payout) = payouts.first() else {
        panic!("payout missing");
    };
    assert_eq!(payout.booking_id, id);
    assert_eq!(payout.amount, dec!(95.00));

    h.pipeline.shutdown().await;
}

#[tokio::test]
async fn pending_booking_sent_to_payout_is_filtered_out() {
    let h = harness();
    let mut events = h.pipeline.events().subscribe();

    let pending = Booking {
        id: Some(BookingId::new()),
        status: BookingStatus::PendingPayment,
        ..Booking::request(1, 1, 1, 1)
    };
    let sent = h.gateway.process_payout(pending).await;
    assert!(sent.is_ok());

    collect_until(&mut events, "payout filter rejection", |event| {
        matches!(event, PipelineEvent::MessageDiscarded { channel: ChannelName::Payout, .. })
    })
    .await;

    assert!(h.payments.payouts().await.is_empty());

    h.pipeline.shutdown().await;
}

#[tokio::test]
async fn failing_transform_sends_original_payload_and_cause_to_error_sink() {
    let h = harness();
    let mut events = h.pipeline.events().subscribe();

    // Confirmation for a booking that was never created: the confirmation
    // is recorded, but confirm-booking fails at the booking-update flow.
    let ghost = Payment::confirmation(BookingId::new(), "TXN_GHOST".to_string(), dec!(100.00));
    let sent = h.gateway.process_payment_confirmation(ghost).await;
    assert!(sent.is_ok());

    let seen = collect_until(&mut events, "stage failure", |event| {
        matches!(event, PipelineEvent::StageFailed { .. })
    })
    .await;

    let Some(PipelineEvent::StageFailed { channel, stage, message, cause, .. }) = seen.last()
    else {
        panic!("expected a stage failure last");
    };
    assert_eq!(*channel, ChannelName::BookingUpdate);
    assert_eq!(stage, "confirm-booking");
    assert_eq!(message.kind(), "payment");
    assert!(cause.contains("booking not found"));

    // The flow stopped: nothing reached payout.
    assert!(!seen.iter().any(|e| matches!(
        e,
        PipelineEvent::FlowCompleted { channel: ChannelName::Payout, .. }
    )));
    assert!(h.payments.payouts().await.is_empty());

    h.pipeline.shutdown().await;
}

#[tokio::test]
async fn gateway_times_out_when_the_reply_point_is_not_wired() {
    let config = PipelineConfig {
        create_booking_timeout_ms: 150,
        ..PipelineConfig::default()
    };
    let bookings = Arc::new(InMemoryBookingService::new());
    let payments = Arc::new(InMemoryPaymentService::new(
        config.payment_amount,
        config.payout_fee_bps,
    ));
    // Drop the payment-initiation flow: creation routes into nowhere and
    // the caller must time out rather than hang.
    let flows = booking_flows(
        Arc::clone(&bookings) as Arc<dyn BookingService>,
        Arc::clone(&payments) as Arc<dyn PaymentService>,
        config.payment_amount,
    )
    .into_iter()
    .filter(|flow| flow.entry != ChannelName::PaymentInitiation);
    let pipeline = PipelineBuilder::new(config.channel_capacity, config.event_bus_capacity)
        .flows(flows)
        .build();
    let gateway = BookingGateway::new(pipeline.handle(), &config);
    let mut events = pipeline.events().subscribe();

    let result = gateway.create_booking(Booking::request(1, 1, 1, 1)).await;
    assert!(matches!(
        result,
        Err(PipelineError::GatewayTimeout { channel: ChannelName::BookingCreation, waited_ms: 150 })
    ));

    // The broken route was reported as a stage failure, not swallowed.
    collect_until(&mut events, "route failure", |event| {
        matches!(event, PipelineEvent::StageFailed { stage, .. } if stage == "route")
    })
    .await;

    pipeline.shutdown().await;
}

#[tokio::test]
async fn replayed_confirmation_is_idempotent_with_a_single_payout() {
    let h = harness();

    let created = h.gateway.create_booking(Booking::request(1, 1, 1, 1)).await;
    let Ok(created) = created else {
        panic!("create_booking failed");
    };
    let (Some(id), Some(transaction_id)) = (created.id, created.payment_id.clone()) else {
        panic!("created booking incomplete");
    };

    let mut events = h.pipeline.events().subscribe();
    let confirmation = Payment::confirmation(id, transaction_id.clone(), dec!(100.00));

    let first = h.gateway.process_payment_confirmation(confirmation.clone()).await;
    assert!(first.is_ok());
    collect_until(
        &mut events,
        "first payout completion",
        completed_on(ChannelName::Payout),
    )
    .await;

    let second = h.gateway.process_payment_confirmation(confirmation).await;
    assert!(second.is_ok());
    collect_until(
        &mut events,
        "second payout completion",
        completed_on(ChannelName::Payout),
    )
    .await;

    let Some(stored) = h.bookings.get(id).await else {
        panic!("booking vanished");
    };
    assert_eq!(stored.status, BookingStatus::Confirmed);
    assert_eq!(stored.payment_id.as_deref(), Some(transaction_id.as_str()));
    assert_eq!(h.payments.payouts().await.len(), 1);

    h.pipeline.shutdown().await;
}

#[tokio::test]
async fn complete_booking_settles_confirms_and_pays_out_in_one_call() {
    let h = harness();

    let result = h
        .gateway
        .process_complete_booking(Booking::request(2, 3, 4, 5))
        .await;
    let Ok(done) = result else {
        panic!("complete booking failed: {result:?}");
    };

    assert_eq!(done.status, BookingStatus::Confirmed);
    assert!(done.payment_id.is_some());
    assert_eq!(h.payments.payouts().await.len(), 1);

    h.pipeline.shutdown().await;
}
