//! booking-pipeline CLI entry point.
//!
//! Wires the pipeline, flows and gateway, runs one front-end operation,
//! then drains the pipeline. State is in-memory and per-process, so the
//! `demo` command shows the full create → confirm → payout lifecycle in
//! one run.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

use booking_pipeline::config::PipelineConfig;
use booking_pipeline::domain::{
    Booking, BookingId, ChannelName, Payment, PipelineEvent,
};
use booking_pipeline::gateway::BookingGateway;
use booking_pipeline::pipeline::{Pipeline, PipelineBuilder, booking_flows};
use booking_pipeline::service::{
    BookingService, InMemoryBookingService, InMemoryPaymentService, PaymentService,
};

#[derive(Debug, Parser)]
#[command(name = "booking-pipeline", version, about = "Booking, payment and payout orchestration")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a booking and wait for the created result.
    CreateBooking {
        #[arg(long)]
        client_id: u64,
        #[arg(long)]
        tenant_id: u64,
        #[arg(long)]
        schedule_id: u64,
        #[arg(long)]
        deed_id: u64,
    },
    /// Create a booking without waiting for a result.
    CreateBookingAsync {
        #[arg(long)]
        client_id: Option<u64>,
        #[arg(long)]
        tenant_id: Option<u64>,
        #[arg(long)]
        schedule_id: Option<u64>,
        #[arg(long)]
        deed_id: Option<u64>,
    },
    /// Simulate the provider's payment confirmation webhook.
    ConfirmPayment {
        #[arg(long)]
        booking_id: BookingId,
        #[arg(long)]
        transaction_id: String,
        #[arg(long, default_value = "100.00")]
        amount: Decimal,
    },
    /// Trigger the payout flow for a confirmed booking.
    ProcessPayout {
        #[arg(long)]
        booking_id: BookingId,
        #[arg(long)]
        tenant_id: u64,
    },
    /// Run the unified complete-booking workflow and wait for the result.
    CompleteBooking {
        #[arg(long)]
        client_id: u64,
        #[arg(long)]
        tenant_id: u64,
        #[arg(long)]
        schedule_id: u64,
        #[arg(long)]
        deed_id: u64,
    },
    /// Run create → confirm → payout end to end in one process.
    Demo,
}

struct App {
    config: PipelineConfig,
    booking_service: Arc<InMemoryBookingService>,
    payment_service: Arc<InMemoryPaymentService>,
    pipeline: Pipeline,
    gateway: BookingGateway,
}

fn wire() -> App {
    let config = PipelineConfig::from_env();
    let booking_service = Arc::new(InMemoryBookingService::new());
    let payment_service = Arc::new(InMemoryPaymentService::new(
        config.payment_amount,
        config.payout_fee_bps,
    ));

    let flows = booking_flows(
        Arc::clone(&booking_service) as Arc<dyn BookingService>,
        Arc::clone(&payment_service) as Arc<dyn PaymentService>,
        config.payment_amount,
    );
    let pipeline = PipelineBuilder::new(config.channel_capacity, config.event_bus_capacity)
        .flows(flows)
        .build();
    let gateway = BookingGateway::new(pipeline.handle(), &config);

    App {
        config,
        booking_service,
        payment_service,
        pipeline,
        gateway,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let app = wire();

    match cli.command {
        Command::CreateBooking {
            client_id,
            tenant_id,
            schedule_id,
            deed_id,
        } => {
            let created = app
                .gateway
                .create_booking(Booking::request(client_id, tenant_id, schedule_id, deed_id))
                .await?;
            println!("{}", serde_json::to_string_pretty(&created)?);
        }

        Command::CreateBookingAsync {
            client_id,
            tenant_id,
            schedule_id,
            deed_id,
        } => {
            let booking = Booking {
                client_id,
                tenant_id,
                schedule_id,
                deed_id,
                ..Booking::default()
            };
            app.gateway.create_booking_async(booking).await?;
            println!("booking accepted for asynchronous processing");
        }

        Command::ConfirmPayment {
            booking_id,
            transaction_id,
            amount,
        } => {
            let payment = Payment::confirmation(booking_id, transaction_id.clone(), amount);
            app.gateway.process_payment_confirmation(payment).await?;
            println!("payment confirmation {transaction_id} dispatched for booking {booking_id}");
        }

        Command::ProcessPayout {
            booking_id,
            tenant_id,
        } => {
            let booking = Booking {
                id: Some(booking_id),
                tenant_id: Some(tenant_id),
                status: booking_pipeline::domain::BookingStatus::Confirmed,
                ..Booking::default()
            };
            app.gateway.process_payout(booking).await?;
            println!("payout dispatched for booking {booking_id} to tenant {tenant_id}");
        }

        Command::CompleteBooking {
            client_id,
            tenant_id,
            schedule_id,
            deed_id,
        } => {
            let result = app
                .gateway
                .process_complete_booking(Booking::request(
                    client_id, tenant_id, schedule_id, deed_id,
                ))
                .await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Command::Demo => run_demo(&app).await?,
    }

    app.pipeline.shutdown().await;
    Ok(())
}

/// Full lifecycle against the in-process stores: create synchronously,
/// confirm through the webhook path, then show the confirmed booking and
/// the executed payout.
async fn run_demo(app: &App) -> anyhow::Result<()> {
    let created = app
        .gateway
        .create_booking(Booking::request(1, 1, 1, 1))
        .await?;
    println!("created: {}", serde_json::to_string_pretty(&created)?);

    let booking_id = created.id.context("created booking has no id")?;
    let transaction_id = created
        .payment_id
        .clone()
        .context("created booking has no payment id")?;

    let mut events = app.pipeline.events().subscribe();
    let confirmation = Payment::confirmation(booking_id, transaction_id, app.config.payment_amount);
    app.gateway.process_payment_confirmation(confirmation).await?;

    // The confirmation fans out across three flows; wait for the payout
    // flow to finish before reading the stores.
    tokio::time::timeout(std::time::Duration::from_secs(5), async {
        loop {
            match events.recv().await {
                Ok(PipelineEvent::FlowCompleted { channel: ChannelName::Payout, .. }) => break,
                Ok(_) => {}
                Err(_) => break,
            }
        }
    })
    .await
    .context("payout flow did not complete in time")?;

    let confirmed = app
        .booking_service
        .get(booking_id)
        .await
        .context("booking vanished from the store")?;
    println!("confirmed: {}", serde_json::to_string_pretty(&confirmed)?);

    for payout in app.payment_service.payouts().await {
        println!(
            "payout: {} {} to {}",
            payout.transaction_id, payout.amount, payout.tenant_account
        );
    }
    Ok(())
}
