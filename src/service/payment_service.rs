//! Payment collaborator: initiation, confirmation and payout.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use crate::domain::{Booking, BookingId, Payment, PaymentId, PaymentStatus};
use crate::error::PipelineError;

/// Business operations on payments, free of any pipeline topology
/// knowledge.
#[async_trait]
pub trait PaymentService: Send + Sync {
    /// Initiates payment for a created booking: generates the transaction
    /// id, sets `booking.payment_id` and records a pending payment.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidBooking`] when the booking has no id
    /// yet.
    async fn initiate_payment(&self, booking: Booking) -> Result<Booking, PipelineError>;

    /// Validates and records a payment confirmation delivered by the
    /// provider webhook. Idempotent: replaying an already-recorded
    /// confirmation is a logged no-op.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidPayment`] when the payment is not
    /// `Completed` or carries a blank transaction id.
    async fn process_payment_confirmation(&self, payment: Payment)
    -> Result<Payment, PipelineError>;

    /// Pays the tenant out for a confirmed booking, retaining the service
    /// fee. Idempotent by booking id: a second payout for the same booking
    /// is a logged no-op.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidBooking`] when the booking has no id
    /// or no tenant.
    async fn process_payout(&self, booking: Booking) -> Result<Booking, PipelineError>;
}

/// One executed payout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayoutRecord {
    /// Booking the payout settles.
    pub booking_id: BookingId,
    /// Provider-side payout transaction id (`PAYOUT_…`).
    pub transaction_id: String,
    /// Amount transferred after the service fee.
    pub amount: Decimal,
    /// Tenant account credited.
    pub tenant_account: String,
    /// When the payout was executed.
    pub processed_at: DateTime<Utc>,
}

/// In-memory payment provider standing in for the external gateway.
///
/// Payments are keyed by transaction id, payouts by booking id; both maps
/// double as the idempotence record.
#[derive(Debug)]
pub struct InMemoryPaymentService {
    payment_amount: Decimal,
    payout_fee_bps: u32,
    payments: RwLock<HashMap<String, Payment>>,
    payouts: RwLock<HashMap<BookingId, PayoutRecord>>,
}

impl InMemoryPaymentService {
    /// Creates a provider charging `payment_amount` per booking and
    /// retaining `payout_fee_bps` basis points from each payout.
    #[must_use]
    pub fn new(payment_amount: Decimal, payout_fee_bps: u32) -> Self {
        Self {
            payment_amount,
            payout_fee_bps,
            payments: RwLock::new(HashMap::new()),
            payouts: RwLock::new(HashMap::new()),
        }
    }

    /// Returns a copy of the recorded payment for a transaction id.
    pub async fn payment(&self, transaction_id: &str) -> Option<Payment> {
        self.payments.read().await.get(transaction_id).cloned()
    }

    /// Returns all executed payouts.
    pub async fn payouts(&self) -> Vec<PayoutRecord> {
        self.payouts.read().await.values().cloned().collect()
    }

    /// Payout amount after the service fee.
    fn payout_amount(&self) -> Decimal {
        let fee = self.payment_amount * Decimal::from(self.payout_fee_bps) / Decimal::from(10_000);
        self.payment_amount - fee
    }
}

/// Generates an 8-character upper-case provider token.
fn provider_token() -> String {
    uuid::Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(8)
        .collect::<String>()
        .to_uppercase()
}

#[async_trait]
impl PaymentService for InMemoryPaymentService {
    async fn initiate_payment(&self, mut booking: Booking) -> Result<Booking, PipelineError> {
        let booking_id = booking
            .id
            .ok_or_else(|| PipelineError::InvalidBooking("cannot pay for an unsaved booking".to_string()))?;

        let transaction_id = format!("PAY_{}", provider_token());
        booking.payment_id = Some(transaction_id.clone());

        let payment = Payment {
            id: Some(PaymentId::new()),
            booking_id,
            transaction_id: transaction_id.clone(),
            amount: self.payment_amount,
            status: PaymentStatus::Pending,
            created_at: Utc::now(),
        };
        self.payments
            .write()
            .await
            .insert(transaction_id.clone(), payment);

        // Stand-in for the external provider call that would return a
        // payment link to the client.
        tracing::info!(
            %booking_id,
            %transaction_id,
            amount = %self.payment_amount,
            "payment initiated with provider"
        );
        Ok(booking)
    }

    async fn process_payment_confirmation(
        &self,
        mut payment: Payment,
    ) -> Result<Payment, PipelineError> {
        if payment.status != PaymentStatus::Completed {
            return Err(PipelineError::InvalidPayment(format!(
                "payment is not completed: {}",
                payment.status
            )));
        }
        if payment.transaction_id.trim().is_empty() {
            return Err(PipelineError::InvalidPayment(
                "transaction id is required".to_string(),
            ));
        }

        let mut payments = self.payments.write().await;
        if let Some(existing) = payments.get(&payment.transaction_id)
            && existing.status == PaymentStatus::Completed
        {
            tracing::info!(
                transaction_id = %payment.transaction_id,
                "confirmation already recorded"
            );
            return Ok(existing.clone());
        }

        if payment.id.is_none() {
            payment.id = Some(PaymentId::new());
        }
        payments.insert(payment.transaction_id.clone(), payment.clone());

        tracing::info!(
            transaction_id = %payment.transaction_id,
            booking_id = %payment.booking_id,
            "payment confirmation recorded"
        );
        Ok(payment)
    }

    async fn process_payout(&self, booking: Booking) -> Result<Booking, PipelineError> {
        let booking_id = booking
            .id
            .ok_or_else(|| PipelineError::InvalidBooking("cannot pay out an unsaved booking".to_string()))?;
        let tenant_id = booking
            .tenant_id
            .ok_or_else(|| PipelineError::InvalidBooking("payout requires a tenant".to_string()))?;

        let mut payouts = self.payouts.write().await;
        if payouts.contains_key(&booking_id) {
            tracing::info!(%booking_id, "payout already executed, skipping");
            return Ok(booking);
        }

        let record = PayoutRecord {
            booking_id,
            transaction_id: format!("PAYOUT_{}", provider_token()),
            amount: self.payout_amount(),
            tenant_account: format!("TENANT_ACCOUNT_{tenant_id}"),
            processed_at: Utc::now(),
        };
        tracing::info!(
            %booking_id,
            transaction_id = %record.transaction_id,
            amount = %record.amount,
            account = %record.tenant_account,
            "payout transferred to tenant"
        );
        payouts.insert(booking_id, record);

        Ok(booking)
    }
}
