//! Pipeline configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`), with sensible defaults for every key.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Top-level pipeline configuration.
///
/// Loaded once at startup via [`PipelineConfig::from_env`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Capacity of each named channel's queue.
    pub channel_capacity: usize,

    /// Capacity of the observability event bus.
    pub event_bus_capacity: usize,

    /// Reply window for the synchronous `create-booking` operation, ms.
    pub create_booking_timeout_ms: u64,

    /// Reply window for the synchronous `complete-booking` operation, ms.
    pub complete_booking_timeout_ms: u64,

    /// Amount charged per booking (deed pricing is out of scope).
    pub payment_amount: Decimal,

    /// Service fee retained from each payout, in basis points.
    pub payout_fee_bps: u32,
}

impl PipelineConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to defaults when a variable is unset or unparsable.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            channel_capacity: parse_env("CHANNEL_CAPACITY", 64),
            event_bus_capacity: parse_env("EVENT_BUS_CAPACITY", 1024),
            create_booking_timeout_ms: parse_env("CREATE_BOOKING_TIMEOUT_MS", 5_000),
            complete_booking_timeout_ms: parse_env("COMPLETE_BOOKING_TIMEOUT_MS", 10_000),
            payment_amount: parse_env("PAYMENT_AMOUNT", dec!(100.00)),
            payout_fee_bps: parse_env("PAYOUT_FEE_BPS", 500),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
            event_bus_capacity: 1024,
            create_booking_timeout_ms: 5_000,
            complete_booking_timeout_ms: 10_000,
            payment_amount: dec!(100.00),
            payout_fee_bps: 500,
        }
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
