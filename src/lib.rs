//! # booking-pipeline
//!
//! Message-driven booking, payment and payout orchestration.
//!
//! Booking requests enter through named, typed, point-to-point channels
//! and are processed by flows: immutable chains of filter, transform and
//! route stages. Business operations (create, confirm, initiate payment,
//! pay out) are delegated to collaborator services; this crate is a
//! coordination layer.
//!
//! ## Architecture
//!
//! ```text
//! Front end (CLI)
//!     │
//!     ├── BookingGateway (gateway)          sync-over-async, correlation + deadline
//!     │
//!     ├── Pipeline (pipeline/)              named channels, one worker per flow
//!     │     ├── booking-creation ──► payment-initiation
//!     │     ├── payment-confirmation ──► booking-update ──► payout
//!     │     ├── complete-booking           unified workflow
//!     │     ├── discarded-booking          rejection sink
//!     │     └── error sink                 failed payload + cause
//!     │
//!     ├── EventBus (domain/)               observability of every routing decision
//!     │
//!     └── BookingService / PaymentService (service/)   collaborators
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod pipeline;
pub mod service;
