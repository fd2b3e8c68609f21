//! Domain layer: booking and payment entities, channel names, message
//! envelopes, and the observability event bus.

pub mod booking;
pub mod channel;
pub mod events;
pub mod message;
pub mod payment;

pub use booking::{Booking, BookingId, BookingStatus};
pub use channel::ChannelName;
pub use events::{EventBus, PipelineEvent};
pub use message::{CorrelationId, Envelope, Message};
pub use payment::{Payment, PaymentId, PaymentStatus};
