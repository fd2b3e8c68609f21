//! Pipeline layer: stage and flow definitions, the channel runtime, the
//! reply registry, and the concrete booking flow topology.

pub mod flow;
pub mod flows;
pub mod replies;
pub mod runtime;
pub mod stage;

pub use flow::{FlowBuilder, FlowDefinition};
pub use flows::booking_flows;
pub use replies::ReplyRegistry;
pub use runtime::{FailedMessage, Pipeline, PipelineBuilder, PipelineHandle};
pub use stage::Stage;
