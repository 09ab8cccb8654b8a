//! Query and mutation services over registered queues.
//!
//! Every service is built from an explicitly constructed [`QueueRegistry`]
//! shared through an `Arc`; nothing here is global.

mod call;
mod mutation;
mod query;
mod registry;

pub use mutation::{JobMutationService, MANUAL_FAIL_REASON, RemoveOutcome};
pub use query::{JobQueryService, QueueSummary};
pub use registry::QueueRegistry;
