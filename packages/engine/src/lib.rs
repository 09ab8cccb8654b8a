//! Queue engine adapters for the monitor.
//!
//! This crate defines [`QueueEngine`], the narrow contract through which the
//! monitor reads and mutates an external work queue, and ships two engines
//! that implement it.
//!
//! # Features
//!
//! - `memory` (default): In-memory engine with call counting, for tests
//! - `remote`: Connect the SurrealDB engine to a server over `ws://`

mod connection;
mod lifecycle;
#[cfg(feature = "memory")]
mod memory;
mod schema;
mod surreal;
mod traits;
mod vocabulary;

pub use connection::{Database, DbConfig, DbError, connect};
#[cfg(feature = "memory")]
pub use memory::{EngineOp, MemoryQueue};
pub use schema::init_schema;
pub use surreal::SurrealQueue;
pub use traits::{EngineFuture, EngineResult, QueueEngine};
pub use vocabulary::StateVocabulary;

/// Connect to the database and make sure the schema exists.
///
/// This should be called once at application startup.
pub async fn init(config: &DbConfig) -> Result<Database, DbError> {
    let db = connect(config).await?;
    init_schema(&db).await?;
    Ok(db)
}
