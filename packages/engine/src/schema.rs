//! Database schema definitions using SurrealQL.

use crate::{Database, DbError};

/// Initialize the database schema.
///
/// Safe to run repeatedly; every definition is `IF NOT EXISTS`.
pub async fn init_schema(db: &Database) -> Result<(), DbError> {
    tracing::info!("Initializing database schema...");

    db.query(ITEM_SCHEMA).await?.check()?;

    tracing::info!("Database schema initialized");

    Ok(())
}

/// Item table schema.
///
/// Timestamps are epoch milliseconds. Optional fields are left undefined so
/// payloads and options keep arbitrary nested structure.
const ITEM_SCHEMA: &str = r#"
-- Item table holding every queue's work items
DEFINE TABLE IF NOT EXISTS item SCHEMALESS;

DEFINE FIELD IF NOT EXISTS queue ON item TYPE string;
DEFINE FIELD IF NOT EXISTS item_id ON item TYPE string;
DEFINE FIELD IF NOT EXISTS status ON item TYPE string;
DEFINE FIELD IF NOT EXISTS created_at ON item TYPE int;
DEFINE FIELD IF NOT EXISTS updated_at ON item TYPE int;

-- Items are addressed by queue and engine id
DEFINE INDEX IF NOT EXISTS item_key ON item FIELDS queue, item_id UNIQUE;

-- Counting and paging by state
DEFINE INDEX IF NOT EXISTS item_queue_status ON item FIELDS queue, status;
DEFINE INDEX IF NOT EXISTS item_created ON item FIELDS queue, created_at;
"#;
