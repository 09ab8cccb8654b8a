#![allow(dead_code)]

use std::time::Duration;

use chrono::Utc;
use engine::{Database, DbConfig, DbError};
use serde_json::{Map, Value};

/// Fresh in-memory database with the schema installed.
pub async fn setup_db() -> Result<Database, DbError> {
    engine::init(&DbConfig::memory()).await
}

pub fn payload_with_message(message: &str) -> Value {
    let mut map = Map::new();
    map.insert("msg".to_string(), Value::String(message.to_string()));
    Value::Object(map)
}

/// A timestamp `age` in the past.
pub fn ago(age: Duration) -> chrono::DateTime<Utc> {
    Utc::now() - chrono::Duration::from_std(age).unwrap_or_default()
}
