use crate::config::DatabaseConfig;
use duckdb::{Connection, Result as DbResult};
use std::sync::{Arc, Mutex};
use tracing::info;

pub type DbPool = Arc<Mutex<Connection>>;

const SCHEMA: &str = r#"
CREATE SEQUENCE IF NOT EXISTS seq_conversations_id;

CREATE TABLE IF NOT EXISTS visitors (
    visitor_id UUID PRIMARY KEY,
    fp_hash VARCHAR,
    ip VARCHAR,
    city VARCHAR,
    country VARCHAR,
    lat DOUBLE,
    lon DOUBLE,
    user_agent VARCHAR,
    first_seen TIMESTAMP NOT NULL,
    last_seen TIMESTAMP NOT NULL
);

CREATE TABLE IF NOT EXISTS conversations (
    id BIGINT PRIMARY KEY DEFAULT nextval('seq_conversations_id'),
    visitor_id UUID NOT NULL,
    ts TIMESTAMP NOT NULL,
    prompt TEXT,
    answer TEXT
);

CREATE INDEX IF NOT EXISTS idx_conversations_visitor ON conversations(visitor_id, ts);
"#;

pub fn get_connection(config: &DatabaseConfig) -> DbResult<DbPool> {
    info!("Opening DuckDB database at {}", config.path);
    let conn = if config.is_in_memory() {
        Connection::open_in_memory()?
    } else {
        Connection::open(&config.path)?
    };

    init_schema(&conn)?;

    Ok(Arc::new(Mutex::new(conn)))
}

/// Idempotent; safe to run on every start.
pub fn init_schema(conn: &Connection) -> DbResult<()> {
    info!("Initializing database schema");
    conn.execute_batch(SCHEMA)?;
    Ok(())
}
