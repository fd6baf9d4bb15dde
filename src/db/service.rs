use crate::db::models::{Conversation, NewVisitor, Visitor};
use chrono::{DateTime, NaiveDateTime, Utc};
use duckdb::{params, types::Type, Connection, Error as DbError, Result as DbResult, Row};
use uuid::Uuid;

// DuckDB renders TIMESTAMP as text in this shape; the fraction is omitted when zero.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

const VISITOR_COLUMNS: &str = "CAST(visitor_id AS VARCHAR), fp_hash, ip, city, country, lat, lon, user_agent, \
     CAST(first_seen AS VARCHAR), CAST(last_seen AS VARCHAR)";

const CONVERSATION_COLUMNS: &str = "id, CAST(visitor_id AS VARCHAR), CAST(ts AS VARCHAR), prompt, answer";

pub struct DbService;

impl DbService {
    fn timestamp_param(ts: DateTime<Utc>) -> String {
        ts.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
    }

    fn parse_timestamp(row: &Row, idx: usize) -> DbResult<DateTime<Utc>> {
        let raw: String = row.get(idx)?;
        NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(|e| DbError::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    }

    fn parse_uuid(row: &Row, idx: usize) -> DbResult<Uuid> {
        let raw: String = row.get(idx)?;
        raw.parse()
            .map_err(|e| DbError::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    }

    fn row_to_visitor(row: &Row) -> DbResult<Visitor> {
        Ok(Visitor {
            visitor_id: Self::parse_uuid(row, 0)?,
            fingerprint_hash: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            ip: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            city: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            country: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
            latitude: row.get::<_, Option<f64>>(5)?.unwrap_or_default(),
            longitude: row.get::<_, Option<f64>>(6)?.unwrap_or_default(),
            user_agent: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
            first_seen: Self::parse_timestamp(row, 8)?,
            last_seen: Self::parse_timestamp(row, 9)?,
        })
    }

    fn row_to_conversation(row: &Row) -> DbResult<Conversation> {
        Ok(Conversation {
            id: row.get(0)?,
            visitor_id: Self::parse_uuid(row, 1)?,
            ts: Self::parse_timestamp(row, 2)?,
            prompt: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            answer: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        })
    }

    // --- Visitor Operations ---

    /// Inserts the visitor or refreshes every mutable field plus `last_seen`.
    /// `first_seen` is only ever written by the insert branch.
    pub fn upsert_visitor(conn: &Connection, visitor: &NewVisitor, now: DateTime<Utc>) -> DbResult<Visitor> {
        let now = Self::timestamp_param(now);

        conn.execute(
            "INSERT INTO visitors (visitor_id, fp_hash, ip, city, country, lat, lon, user_agent, first_seen, last_seen)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, CAST(? AS TIMESTAMP), CAST(? AS TIMESTAMP))
             ON CONFLICT (visitor_id) DO UPDATE SET
                 fp_hash = EXCLUDED.fp_hash,
                 ip = EXCLUDED.ip,
                 city = EXCLUDED.city,
                 country = EXCLUDED.country,
                 lat = EXCLUDED.lat,
                 lon = EXCLUDED.lon,
                 user_agent = EXCLUDED.user_agent,
                 last_seen = EXCLUDED.last_seen",
            params![
                visitor.visitor_id.to_string(),
                visitor.fingerprint_hash,
                visitor.ip,
                visitor.city,
                visitor.country,
                visitor.latitude,
                visitor.longitude,
                visitor.user_agent,
                now,
                now,
            ],
        )?;

        Self::get_visitor(conn, visitor.visitor_id)?.ok_or(DbError::QueryReturnedNoRows)
    }

    pub fn get_visitor(conn: &Connection, id: Uuid) -> DbResult<Option<Visitor>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {VISITOR_COLUMNS} FROM visitors WHERE visitor_id = ?"
        ))?;
        let mut rows = stmt.query_map(params![id.to_string()], Self::row_to_visitor)?;

        rows.next().transpose()
    }

    pub fn list_visitors(conn: &Connection, limit: usize) -> DbResult<Vec<Visitor>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {VISITOR_COLUMNS} FROM visitors ORDER BY last_seen DESC LIMIT ?"
        ))?;
        let rows = stmt.query_map(params![limit as i64], Self::row_to_visitor)?;

        rows.collect()
    }

    // --- Conversation Operations ---

    /// Returns `None` without writing when the visitor does not exist.
    pub fn insert_conversation(
        conn: &Connection,
        visitor_id: Uuid,
        prompt: &str,
        answer: &str,
        now: DateTime<Utc>,
    ) -> DbResult<Option<Conversation>> {
        if Self::get_visitor(conn, visitor_id)?.is_none() {
            return Ok(None);
        }

        conn.execute(
            "INSERT INTO conversations (visitor_id, ts, prompt, answer) VALUES (?, CAST(? AS TIMESTAMP), ?, ?)",
            params![visitor_id.to_string(), Self::timestamp_param(now), prompt, answer],
        )?;

        // The id comes from the sequence, so read the row back
        let mut stmt = conn.prepare(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE visitor_id = ? ORDER BY id DESC LIMIT 1"
        ))?;
        let mut rows = stmt.query_map(params![visitor_id.to_string()], Self::row_to_conversation)?;

        rows.next().transpose()
    }

    /// Newest first.
    pub fn recent_conversations(conn: &Connection, visitor_id: Uuid, limit: usize) -> DbResult<Vec<Conversation>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations
             WHERE visitor_id = ?
             ORDER BY ts DESC, id DESC
             LIMIT ?"
        ))?;
        let rows = stmt.query_map(
            params![visitor_id.to_string(), limit as i64],
            Self::row_to_conversation,
        )?;

        rows.collect()
    }
}
