use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fallback for text fields the client did not report.
pub const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Visitor {
    pub visitor_id: Uuid,
    pub fingerprint_hash: String,
    pub ip: String,
    pub city: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub user_agent: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conversation {
    pub id: i64,
    pub visitor_id: Uuid,
    pub ts: DateTime<Utc>,
    pub prompt: String,
    pub answer: String,
}

/// The mutable part of a visitor row, as carried by a session report.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVisitor {
    pub visitor_id: Uuid,
    pub fingerprint_hash: String,
    pub ip: String,
    pub city: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub user_agent: String,
}

impl NewVisitor {
    /// A report for `visitor_id` with every optional field at its fallback.
    pub fn unknown(visitor_id: Uuid) -> Self {
        Self {
            visitor_id,
            fingerprint_hash: String::new(),
            ip: UNKNOWN.to_string(),
            city: UNKNOWN.to_string(),
            country: UNKNOWN.to_string(),
            latitude: 0.0,
            longitude: 0.0,
            user_agent: UNKNOWN.to_string(),
        }
    }
}
