use async_trait::async_trait;
use chrono::Utc;
use duckdb::Connection;
use std::sync::MutexGuard;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{
    models::{Conversation, NewVisitor, Visitor},
    service::DbService,
    DbPool,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] duckdb::Error),
    #[error("Database connection lock poisoned")]
    Poisoned,
    #[error("Unknown visitor {0}")]
    UnknownVisitor(Uuid),
}

/// Visitor and conversation persistence, chosen once at startup.
#[async_trait]
pub trait VisitorStore: Send + Sync {
    /// False for the store used when no database is configured.
    fn is_persistent(&self) -> bool;

    async fn upsert_visitor(&self, visitor: NewVisitor) -> Result<(), StoreError>;

    async fn get_visitor(&self, id: Uuid) -> Result<Option<Visitor>, StoreError>;

    async fn list_visitors(&self, limit: usize) -> Result<Vec<Visitor>, StoreError>;

    async fn insert_conversation(&self, visitor_id: Uuid, prompt: &str, answer: &str) -> Result<(), StoreError>;

    /// At most `limit` rows, newest first.
    async fn recent_conversations(&self, visitor_id: Uuid, limit: usize) -> Result<Vec<Conversation>, StoreError>;
}

pub struct DuckDbStore {
    pool: DbPool,
}

impl DuckDbStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.pool.lock().map_err(|_| StoreError::Poisoned)
    }
}

#[async_trait]
impl VisitorStore for DuckDbStore {
    fn is_persistent(&self) -> bool {
        true
    }

    async fn upsert_visitor(&self, visitor: NewVisitor) -> Result<(), StoreError> {
        let conn = self.conn()?;
        DbService::upsert_visitor(&conn, &visitor, Utc::now())?;
        Ok(())
    }

    async fn get_visitor(&self, id: Uuid) -> Result<Option<Visitor>, StoreError> {
        let conn = self.conn()?;
        Ok(DbService::get_visitor(&conn, id)?)
    }

    async fn list_visitors(&self, limit: usize) -> Result<Vec<Visitor>, StoreError> {
        let conn = self.conn()?;
        Ok(DbService::list_visitors(&conn, limit)?)
    }

    async fn insert_conversation(&self, visitor_id: Uuid, prompt: &str, answer: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        match DbService::insert_conversation(&conn, visitor_id, prompt, answer, Utc::now())? {
            Some(_) => Ok(()),
            None => Err(StoreError::UnknownVisitor(visitor_id)),
        }
    }

    async fn recent_conversations(&self, visitor_id: Uuid, limit: usize) -> Result<Vec<Conversation>, StoreError> {
        let conn = self.conn()?;
        Ok(DbService::recent_conversations(&conn, visitor_id, limit)?)
    }
}

/// Accepts every write and remembers nothing.
pub struct NoopStore;

#[async_trait]
impl VisitorStore for NoopStore {
    fn is_persistent(&self) -> bool {
        false
    }

    async fn upsert_visitor(&self, _visitor: NewVisitor) -> Result<(), StoreError> {
        Ok(())
    }

    async fn get_visitor(&self, _id: Uuid) -> Result<Option<Visitor>, StoreError> {
        Ok(None)
    }

    async fn list_visitors(&self, _limit: usize) -> Result<Vec<Visitor>, StoreError> {
        Ok(Vec::new())
    }

    async fn insert_conversation(&self, _visitor_id: Uuid, _prompt: &str, _answer: &str) -> Result<(), StoreError> {
        Ok(())
    }

    async fn recent_conversations(&self, _visitor_id: Uuid, _limit: usize) -> Result<Vec<Conversation>, StoreError> {
        Ok(Vec::new())
    }
}
