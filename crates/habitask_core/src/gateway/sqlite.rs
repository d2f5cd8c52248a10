//! SQLite-backed document store.
//!
//! # Responsibility
//! - Persist collection documents as JSON bodies in the `documents` table.
//! - Offer the same CRUD semantics as the remote store for local use.
//!
//! # Invariants
//! - `(collection, id)` is unique.
//! - `list` returns documents in insertion order.
//! - `owner_id` mirrors the document owner so filtering stays in SQL.

use super::{
    encode_with_id, CollectionGateway, GatewayError, GatewayOperation, GatewayResult, ListFilter,
};
use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::model::{Document, EntityId};
use log::debug;
use rusqlite::{params, Connection};
use std::path::Path;

pub struct SqliteGateway {
    conn: Connection,
}

impl SqliteGateway {
    /// Wraps a connection that already went through `open_db*`.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        open_db(path).map(Self::new)
    }

    pub fn open_in_memory() -> DbResult<Self> {
        open_db_in_memory().map(Self::new)
    }

    fn missing<D: Document>(id: &EntityId) -> GatewayError {
        GatewayError::MissingRecord {
            collection: D::COLLECTION,
            id: id.clone(),
        }
    }
}

impl<D: Document> CollectionGateway<D> for SqliteGateway {
    async fn list(&self, filter: &ListFilter) -> GatewayResult<Vec<D>> {
        let mut stmt = self.conn.prepare(
            "SELECT body
             FROM documents
             WHERE collection = ?1
               AND (?2 IS NULL OR owner_id = ?2)
             ORDER BY seq ASC;",
        )?;
        let owner = filter.owner_id.as_ref().map(|owner| owner.as_str());
        let mut rows = stmt.query(params![D::COLLECTION.as_str(), owner])?;

        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            let body: String = row.get(0)?;
            documents.push(serde_json::from_str(&body)?);
        }
        Ok(documents)
    }

    async fn create(&self, document: &D) -> GatewayResult<D> {
        let id = document.id().cloned().unwrap_or_else(EntityId::generate);
        let value = encode_with_id(document, &id)?;
        let stored: D = serde_json::from_value(value.clone())?;

        self.conn.execute(
            "INSERT INTO documents (collection, id, owner_id, body)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                D::COLLECTION.as_str(),
                id.as_str(),
                document.owner_id().map(|owner| owner.as_str()),
                value.to_string(),
            ],
        )?;
        debug!(
            "event=gateway_write module=gateway status=ok backend=sqlite op={} collection={} id={id}",
            GatewayOperation::Create,
            D::COLLECTION
        );
        Ok(stored)
    }

    async fn replace(&self, id: &EntityId, document: &D) -> GatewayResult<D> {
        let value = encode_with_id(document, id)?;
        let stored: D = serde_json::from_value(value.clone())?;

        let changed = self.conn.execute(
            "UPDATE documents
             SET
                body = ?1,
                owner_id = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE collection = ?3 AND id = ?4;",
            params![
                value.to_string(),
                document.owner_id().map(|owner| owner.as_str()),
                D::COLLECTION.as_str(),
                id.as_str(),
            ],
        )?;
        if changed == 0 {
            return Err(Self::missing::<D>(id));
        }
        Ok(stored)
    }

    async fn remove(&self, id: &EntityId) -> GatewayResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2;",
            params![D::COLLECTION.as_str(), id.as_str()],
        )?;
        if changed == 0 {
            return Err(Self::missing::<D>(id));
        }
        Ok(())
    }
}
