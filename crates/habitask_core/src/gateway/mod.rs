//! Remote collection gateway contract.
//!
//! # Responsibility
//! - Describe the key-scoped CRUD surface the stores depend on.
//! - Provide the local and HTTP implementations of that surface.
//!
//! # Invariants
//! - `create` returns the stored document with an identifier populated.
//! - `replace` and `remove` address documents by identifier only.
//! - Gateways hold no business rules; they never touch streaks or stats.

use crate::db::DbError;
use crate::model::{ActorId, Collection, Document, EntityId};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod http;
pub mod memory;
pub mod sqlite;

pub use http::HttpGateway;
pub use memory::InMemoryGateway;
pub use sqlite::SqliteGateway;

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Gateway call kind, used for diagnostics and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GatewayOperation {
    List,
    Create,
    Replace,
    Remove,
}

impl Display for GatewayOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::List => "list",
            Self::Create => "create",
            Self::Replace => "replace",
            Self::Remove => "remove",
        })
    }
}

/// Transport or remote-side failure. Stores treat every variant as opaque.
#[derive(Debug)]
pub enum GatewayError {
    Transport(String),
    Status { status: u16, body: String },
    Decode(String),
    Storage(DbError),
    MissingRecord { collection: Collection, id: EntityId },
    Injected {
        collection: Collection,
        operation: GatewayOperation,
    },
}

impl Display for GatewayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "transport failure: {message}"),
            Self::Status { status, body } => {
                write!(f, "remote store answered {status}: {body}")
            }
            Self::Decode(message) => write!(f, "undecodable document: {message}"),
            Self::Storage(err) => write!(f, "{err}"),
            Self::MissingRecord { collection, id } => {
                write!(f, "{collection}/{id} does not exist")
            }
            Self::Injected {
                collection,
                operation,
            } => write!(f, "injected failure on {collection} {operation}"),
        }
    }
}

impl Error for GatewayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for GatewayError {
    fn from(value: DbError) -> Self {
        Self::Storage(value)
    }
}

impl From<rusqlite::Error> for GatewayError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode(value.to_string())
    }
}

/// Filter for `list`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub owner_id: Option<ActorId>,
}

impl ListFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn owned_by(owner_id: ActorId) -> Self {
        Self {
            owner_id: Some(owner_id),
        }
    }

    pub fn accepts<D: Document>(&self, document: &D) -> bool {
        match &self.owner_id {
            Some(owner) => document.owner_id() == Some(owner),
            None => true,
        }
    }
}

/// Key-scoped CRUD access to one collection of `D`.
///
/// Futures are not required to be `Send`; callers drive them on a
/// single-threaded local executor.
#[allow(async_fn_in_trait)]
pub trait CollectionGateway<D: Document> {
    async fn list(&self, filter: &ListFilter) -> GatewayResult<Vec<D>>;

    async fn create(&self, document: &D) -> GatewayResult<D>;

    async fn replace(&self, id: &EntityId, document: &D) -> GatewayResult<D>;

    async fn remove(&self, id: &EntityId) -> GatewayResult<()>;
}

/// Serializes `document` with `id` stamped into its `id` field.
pub(crate) fn encode_with_id<D: Document>(document: &D, id: &EntityId) -> GatewayResult<Value> {
    let mut value = serde_json::to_value(document)?;
    match value.as_object_mut() {
        Some(fields) => {
            fields.insert("id".to_string(), Value::String(id.as_str().to_string()));
            Ok(value)
        }
        None => Err(GatewayError::Decode(format!(
            "{} document is not a JSON object",
            D::COLLECTION
        ))),
    }
}

/// Reads the identifier of a stored JSON document.
pub(crate) fn stored_id(value: &Value) -> Option<EntityId> {
    match value.get("id")? {
        Value::String(text) => Some(EntityId::new(text.as_str())),
        Value::Number(number) => Some(EntityId::new(number.to_string())),
        _ => None,
    }
}
