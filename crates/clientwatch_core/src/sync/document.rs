//! Remote document-store contract.

use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use tokio::sync::mpsc;

/// Field stamped by the document store on every accepted write.
pub const SERVER_UPDATED_AT_FIELD: &str = "serverUpdatedAt";
/// Field stamped by this client on every write it sends.
pub const CLIENT_UPDATED_AT_FIELD: &str = "clientUpdatedAt";

/// Location of one remote document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentPath {
    pub collection: String,
    pub id: String,
}

impl DocumentPath {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// The single document every dashboard client shares.
    pub fn shared_default() -> Self {
        Self::new("shared", "clientwatch")
    }
}

impl Display for DocumentPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// One delivery from a subscription.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentSnapshot {
    pub exists: bool,
    pub data: Map<String, Value>,
}

impl DocumentSnapshot {
    pub fn missing() -> Self {
        Self::default()
    }

    pub fn with_data(data: Map<String, Value>) -> Self {
        Self { exists: true, data }
    }

    /// Snapshots without content are ignored by the sync engine.
    pub fn has_content(&self) -> bool {
        self.exists && !self.data.is_empty()
    }
}

/// Remote collaborator failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Network, configuration or availability problem.
    Unavailable(String),
    /// The store refused the request or its payload.
    Rejected(String),
    /// The snapshot stream ended.
    SubscriptionClosed,
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(message) => write!(f, "remote unavailable: {message}"),
            Self::Rejected(message) => write!(f, "remote rejected request: {message}"),
            Self::SubscriptionClosed => write!(f, "remote subscription closed"),
        }
    }
}

impl Error for RemoteError {}

/// Live snapshot stream. Dropping it releases the subscription.
#[derive(Debug)]
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<DocumentSnapshot>,
}

impl Subscription {
    pub fn new(receiver: mpsc::UnboundedReceiver<DocumentSnapshot>) -> Self {
        Self { receiver }
    }

    /// Waits for the next snapshot; `None` once the stream has ended.
    pub async fn next(&mut self) -> Option<DocumentSnapshot> {
        self.receiver.recv().await
    }
}

/// Opaque key-value document store reachable by subscribe / merge-write.
pub trait DocumentStore: Send + Sync {
    /// Opens a subscription delivering a snapshot on every change, including
    /// changes caused by this client's own writes.
    fn subscribe(&self, path: &DocumentPath) -> Result<Subscription, RemoteError>;

    /// Upserts the named top-level fields without touching unlisted ones.
    fn merge_write(&self, path: &DocumentPath, fields: Map<String, Value>)
        -> Result<(), RemoteError>;
}
