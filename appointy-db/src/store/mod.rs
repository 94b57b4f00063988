//! Access to the document datastore.
//!
//! [`DocumentStore`] is the only seam between the service and the database
//! engine. Implementations own their connection pooling and concurrency
//! control, so a shared `Arc<dyn DocumentStore>` needs no extra locking.

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use mongodb::bson::{Bson, Document};

use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{info, warn};

/// Connection string selecting [`MemoryStore`] instead of a MongoDB deployment.
pub const MEMORY_URI: &str = "memory://";

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum StoreError {
    #[error("Datastore is unreachable: {0}")]
    Connection(String),
    #[error("Datastore rejected the write: {0}")]
    Write(String),
    #[error("Document could not be converted: {0}")]
    Serialization(String),
}

#[async_trait]
pub trait DocumentStore: Debug + Send + Sync {
    /// Inserts `document` and returns its `_id`, generating one if the document has none.
    async fn insert_one(&self, collection: &str, document: Document) -> Result<Bson>;

    async fn find_by_id(&self, collection: &str, id: &Bson) -> Result<Option<Document>>;
}

/// Opens the datastore named by `uri`.
///
/// For MongoDB this includes a round trip to the server, so an unreachable
/// deployment fails here rather than on the first request.
pub async fn connect(
    uri: &str,
    database: &str,
    timeout: Duration,
) -> Result<Arc<dyn DocumentStore>> {
    if uri == MEMORY_URI {
        warn!("Using the in-memory datastore, nothing will be persisted");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let store = MongoStore::connect(uri, database, timeout).await?;
    info!(database, "Connected to MongoDB");

    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use crate::store::{Bson, MEMORY_URI, StoreError, connect};
    use mongodb::bson::doc;
    use std::time::{Duration, Instant};

    const TIMEOUT: Duration = Duration::from_millis(300);

    #[tokio::test]
    async fn memory_uri_opens_working_store() {
        let store = connect(MEMORY_URI, "appointy", TIMEOUT).await.unwrap();

        let id = store
            .insert_one("users", doc! { "_id": 1_i64, "name": "Camboda Sun" })
            .await
            .unwrap();
        let document = store.find_by_id("users", &id).await.unwrap().unwrap();

        assert_eq!(id, Bson::Int64(1));
        assert_eq!(document.get_str("name").unwrap(), "Camboda Sun");
    }

    #[tokio::test]
    async fn unreachable_server_is_connection_error() {
        let started = Instant::now();

        let result = connect("mongodb://127.0.0.1:1", "appointy", TIMEOUT).await;

        assert!(matches!(result, Err(StoreError::Connection(_))), "{result:?}");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn malformed_uri_is_connection_error() {
        let result = connect("not a connection string", "appointy", TIMEOUT).await;

        assert!(matches!(result, Err(StoreError::Connection(_))), "{result:?}");
    }
}
