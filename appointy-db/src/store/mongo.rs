use crate::store::{DocumentStore, Result, StoreError};
use async_trait::async_trait;
use mongodb::{
    Client, Database,
    bson::{Bson, Document, doc},
    error::{Error as MongoError, ErrorKind},
    options::ClientOptions,
};
use std::time::Duration;
use tracing::debug;

const APP_NAME: &str = "appointy";

#[derive(Clone, Debug)]
pub struct MongoStore {
    database: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str, timeout: Duration) -> Result<Self> {
        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(|err| StoreError::Connection(err.to_string()))?;
        options.app_name = Some(APP_NAME.to_owned());
        options.connect_timeout = Some(timeout);
        options.server_selection_timeout = Some(timeout);

        let client =
            Client::with_options(options).map_err(|err| StoreError::Connection(err.to_string()))?;
        let database = client.database(database);

        // The driver connects lazily, ping to surface an unreachable server now.
        tokio::time::timeout(timeout, database.run_command(doc! { "ping": 1 }))
            .await
            .map_err(|_| StoreError::Connection(format!("No handshake within {timeout:?}")))?
            .map_err(|err| StoreError::Connection(err.to_string()))?;

        Ok(Self { database })
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn insert_one(&self, collection: &str, document: Document) -> Result<Bson> {
        let result = self
            .database
            .collection::<Document>(collection)
            .insert_one(document)
            .await?;

        debug!(collection, id = %result.inserted_id, "Inserted document");
        Ok(result.inserted_id)
    }

    async fn find_by_id(&self, collection: &str, id: &Bson) -> Result<Option<Document>> {
        let document = self
            .database
            .collection::<Document>(collection)
            .find_one(doc! { "_id": id.clone() })
            .await?;

        Ok(document)
    }
}

impl From<MongoError> for StoreError {
    fn from(err: MongoError) -> Self {
        let message = err.to_string();

        match *err.kind {
            ErrorKind::Io { .. }
            | ErrorKind::ServerSelection { .. }
            | ErrorKind::ConnectionPoolCleared { .. }
            | ErrorKind::DnsResolve { .. }
            | ErrorKind::Authentication { .. } => StoreError::Connection(message),
            ErrorKind::BsonSerialization { .. } | ErrorKind::BsonDeserialization { .. } => {
                StoreError::Serialization(message)
            }
            _ => StoreError::Write(message),
        }
    }
}
