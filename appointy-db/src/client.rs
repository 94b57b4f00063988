use crate::{
    record::UserRecord,
    store::{DocumentStore, StoreError},
};
use appointy_common::model::{
    AppointySnowflakeGenerator, Id, ModelValidationError,
    user::{NewUser, User, UserMarker},
};
use appointy_common::snowflake::{ProcessId, SnowflakeTimestampFromDateTimeError, WorkerId};
use mongodb::bson::{self, Bson};
use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};
use thiserror::Error;
use tokio::time::error::Elapsed;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("Could not encode document: {0}")]
    Encode(#[from] bson::ser::Error),
    #[error("Could not decode document: {0}")]
    Decode(#[from] bson::de::Error),
    #[error("Datastore returned an unexpected id: {0}")]
    UnexpectedId(Bson),
    #[error("Could not generate an id: {0}")]
    IdGeneration(#[from] SnowflakeTimestampFromDateTimeError),
    #[error("Datastore did not respond in time")]
    Timeout(#[from] Elapsed),
}

/// Typed access to the users collection.
///
/// Built once at startup and shared behind an `Arc`. Every datastore call is
/// bounded by the operation timeout and is never retried.
#[derive(Debug)]
pub struct DbClient {
    store: Arc<dyn DocumentStore>,
    users_collection: String,
    snowflake_generator: Mutex<AppointySnowflakeGenerator>,
    operation_timeout: Duration,
}

impl DbClient {
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        users_collection: impl Into<String>,
        worker_id: WorkerId,
        process_id: ProcessId,
        operation_timeout: Duration,
    ) -> Self {
        let snowflake_generator =
            Mutex::new(AppointySnowflakeGenerator::new(worker_id, process_id));

        Self {
            store,
            users_collection: users_collection.into(),
            snowflake_generator,
            operation_timeout,
        }
    }

    pub async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        let document = tokio::time::timeout(
            self.operation_timeout,
            self.store
                .find_by_id(&self.users_collection, &Bson::Int64(user_id.to_stored())),
        )
        .await??;

        let Some(document) = document else {
            return Ok(None);
        };

        let record: UserRecord = bson::from_document(document)?;
        Ok(Some(User::try_from(record)?))
    }

    pub async fn create_user(&self, user: &NewUser) -> Result<User> {
        let user_id: Id<UserMarker> = self
            .snowflake_generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generate()?
            .into();

        let document = bson::to_document(&UserRecord::new(user_id, user))?;
        let inserted_id = tokio::time::timeout(
            self.operation_timeout,
            self.store.insert_one(&self.users_collection, document),
        )
        .await??;

        let user_id = match inserted_id {
            Bson::Int64(stored) => Id::from_stored(stored),
            other => return Err(DbError::UnexpectedId(other)),
        };

        Ok(User {
            id: user_id,
            name: user.name.clone(),
            email: user.email.clone(),
        })
    }
}
