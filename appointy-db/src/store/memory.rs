use crate::store::{DocumentStore, Result, StoreError};
use async_trait::async_trait;
use dashmap::DashMap;
use mongodb::bson::{Bson, Document, oid::ObjectId};

/// Process-local store with MongoDB's `_id` semantics. Contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: DashMap<String, Vec<Document>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map_or(0, |documents| documents.len())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_one(&self, collection: &str, mut document: Document) -> Result<Bson> {
        let id = if let Some(id) = document.get("_id") {
            id.clone()
        } else {
            let id = Bson::ObjectId(ObjectId::new());
            document.insert("_id", id.clone());
            id
        };

        let mut documents = self.collections.entry(collection.to_owned()).or_default();
        if documents
            .iter()
            .any(|existing| existing.get("_id") == Some(&id))
        {
            return Err(StoreError::Write(format!(
                "Duplicate _id {id} in collection {collection}"
            )));
        }
        documents.push(document);

        Ok(id)
    }

    async fn find_by_id(&self, collection: &str, id: &Bson) -> Result<Option<Document>> {
        let document = self.collections.get(collection).and_then(|documents| {
            documents
                .iter()
                .find(|document| document.get("_id") == Some(id))
                .cloned()
        });

        Ok(document)
    }
}
