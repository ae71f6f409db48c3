//! In-process document store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use portfolio_core::DocumentId;

use super::{Document, DocumentStore, Fields, StoreError};

/// Document store that keeps collections in memory.
///
/// Supports failure injection so callers can exercise their error paths:
/// [`set_unavailable`](Self::set_unavailable) fails every call,
/// [`set_writes_failing`](Self::set_writes_failing) fails inserts only.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    unavailable: AtomicBool,
    writes_failing: AtomicBool,
    insert_calls: AtomicUsize,
    query_calls: AtomicUsize,
}

impl MemoryDocumentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make subsequent inserts fail while queries keep working.
    pub fn set_writes_failing(&self, failing: bool) {
        self.writes_failing.store(failing, Ordering::SeqCst);
    }

    /// Number of insert calls received, successful or not.
    #[must_use]
    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    /// Number of query calls received, successful or not.
    #[must_use]
    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    /// Snapshot of a collection, oldest first.
    #[must_use]
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .read()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert(&self, collection: &str, fields: Fields) -> Result<DocumentId, StoreError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) || self.writes_failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable);
        }

        let id = DocumentId::new(Uuid::new_v4().simple().to_string());
        self.collections
            .write()
            .entry(collection.to_owned())
            .or_default()
            .push(Document {
                id: id.clone(),
                fields,
            });
        Ok(id)
    }

    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<Document>, StoreError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable);
        }

        let collections = self.collections.read();
        let matches = collections
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|doc| doc.fields.get(field).and_then(|v| v.as_str()) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(matches)
    }
}
