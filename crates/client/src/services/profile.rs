//! Profile store adapter.
//!
//! Writes and reads [`Profile`] documents in the profiles collection. Profiles
//! are located by an equality filter on their `email` field, not by a key.

use std::sync::Arc;

use futures::Stream;
use tracing::{info, instrument, warn};

use portfolio_core::{DocumentId, Profile, ProfileLookup};

use crate::store::{DocumentStore, Fields, StoreError};

/// Field profiles are looked up by.
pub const EMAIL_FIELD: &str = "email";

/// Reads and writes profile documents.
///
/// Cheap to clone; clones share the same store handle.
#[derive(Clone)]
pub struct ProfileStore {
    inner: Arc<ProfileStoreInner>,
}

struct ProfileStoreInner {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl ProfileStore {
    /// Create an adapter over `store`, using `collection` for profiles.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ProfileStoreInner {
                store,
                collection: collection.into(),
            }),
        }
    }

    /// Name of the collection profiles live in.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.inner.collection
    }

    /// Create the profile for `email`.
    ///
    /// Creation is idempotent per email: if a profile document for the email
    /// already exists it is kept, its id is returned and nothing is inserted.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the existence check or the insert fails.
    #[instrument(skip(self, name, address, bio))]
    pub async fn create_profile(
        &self,
        name: &str,
        email: &str,
        address: &str,
        bio: &str,
    ) -> Result<DocumentId, StoreError> {
        let existing = self
            .inner
            .store
            .query_eq(&self.inner.collection, EMAIL_FIELD, email)
            .await
            .inspect_err(|e| warn!(error = %e, "Error checking for existing profile"))?;

        if let Some(document) = existing.into_iter().next() {
            info!(document_id = %document.id, "Profile already exists; keeping it");
            return Ok(document.id);
        }

        let fields = profile_fields(&Profile::new(name, email, address, bio))?;
        match self.inner.store.insert(&self.inner.collection, fields).await {
            Ok(id) => {
                info!(document_id = %id, "Profile document added");
                Ok(id)
            }
            Err(e) => {
                warn!(error = %e, "Error adding profile document");
                Err(e)
            }
        }
    }

    /// Look up the profile for `email`.
    ///
    /// Takes the first matching document. More than one match means duplicate
    /// profiles exist for the email; that is logged and otherwise ignored.
    #[instrument(skip(self))]
    pub async fn lookup_profile(&self, email: &str) -> ProfileLookup {
        let documents = match self
            .inner
            .store
            .query_eq(&self.inner.collection, EMAIL_FIELD, email)
            .await
        {
            Ok(documents) => documents,
            Err(e) => {
                warn!(error = %e, "Error retrieving profile");
                return ProfileLookup::QueryError(e.to_string());
            }
        };

        if documents.len() > 1 {
            warn!(matches = documents.len(), "Duplicate profile documents for email");
        }

        let Some(document) = documents.into_iter().next() else {
            return ProfileLookup::NotFound;
        };

        match serde_json::from_value::<Profile>(serde_json::Value::Object(document.fields)) {
            Ok(profile) => ProfileLookup::Found(profile),
            Err(e) => {
                warn!(document_id = %document.id, error = %e, "Profile document is malformed");
                ProfileLookup::QueryError(StoreError::InvalidDocument(e.to_string()).to_string())
            }
        }
    }

    /// Single-value stream over the profile for `email`.
    ///
    /// Nothing is queried until the stream is first polled. It yields exactly
    /// one [`ProfileLookup`] and then ends; fetch again for a fresh value.
    pub fn fetch_profile(&self, email: &str) -> impl Stream<Item = ProfileLookup> + Send + 'static {
        let profiles = self.clone();
        let email = email.to_owned();
        async_stream::stream! {
            yield profiles.lookup_profile(&email).await;
        }
    }
}

/// Encode a profile as a document field map.
fn profile_fields(profile: &Profile) -> Result<Fields, StoreError> {
    match serde_json::to_value(profile) {
        Ok(serde_json::Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(StoreError::InvalidDocument(format!(
            "expected an object, got {other}"
        ))),
        Err(e) => Err(StoreError::InvalidDocument(e.to_string())),
    }
}
