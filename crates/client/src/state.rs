//! Application state shared by front ends.

use std::sync::Arc;

use tokio::runtime::Handle;

use crate::config::{ClientConfig, DEFAULT_PROFILE_COLLECTION};
use crate::identity::{IdentityService, MemoryIdentityService, RestIdentityService};
use crate::screens::Navigator;
use crate::services::{ProfileStore, SessionManager};
use crate::store::{DocumentStore, MemoryDocumentStore, RestDocumentStore};

/// Error wiring the hosted backends.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("invalid service URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("could not build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Collaborators and services for one client.
///
/// This struct is cheaply cloneable via `Arc`. The identity service and the
/// document store are chosen once, here, and injected into the services.
/// Background session work runs on the runtime handle passed in.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    session: SessionManager,
    profiles: ProfileStore,
}

impl AppState {
    /// Wire the services over the given collaborators.
    #[must_use]
    pub fn new(
        identity: Arc<dyn IdentityService>,
        store: Arc<dyn DocumentStore>,
        profile_collection: impl Into<String>,
        runtime: Handle,
    ) -> Self {
        let profiles = ProfileStore::new(store, profile_collection);
        let session = SessionManager::new(identity, profiles.clone(), runtime);
        Self {
            inner: Arc::new(AppStateInner { session, profiles }),
        }
    }

    /// Wire the services over the hosted backends named in `config`.
    ///
    /// Both REST clients share one connection pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or a service URL
    /// cannot be extended with an endpoint path.
    pub fn from_config(config: &ClientConfig, runtime: Handle) -> Result<Self, StateError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("portfolio-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let identity = RestIdentityService::new(
            client.clone(),
            &config.identity_url,
            config.api_key.clone(),
        )?;
        let store = RestDocumentStore::new(
            client,
            config.store_url.clone(),
            config.api_key.clone(),
        );

        Ok(Self::new(
            Arc::new(identity),
            Arc::new(store),
            config.profile_collection.clone(),
            runtime,
        ))
    }

    /// Wire the services over fresh in-memory backends.
    #[must_use]
    pub fn in_memory(runtime: Handle) -> Self {
        Self::new(
            Arc::new(MemoryIdentityService::new()),
            Arc::new(MemoryDocumentStore::new()),
            DEFAULT_PROFILE_COLLECTION,
            runtime,
        )
    }

    /// Get the session manager.
    #[must_use]
    pub fn session(&self) -> &SessionManager {
        &self.inner.session
    }

    /// Get the profile store.
    #[must_use]
    pub fn profiles(&self) -> &ProfileStore {
        &self.inner.profiles
    }

    /// A navigator starting on the login screen.
    #[must_use]
    pub fn navigator(&self) -> Navigator {
        Navigator::new(self.inner.session.clone())
    }
}
