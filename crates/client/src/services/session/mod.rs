//! Session manager.
//!
//! Coordinates the identity service and the profile store: sign-up creates an
//! account and then its profile, login and logout delegate to the identity
//! service. The signed-in identity is never cached here; it is read from the
//! identity service on every call.

mod error;

pub use error::{LOGIN_FAILED, REGISTRATION_FAILED, SessionError};

use std::sync::Arc;

use secrecy::SecretString;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use portfolio_core::Credential;

use super::ProfileStore;
use crate::identity::{Account, IdentityService};
use crate::telemetry::{add_breadcrumb, clear_sentry_user, set_sentry_user};

/// Everything collected by the sign-up form.
///
/// Password confirmation is the caller's job; by the time a `Registration`
/// exists the password has been confirmed.
#[derive(Debug)]
pub struct Registration {
    pub email: String,
    pub password: SecretString,
    pub name: String,
    pub address: String,
    pub bio: String,
}

/// Session workflow over injected collaborators.
///
/// Cheap to clone; clones share the same collaborators. Background operations
/// run on the runtime handle given at construction, so they can be started
/// from threads that are not inside that runtime.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionManagerInner>,
}

struct SessionManagerInner {
    identity: Arc<dyn IdentityService>,
    profiles: ProfileStore,
    runtime: Handle,
}

impl SessionManager {
    /// Create a session manager whose background work runs on `runtime`.
    #[must_use]
    pub fn new(
        identity: Arc<dyn IdentityService>,
        profiles: ProfileStore,
        runtime: Handle,
    ) -> Self {
        Self {
            inner: Arc::new(SessionManagerInner {
                identity,
                profiles,
                runtime,
            }),
        }
    }

    /// The profile store this manager writes to.
    #[must_use]
    pub fn profiles(&self) -> &ProfileStore {
        &self.inner.profiles
    }

    /// Email of the signed-in identity, or `None` when nobody is signed in.
    #[must_use]
    pub fn current_user_email(&self) -> Option<String> {
        self.inner
            .identity
            .current_identity()
            .map(|account| account.email)
    }

    /// Create an account and then its profile.
    ///
    /// The profile is written only after the identity service has accepted the
    /// account. If that write fails the account stays created and signed in.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Registration` if the identity service refuses the
    /// account, and `SessionError::ProfileWrite` if the profile write fails.
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: Registration) -> Result<Account, SessionError> {
        let Registration {
            email,
            password,
            name,
            address,
            bio,
        } = registration;

        let credential = Credential::new(email, password);
        let account = self
            .inner
            .identity
            .create_account(&credential)
            .await
            .map_err(|e| {
                warn!(error = %e, "Account creation failed");
                SessionError::Registration(e)
            })?;

        info!(account_id = %account.id, "Account created");
        set_sentry_user(&account.id, Some(account.email.as_str()));
        add_breadcrumb(
            "auth",
            "Account created",
            Some(&[("account_id", account.id.as_str())]),
        );

        if let Err(source) = self
            .inner
            .profiles
            .create_profile(&name, credential.email(), &address, &bio)
            .await
        {
            return Err(SessionError::ProfileWrite { account, source });
        }

        Ok(account)
    }

    /// Sign in with an email and password.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Login` if the identity service refuses the
    /// credential.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: SecretString) -> Result<Account, SessionError> {
        let credential = Credential::new(email, password);
        let account = self
            .inner
            .identity
            .authenticate(&credential)
            .await
            .map_err(|e| {
                warn!(error = %e, "Login failed");
                SessionError::Login(e)
            })?;

        info!(account_id = %account.id, "Signed in");
        set_sentry_user(&account.id, Some(account.email.as_str()));
        add_breadcrumb(
            "auth",
            "Signed in",
            Some(&[("account_id", account.id.as_str())]),
        );
        Ok(account)
    }

    /// Sign out. Succeeds even when nobody is signed in.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        let previous = self.inner.identity.current_identity();
        self.inner.identity.sign_out().await;
        clear_sentry_user();

        let Some(account) = previous else {
            return;
        };
        add_breadcrumb(
            "auth",
            "Signed out",
            Some(&[("account_id", account.id.as_str())]),
        );
        info!(account_id = %account.id, "Signed out");
    }

    /// Run [`register`](Self::register) on the session's runtime and report
    /// through callbacks.
    ///
    /// Exactly one callback runs, once, on the spawned task. Failures are never
    /// returned to the caller; they reach `on_failure` as display text.
    pub fn register_in_background<S, F>(
        &self,
        registration: Registration,
        on_success: S,
        on_failure: F,
    ) -> JoinHandle<()>
    where
        S: FnOnce() + Send + 'static,
        F: FnOnce(String) + Send + 'static,
    {
        let session = self.clone();
        self.inner.runtime.spawn(async move {
            match session.register(registration).await {
                Ok(_) => on_success(),
                Err(e) => on_failure(e.user_message()),
            }
        })
    }

    /// Run [`login`](Self::login) on the session's runtime and report through
    /// callbacks.
    ///
    /// Same callback contract as
    /// [`register_in_background`](Self::register_in_background).
    pub fn login_in_background<S, F>(
        &self,
        email: String,
        password: SecretString,
        on_success: S,
        on_failure: F,
    ) -> JoinHandle<()>
    where
        S: FnOnce() + Send + 'static,
        F: FnOnce(String) + Send + 'static,
    {
        let session = self.clone();
        self.inner.runtime.spawn(async move {
            match session.login(&email, password).await {
                Ok(_) => on_success(),
                Err(e) => on_failure(e.user_message()),
            }
        })
    }
}
