//! Identity service collaborator.
//!
//! The identity service owns accounts, credential verification and the notion
//! of "who is signed in". This crate never hashes or stores passwords for the
//! hosted backend; it forwards credentials and remembers what the service said.
//!
//! # Implementations
//!
//! - [`RestIdentityService`] - JSON-over-HTTP client for a hosted service
//! - [`MemoryIdentityService`] - In-process service for tests and offline use

mod memory;
mod rest;

pub use memory::MemoryIdentityService;
pub use rest::RestIdentityService;

pub(crate) use rest::API_KEY_HEADER;

use async_trait::async_trait;
use thiserror::Error;

use portfolio_core::{AccountId, Credential};

/// An identity as reported by the identity service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Service-issued account identifier.
    pub id: AccountId,
    /// Email as the service reports it. Not re-validated here.
    pub email: String,
}

/// Errors reported by an identity service.
///
/// The `Display` text of each variant is written for end users: it is what the
/// session workflow hands to failure callbacks.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Wrong password or unknown account.
    #[error("The email or password is incorrect.")]
    InvalidCredentials,

    /// An account already exists for the email.
    #[error("The email address is already in use by another account.")]
    EmailAlreadyInUse,

    /// The service rejected the password.
    #[error("{0}")]
    WeakPassword(String),

    /// The service rejected the email address.
    #[error("The email address is badly formatted: {0}")]
    InvalidEmail(String),

    /// The service could not be reached or refused to serve the request.
    #[error("The identity service is unavailable. Try again later.")]
    Unavailable,

    /// HTTP transport failed.
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with something we could not interpret.
    #[error("Unexpected response from the identity service: {0}")]
    MalformedResponse(String),

    /// Any other rejection, with the service's message when it gave one.
    #[error("{}", .message.as_deref().unwrap_or("identity service request failed"))]
    Service {
        /// HTTP status (0 when not applicable).
        status: u16,
        /// Message supplied by the service, if any.
        message: Option<String>,
    },
}

impl IdentityError {
    /// The message the service itself supplied, if this error carries one.
    ///
    /// `None` means callers should fall back to a generic message.
    #[must_use]
    pub fn service_message(&self) -> Option<String> {
        match self {
            Self::Service { message, .. } => message
                .as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(ToOwned::to_owned),
            other => Some(other.to_string()),
        }
    }
}

/// Capabilities the session workflow needs from an identity service.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Create an account and sign it in.
    async fn create_account(&self, credential: &Credential) -> Result<Account, IdentityError>;

    /// Verify a credential and sign the account in.
    async fn authenticate(&self, credential: &Credential) -> Result<Account, IdentityError>;

    /// Forget the signed-in identity. Never fails from the caller's view.
    async fn sign_out(&self);

    /// The signed-in identity, if any.
    fn current_identity(&self) -> Option<Account>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_message_fallback() {
        let silent = IdentityError::Service {
            status: 500,
            message: None,
        };
        assert_eq!(silent.service_message(), None);
        assert_eq!(silent.to_string(), "identity service request failed");

        let blank = IdentityError::Service {
            status: 400,
            message: Some("   ".to_string()),
        };
        assert_eq!(blank.service_message(), None);

        let explained = IdentityError::Service {
            status: 403,
            message: Some("Project is suspended".to_string()),
        };
        assert_eq!(
            explained.service_message().as_deref(),
            Some("Project is suspended")
        );
    }

    #[test]
    fn test_known_errors_carry_messages() {
        assert_eq!(
            IdentityError::EmailAlreadyInUse.service_message().as_deref(),
            Some("The email address is already in use by another account.")
        );
        assert_eq!(
            IdentityError::WeakPassword("too short".to_string()).to_string(),
            "too short"
        );
    }
}
