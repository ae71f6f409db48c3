//! Session error types.

use thiserror::Error;

use crate::identity::{Account, IdentityError};
use crate::store::StoreError;

/// Message shown when registration fails without a service message.
pub const REGISTRATION_FAILED: &str = "Registration failed";

/// Message shown when login fails without a service message.
pub const LOGIN_FAILED: &str = "Login failed";

/// Errors that can occur during session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The identity service refused to create the account.
    #[error("registration failed: {0}")]
    Registration(#[source] IdentityError),

    /// The identity service refused the credential.
    #[error("login failed: {0}")]
    Login(#[source] IdentityError),

    /// The account was created and is signed in, but its profile was not saved.
    #[error("account created, but saving the profile failed: {source}")]
    ProfileWrite {
        /// The account that was created.
        account: Account,
        /// Why the profile write failed.
        #[source]
        source: StoreError,
    },
}

impl SessionError {
    /// Text to hand to a failure callback.
    ///
    /// Identity failures use the service's message, or a generic fallback when
    /// the service did not supply one.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Registration(e) => e
                .service_message()
                .unwrap_or_else(|| REGISTRATION_FAILED.to_string()),
            Self::Login(e) => e
                .service_message()
                .unwrap_or_else(|| LOGIN_FAILED.to_string()),
            Self::ProfileWrite { source, .. } => {
                format!("Account created, but saving the profile failed: {source}")
            }
        }
    }

    /// The signed-in account, if the identity step succeeded.
    #[must_use]
    pub const fn account(&self) -> Option<&Account> {
        match self {
            Self::ProfileWrite { account, .. } => Some(account),
            Self::Registration(_) | Self::Login(_) => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use portfolio_core::AccountId;

    use super::*;

    fn silent() -> IdentityError {
        IdentityError::Service {
            status: 500,
            message: None,
        }
    }

    #[test]
    fn test_fallback_messages() {
        assert_eq!(
            SessionError::Registration(silent()).user_message(),
            "Registration failed"
        );
        assert_eq!(SessionError::Login(silent()).user_message(), "Login failed");
    }

    #[test]
    fn test_service_message_preferred() {
        let err = SessionError::Login(IdentityError::InvalidCredentials);
        assert_eq!(err.user_message(), "The email or password is incorrect.");
        assert!(err.account().is_none());
    }

    #[test]
    fn test_profile_write_keeps_account() {
        let account = Account {
            id: AccountId::new("acct-1"),
            email: "ada@example.com".to_string(),
        };
        let err = SessionError::ProfileWrite {
            account: account.clone(),
            source: StoreError::Unavailable,
        };
        assert_eq!(
            err.user_message(),
            "Account created, but saving the profile failed: document store unavailable"
        );
        assert_eq!(err.account(), Some(&account));
    }
}
