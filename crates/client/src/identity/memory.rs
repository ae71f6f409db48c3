//! In-process identity service.
//!
//! Behaves like a small hosted identity service: it validates emails, enforces
//! a minimum password length, refuses duplicate accounts and keeps argon2
//! hashes instead of passwords. Used by tests, the CLI demo, and offline
//! development.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, instrument};

use portfolio_core::{AccountId, Credential, Email};

use super::{Account, IdentityError, IdentityService};

/// Minimum password length, matching common hosted identity services.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Argon2 memory cost in KiB. Kept small: this backend is for tests and demos.
const HASH_MEMORY_KIB: u32 = 8 * 1024;

struct StoredAccount {
    id: AccountId,
    password_hash: String,
}

/// Identity service that keeps accounts in memory.
pub struct MemoryIdentityService {
    /// Keyed by normalized email so uniqueness ignores case.
    accounts: RwLock<HashMap<Email, StoredAccount>>,
    current: RwLock<Option<Account>>,
    hasher: Argon2<'static>,
    unavailable: AtomicBool,
    next_id: AtomicUsize,
    create_calls: AtomicUsize,
}

impl Default for MemoryIdentityService {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryIdentityService {
    /// Create an empty service with nobody signed in.
    #[must_use]
    pub fn new() -> Self {
        let params = Params::new(HASH_MEMORY_KIB, 1, 1, None).unwrap_or_default();
        Self {
            accounts: RwLock::new(HashMap::new()),
            current: RwLock::new(None),
            hasher: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            unavailable: AtomicBool::new(false),
            next_id: AtomicUsize::new(1),
            create_calls: AtomicUsize::new(0),
        }
    }

    /// Make every subsequent call fail with [`IdentityError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of `create_account` calls received, successful or not.
    #[must_use]
    pub fn create_account_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Number of registered accounts.
    #[must_use]
    pub fn account_count(&self) -> usize {
        self.accounts.read().len()
    }

    fn check_available(&self) -> Result<(), IdentityError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(IdentityError::Unavailable);
        }
        Ok(())
    }

    fn hash_password(&self, password: &str) -> Result<String, IdentityError> {
        let salt = SaltString::generate(&mut OsRng);
        self.hasher
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| IdentityError::Service {
                status: 0,
                message: Some(format!("failed to hash password: {e}")),
            })
    }

    fn verify_password(&self, password: &str, hash: &str) -> Result<(), IdentityError> {
        let parsed = PasswordHash::new(hash).map_err(|_| IdentityError::InvalidCredentials)?;
        self.hasher
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| IdentityError::InvalidCredentials)
    }

    fn sign_in(&self, account: &Account) {
        *self.current.write() = Some(account.clone());
    }
}

#[async_trait]
impl IdentityService for MemoryIdentityService {
    #[instrument(skip(self, credential), fields(email = %credential.email()))]
    async fn create_account(&self, credential: &Credential) -> Result<Account, IdentityError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let key = Email::parse(credential.email())
            .map_err(|e| IdentityError::InvalidEmail(e.to_string()))?;

        if credential.expose_password().chars().count() < MIN_PASSWORD_LENGTH {
            return Err(IdentityError::WeakPassword(format!(
                "Password should be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }

        if self.accounts.read().contains_key(&key) {
            return Err(IdentityError::EmailAlreadyInUse);
        }

        let password_hash = self.hash_password(credential.expose_password())?;
        let id = AccountId::new(format!(
            "acct-{}",
            self.next_id.fetch_add(1, Ordering::SeqCst)
        ));

        {
            let mut accounts = self.accounts.write();
            // Re-check under the write lock; another task may have won the race.
            if accounts.contains_key(&key) {
                return Err(IdentityError::EmailAlreadyInUse);
            }
            accounts.insert(
                key,
                StoredAccount {
                    id: id.clone(),
                    password_hash,
                },
            );
        }

        let account = Account {
            id,
            email: credential.email().to_string(),
        };
        self.sign_in(&account);
        debug!(account_id = %account.id, "account created");
        Ok(account)
    }

    #[instrument(skip(self, credential), fields(email = %credential.email()))]
    async fn authenticate(&self, credential: &Credential) -> Result<Account, IdentityError> {
        self.check_available()?;

        let key = Email::parse(credential.email())
            .map_err(|e| IdentityError::InvalidEmail(e.to_string()))?;

        let (id, password_hash) = {
            let accounts = self.accounts.read();
            let stored = accounts
                .get(&key)
                .ok_or(IdentityError::InvalidCredentials)?;
            (stored.id.clone(), stored.password_hash.clone())
        };

        self.verify_password(credential.expose_password(), &password_hash)?;

        let account = Account {
            id,
            email: credential.email().to_string(),
        };
        self.sign_in(&account);
        debug!(account_id = %account.id, "account authenticated");
        Ok(account)
    }

    async fn sign_out(&self) {
        self.current.write().take();
    }

    fn current_identity(&self) -> Option<Account> {
        self.current.read().clone()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn credential(email: &str, password: &str) -> Credential {
        Credential::new(email, password.to_string())
    }

    #[tokio::test]
    async fn test_create_account_signs_in() {
        let service = MemoryIdentityService::new();
        assert!(service.current_identity().is_none());

        let account = service
            .create_account(&credential("Ada@Example.com", "abc123"))
            .await
            .unwrap();

        assert_eq!(account.email, "Ada@Example.com");
        assert_eq!(service.current_identity(), Some(account));
        assert_eq!(service.account_count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let service = MemoryIdentityService::new();
        service
            .create_account(&credential("ada@example.com", "abc123"))
            .await
            .unwrap();

        let err = service
            .create_account(&credential("ADA@example.com", "other-pass"))
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::EmailAlreadyInUse));
        assert_eq!(service.create_account_calls(), 2);
    }

    #[tokio::test]
    async fn test_validation_rules() {
        let service = MemoryIdentityService::new();

        let err = service
            .create_account(&credential("not-an-email", "abc123"))
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::InvalidEmail(_)));

        let err = service
            .create_account(&credential("ada@example.com", "abc"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Password should be at least 6 characters");
        assert_eq!(service.account_count(), 0);
    }

    #[tokio::test]
    async fn test_authenticate_checks_password() {
        let service = MemoryIdentityService::new();
        service
            .create_account(&credential("ada@example.com", "abc123"))
            .await
            .unwrap();
        service.sign_out().await;
        assert!(service.current_identity().is_none());

        let err = service
            .authenticate(&credential("ada@example.com", "wrong-password"))
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::InvalidCredentials));
        assert!(service.current_identity().is_none());

        let err = service
            .authenticate(&credential("nobody@example.com", "abc123"))
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::InvalidCredentials));

        let account = service
            .authenticate(&credential("ADA@example.com", "abc123"))
            .await
            .unwrap();
        assert_eq!(account.email, "ADA@example.com");
        assert_eq!(service.current_identity(), Some(account));
    }

    #[tokio::test]
    async fn test_unavailable() {
        let service = MemoryIdentityService::new();
        service.set_unavailable(true);

        let err = service
            .create_account(&credential("ada@example.com", "abc123"))
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::Unavailable));
        assert_eq!(service.account_count(), 0);
    }
}
