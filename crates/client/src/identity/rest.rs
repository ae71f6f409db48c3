//! REST identity service client.
//!
//! Speaks a small JSON protocol:
//!
//! - `POST v1/accounts:signUp` / `POST v1/accounts:signIn` with
//!   `{"email", "password"}`, answered by `{"accountId", "email", "idToken"}`
//! - `POST v1/accounts:signOut` with `Authorization: Bearer <idToken>`
//!
//! Failures come back as a non-2xx status with
//! `{"error": {"code": "...", "message": "..."}}`.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use url::Url;

use portfolio_core::{AccountId, Credential};

use super::{Account, IdentityError, IdentityService};

/// Header carrying the project API key.
pub(crate) const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Serialize)]
struct CredentialRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    account_id: String,
    email: String,
    id_token: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
}

struct SignedIn {
    account: Account,
    id_token: SecretString,
}

/// Client for a hosted identity service.
///
/// Cheap to clone; clones share the signed-in identity.
#[derive(Clone)]
pub struct RestIdentityService {
    inner: Arc<RestIdentityServiceInner>,
}

struct RestIdentityServiceInner {
    client: reqwest::Client,
    sign_up_url: Url,
    sign_in_url: Url,
    sign_out_url: Url,
    api_key: SecretString,
    current: RwLock<Option<SignedIn>>,
}

impl RestIdentityService {
    /// Create a client for the service rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `url::ParseError` if `base_url` cannot carry a path.
    pub fn new(
        client: reqwest::Client,
        base_url: &Url,
        api_key: SecretString,
    ) -> Result<Self, url::ParseError> {
        Ok(Self {
            inner: Arc::new(RestIdentityServiceInner {
                client,
                sign_up_url: endpoint(base_url, "accounts:signUp")?,
                sign_in_url: endpoint(base_url, "accounts:signIn")?,
                sign_out_url: endpoint(base_url, "accounts:signOut")?,
                api_key,
                current: RwLock::new(None),
            }),
        })
    }

    /// Post a credential to `url` and record the identity that comes back.
    async fn exchange(&self, url: &Url, credential: &Credential) -> Result<Account, IdentityError> {
        let response = self
            .inner
            .client
            .post(url.clone())
            .header(API_KEY_HEADER, self.inner.api_key.expose_secret())
            .json(&CredentialRequest {
                email: credential.email(),
                password: credential.expose_password(),
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            debug!(status = %status, "identity service rejected request");
            return Err(map_error_response(status, &body));
        }

        let parsed: AccountResponse = serde_json::from_str(&body)
            .map_err(|e| IdentityError::MalformedResponse(e.to_string()))?;
        let account = Account {
            id: AccountId::new(parsed.account_id),
            email: parsed.email,
        };
        *self.inner.current.write() = Some(SignedIn {
            account: account.clone(),
            id_token: SecretString::from(parsed.id_token),
        });

        Ok(account)
    }
}

#[async_trait]
impl IdentityService for RestIdentityService {
    #[instrument(skip(self, credential), fields(email = %credential.email()))]
    async fn create_account(&self, credential: &Credential) -> Result<Account, IdentityError> {
        self.exchange(&self.inner.sign_up_url, credential).await
    }

    #[instrument(skip(self, credential), fields(email = %credential.email()))]
    async fn authenticate(&self, credential: &Credential) -> Result<Account, IdentityError> {
        self.exchange(&self.inner.sign_in_url, credential).await
    }

    /// Drop the local identity, then revoke the token (best effort).
    async fn sign_out(&self) {
        let taken = self.inner.current.write().take();
        let Some(signed_in) = taken else {
            return;
        };

        let result = self
            .inner
            .client
            .post(self.inner.sign_out_url.clone())
            .header(API_KEY_HEADER, self.inner.api_key.expose_secret())
            .bearer_auth(signed_in.id_token.expose_secret())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);

        if let Err(e) = result {
            warn!(
                account_id = %signed_in.account.id,
                error = %e,
                "Failed to revoke identity token"
            );
        }
    }

    fn current_identity(&self) -> Option<Account> {
        self.inner
            .current
            .read()
            .as_ref()
            .map(|signed_in| signed_in.account.clone())
    }
}

/// Translate an error response into an [`IdentityError`].
fn map_error_response(status: reqwest::StatusCode, body: &str) -> IdentityError {
    if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
        return IdentityError::Unavailable;
    }

    let (code, message) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => (envelope.error.code, envelope.error.message),
        Err(_) => (None, None),
    };

    match code.as_deref() {
        Some("EMAIL_EXISTS") => IdentityError::EmailAlreadyInUse,
        Some("INVALID_CREDENTIALS") => IdentityError::InvalidCredentials,
        Some("WEAK_PASSWORD") => IdentityError::WeakPassword(
            message.unwrap_or_else(|| "The password is too weak.".to_string()),
        ),
        Some("INVALID_EMAIL") => {
            IdentityError::InvalidEmail(message.unwrap_or_else(|| "rejected".to_string()))
        }
        _ => IdentityError::Service {
            status: status.as_u16(),
            message,
        },
    }
}

/// `{base}/v1/{action}`, keeping every segment of the base path.
fn endpoint(base_url: &Url, action: &str) -> Result<Url, url::ParseError> {
    let mut url = base_url.clone();
    url.path_segments_mut()
        .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .extend(["v1", action]);
    Ok(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use reqwest::StatusCode;

    use super::*;

    #[test]
    fn test_map_known_codes() {
        let body = r#"{"error":{"code":"EMAIL_EXISTS","message":"taken"}}"#;
        assert!(matches!(
            map_error_response(StatusCode::BAD_REQUEST, body),
            IdentityError::EmailAlreadyInUse
        ));

        let body = r#"{"error":{"code":"WEAK_PASSWORD","message":"Password should be at least 6 characters"}}"#;
        let err = map_error_response(StatusCode::BAD_REQUEST, body);
        assert_eq!(err.to_string(), "Password should be at least 6 characters");
    }

    #[test]
    fn test_map_unknown_code_keeps_message() {
        let body = r#"{"error":{"code":"QUOTA","message":"Too many attempts"}}"#;
        let err = map_error_response(StatusCode::TOO_MANY_REQUESTS, body);
        assert_eq!(err.service_message().as_deref(), Some("Too many attempts"));
    }

    #[test]
    fn test_map_unparseable_body_has_no_message() {
        let err = map_error_response(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>");
        assert!(matches!(
            err,
            IdentityError::Service {
                status: 500,
                message: None
            }
        ));
        assert_eq!(err.service_message(), None);
    }

    #[test]
    fn test_map_unavailable() {
        assert!(matches!(
            map_error_response(StatusCode::SERVICE_UNAVAILABLE, ""),
            IdentityError::Unavailable
        ));
    }

    #[test]
    fn test_endpoints_keep_base_path() {
        let base = Url::parse("https://auth.example.net/project-1/").unwrap();
        let service =
            RestIdentityService::new(reqwest::Client::new(), &base, SecretString::from("k"))
                .unwrap();
        assert_eq!(
            service.inner.sign_up_url.as_str(),
            "https://auth.example.net/project-1/v1/accounts:signUp"
        );
        assert!(service.current_identity().is_none());
    }

    #[test]
    fn test_endpoints_without_trailing_slash() {
        let base = Url::parse("https://auth.example.net/project-1").unwrap();
        let service =
            RestIdentityService::new(reqwest::Client::new(), &base, SecretString::from("k"))
                .unwrap();
        assert_eq!(
            service.inner.sign_in_url.as_str(),
            "https://auth.example.net/project-1/v1/accounts:signIn"
        );
        assert_eq!(
            service.inner.sign_out_url.as_str(),
            "https://auth.example.net/project-1/v1/accounts:signOut"
        );
    }

    #[test]
    fn test_endpoints_reject_opaque_base() {
        let base = Url::parse("mailto:auth@example.net").unwrap();
        assert!(
            RestIdentityService::new(reqwest::Client::new(), &base, SecretString::from("k"))
                .is_err()
        );
    }
}
