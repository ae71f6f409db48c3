//! Integration test support for the portfolio account client.
//!
//! [`MockBackend`] serves the identity and document store wire protocol from
//! an in-process axum server on an ephemeral port, so the REST clients can be
//! exercised end-to-end without hosted services.
//!
//! ```rust,ignore
//! let backend = MockBackend::start().await?;
//! let state = AppState::from_config(&backend.config(), Handle::current())?;
//! state.session().register(registration).await?;
//! assert_eq!(backend.documents("users").len(), 1);
//! ```
//!
//! # Test Categories
//!
//! - `session_flow` - Session and profile workflow over in-memory backends
//! - `rest_backend` - REST clients against the mock backend

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::Mutex;
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tokio::sync::oneshot;
use url::Url;

use portfolio_client::ClientConfig;
use portfolio_client::config::DEFAULT_PROFILE_COLLECTION;

/// API key the mock backend accepts.
pub const MOCK_API_KEY: &str = "mk_7Qz4rT9pLw2Xv8Nc";

const API_KEY_HEADER: &str = "x-api-key";

struct MockAccount {
    id: String,
    password: String,
}

#[derive(Default)]
struct MockState {
    accounts: Mutex<HashMap<String, MockAccount>>,
    tokens: Mutex<HashMap<String, String>>,
    revoked: Mutex<Vec<String>>,
    collections: Mutex<HashMap<String, Vec<(String, Map<String, Value>)>>>,
    next_token: AtomicUsize,
    next_document: AtomicUsize,
    sign_ups: AtomicUsize,
    inserts: AtomicUsize,
    identity_unavailable: AtomicBool,
    identity_silent: AtomicBool,
    store_unavailable: AtomicBool,
    writes_failing: AtomicBool,
}

impl MockState {
    fn authorize(headers: &HeaderMap) -> Result<(), Response> {
        match headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) {
            Some(MOCK_API_KEY) => Ok(()),
            _ => Err(error_response(
                StatusCode::UNAUTHORIZED,
                "INVALID_API_KEY",
                "API key not valid.",
            )),
        }
    }

    fn identity_gate(&self, headers: &HeaderMap) -> Result<(), Response> {
        Self::authorize(headers)?;
        if self.identity_unavailable.load(Ordering::SeqCst) {
            return Err(error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "UNAVAILABLE",
                "Service unavailable",
            ));
        }
        if self.identity_silent.load(Ordering::SeqCst) {
            return Err(StatusCode::INTERNAL_SERVER_ERROR.into_response());
        }
        Ok(())
    }

    fn store_gate(&self, headers: &HeaderMap) -> Result<(), Response> {
        Self::authorize(headers)?;
        if self.store_unavailable.load(Ordering::SeqCst) {
            return Err(error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "UNAVAILABLE",
                "Service unavailable",
            ));
        }
        Ok(())
    }

    fn signed_in(&self, account_id: &str, email: &str) -> Response {
        let token = format!("token-{}", self.next_token.fetch_add(1, Ordering::SeqCst) + 1);
        self.tokens.lock().insert(token.clone(), email.to_owned());
        Json(json!({
            "accountId": account_id,
            "email": email,
            "idToken": token,
        }))
        .into_response()
    }
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({ "error": { "code": code, "message": message } })),
    )
        .into_response()
}

#[derive(Deserialize)]
struct CredentialBody {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct InsertBody {
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Deserialize)]
struct QueryParams {
    field: String,
    value: String,
}

async fn sign_up(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<CredentialBody>,
) -> Response {
    if let Err(response) = state.identity_gate(&headers) {
        return response;
    }
    state.sign_ups.fetch_add(1, Ordering::SeqCst);

    // Accounts are keyed case-insensitively; responses echo the email as sent
    let key = body.email.trim().to_lowercase();
    if !key.contains('@') {
        return error_response(
            StatusCode::BAD_REQUEST,
            "INVALID_EMAIL",
            "The email address is badly formatted.",
        );
    }
    if body.password.chars().count() < 6 {
        return error_response(
            StatusCode::BAD_REQUEST,
            "WEAK_PASSWORD",
            "Password should be at least 6 characters",
        );
    }

    let id = {
        let mut accounts = state.accounts.lock();
        if accounts.contains_key(&key) {
            return error_response(
                StatusCode::BAD_REQUEST,
                "EMAIL_EXISTS",
                "The email address is already in use by another account.",
            );
        }
        let id = format!("mock-{}", accounts.len() + 1);
        accounts.insert(
            key,
            MockAccount {
                id: id.clone(),
                password: body.password,
            },
        );
        id
    };

    state.signed_in(&id, &body.email)
}

async fn sign_in(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<CredentialBody>,
) -> Response {
    if let Err(response) = state.identity_gate(&headers) {
        return response;
    }

    let key = body.email.trim().to_lowercase();
    let id = state
        .accounts
        .lock()
        .get(&key)
        .filter(|account| account.password == body.password)
        .map(|account| account.id.clone());

    match id {
        Some(id) => state.signed_in(&id, &body.email),
        None => error_response(
            StatusCode::BAD_REQUEST,
            "INVALID_CREDENTIALS",
            "The email or password is incorrect.",
        ),
    }
}

async fn sign_out(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(response) = MockState::authorize(&headers) {
        return response;
    }

    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_owned);

    match token {
        Some(token) if state.tokens.lock().remove(&token).is_some() => {
            state.revoked.lock().push(token);
            StatusCode::NO_CONTENT.into_response()
        }
        _ => error_response(StatusCode::UNAUTHORIZED, "INVALID_TOKEN", "Unknown token"),
    }
}

async fn insert_document(
    State(state): State<Arc<MockState>>,
    Path(collection): Path<String>,
    headers: HeaderMap,
    Json(body): Json<InsertBody>,
) -> Response {
    if let Err(response) = state.store_gate(&headers) {
        return response;
    }
    state.inserts.fetch_add(1, Ordering::SeqCst);
    if state.writes_failing.load(Ordering::SeqCst) {
        return error_response(
            StatusCode::FORBIDDEN,
            "PERMISSION_DENIED",
            "Missing or insufficient permissions.",
        );
    }

    let id = format!("doc-{}", state.next_document.fetch_add(1, Ordering::SeqCst) + 1);
    state
        .collections
        .lock()
        .entry(collection)
        .or_default()
        .push((id.clone(), body.fields));

    Json(json!({ "id": id })).into_response()
}

async fn query_documents(
    State(state): State<Arc<MockState>>,
    Path(collection): Path<String>,
    Query(params): Query<QueryParams>,
    headers: HeaderMap,
) -> Response {
    if let Err(response) = state.store_gate(&headers) {
        return response;
    }

    let documents: Vec<Value> = state
        .collections
        .lock()
        .get(&collection)
        .map(|documents| {
            documents
                .iter()
                .filter(|(_, fields)| {
                    fields.get(&params.field).and_then(Value::as_str) == Some(params.value.as_str())
                })
                .map(|(id, fields)| json!({ "id": id, "fields": fields }))
                .collect()
        })
        .unwrap_or_default();

    Json(json!({ "documents": documents })).into_response()
}

/// In-process identity service and document store.
///
/// The server stops when the handle is dropped.
pub struct MockBackend {
    state: Arc<MockState>,
    base_url: Url,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockBackend {
    /// Start a backend on an ephemeral localhost port.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start() -> std::io::Result<Self> {
        let state = Arc::new(MockState::default());

        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let local_addr = listener.local_addr()?;
        let base_url = Url::parse(&format!("http://{local_addr}/")).map_err(std::io::Error::other)?;

        let app = Router::new()
            .route("/v1/accounts:signUp", post(sign_up))
            .route("/v1/accounts:signIn", post(sign_in))
            .route("/v1/accounts:signOut", post(sign_out))
            .route(
                "/v1/collections/{collection}/documents",
                post(insert_document).get(query_documents),
            )
            .with_state(state.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;

            if let Err(e) = result {
                tracing::error!("Mock backend error: {e}");
            }
        });

        Ok(Self {
            state,
            base_url,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    /// Root URL of both services.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Client configuration pointing at this backend.
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        self.config_with_key(MOCK_API_KEY)
    }

    /// Client configuration pointing at this backend with a chosen API key.
    #[must_use]
    pub fn config_with_key(&self, api_key: &str) -> ClientConfig {
        ClientConfig {
            identity_url: self.base_url.clone(),
            store_url: self.base_url.clone(),
            api_key: SecretString::from(api_key),
            profile_collection: DEFAULT_PROFILE_COLLECTION.to_string(),
            sentry_dsn: None,
        }
    }

    /// Answer identity requests with 503.
    pub fn set_identity_unavailable(&self, unavailable: bool) {
        self.state
            .identity_unavailable
            .store(unavailable, Ordering::SeqCst);
    }

    /// Answer identity requests with a bare 500 and no message.
    pub fn set_identity_silent(&self, silent: bool) {
        self.state.identity_silent.store(silent, Ordering::SeqCst);
    }

    /// Answer document store requests with 503.
    pub fn set_store_unavailable(&self, unavailable: bool) {
        self.state.store_unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Reject inserts with 403 while queries keep working.
    pub fn set_writes_failing(&self, failing: bool) {
        self.state.writes_failing.store(failing, Ordering::SeqCst);
    }

    /// Sign-up requests that passed the API key and availability checks.
    #[must_use]
    pub fn sign_up_count(&self) -> usize {
        self.state.sign_ups.load(Ordering::SeqCst)
    }

    /// Insert requests that passed the API key and availability checks.
    #[must_use]
    pub fn insert_count(&self) -> usize {
        self.state.inserts.load(Ordering::SeqCst)
    }

    /// Tokens revoked through sign-out, oldest first.
    #[must_use]
    pub fn revoked_tokens(&self) -> Vec<String> {
        self.state.revoked.lock().clone()
    }

    /// Field maps stored in a collection, oldest first.
    #[must_use]
    pub fn documents(&self, collection: &str) -> Vec<Value> {
        self.state
            .collections
            .lock()
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .map(|(_, fields)| Value::Object(fields.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Store a document directly, bypassing the API.
    pub fn seed_document(&self, collection: &str, fields: Map<String, Value>) {
        let id = format!(
            "doc-{}",
            self.state.next_document.fetch_add(1, Ordering::SeqCst) + 1
        );
        self.state
            .collections
            .lock()
            .entry(collection.to_owned())
            .or_default()
            .push((id, fields));
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
