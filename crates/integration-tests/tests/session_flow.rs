//! Session and profile workflow over in-memory backends.
//!
//! Run with: cargo test -p portfolio-integration-tests

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use futures::StreamExt;
use parking_lot::Mutex;
use secrecy::SecretString;
use tokio::runtime::Handle;

use portfolio_client::AppState;
use portfolio_client::identity::MemoryIdentityService;
use portfolio_client::screens::{PASSWORD_MISMATCH, Screen, SignUpForm};
use portfolio_client::services::{Registration, SessionError};
use portfolio_client::store::MemoryDocumentStore;
use portfolio_core::ProfileLookup;

struct Fixture {
    identity: Arc<MemoryIdentityService>,
    store: Arc<MemoryDocumentStore>,
    state: AppState,
}

fn fixture() -> Fixture {
    let identity = Arc::new(MemoryIdentityService::new());
    let store = Arc::new(MemoryDocumentStore::new());
    let state = AppState::new(identity.clone(), store.clone(), "users", Handle::current());
    Fixture {
        identity,
        store,
        state,
    }
}

fn registration(email: &str, password: &str) -> Registration {
    Registration {
        email: email.to_string(),
        password: SecretString::from(password),
        name: "Grace".to_string(),
        address: "1 Harbor Rd".to_string(),
        bio: "Compiler pioneer".to_string(),
    }
}

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn test_registered_profile_is_fetched_by_email() {
    let f = fixture();
    let pairs = [
        ("grace@example.com", "cobol1959"),
        ("ada@example.org", "engine"),
        ("linus+kernel@example.net", "p3ngu1n-rules"),
    ];

    for (email, password) in pairs {
        f.state
            .session()
            .register(registration(email, password))
            .await
            .unwrap();

        let values: Vec<ProfileLookup> = f.state.profiles().fetch_profile(email).collect().await;
        assert_eq!(values.len(), 1, "exactly one value for {email}");

        let profile = values.into_iter().next().unwrap().into_profile().unwrap();
        assert_eq!(profile.email.as_deref(), Some(email));
        assert_eq!(profile.name.as_deref(), Some("Grace"));
    }

    assert_eq!(f.store.documents("users").len(), pairs.len());
}

#[tokio::test]
async fn test_mixed_case_email_is_kept_as_entered() {
    let f = fixture();
    f.state
        .session()
        .register(registration("Grace@Example.com", "cobol1959"))
        .await
        .unwrap();

    assert_eq!(
        f.state.session().current_user_email().as_deref(),
        Some("Grace@Example.com")
    );

    let values: Vec<ProfileLookup> = f
        .state
        .profiles()
        .fetch_profile("Grace@Example.com")
        .collect()
        .await;
    let profile = values.into_iter().next().unwrap().into_profile().unwrap();
    assert_eq!(profile.email.as_deref(), Some("Grace@Example.com"));

    // Uniqueness still ignores case
    f.state.session().logout().await;
    let err = f
        .state
        .session()
        .register(registration("grace@example.com", "cobol1960"))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Registration(_)));
    assert_eq!(f.store.documents("users").len(), 1);
}

#[tokio::test]
async fn test_failed_registration_inserts_nothing() {
    let f = fixture();

    // Rejected by the identity service: password too short
    let err = f
        .state
        .session()
        .register(registration("grace@example.com", "abc"))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Registration(_)));
    assert_eq!(
        err.user_message(),
        "Password should be at least 6 characters"
    );

    // Identity service down
    f.identity.set_unavailable(true);
    f.state
        .session()
        .register(registration("grace@example.com", "cobol1959"))
        .await
        .unwrap_err();

    assert_eq!(f.store.insert_calls(), 0);
    assert!(f.store.documents("users").is_empty());
}

#[tokio::test]
async fn test_password_mismatch_rejected_before_session() {
    let f = fixture();
    let navigator = f.state.navigator();
    navigator.go_to(Screen::SignUp);

    let task = navigator.submit_sign_up(SignUpForm {
        email: "grace@example.com".to_string(),
        password: SecretString::from("abc123"),
        confirm_password: SecretString::from("abc124"),
        name: String::new(),
        address: String::new(),
        bio: String::new(),
    });

    assert!(task.is_none());
    assert_eq!(navigator.error().as_deref(), Some(PASSWORD_MISMATCH));
    assert_eq!(navigator.screen(), Screen::SignUp);
    assert_eq!(f.identity.create_account_calls(), 0);
    assert_eq!(f.identity.account_count(), 0);
}

#[tokio::test]
async fn test_profile_write_failure_reaches_failure_callback() {
    let f = fixture();
    f.store.set_writes_failing(true);

    let messages: Arc<Mutex<Vec<String>>> = Arc::default();
    let sink = messages.clone();
    f.state
        .session()
        .register_in_background(
            registration("grace@example.com", "cobol1959"),
            || panic!("registration should not report success"),
            move |message| sink.lock().push(message),
        )
        .await
        .unwrap();

    let messages = messages.lock().clone();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("Account created, but saving the profile failed"));
    assert_eq!(
        f.state.session().current_user_email().as_deref(),
        Some("grace@example.com")
    );
}

// ============================================================================
// Profile lookup
// ============================================================================

#[tokio::test]
async fn test_empty_store_yields_not_found() {
    let f = fixture();
    let values: Vec<ProfileLookup> = f
        .state
        .profiles()
        .fetch_profile("nobody@example.com")
        .collect()
        .await;
    assert_eq!(values, vec![ProfileLookup::NotFound]);
}

#[tokio::test]
async fn test_store_failure_is_not_absence() {
    let f = fixture();
    f.store.set_unavailable(true);

    let lookup = f.state.profiles().lookup_profile("nobody@example.com").await;
    assert!(lookup.is_error());
    assert_ne!(lookup, ProfileLookup::NotFound);
}

// ============================================================================
// Current identity
// ============================================================================

#[tokio::test]
async fn test_current_user_tracks_login_and_logout() {
    let f = fixture();
    let session = f.state.session();
    assert!(session.current_user_email().is_none());

    session
        .register(registration("grace@example.com", "cobol1959"))
        .await
        .unwrap();
    assert_eq!(
        session.current_user_email().as_deref(),
        Some("grace@example.com")
    );

    session
        .register(registration("ada@example.org", "engine"))
        .await
        .unwrap();
    assert_eq!(session.current_user_email().as_deref(), Some("ada@example.org"));

    session
        .login("grace@example.com", SecretString::from("cobol1959"))
        .await
        .unwrap();
    assert_eq!(
        session.current_user_email().as_deref(),
        Some("grace@example.com")
    );

    session.logout().await;
    assert!(session.current_user_email().is_none());
}

#[tokio::test]
async fn test_failed_login_keeps_previous_identity() {
    let f = fixture();
    let session = f.state.session();
    session
        .register(registration("grace@example.com", "cobol1959"))
        .await
        .unwrap();

    let err = session
        .login("grace@example.com", SecretString::from("wrong-one"))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Login(_)));
    assert_eq!(
        session.current_user_email().as_deref(),
        Some("grace@example.com")
    );
}

#[tokio::test]
async fn test_full_screen_flow() {
    let f = fixture();
    let navigator = f.state.navigator();
    assert_eq!(navigator.screen(), Screen::Login);

    navigator.go_to(Screen::SignUp);
    navigator
        .submit_sign_up(SignUpForm {
            email: "grace@example.com".to_string(),
            password: SecretString::from("cobol1959"),
            confirm_password: SecretString::from("cobol1959"),
            name: "Grace".to_string(),
            address: "1 Harbor Rd".to_string(),
            bio: String::new(),
        })
        .unwrap()
        .await
        .unwrap();
    assert_eq!(navigator.screen(), Screen::Home);
    assert_eq!(
        navigator.home_view().await.lines(),
        vec![
            "Name: Grace",
            "Email: grace@example.com",
            "Address: 1 Harbor Rd",
            "Bio: ",
        ]
    );

    navigator.sign_out().await;
    assert_eq!(navigator.screen(), Screen::Login);
    assert!(f.state.session().current_user_email().is_none());
}
