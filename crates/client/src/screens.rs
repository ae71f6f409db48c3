//! Screen flow.
//!
//! A front end shows one of three screens. The [`Navigator`] holds which one
//! is current plus the last error message, and moves between them as forms are
//! submitted. Submissions run in the background and update the navigator from
//! their callbacks, so a front end only ever reads [`Navigator::screen`] and
//! [`Navigator::error`].

use std::fmt;
use std::pin::pin;
use std::sync::Arc;

use futures::StreamExt;
use parking_lot::RwLock;
use secrecy::{ExposeSecret, SecretString};
use tokio::task::JoinHandle;

use portfolio_core::{Profile, ProfileLookup};

use crate::services::{Registration, SessionManager};

/// Shown when the sign-up password and its confirmation differ.
pub const PASSWORD_MISMATCH: &str = "Passwords do not match";

/// Shown on the home screen until a profile has been found.
pub const LOADING_PLACEHOLDER: &str = "Loading user data...";

/// Screens of the account flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    SignUp,
    Home,
}

/// Fields of the sign-up screen.
#[derive(Debug)]
pub struct SignUpForm {
    pub email: String,
    pub password: SecretString,
    pub confirm_password: SecretString,
    pub name: String,
    pub address: String,
    pub bio: String,
}

impl SignUpForm {
    /// Check the form before anything is sent.
    ///
    /// Only password confirmation is checked; everything else is left to the
    /// identity service.
    ///
    /// # Errors
    ///
    /// Returns [`PASSWORD_MISMATCH`] when the two passwords differ.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.password.expose_secret() == self.confirm_password.expose_secret() {
            Ok(())
        } else {
            Err(PASSWORD_MISMATCH)
        }
    }

    fn into_registration(self) -> Registration {
        Registration {
            email: self.email,
            password: self.password,
            name: self.name,
            address: self.address,
            bio: self.bio,
        }
    }
}

/// Fields of the login screen.
#[derive(Debug)]
pub struct LoginForm {
    pub email: String,
    pub password: SecretString,
}

/// What the home screen shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HomeView {
    /// No profile yet: the lookup found nothing or failed.
    Loading,
    /// The signed-in user's profile.
    Profile(Profile),
}

impl HomeView {
    /// Build the view from a lookup result.
    #[must_use]
    pub fn from_lookup(lookup: ProfileLookup) -> Self {
        lookup.into_profile().map_or(Self::Loading, Self::Profile)
    }

    /// Text lines to render, top to bottom.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        match self {
            Self::Loading => vec![LOADING_PLACEHOLDER.to_string()],
            Self::Profile(profile) => {
                let field = |value: &Option<String>| value.as_deref().unwrap_or_default().to_owned();
                vec![
                    format!("Name: {}", field(&profile.name)),
                    format!("Email: {}", field(&profile.email)),
                    format!("Address: {}", field(&profile.address)),
                    format!("Bio: {}", field(&profile.bio)),
                ]
            }
        }
    }
}

impl fmt::Display for HomeView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines().join("\n"))
    }
}

#[derive(Debug)]
struct NavState {
    screen: Screen,
    error: Option<String>,
}

/// Current screen and message, driven by form submissions.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct Navigator {
    session: SessionManager,
    state: Arc<RwLock<NavState>>,
}

impl Navigator {
    /// Start on the login screen.
    #[must_use]
    pub fn new(session: SessionManager) -> Self {
        Self {
            session,
            state: Arc::new(RwLock::new(NavState {
                screen: Screen::Login,
                error: None,
            })),
        }
    }

    /// The screen currently shown.
    #[must_use]
    pub fn screen(&self) -> Screen {
        self.state.read().screen
    }

    /// The message currently shown, if any.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.state.read().error.clone()
    }

    /// Switch screens and clear the message.
    pub fn go_to(&self, screen: Screen) {
        let mut state = self.state.write();
        state.screen = screen;
        state.error = None;
    }

    fn fail(state: &RwLock<NavState>, message: String) {
        state.write().error = Some(message);
    }

    /// Submit the sign-up form.
    ///
    /// A password mismatch is reported immediately and nothing is sent; `None`
    /// is returned. Otherwise registration runs in the background and the
    /// returned handle completes once the navigator has been updated.
    pub fn submit_sign_up(&self, form: SignUpForm) -> Option<JoinHandle<()>> {
        if let Err(message) = form.validate() {
            Self::fail(&self.state, message.to_string());
            return None;
        }

        let on_success = {
            let navigator = self.clone();
            move || navigator.go_to(Screen::Home)
        };
        let on_failure = {
            let state = Arc::clone(&self.state);
            move |message| Self::fail(&state, message)
        };

        Some(
            self.session
                .register_in_background(form.into_registration(), on_success, on_failure),
        )
    }

    /// Submit the login form; the handle completes once the navigator has been
    /// updated.
    pub fn submit_login(&self, form: LoginForm) -> JoinHandle<()> {
        let on_success = {
            let navigator = self.clone();
            move || navigator.go_to(Screen::Home)
        };
        let on_failure = {
            let state = Arc::clone(&self.state);
            move |message| Self::fail(&state, message)
        };

        self.session
            .login_in_background(form.email, form.password, on_success, on_failure)
    }

    /// Sign out and return to the login screen.
    pub async fn sign_out(&self) {
        self.session.logout().await;
        self.go_to(Screen::Login);
    }

    /// Look up the signed-in user's profile for the home screen.
    pub async fn home_view(&self) -> HomeView {
        let email = self.session.current_user_email().unwrap_or_default();
        let mut profile = pin!(self.session.profiles().fetch_profile(&email));
        let lookup = profile.next().await.unwrap_or(ProfileLookup::NotFound);
        HomeView::from_lookup(lookup)
    }
}
