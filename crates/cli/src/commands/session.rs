//! Sign-up and login commands.
//!
//! Both drive the screen flow the same way an interactive front end would,
//! then print the home screen on success.

use secrecy::SecretString;

use portfolio_client::AppState;
use portfolio_client::screens::{LoginForm, Navigator, Screen, SignUpForm};
use portfolio_client::services::{LOGIN_FAILED, REGISTRATION_FAILED};

use super::CommandError;

/// Build a sign-up form from command-line arguments.
pub fn sign_up_form(
    email: String,
    name: String,
    address: String,
    bio: String,
    password: String,
    confirm_password: String,
) -> SignUpForm {
    SignUpForm {
        email,
        password: SecretString::from(password),
        confirm_password: SecretString::from(confirm_password),
        name,
        address,
        bio,
    }
}

/// Register an account and print the home screen.
pub async fn signup(state: &AppState, form: SignUpForm) -> Result<(), CommandError> {
    let navigator = state.navigator();
    navigator.go_to(Screen::SignUp);

    if let Some(task) = navigator.submit_sign_up(form) {
        task.await?;
    }

    finish(&navigator, REGISTRATION_FAILED).await
}

/// Sign in and print the home screen.
pub async fn login(state: &AppState, email: String, password: String) -> Result<(), CommandError> {
    let navigator = state.navigator();
    navigator
        .submit_login(LoginForm {
            email,
            password: SecretString::from(password),
        })
        .await?;

    finish(&navigator, LOGIN_FAILED).await
}

/// Print the home screen, or turn the navigator's message into an error.
#[allow(clippy::print_stdout)]
pub async fn finish(navigator: &Navigator, fallback: &str) -> Result<(), CommandError> {
    if navigator.screen() != Screen::Home {
        let message = navigator.error().unwrap_or_else(|| fallback.to_string());
        return Err(CommandError::Rejected(message));
    }

    println!("{}", navigator.home_view().await);
    Ok(())
}
