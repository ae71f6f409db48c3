//! In-memory walkthrough of the account flow.

use secrecy::SecretString;
use tokio::runtime::Handle;

use portfolio_client::AppState;
use portfolio_client::screens::{LoginForm, SignUpForm};
use portfolio_client::services::{LOGIN_FAILED, REGISTRATION_FAILED};

use super::CommandError;
use super::session::finish;

const DEMO_EMAIL: &str = "ada@example.com";
const DEMO_PASSWORD: &str = "analytical-engine";

/// Sign up, sign out, log back in and show the profile each time.
#[allow(clippy::print_stdout)]
pub async fn run() -> Result<(), CommandError> {
    let state = AppState::in_memory(Handle::current());
    let navigator = state.navigator();

    println!("== Sign up (mismatched confirmation)");
    if navigator.submit_sign_up(form("not-the-same")).is_none() {
        println!("{}", navigator.error().unwrap_or_default());
    }

    println!("\n== Sign up");
    if let Some(task) = navigator.submit_sign_up(form(DEMO_PASSWORD)) {
        task.await?;
    }
    finish(&navigator, REGISTRATION_FAILED).await?;

    println!("\n== Sign out");
    navigator.sign_out().await;
    println!("{}", navigator.home_view().await);

    println!("\n== Log in");
    navigator
        .submit_login(LoginForm {
            email: DEMO_EMAIL.to_string(),
            password: SecretString::from(DEMO_PASSWORD),
        })
        .await?;
    finish(&navigator, LOGIN_FAILED).await?;

    tracing::info!("Demo complete");
    Ok(())
}

fn form(confirm_password: &str) -> SignUpForm {
    SignUpForm {
        email: DEMO_EMAIL.to_string(),
        password: SecretString::from(DEMO_PASSWORD),
        confirm_password: SecretString::from(confirm_password),
        name: "Ada Lovelace".to_string(),
        address: "12 Analytical St, London".to_string(),
        bio: "Wrote the first published algorithm.".to_string(),
    }
}
