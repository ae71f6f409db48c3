//! Profile lookup command.

use portfolio_client::AppState;
use portfolio_client::screens::HomeView;
use portfolio_core::ProfileLookup;

use super::CommandError;

/// Print the profile stored for `email`.
#[allow(clippy::print_stdout)]
pub async fn show(state: &AppState, email: &str) -> Result<(), CommandError> {
    match state.profiles().lookup_profile(email).await {
        ProfileLookup::Found(profile) => {
            println!("{}", HomeView::Profile(profile));
            Ok(())
        }
        ProfileLookup::NotFound => {
            println!("No profile for {email}");
            Ok(())
        }
        ProfileLookup::QueryError(reason) => Err(CommandError::Rejected(format!(
            "Could not load profile: {reason}"
        ))),
    }
}
