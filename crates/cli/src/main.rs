//! Portfolio CLI - sign up, log in and view profiles from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Create an account and its profile
//! portfolio signup -e ada@example.com -n "Ada" --address "12 Analytical St" \
//!     --bio "Mathematician" --password hunter22 --confirm-password hunter22
//!
//! # Log in and show the home screen
//! PORTFOLIO_PASSWORD=hunter22 portfolio login -e ada@example.com
//!
//! # Show the profile stored for an email
//! portfolio profile -e ada@example.com
//!
//! # Walk through the whole flow against in-memory backends
//! portfolio demo
//! ```
//!
//! # Commands
//!
//! - `signup` - Register an account and create its profile
//! - `login` - Sign in and show the profile
//! - `profile` - Look up a profile by email
//! - `demo` - Sign up, sign out, log in and show the profile, in memory
//!
//! Without `--in-memory` the hosted backends are configured from the
//! environment (see `portfolio_client::config`), including `SENTRY_DSN`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tokio::runtime::Handle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use portfolio_client::config::ConfigError;
use portfolio_client::{AppState, ClientConfig};

mod commands;

use commands::CommandError;

#[derive(Parser)]
#[command(name = "portfolio")]
#[command(author, version, about = "Portfolio account client")]
struct Cli {
    /// Use in-process backends instead of the configured hosted services
    #[arg(long, global = true)]
    in_memory: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Whether the command talks to the configured hosted services.
    const fn uses_hosted_backends(&self) -> bool {
        !self.in_memory && !matches!(self.command, Commands::Demo)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Register an account and create its profile
    Signup {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long, default_value = "")]
        name: String,

        /// Postal address
        #[arg(long, default_value = "")]
        address: String,

        /// Short biography
        #[arg(long, default_value = "")]
        bio: String,

        /// Account password
        #[arg(long, env = "PORTFOLIO_PASSWORD", hide_env_values = true)]
        password: String,

        /// Account password, again
        #[arg(long, env = "PORTFOLIO_PASSWORD", hide_env_values = true)]
        confirm_password: String,
    },
    /// Sign in and show the profile
    Login {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(long, env = "PORTFOLIO_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Look up the profile stored for an email
    Profile {
        /// Email the profile was created with
        #[arg(short, long)]
        email: String,
    },
    /// Walk through sign-up, sign-out and login against in-memory backends
    Demo,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = cli
        .uses_hosted_backends()
        .then(ClientConfig::from_env)
        .transpose();

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = config
        .as_ref()
        .ok()
        .and_then(Option::as_ref)
        .and_then(init_sentry);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "portfolio_client=info,portfolio_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli, config).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

/// Build the state a command runs against: hosted when configured, in memory
/// otherwise.
fn state(config: Option<&ClientConfig>) -> Result<AppState, CommandError> {
    let runtime = Handle::current();
    let Some(config) = config else {
        return Ok(AppState::in_memory(runtime));
    };
    tracing::debug!(?config, "Loaded configuration");
    Ok(AppState::from_config(config, runtime)?)
}

async fn run(
    cli: Cli,
    config: Result<Option<ClientConfig>, ConfigError>,
) -> Result<(), CommandError> {
    let config = config?;
    let config = config.as_ref();

    match cli.command {
        Commands::Signup {
            email,
            name,
            address,
            bio,
            password,
            confirm_password,
        } => {
            let state = state(config)?;
            let form = commands::session::sign_up_form(
                email,
                name,
                address,
                bio,
                password,
                confirm_password,
            );
            commands::session::signup(&state, form).await?;
        }
        Commands::Login { email, password } => {
            let state = state(config)?;
            commands::session::login(&state, email, password).await?;
        }
        Commands::Profile { email } => {
            let state = state(config)?;
            commands::profile::show(&state, &email).await?;
        }
        Commands::Demo => commands::demo::run().await?,
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn config(sentry_dsn: Option<&str>) -> ClientConfig {
        ClientConfig {
            identity_url: "http://127.0.0.1:9099/".parse().unwrap(),
            store_url: "http://127.0.0.1:8080/".parse().unwrap(),
            api_key: SecretString::from("mk_test_7f3a9c2e4b1d8f6a"),
            profile_collection: "users".to_string(),
            sentry_dsn: sentry_dsn.map(String::from),
        }
    }

    #[test]
    fn test_only_hosted_commands_load_config() {
        let cli = Cli::parse_from(["portfolio", "profile", "-e", "ada@example.com"]);
        assert!(cli.uses_hosted_backends());

        let cli = Cli::parse_from(["portfolio", "--in-memory", "profile", "-e", "ada@example.com"]);
        assert!(!cli.uses_hosted_backends());

        let cli = Cli::parse_from(["portfolio", "demo"]);
        assert!(!cli.uses_hosted_backends());
    }

    #[test]
    fn test_sentry_dsn_comes_from_config() {
        assert!(init_sentry(&config(None)).is_none());

        let guard = init_sentry(&config(Some("https://public@o0.ingest.sentry.io/0"))).unwrap();
        assert!(guard.is_enabled());
    }
}
