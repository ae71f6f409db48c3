//! CLI commands.

pub mod demo;
pub mod profile;
pub mod session;

use thiserror::Error;

use portfolio_client::StateError;
use portfolio_client::config::ConfigError;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Backends could not be wired.
    #[error("Initialization error: {0}")]
    State(#[from] StateError),

    /// A background task panicked or was cancelled.
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// The backend refused the request; carries the message to show.
    #[error("{0}")]
    Rejected(String),
}
