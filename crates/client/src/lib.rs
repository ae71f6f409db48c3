//! Portfolio account client.
//!
//! Sign-up, login, sign-out and profile display against a hosted identity
//! service and a hosted document store. Both backends are traits
//! ([`identity::IdentityService`], [`store::DocumentStore`]) injected into the
//! services, with REST and in-memory implementations provided.
//!
//! ```rust,ignore
//! let state = AppState::from_config(&ClientConfig::from_env()?, Handle::current())?;
//! state.session().register(registration).await?;
//! let lookup = state.profiles().lookup_profile("ada@example.com").await;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod identity;
pub mod screens;
pub mod services;
pub mod state;
pub mod store;
pub mod telemetry;

pub use config::ClientConfig;
pub use state::{AppState, StateError};
