//! Core types for the portfolio account client.
//!
//! This module provides type-safe wrappers for the account and profile domain.

pub mod credential;
pub mod email;
pub mod id;
pub mod profile;

pub use credential::Credential;
pub use email::{Email, EmailError};
pub use id::*;
pub use profile::{Profile, ProfileLookup};
