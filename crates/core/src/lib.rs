//! Portfolio Core - Shared domain types.
//!
//! This crate provides the types shared by the account client and its front
//! ends:
//! - `client` - Session and profile workflow against hosted services
//! - `cli` - Command-line front end
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no async
//! runtime. Anything that talks to the identity service or the document store
//! lives in `portfolio-client`.
//!
//! # Modules
//!
//! - [`types`] - Emails, identifiers, credentials and profile records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
