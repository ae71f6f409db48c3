//! Business logic services.
//!
//! # Services
//!
//! - `profile` - Profile documents keyed by email
//! - `session` - Sign-up, login, logout and the signed-in identity

mod profile;
mod session;

pub use profile::{EMAIL_FIELD, ProfileStore};
pub use session::{LOGIN_FAILED, REGISTRATION_FAILED, Registration, SessionError, SessionManager};
