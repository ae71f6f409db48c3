//! Sign-in credentials.
//!
//! A credential only lives for the duration of one identity-service call. The
//! password is wrapped in [`SecretString`] so it never shows up in logs.

use secrecy::{ExposeSecret, SecretString};

/// An email/password pair as typed by the user.
///
/// The email is kept verbatim: validating it is the identity service's job.
#[derive(Debug)]
pub struct Credential {
    email: String,
    password: SecretString,
}

impl Credential {
    /// Build a credential from raw user input.
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<SecretString>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// The email exactly as entered.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Expose the password for the one place that must send or hash it.
    #[must_use]
    pub fn expose_password(&self) -> &str {
        self.password.expose_secret()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_password() {
        let credential = Credential::new("ada@example.com", SecretString::from("hunter22"));
        let debug_output = format!("{credential:?}");

        assert!(debug_output.contains("ada@example.com"));
        assert!(!debug_output.contains("hunter22"));
    }

    #[test]
    fn test_email_is_not_normalized() {
        let credential = Credential::new(" Ada@Example.com", SecretString::from("pw"));
        assert_eq!(credential.email(), " Ada@Example.com");
        assert_eq!(credential.expose_password(), "pw");
    }
}
