//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `PORTFOLIO_IDENTITY_URL` - Base URL of the hosted identity service
//! - `PORTFOLIO_STORE_URL` - Base URL of the hosted document store
//! - `PORTFOLIO_API_KEY` - Project API key sent with every request
//!
//! ## Optional
//! - `PORTFOLIO_PROFILE_COLLECTION` - Collection holding profiles (default: users)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Collection used for profile documents unless overridden.
pub const DEFAULT_PROFILE_COLLECTION: &str = "users";

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.0;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "api-key",
    "xxx",
    "todo",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Account client configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL of the identity service
    pub identity_url: Url,
    /// Base URL of the document store
    pub store_url: Url,
    /// Project API key
    pub api_key: SecretString,
    /// Collection profiles are written to and read from
    pub profile_collection: String,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("identity_url", &self.identity_url.as_str())
            .field("store_url", &self.store_url.as_str())
            .field("api_key", &"[REDACTED]")
            .field("profile_collection", &self.profile_collection)
            .field("sentry_dsn", &self.sentry_dsn)
            .finish()
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, a URL does not
    /// parse, or the API key fails validation (placeholder detection, entropy
    /// check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let identity_url = get_required_url("PORTFOLIO_IDENTITY_URL")?;
        let store_url = get_required_url("PORTFOLIO_STORE_URL")?;
        let api_key = get_validated_secret("PORTFOLIO_API_KEY")?;
        let profile_collection =
            get_env_or_default("PORTFOLIO_PROFILE_COLLECTION", DEFAULT_PROFILE_COLLECTION);
        if profile_collection.is_empty() || profile_collection.contains('/') {
            return Err(ConfigError::InvalidEnvVar(
                "PORTFOLIO_PROFILE_COLLECTION".to_string(),
                "must be a non-empty name without '/'".to_string(),
            ));
        }

        Ok(Self {
            identity_url,
            store_url,
            api_key,
            profile_collection,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable and parse it as an http(s) base URL.
fn get_required_url(key: &str) -> Result<Url, ConfigError> {
    parse_base_url(&get_required_env(key)?)
        .map_err(|reason| ConfigError::InvalidEnvVar(key.to_string(), reason))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a service base URL.
///
/// Only http(s) is accepted. A trailing slash is added so relative joins keep
/// any path prefix (`https://host/api` + `v1/...` → `https://host/api/v1/...`).
fn parse_base_url(raw: &str) -> Result<Url, String> {
    let mut url = Url::parse(raw).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("must have a host".to_string());
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_bounds() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let err = validate_secret_strength("your-api-key-here", "TEST_VAR").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let err = validate_secret_strength("abababababababab", "TEST_VAR").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        assert!(validate_secret_strength("AIzaSyD3k9Qm7Lp2Vt8Xw1Rb4Nc6", "TEST_VAR").is_ok());
    }

    #[test]
    fn test_parse_base_url_adds_trailing_slash() {
        let url = parse_base_url("https://id.example.net/api").unwrap();
        assert_eq!(url.as_str(), "https://id.example.net/api/");
        assert_eq!(
            url.join("v1/accounts:signUp").unwrap().as_str(),
            "https://id.example.net/api/v1/accounts:signUp"
        );
    }

    #[test]
    fn test_parse_base_url_rejects_other_schemes() {
        assert!(parse_base_url("ftp://files.example.net").is_err());
        assert!(parse_base_url("not a url").is_err());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = ClientConfig {
            identity_url: parse_base_url("http://127.0.0.1:9099").unwrap(),
            store_url: parse_base_url("http://127.0.0.1:8080").unwrap(),
            api_key: SecretString::from("super_secret_api_key_value"),
            profile_collection: DEFAULT_PROFILE_COLLECTION.to_string(),
            sentry_dsn: None,
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("127.0.0.1:9099"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_api_key_value"));
    }
}
