//! Opaque identifiers issued by the hosted services.
//!
//! Both the identity service and the document store hand out string ids we
//! never interpret. The `define_id!` macro keeps them from being mixed up.

/// Macro to define an opaque, service-issued string identifier.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `Display`
/// - `new()`, `as_str()`, `into_inner()`
/// - `From<String>` and `From<&str>`
///
/// # Example
///
/// ```rust
/// # use portfolio_core::define_id;
/// define_id!(SessionTokenId);
///
/// let id = SessionTokenId::new("tok_1");
/// assert_eq!(id.as_str(), "tok_1");
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an identifier issued by the service.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the raw identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the raw identifier.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }
    };
}

// Account ids come from the identity service, document ids from the store.
define_id!(AccountId);
define_id!(DocumentId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_transparent_in_json() {
        let id = DocumentId::new("doc-42");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"doc-42\"");

        let parsed: AccountId = serde_json::from_str("\"acct-7\"").unwrap();
        assert_eq!(parsed, AccountId::from("acct-7"));
        assert_eq!(parsed.to_string(), "acct-7");
    }
}
