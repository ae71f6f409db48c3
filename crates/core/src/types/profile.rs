//! Profile records and lookup results.

use serde::{Deserialize, Serialize};

/// The display record stored for each account.
///
/// Every field is optional: documents written by older clients (or by hand) may
/// be missing any of them, and a missing field reads back as `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

impl Profile {
    /// Build a fully populated profile, as written at registration.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        address: impl Into<String>,
        bio: impl Into<String>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            email: Some(email.into()),
            address: Some(address.into()),
            bio: Some(bio.into()),
        }
    }
}

/// Outcome of looking up the profile for an email.
///
/// Keeps "no such profile" apart from "the store could not be queried" so a
/// caller can retry the latter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileLookup {
    /// A matching profile document.
    Found(Profile),
    /// The query succeeded and nothing matched.
    NotFound,
    /// The query itself failed.
    QueryError(String),
}

impl ProfileLookup {
    /// Collapse to the nullable view: anything but `Found` is `None`.
    #[must_use]
    pub fn into_profile(self) -> Option<Profile> {
        match self {
            Self::Found(profile) => Some(profile),
            Self::NotFound | Self::QueryError(_) => None,
        }
    }

    /// Returns `true` if the lookup failed rather than came back empty.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::QueryError(_))
    }
}
