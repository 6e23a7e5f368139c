//! Tagged identifiers for the two entity spaces.
//!
//! Provider-side (Bugsnag) and platform-side (Mattermost) identifiers are all
//! plain strings on the wire. Each one gets its own newtype here so that a
//! project id can never be passed where a channel id is expected.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a raw identifier. No validation happens here: editing
            /// surfaces hold transient empty values while the user types.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns true if the identifier is empty or whitespace only.
            #[must_use]
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }

            /// Consumes the identifier and returns the raw string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id! {
    /// Identifier of a Bugsnag project.
    ProjectId
}

string_id! {
    /// Identifier of a Bugsnag organization.
    OrganizationId
}

string_id! {
    /// Identifier of a Bugsnag user (collaborator).
    ProviderUserId
}

string_id! {
    /// Identifier of a Mattermost channel.
    ChannelId
}

string_id! {
    /// Identifier of a Mattermost user.
    PlatformUserId
}

/// Stable key for an editable row.
///
/// Rows are addressed by key rather than position so that an edit never lands
/// on the wrong element after the collection was re-rendered or reordered.
/// Keys are local to one edit session and never serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowKey(Uuid);

impl RowKey {
    /// Generates a fresh key.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RowKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
