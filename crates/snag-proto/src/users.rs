//! Mattermost↔Bugsnag user mappings.

use serde::{Deserialize, Deserializer, Serialize};

use crate::ids::{PlatformUserId, ProviderUserId};

/// Connects a Mattermost user to a Bugsnag user, by explicit id or by email.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMapping {
    /// Mattermost user. Required for the mapping to be persisted.
    #[serde(default)]
    pub mm_user_id: PlatformUserId,
    /// Bugsnag user id, if known.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "non_empty"
    )]
    pub bugsnag_user_id: Option<ProviderUserId>,
    /// Bugsnag account email, if known.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "non_empty"
    )]
    pub bugsnag_email: Option<String>,
}

impl UserMapping {
    /// Creates a mapping for a Mattermost user with no Bugsnag side yet.
    #[must_use]
    pub fn new(mm_user_id: PlatformUserId) -> Self {
        Self {
            mm_user_id,
            ..Self::default()
        }
    }

    /// Sets the Bugsnag user id.
    #[must_use]
    pub fn with_provider_user(mut self, id: ProviderUserId) -> Self {
        self.bugsnag_user_id = Some(id).filter(|id| !id.is_blank());
        self
    }

    /// Sets the Bugsnag email.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.bugsnag_email = Some(email.into()).filter(|e| !e.trim().is_empty());
        self
    }

    /// Replaces one field. Empty values clear the optional fields.
    pub fn apply(&mut self, field: UserField, value: &str) {
        match field {
            UserField::PlatformUser => self.mm_user_id = PlatformUserId::new(value),
            UserField::ProviderUser => {
                self.bugsnag_user_id =
                    Some(ProviderUserId::new(value)).filter(|id| !id.is_blank());
            }
            UserField::ProviderEmail => {
                self.bugsnag_email = Some(value.to_string()).filter(|e| !e.trim().is_empty());
            }
        }
    }
}

/// Editable fields of a [`UserMapping`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserField {
    /// `mm_user_id`.
    PlatformUser,
    /// `bugsnag_user_id`.
    ProviderUser,
    /// `bugsnag_email`.
    ProviderEmail,
}

fn non_empty<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<String>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()).map(T::from))
}

/// Finds the mapping for a Mattermost user.
///
/// An explicit `mm_user_id` match wins; otherwise the user's email is
/// compared, trimmed and case-insensitively, against `bugsnag_email`.
#[must_use]
pub fn resolve_provider_user<'a>(
    mappings: &'a [UserMapping],
    user_id: &PlatformUserId,
    email: &str,
) -> Option<&'a UserMapping> {
    if let Some(found) = mappings
        .iter()
        .find(|m| !m.mm_user_id.is_blank() && &m.mm_user_id == user_id)
    {
        return Some(found);
    }

    let email = email.trim();
    if email.is_empty() {
        return None;
    }

    mappings.iter().find(|m| {
        m.bugsnag_email
            .as_deref()
            .is_some_and(|e| e.trim().eq_ignore_ascii_case(email))
    })
}
