//! Read-only catalog entities from both sides of the integration.

use serde::{Deserialize, Serialize};

use crate::ids::{ChannelId, OrganizationId, PlatformUserId, ProjectId, ProviderUserId};

/// A Bugsnag project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectEntity {
    /// Project identifier.
    pub id: ProjectId,
    /// Display name.
    pub name: String,
}

/// A Bugsnag organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    /// Organization identifier.
    pub id: OrganizationId,
    /// Display name.
    pub name: String,
    /// URL slug.
    #[serde(default)]
    pub slug: String,
}

/// A Bugsnag user with access to the organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collaborator {
    /// Bugsnag user identifier.
    pub id: ProviderUserId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Email address.
    #[serde(default)]
    pub email: String,
}

/// A Mattermost channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelEntity {
    /// Channel identifier.
    pub id: ChannelId,
    /// Human-readable name.
    #[serde(default)]
    pub display_name: String,
    /// URL name.
    #[serde(default)]
    pub name: String,
}

impl ChannelEntity {
    /// Display name, falling back to the URL name and then the id.
    #[must_use]
    pub fn label(&self) -> &str {
        if !self.display_name.is_empty() {
            &self.display_name
        } else if !self.name.is_empty() {
            &self.name
        } else {
            self.id.as_str()
        }
    }
}

/// A Mattermost user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformUserEntity {
    /// User identifier.
    pub id: PlatformUserId,
    /// Login name.
    #[serde(default)]
    pub username: String,
    /// Email address.
    #[serde(default)]
    pub email: String,
}

impl PlatformUserEntity {
    /// Username, falling back to the id.
    #[must_use]
    pub fn label(&self) -> &str {
        if self.username.is_empty() {
            self.id.as_str()
        } else {
            &self.username
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_label_fallbacks() {
        let mut channel = ChannelEntity {
            id: ChannelId::new("c1"),
            display_name: "Town Square".to_string(),
            name: "town-square".to_string(),
        };
        assert_eq!(channel.label(), "Town Square");

        channel.display_name.clear();
        assert_eq!(channel.label(), "town-square");

        channel.name.clear();
        assert_eq!(channel.label(), "c1");
    }

    #[test]
    fn platform_channel_ignores_unknown_fields() {
        let json = r#"{"id":"c1","display_name":"Alerts","name":"alerts","team_id":"t1","type":"O"}"#;
        let channel: ChannelEntity = serde_json::from_str(json).unwrap();
        assert_eq!(channel.label(), "Alerts");
    }

    #[test]
    fn collaborator_tolerates_missing_email() {
        let collaborator: Collaborator = serde_json::from_str(r#"{"id":"b1","name":"Ann"}"#).unwrap();
        assert!(collaborator.email.is_empty());
    }
}
