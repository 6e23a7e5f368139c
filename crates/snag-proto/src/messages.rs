//! Request and response bodies of the plugin's HTTP API.

use serde::{Deserialize, Serialize};

use crate::entities::{Collaborator, Organization, ProjectEntity};
use crate::flat::{FlatChannelRule, unflatten};
use crate::ids::OrganizationId;
use crate::rules::ProjectChannelMappings;
use crate::users::UserMapping;

/// Body of `POST /api/v1/test`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestConnectionRequest {
    /// Personal Bugsnag API token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    /// Restrict the check to one organization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<OrganizationId>,
}

impl TestConnectionRequest {
    /// Builds a request from raw form input. Blank values are omitted.
    #[must_use]
    pub fn new(api_token: &str, organization_id: &str) -> Self {
        let api_token = api_token.trim();
        let organization_id = organization_id.trim();
        Self {
            api_token: (!api_token.is_empty()).then(|| api_token.to_string()),
            organization_id: (!organization_id.is_empty())
                .then(|| OrganizationId::new(organization_id)),
        }
    }
}

/// A body carrying an optional human-readable message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    /// Server supplied message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Error body returned on non-2xx responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error description (`{error}`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Alternative message field (`{message}`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorBody {
    /// Creates an error body.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            message: None,
        }
    }

    /// Leniently parses a response body. Anything unparseable yields an empty body.
    #[must_use]
    pub fn parse(bytes: &[u8]) -> Self {
        serde_json::from_slice(bytes).unwrap_or_default()
    }

    /// The `error` field if present and non-empty, else `message`.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.error
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.message.as_deref().filter(|s| !s.is_empty()))
    }
}

/// Response of `GET /api/v1/projects`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectsResponse {
    /// Projects of the selected organization.
    #[serde(default)]
    pub projects: Vec<ProjectEntity>,
    /// Organization the projects were listed for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<OrganizationId>,
}

/// Response of `GET /api/v1/organizations`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationsResponse {
    /// Organizations visible to the configured token.
    #[serde(default)]
    pub organizations: Vec<Organization>,
}

/// Response of `GET /api/v1/collaborators`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollaboratorsResponse {
    /// Bugsnag users of the organization.
    #[serde(default)]
    pub collaborators: Vec<Collaborator>,
}

/// Response of `GET /api/v1/channel-rules`, in either representation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChannelRulesResponse {
    /// Keyed representation.
    #[serde(default)]
    pub mappings: Option<ProjectChannelMappings>,
    /// Flattened representation.
    #[serde(default)]
    pub rules: Option<Vec<FlatChannelRule>>,
}

impl ChannelRulesResponse {
    /// Normalises either representation into keyed mappings.
    ///
    /// The keyed form wins when both are present; neither means no rules.
    #[must_use]
    pub fn into_mappings(self) -> ProjectChannelMappings {
        match (self.mappings, self.rules) {
            (Some(mappings), _) => mappings,
            (None, Some(rules)) => unflatten(&rules),
            (None, None) => ProjectChannelMappings::new(),
        }
    }
}

/// Body of `POST /api/v1/channel-rules`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRulesRequest {
    /// The complete mapping set.
    pub mappings: ProjectChannelMappings,
}

/// Body of `GET`/`POST /api/v1/user-mappings`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMappingsEnvelope {
    /// The complete mapping list.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub mappings: Vec<UserMapping>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<UserMapping>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<UserMapping>>::deserialize(deserializer)?.unwrap_or_default())
}
