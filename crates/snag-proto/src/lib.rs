//! # snag-proto
//!
//! Wire and domain types for the Bugsnag integration's administrative
//! configuration: project→channel routing rules with filters, Mattermost↔Bugsnag
//! user mappings, catalog entities, and the request/response bodies of the
//! plugin API.
//!
//! Identifiers from the two entity spaces are distinct types
//! ([`ProjectId`], [`ChannelId`], [`PlatformUserId`], [`ProviderUserId`]), and
//! optional filters are an explicit [`Filter`] rather than a possibly-absent
//! list.
//!
//! ```rust
//! use snag_proto::{ChannelId, ChannelRule, ProjectChannelMappings, ProjectId};
//!
//! let mut mappings = ProjectChannelMappings::new();
//! mappings.set(ProjectId::new("p1"), vec![ChannelRule::new(ChannelId::new("c1"))]);
//!
//! let json = serde_json::to_string(&mappings).unwrap();
//! assert_eq!(json, r#"{"p1":[{"channel_id":"c1"}]}"#);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod entities;
pub mod error;
pub mod filter;
pub mod flat;
pub mod ids;
pub mod messages;
pub mod rules;
pub mod users;

pub use entities::{ChannelEntity, Collaborator, Organization, PlatformUserEntity, ProjectEntity};
pub use error::{ProtoError, Result};
pub use filter::{
    Environment, EventKind, Filter, FilterMember, Severity, format_environments,
    parse_environments,
};
pub use flat::{DisplayNames, FlatChannelRule, flatten, unflatten};
pub use ids::{ChannelId, OrganizationId, PlatformUserId, ProjectId, ProviderUserId, RowKey};
pub use messages::{
    ChannelRulesRequest, ChannelRulesResponse, CollaboratorsResponse, ErrorBody, MessageBody,
    OrganizationsResponse, ProjectsResponse, TestConnectionRequest, UserMappingsEnvelope,
};
pub use rules::{ChannelRule, EventAttributes, ProjectChannelMappings, RuleField};
pub use users::{UserField, UserMapping, resolve_provider_user};
