//! Entity catalogs.
//!
//! Catalogs are read-only lists fetched from the provider or the platform.
//! Each one settles on its own: a failed fetch leaves that catalog empty
//! with the error attached, and the rest of the set is unaffected.

use std::fmt;

use serde::Serialize;
use snag_proto::{
    ChannelEntity, Collaborator, DisplayNames, Organization, PlatformUserEntity, ProjectEntity,
};
use tracing::warn;

use crate::client::AdminClient;
use crate::error::Result;
use crate::transport::Transport;

/// Which catalog to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogKind {
    /// Provider projects.
    Projects,
    /// Platform channels.
    Channels,
    /// Platform users.
    PlatformUsers,
    /// Provider collaborators.
    Collaborators,
    /// Provider organizations.
    Organizations,
}

impl CatalogKind {
    /// Every catalog kind.
    pub const ALL: [Self; 5] = [
        Self::Projects,
        Self::Channels,
        Self::PlatformUsers,
        Self::Collaborators,
        Self::Organizations,
    ];

    /// Catalogs the notification rules view needs.
    pub const RULES_VIEW: [Self; 2] = [Self::Projects, Self::Channels];

    /// Catalogs the user mappings view needs.
    pub const USERS_VIEW: [Self; 2] = [Self::PlatformUsers, Self::Collaborators];
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Projects => "projects",
            Self::Channels => "channels",
            Self::PlatformUsers => "platform users",
            Self::Collaborators => "collaborators",
            Self::Organizations => "organizations",
        };
        f.write_str(name)
    }
}

/// A settled catalog fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Catalog<E> {
    /// Fetched entities in server order. Empty if the fetch failed.
    pub items: Vec<E>,
    /// Why the fetch failed, if it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<E> Default for Catalog<E> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            error: None,
        }
    }
}

impl<E> Catalog<E> {
    /// Settles a fetch result, degrading failure to an empty catalog.
    #[must_use]
    pub fn settle(result: Result<Vec<E>>) -> Self {
        match result {
            Ok(items) => Self { items, error: None },
            Err(e) => Self {
                items: Vec::new(),
                error: Some(e.to_string()),
            },
        }
    }

    /// Returns true if the fetch failed.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        self.error.is_some()
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if there are no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// The catalogs loaded for one view. Catalogs not requested stay empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogSet {
    /// Provider projects.
    pub projects: Catalog<ProjectEntity>,
    /// Platform channels.
    pub channels: Catalog<ChannelEntity>,
    /// Platform users.
    pub platform_users: Catalog<PlatformUserEntity>,
    /// Provider collaborators.
    pub collaborators: Catalog<Collaborator>,
    /// Provider organizations.
    pub organizations: Catalog<Organization>,
}

impl CatalogSet {
    /// Fetches the requested catalogs concurrently and settles each one.
    pub async fn fetch<T: Transport>(client: &AdminClient<T>, kinds: &[CatalogKind]) -> Self {
        let wants = |kind| kinds.contains(&kind);

        let (projects, channels, platform_users, collaborators, organizations) = futures::join!(
            fetch_if(wants(CatalogKind::Projects), client.projects()),
            fetch_if(wants(CatalogKind::Channels), client.channels()),
            fetch_if(wants(CatalogKind::PlatformUsers), client.platform_users()),
            fetch_if(wants(CatalogKind::Collaborators), client.collaborators()),
            fetch_if(wants(CatalogKind::Organizations), client.organizations()),
        );

        let set = Self {
            projects,
            channels,
            platform_users,
            collaborators,
            organizations,
        };
        for kind in set.degraded() {
            warn!(catalog = %kind, "catalog fetch failed, showing it empty");
        }
        set
    }

    /// Kinds whose fetch failed.
    #[must_use]
    pub fn degraded(&self) -> Vec<CatalogKind> {
        let flags = [
            (CatalogKind::Projects, self.projects.is_degraded()),
            (CatalogKind::Channels, self.channels.is_degraded()),
            (CatalogKind::PlatformUsers, self.platform_users.is_degraded()),
            (CatalogKind::Collaborators, self.collaborators.is_degraded()),
            (CatalogKind::Organizations, self.organizations.is_degraded()),
        ];
        flags
            .into_iter()
            .filter_map(|(kind, degraded)| degraded.then_some(kind))
            .collect()
    }

    /// Display names for projects and channels.
    #[must_use]
    pub fn display_names(&self) -> DisplayNames {
        DisplayNames::from_catalogs(&self.projects.items, &self.channels.items)
    }
}

async fn fetch_if<E>(wanted: bool, fetch: impl Future<Output = Result<Vec<E>>>) -> Catalog<E> {
    if wanted {
        Catalog::settle(fetch.await)
    } else {
        Catalog::default()
    }
}
