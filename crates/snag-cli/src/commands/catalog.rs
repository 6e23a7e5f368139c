//! Catalog listing commands: projects, organizations, collaborators and
//! channels.

use std::io::Write;

use serde::Serialize;
use snag_config::{AdminClient, Catalog, CatalogKind, CatalogSet, Transport};
use snag_proto::{ChannelEntity, Collaborator, Organization, PlatformUserEntity, ProjectEntity};

use crate::error::CliError;
use crate::output::{OutputFormat, TableDisplay, truncate};

/// Handler for the catalog listing commands.
pub struct CatalogCommand<'a, T> {
    client: &'a AdminClient<T>,
}

impl<'a, T: Transport> CatalogCommand<'a, T> {
    /// Creates a new catalog command handler.
    #[must_use]
    pub const fn new(client: &'a AdminClient<T>) -> Self {
        Self { client }
    }

    /// Fetches and prints one catalog.
    ///
    /// A failed fetch prints an empty listing with the error attached.
    ///
    /// # Errors
    ///
    /// Returns error only if writing the output fails.
    pub async fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        kind: CatalogKind,
    ) -> Result<(), CliError> {
        let set = CatalogSet::fetch(self.client, &[kind]).await;
        let listing = match kind {
            CatalogKind::Projects => CatalogListing::from_catalog(kind, &set.projects),
            CatalogKind::Channels => CatalogListing::from_catalog(kind, &set.channels),
            CatalogKind::PlatformUsers => CatalogListing::from_catalog(kind, &set.platform_users),
            CatalogKind::Collaborators => CatalogListing::from_catalog(kind, &set.collaborators),
            CatalogKind::Organizations => CatalogListing::from_catalog(kind, &set.organizations),
        };

        format.write(out, &listing)?;
        Ok(())
    }
}

/// One row of a catalog listing.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogRow {
    /// Entity ID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Secondary column: slug, email or handle.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub detail: String,
}

impl From<&ProjectEntity> for CatalogRow {
    fn from(project: &ProjectEntity) -> Self {
        Self {
            id: project.id.to_string(),
            name: project.name.clone(),
            detail: String::new(),
        }
    }
}

impl From<&Organization> for CatalogRow {
    fn from(org: &Organization) -> Self {
        Self {
            id: org.id.to_string(),
            name: org.name.clone(),
            detail: org.slug.clone(),
        }
    }
}

impl From<&Collaborator> for CatalogRow {
    fn from(collaborator: &Collaborator) -> Self {
        Self {
            id: collaborator.id.to_string(),
            name: collaborator.name.clone(),
            detail: collaborator.email.clone(),
        }
    }
}

impl From<&ChannelEntity> for CatalogRow {
    fn from(channel: &ChannelEntity) -> Self {
        Self {
            id: channel.id.to_string(),
            name: channel.label().to_string(),
            detail: channel.name.clone(),
        }
    }
}

impl From<&PlatformUserEntity> for CatalogRow {
    fn from(user: &PlatformUserEntity) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.label().to_string(),
            detail: user.email.clone(),
        }
    }
}

/// A printed catalog.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogListing {
    /// Which catalog this is.
    pub catalog: String,
    /// Entities in server order.
    pub items: Vec<CatalogRow>,
    /// Why the fetch failed, if it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CatalogListing {
    fn from_catalog<E>(kind: CatalogKind, catalog: &Catalog<E>) -> Self
    where
        for<'e> &'e E: Into<CatalogRow>,
    {
        Self {
            catalog: kind.to_string(),
            items: catalog.items.iter().map(Into::into).collect(),
            error: catalog.error.clone(),
        }
    }
}

impl TableDisplay for CatalogListing {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.items.is_empty() {
            writeln!(writer, "No {} found", self.catalog)?;
            if let Some(error) = &self.error {
                writeln!(writer, "  ({error})")?;
            }
            return Ok(());
        }

        writeln!(writer, "{:<28}  {:<32}  {}", "ID", "NAME", "DETAIL")?;
        writeln!(writer, "{}", "─".repeat(90))?;
        for row in &self.items {
            writeln!(
                writer,
                "{:<28}  {:<32}  {}",
                truncate(&row.id, 28),
                truncate(&row.name, 32),
                row.detail
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "Total: {} {}", self.items.len(), self.catalog)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Format;
    use serde_json::json;
    use snag_config::{ApiPaths, InMemoryBackend};
    use snag_proto::{ChannelId, ProjectId};
    use test_case::test_case;

    fn backend() -> InMemoryBackend {
        InMemoryBackend::default()
            .with_api_token("tok")
            .with_organizations(vec![Organization {
                id: "o1".into(),
                name: "Acme".into(),
                slug: "acme".into(),
            }])
            .with_projects(vec![ProjectEntity {
                id: ProjectId::new("p1"),
                name: "Checkout".into(),
            }])
            .with_channels(vec![ChannelEntity {
                id: ChannelId::new("c1"),
                display_name: "Town Square".into(),
                name: "town-square".into(),
            }])
    }

    async fn render(backend: InMemoryBackend, kind: CatalogKind, format: Format) -> String {
        let client = AdminClient::new(backend, ApiPaths::default());
        let mut out = Vec::new();
        CatalogCommand::new(&client)
            .execute(&mut out, &OutputFormat::new(format), kind)
            .await
            .expect("should render");
        String::from_utf8(out).expect("utf-8")
    }

    #[test_case(CatalogKind::Projects, "Checkout" ; "projects")]
    #[test_case(CatalogKind::Organizations, "acme" ; "organizations")]
    #[test_case(CatalogKind::Channels, "Town Square" ; "channels")]
    #[tokio::test]
    async fn lists_catalog(kind: CatalogKind, expected: &str) {
        let output = render(backend(), kind, Format::Table).await;
        assert!(output.contains(expected));
        assert!(output.contains("Total: 1"));
    }

    #[tokio::test]
    async fn empty_catalog_message() {
        let output = render(backend(), CatalogKind::Collaborators, Format::Table).await;
        assert!(output.contains("No collaborators found"));
    }

    #[tokio::test]
    async fn failed_catalog_degrades_to_empty() {
        let backend = backend();
        backend.fail_path(&ApiPaths::default().projects(), 502, json!({"error": "bugsnag down"}));

        let output = render(backend, CatalogKind::Projects, Format::Json).await;
        let value: serde_json::Value = serde_json::from_str(&output).expect("json");
        assert_eq!(value["items"], json!([]));
        assert!(value["error"].as_str().expect("error").contains("bugsnag down"));
    }
}
