//! Boundary adapter for the flattened channel-rule representation.
//!
//! Older editing surfaces persist rules as a flat list with denormalised
//! display names (`{rules: [...]}`). The keyed [`ProjectChannelMappings`] is
//! the only shape this workspace stores; the flat list is converted on the
//! way in and produced on demand for display, never persisted.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::entities::{ChannelEntity, ProjectEntity};
use crate::ids::{ChannelId, ProjectId};
use crate::rules::{ChannelRule, ProjectChannelMappings};

/// A rule in the flattened representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatChannelRule {
    /// Row identifier assigned by the editing surface.
    #[serde(default)]
    pub id: String,
    /// Bugsnag project.
    pub project_id: ProjectId,
    /// Project display name at the time of writing.
    #[serde(default)]
    pub project_name: String,
    /// Mattermost channel.
    pub channel_id: ChannelId,
    /// Channel display name at the time of writing.
    #[serde(default)]
    pub channel_name: String,
}

/// Display names resolved from the entity catalogs.
#[derive(Debug, Clone, Default)]
pub struct DisplayNames {
    projects: HashMap<ProjectId, String>,
    channels: HashMap<ChannelId, String>,
}

impl DisplayNames {
    /// Builds the lookup tables from catalog snapshots.
    #[must_use]
    pub fn from_catalogs(projects: &[ProjectEntity], channels: &[ChannelEntity]) -> Self {
        Self {
            projects: projects
                .iter()
                .map(|p| (p.id.clone(), p.name.clone()))
                .collect(),
            channels: channels
                .iter()
                .map(|c| (c.id.clone(), c.label().to_string()))
                .collect(),
        }
    }

    /// Project name, or the raw id when the project is not in the catalog.
    #[must_use]
    pub fn project(&self, id: &ProjectId) -> String {
        self.projects
            .get(id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    /// Channel name, or the raw id when the channel is not in the catalog.
    #[must_use]
    pub fn channel(&self, id: &ChannelId) -> String {
        self.channels
            .get(id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }
}

/// Produces the flat view of `mappings`. Filters are not representable in
/// the flat shape and are left out.
#[must_use]
pub fn flatten(mappings: &ProjectChannelMappings, names: &DisplayNames) -> Vec<FlatChannelRule> {
    mappings
        .iter()
        .flat_map(|(project_id, rules)| {
            rules.iter().enumerate().map(move |(index, rule)| FlatChannelRule {
                id: format!("{project_id}:{index}"),
                project_id: project_id.clone(),
                project_name: names.project(project_id),
                channel_id: rule.channel_id.clone(),
                channel_name: names.channel(&rule.channel_id),
            })
        })
        .collect()
}

/// Converts a flat rule list into keyed mappings.
///
/// Rules are appended to their project's sequence in list order; display
/// names are dropped.
#[must_use]
pub fn unflatten(rules: &[FlatChannelRule]) -> ProjectChannelMappings {
    let mut mappings = ProjectChannelMappings::new();
    for rule in rules {
        mappings
            .entry(rule.project_id.clone())
            .push(ChannelRule::new(rule.channel_id.clone()));
    }
    mappings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(project: &str, channel: &str) -> FlatChannelRule {
        FlatChannelRule {
            id: String::new(),
            project_id: ProjectId::new(project),
            project_name: String::new(),
            channel_id: ChannelId::new(channel),
            channel_name: String::new(),
        }
    }

    #[test]
    fn unflatten_groups_by_project_in_order() {
        let mappings = unflatten(&[flat("p1", "a"), flat("p2", "b"), flat("p1", "c")]);

        let p1: Vec<&str> = mappings
            .rules(&ProjectId::new("p1"))
            .iter()
            .map(|r| r.channel_id.as_str())
            .collect();
        assert_eq!(p1, vec!["a", "c"]);
        assert_eq!(mappings.rules(&ProjectId::new("p2")).len(), 1);
    }

    #[test]
    fn flatten_resolves_names_with_fallback() {
        let projects = vec![ProjectEntity {
            id: ProjectId::new("p1"),
            name: "Checkout".to_string(),
        }];
        let channels = vec![ChannelEntity {
            id: ChannelId::new("c1"),
            display_name: "Alerts".to_string(),
            name: "alerts".to_string(),
        }];
        let names = DisplayNames::from_catalogs(&projects, &channels);

        let mut mappings = ProjectChannelMappings::new();
        mappings.set(
            ProjectId::new("p1"),
            vec![
                ChannelRule::new(ChannelId::new("c1")),
                ChannelRule::new(ChannelId::new("c9")),
            ],
        );

        let rows = flatten(&mappings, &names);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].project_name, "Checkout");
        assert_eq!(rows[0].channel_name, "Alerts");
        assert_eq!(rows[1].channel_name, "c9");
        assert_ne!(rows[0].id, rows[1].id);
    }

    #[test]
    fn flatten_then_unflatten_keeps_routing() {
        let mut mappings = ProjectChannelMappings::new();
        mappings.set(ProjectId::new("p1"), vec![ChannelRule::new(ChannelId::new("c1"))]);
        mappings.set(ProjectId::new("p2"), vec![ChannelRule::new(ChannelId::new("c2"))]);

        let back = unflatten(&flatten(&mappings, &DisplayNames::default()));
        assert_eq!(back, mappings);
    }
}
