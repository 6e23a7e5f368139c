//! Project→channel routing rules.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::filter::{Environment, EventKind, Filter, Severity};
use crate::ids::{ChannelId, ProjectId};

/// Binds one Bugsnag project to one Mattermost channel, with optional filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRule {
    /// Target channel.
    pub channel_id: ChannelId,
    /// Release stages that are forwarded.
    #[serde(default, skip_serializing_if = "Filter::is_unfiltered")]
    pub environments: Filter<Environment>,
    /// Severities that are forwarded.
    #[serde(default, skip_serializing_if = "Filter::is_unfiltered")]
    pub severities: Filter<Severity>,
    /// Event kinds that are forwarded.
    #[serde(default, skip_serializing_if = "Filter::is_unfiltered")]
    pub events: Filter<EventKind>,
}

impl ChannelRule {
    /// Creates a rule routing everything to `channel_id`.
    #[must_use]
    pub fn new(channel_id: ChannelId) -> Self {
        Self {
            channel_id,
            ..Self::default()
        }
    }

    /// Sets the environment filter.
    #[must_use]
    pub fn with_environments(mut self, environments: Filter<Environment>) -> Self {
        self.environments = environments;
        self
    }

    /// Sets the severity filter.
    #[must_use]
    pub fn with_severities(mut self, severities: Filter<Severity>) -> Self {
        self.severities = severities;
        self
    }

    /// Sets the event filter.
    #[must_use]
    pub fn with_events(mut self, events: Filter<EventKind>) -> Self {
        self.events = events;
        self
    }

    /// Returns true if the rule carries no filters at all.
    #[must_use]
    pub const fn is_unfiltered(&self) -> bool {
        self.environments.is_unfiltered()
            && self.severities.is_unfiltered()
            && self.events.is_unfiltered()
    }

    /// Replaces a single field.
    pub fn apply(&mut self, field: RuleField) {
        match field {
            RuleField::Channel(channel_id) => self.channel_id = channel_id,
            RuleField::Environments(filter) => self.environments = filter,
            RuleField::Severities(filter) => self.severities = filter,
            RuleField::Events(filter) => self.events = filter,
        }
    }

    /// Returns true if an event with the given attributes passes every filter.
    #[must_use]
    pub fn matches(&self, event: &EventAttributes) -> bool {
        self.environments.allows(&event.environment)
            && self.severities.allows(&event.severity)
            && self.events.allows(&event.event)
    }
}

/// One field of a [`ChannelRule`] together with its new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleField {
    /// Target channel.
    Channel(ChannelId),
    /// Environment filter.
    Environments(Filter<Environment>),
    /// Severity filter.
    Severities(Filter<Severity>),
    /// Event filter.
    Events(Filter<EventKind>),
}

/// The attributes of an incoming Bugsnag event that rules filter on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventAttributes {
    /// Release stage, e.g. `production`.
    pub environment: String,
    /// Severity as reported by Bugsnag.
    pub severity: String,
    /// Webhook trigger type, e.g. `firstException`.
    pub event: String,
}

/// Ordered rule sequences keyed by project.
///
/// A project may fan out to several channels with different filters. A key
/// with an empty sequence means the same as an absent key, and a stored
/// `null` sequence decodes as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ProjectChannelMappings(BTreeMap<ProjectId, Vec<ChannelRule>>);

impl<'de> Deserialize<'de> for ProjectChannelMappings {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<ProjectId, Option<Vec<ChannelRule>>>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .map(|(project, rules)| (project, rules.unwrap_or_default()))
            .collect())
    }
}

impl ProjectChannelMappings {
    /// Creates an empty mapping set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the rules for a project (empty if none).
    #[must_use]
    pub fn rules(&self, project_id: &ProjectId) -> &[ChannelRule] {
        self.0.get(project_id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns a mutable rule sequence for a project, if the key exists.
    pub fn rules_mut(&mut self, project_id: &ProjectId) -> Option<&mut Vec<ChannelRule>> {
        self.0.get_mut(project_id)
    }

    /// Returns the rule sequence for a project, creating an empty one if needed.
    pub fn entry(&mut self, project_id: ProjectId) -> &mut Vec<ChannelRule> {
        self.0.entry(project_id).or_default()
    }

    /// Replaces the rule sequence of a project.
    pub fn set(&mut self, project_id: ProjectId, rules: Vec<ChannelRule>) {
        self.0.insert(project_id, rules);
    }

    /// Removes a project key entirely, returning its rules.
    pub fn remove(&mut self, project_id: &ProjectId) -> Option<Vec<ChannelRule>> {
        self.0.remove(project_id)
    }

    /// Iterates over projects and their rules in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&ProjectId, &Vec<ChannelRule>)> {
        self.0.iter()
    }

    /// Returns the project keys in order.
    pub fn project_ids(&self) -> impl Iterator<Item = &ProjectId> {
        self.0.keys()
    }

    /// Keeps only the project entries for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&ProjectId, &mut Vec<ChannelRule>) -> bool) {
        self.0.retain(|project, rules| keep(project, rules));
    }

    /// Number of project keys (including keys with no rules).
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no project keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of rules across all projects.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    /// Channels an event from `project_id` should be posted to.
    ///
    /// Every matching rule contributes its channel once, in rule order.
    #[must_use]
    pub fn routes_for(&self, project_id: &ProjectId, event: &EventAttributes) -> Vec<ChannelId> {
        let mut channels: Vec<ChannelId> = Vec::new();
        for rule in self.rules(project_id) {
            if rule.channel_id.is_blank() || !rule.matches(event) {
                continue;
            }
            if !channels.contains(&rule.channel_id) {
                channels.push(rule.channel_id.clone());
            }
        }
        channels
    }
}

impl FromIterator<(ProjectId, Vec<ChannelRule>)> for ProjectChannelMappings {
    fn from_iter<I: IntoIterator<Item = (ProjectId, Vec<ChannelRule>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ProjectChannelMappings {
    type Item = (ProjectId, Vec<ChannelRule>);
    type IntoIter = std::collections::btree_map::IntoIter<ProjectId, Vec<ChannelRule>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::parse_environments;

    fn event(environment: &str, severity: &str, kind: &str) -> EventAttributes {
        EventAttributes {
            environment: environment.to_string(),
            severity: severity.to_string(),
            event: kind.to_string(),
        }
    }

    #[test]
    fn unfiltered_rule_serializes_channel_only() {
        let rule = ChannelRule::new(ChannelId::new("c1"));
        assert_eq!(
            serde_json::to_string(&rule).unwrap(),
            r#"{"channel_id":"c1"}"#
        );
    }

    #[test]
    fn filtered_rule_serializes_lists() {
        let rule = ChannelRule::new(ChannelId::new("c1"))
            .with_environments(parse_environments("production"))
            .with_severities(Filter::from_values([Severity::Warning, Severity::Error]));
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["environments"], serde_json::json!(["production"]));
        assert_eq!(json["severities"], serde_json::json!(["error", "warning"]));
        assert!(json.get("events").is_none());
    }

    #[test]
    fn rule_deserializes_with_missing_or_empty_filters() {
        let rule: ChannelRule =
            serde_json::from_str(r#"{"channel_id":"c1","severities":[],"events":null}"#).unwrap();
        assert!(rule.is_unfiltered());
    }

    #[test]
    fn mappings_serialize_as_object() {
        let mut mappings = ProjectChannelMappings::new();
        mappings.set(ProjectId::new("p1"), vec![ChannelRule::new(ChannelId::new("c1"))]);
        assert_eq!(
            serde_json::to_string(&mappings).unwrap(),
            r#"{"p1":[{"channel_id":"c1"}]}"#
        );
    }

    #[test]
    fn null_rule_list_decodes_as_empty() {
        let mappings: ProjectChannelMappings =
            serde_json::from_str(r#"{"p1":null,"p2":[{"channel_id":"c2"}]}"#).unwrap();
        assert!(mappings.rules(&ProjectId::new("p1")).is_empty());
        assert_eq!(mappings.rule_count(), 1);
    }

    #[test]
    fn apply_replaces_single_field() {
        let mut rule = ChannelRule::new(ChannelId::new("c1"));
        rule.apply(RuleField::Events(Filter::from_values([EventKind::Reopened])));
        assert_eq!(rule.channel_id.as_str(), "c1");
        assert_eq!(rule.events.values(), &[EventKind::Reopened]);
    }

    #[test]
    fn matches_applies_every_filter() {
        let rule = ChannelRule::new(ChannelId::new("c1"))
            .with_environments(parse_environments("production"))
            .with_severities(Filter::from_values([Severity::Error]));

        assert!(rule.matches(&event("Production", "error", "exception")));
        assert!(!rule.matches(&event("staging", "error", "exception")));
        assert!(!rule.matches(&event("production", "info", "exception")));
    }

    #[test]
    fn routes_collect_matching_channels_once() {
        let project = ProjectId::new("p1");
        let mut mappings = ProjectChannelMappings::new();
        mappings.set(
            project.clone(),
            vec![
                ChannelRule::new(ChannelId::new("all")),
                ChannelRule::new(ChannelId::new("prod"))
                    .with_environments(parse_environments("production")),
                ChannelRule::new(ChannelId::new("all")),
                ChannelRule::new(ChannelId::new("")),
            ],
        );

        let prod = mappings.routes_for(&project, &event("production", "error", "exception"));
        assert_eq!(prod, vec![ChannelId::new("all"), ChannelId::new("prod")]);

        let staging = mappings.routes_for(&project, &event("staging", "error", "exception"));
        assert_eq!(staging, vec![ChannelId::new("all")]);

        assert!(mappings
            .routes_for(&ProjectId::new("other"), &EventAttributes::default())
            .is_empty());
    }

    #[test]
    fn rule_count_spans_projects() {
        let mappings: ProjectChannelMappings = [
            (ProjectId::new("p1"), vec![ChannelRule::new(ChannelId::new("a"))]),
            (ProjectId::new("p2"), vec![]),
            (
                ProjectId::new("p3"),
                vec![
                    ChannelRule::new(ChannelId::new("b")),
                    ChannelRule::new(ChannelId::new("c")),
                ],
            ),
        ]
        .into_iter()
        .collect();
        assert_eq!(mappings.len(), 3);
        assert_eq!(mappings.rule_count(), 3);
    }
}
