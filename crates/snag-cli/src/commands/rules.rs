//! Notification rule command implementation.
//!
//! Every subcommand loads the current rules together with the project and
//! channel catalogs, applies one edit locally and submits the whole rule set.

use std::io::Write;

use serde::Serialize;
use snag_config::{
    AdminSession, CatalogKind, RULES_SAVED_MESSAGE, SAVE_FAILED_MESSAGE, Transport,
    toggle_set_member,
};
use snag_proto::{
    ChannelId, ChannelRule, DisplayNames, Filter, ProjectChannelMappings, ProjectId, RuleField,
    format_environments, parse_environments,
};

use crate::cli::{FilterArgs, RulesCommands};
use crate::error::CliError;
use crate::output::{OutputFormat, SaveResult, TableDisplay, truncate};

/// Handler for rules subcommands.
pub struct RulesCommand<'a, T> {
    session: &'a AdminSession<T>,
}

impl<'a, T: Transport> RulesCommand<'a, T> {
    /// Creates a new rules command handler.
    #[must_use]
    pub const fn new(session: &'a AdminSession<T>) -> Self {
        Self { session }
    }

    /// Loads the session and executes the rules subcommand.
    ///
    /// # Errors
    ///
    /// Returns error if loading fails, the arguments do not address an
    /// existing rule, or the save is rejected.
    pub async fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        command: &RulesCommands,
    ) -> Result<(), CliError> {
        self.session.hydrate(&CatalogKind::RULES_VIEW).await?;
        self.apply(out, format, command).await
    }

    /// Executes the subcommand against the already loaded session.
    ///
    /// # Errors
    ///
    /// Returns error if the arguments do not address an existing rule or the
    /// save is rejected.
    pub async fn apply<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        command: &RulesCommands,
    ) -> Result<(), CliError> {
        match command {
            RulesCommands::Show => self.show(out, format),
            RulesCommands::Set { project, channel } => {
                let (project, channel) = ids(project, channel)?;
                self.session
                    .edit(|store| store.set_channel_for_project(project, channel));
                self.save(out, format).await
            }
            RulesCommands::Add { project, channel } => {
                let (project, channel) = ids(project, channel)?;
                self.session.edit(|store| store.add_rule(project, channel));
                self.save(out, format).await
            }
            RulesCommands::Remove { project, index } => {
                let project = ProjectId::new(project.as_str());
                self.session
                    .edit(|store| store.remove_rule(&project, *index))
                    .ok_or_else(|| no_rule(&project, *index))?;
                self.save(out, format).await
            }
            RulesCommands::Clear { project } => {
                let project = ProjectId::new(project.as_str());
                if !self.session.edit(|store| store.clear_project(&project)) {
                    return Err(CliError::InvalidArgument(format!(
                        "project {project} has no rules"
                    )));
                }
                self.save(out, format).await
            }
            RulesCommands::Filter(args) => self.filter(out, format, args).await,
        }
    }

    fn show<W: Write>(&self, out: &mut W, format: &OutputFormat) -> Result<(), CliError> {
        let snapshot = self.session.snapshot();
        let catalogs = self.session.catalogs();
        let listing = RuleListing::new(&snapshot.channel_mappings, &catalogs.display_names());
        format.write(out, &listing)?;
        Ok(())
    }

    async fn filter<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        args: &FilterArgs,
    ) -> Result<(), CliError> {
        if args.is_empty() {
            return Err(CliError::InvalidArgument(
                "no filter given; pass --environments, --severity, --event or --all".into(),
            ));
        }

        let project = ProjectId::new(args.project.as_str());
        let fields = filter_fields(args);
        let found = self.session.edit(|store| {
            if store.channel_mappings().rules(&project).get(args.index).is_none() {
                return false;
            }
            for field in fields {
                store.update_rule_field(&project, args.index, field);
            }
            true
        });
        if !found {
            return Err(no_rule(&project, args.index));
        }

        self.save(out, format).await
    }

    async fn save<W: Write>(&self, out: &mut W, format: &OutputFormat) -> Result<(), CliError> {
        let report = self
            .session
            .save_channel_rules()
            .await
            .map_err(|e| CliError::SaveFailed(e.user_message(SAVE_FAILED_MESSAGE)))?;

        format.write(out, &SaveResult::new(RULES_SAVED_MESSAGE, report))?;
        Ok(())
    }
}

fn ids(project: &str, channel: &str) -> Result<(ProjectId, ChannelId), CliError> {
    let project = ProjectId::new(project);
    let channel = ChannelId::new(channel);
    if project.is_blank() || channel.is_blank() {
        return Err(CliError::InvalidArgument(
            "project and channel must not be empty".into(),
        ));
    }
    Ok((project, channel))
}

fn no_rule(project: &ProjectId, index: usize) -> CliError {
    CliError::InvalidArgument(format!("project {project} has no rule at position {index}"))
}

fn filter_fields(args: &FilterArgs) -> Vec<RuleField> {
    if args.all {
        return vec![
            RuleField::Environments(Filter::Unfiltered),
            RuleField::Severities(Filter::Unfiltered),
            RuleField::Events(Filter::Unfiltered),
        ];
    }

    let mut fields = Vec::new();
    if let Some(environments) = &args.environments {
        fields.push(RuleField::Environments(parse_environments(environments)));
    }
    if !args.severities.is_empty() {
        let severities = args
            .severities
            .iter()
            .fold(Filter::Unfiltered, |filter, sev| {
                toggle_set_member(&filter, *sev, true)
            });
        fields.push(RuleField::Severities(severities));
    }
    if !args.events.is_empty() {
        let events = args
            .events
            .iter()
            .fold(Filter::Unfiltered, |filter, event| {
                toggle_set_member(&filter, *event, true)
            });
        fields.push(RuleField::Events(events));
    }
    fields
}

/// One rule as printed by `rules show`.
#[derive(Debug, Clone, Serialize)]
pub struct RuleRow {
    /// Bugsnag project ID.
    pub project_id: String,
    /// Project display name.
    pub project_name: String,
    /// Position within the project.
    pub index: usize,
    /// Mattermost channel ID.
    pub channel_id: String,
    /// Channel display name.
    pub channel_name: String,
    /// Allowed environments in their comma-separated input form; empty means all.
    pub environments: String,
    /// Allowed severities; empty means all.
    pub severities: Vec<String>,
    /// Allowed event kinds; empty means all.
    pub events: Vec<String>,
}

impl RuleRow {
    fn new(project_id: &ProjectId, index: usize, rule: &ChannelRule, names: &DisplayNames) -> Self {
        Self {
            project_id: project_id.to_string(),
            project_name: names.project(project_id),
            index,
            channel_id: rule.channel_id.to_string(),
            channel_name: names.channel(&rule.channel_id),
            environments: format_environments(&rule.environments),
            severities: rule.severities.values().iter().map(ToString::to_string).collect(),
            events: rule.events.values().iter().map(ToString::to_string).collect(),
        }
    }

    fn filter_summary(&self) -> String {
        let mut parts = Vec::new();
        if !self.environments.is_empty() {
            parts.push(format!("env={}", self.environments));
        }
        if !self.severities.is_empty() {
            parts.push(format!("severity={}", self.severities.join(",")));
        }
        if !self.events.is_empty() {
            parts.push(format!("event={}", self.events.join(",")));
        }
        if parts.is_empty() {
            "all".to_string()
        } else {
            parts.join(" ")
        }
    }
}

/// Every rule, grouped by project.
#[derive(Debug, Clone, Serialize)]
pub struct RuleListing {
    /// Rules in project order, then rule order.
    pub rules: Vec<RuleRow>,
}

impl RuleListing {
    /// Builds the listing, naming entities from the loaded catalogs.
    #[must_use]
    pub fn new(mappings: &ProjectChannelMappings, names: &DisplayNames) -> Self {
        let rules = mappings
            .iter()
            .flat_map(|(project_id, rules)| {
                rules
                    .iter()
                    .enumerate()
                    .map(move |(index, rule)| RuleRow::new(project_id, index, rule, names))
            })
            .collect();
        Self { rules }
    }
}

impl TableDisplay for RuleListing {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.rules.is_empty() {
            writeln!(writer, "No notification rules configured")?;
            return Ok(());
        }

        writeln!(
            writer,
            "{:<24}  {:>3}  {:<24}  FILTERS",
            "PROJECT", "#", "CHANNEL"
        )?;
        writeln!(writer, "{}", "─".repeat(90))?;
        for row in &self.rules {
            let channel = if row.channel_id.is_empty() {
                "(none)".to_string()
            } else {
                truncate(&row.channel_name, 24)
            };
            writeln!(
                writer,
                "{:<24}  {:>3}  {:<24}  {}",
                truncate(&row.project_name, 24),
                row.index,
                channel,
                row.filter_summary()
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "Total: {} rules", self.rules.len())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Format;
    use serde_json::json;
    use snag_config::{AdminClient, ApiPaths, InMemoryBackend};
    use snag_proto::{ChannelEntity, EventKind, Organization, ProjectEntity, Severity};

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
                display_name: "Alerts".into(),
                name: "alerts".into(),
            }])
    }

    fn session(backend: &InMemoryBackend) -> AdminSession<InMemoryBackend> {
        AdminSession::new(AdminClient::new(backend.clone(), ApiPaths::default()))
    }

    fn seeded(backend: &InMemoryBackend) {
        let mut mappings = ProjectChannelMappings::new();
        mappings.set(
            ProjectId::new("p1"),
            vec![
                ChannelRule::new(ChannelId::new("c1")),
                ChannelRule::new(ChannelId::new("c2")),
            ],
        );
        backend.seed_channel_mappings(&mappings);
    }

    async fn run(
        backend: &InMemoryBackend,
        format: Format,
        command: RulesCommands,
    ) -> (Result<(), CliError>, String) {
        let session = session(backend);
        let mut out = Vec::new();
        let result = RulesCommand::new(&session)
            .execute(&mut out, &OutputFormat::new(format), &command)
            .await;
        (result, String::from_utf8(out).expect("utf-8"))
    }

    #[tokio::test]
    async fn set_routes_project_to_channel() {
        let backend = backend();
        let (result, output) = run(
            &backend,
            Format::Table,
            RulesCommands::Set {
                project: "p1".into(),
                channel: "c1".into(),
            },
        )
        .await;

        result.expect("should save");
        assert!(output.contains(RULES_SAVED_MESSAGE));
        let stored = backend.stored_channel_mappings().expect("stored");
        assert_eq!(
            stored.rules(&ProjectId::new("p1")),
            &[ChannelRule::new(ChannelId::new("c1"))]
        );
    }

    #[tokio::test]
    async fn show_names_entities_from_catalogs() {
        let backend = backend();
        seeded(&backend);

        let (result, output) = run(&backend, Format::Table, RulesCommands::Show).await;

        result.expect("should show");
        assert!(output.contains("Checkout"));
        assert!(output.contains("Alerts"));
        assert!(output.contains("Total: 2 rules"));
    }

    #[tokio::test]
    async fn show_empty() {
        let (result, output) = run(&backend(), Format::Table, RulesCommands::Show).await;
        result.expect("should show");
        assert!(output.contains("No notification rules configured"));
    }

    #[tokio::test]
    async fn filter_sets_severities_in_enumeration_order() {
        let backend = backend();
        seeded(&backend);

        let args = FilterArgs {
            project: "p1".into(),
            index: 1,
            environments: Some("production, staging".into()),
            severities: vec![Severity::Info, Severity::Error],
            events: vec![EventKind::Reopened],
            all: false,
        };
        let (result, _) = run(&backend, Format::Json, RulesCommands::Filter(args)).await;
        result.expect("should save");

        let stored = backend.stored_raw(snag_config::CHANNEL_RULES_KEY).expect("stored");
        assert_eq!(
            stored["p1"][1],
            json!({
                "channel_id": "c2",
                "environments": ["production", "staging"],
                "severities": ["error", "info"],
                "events": ["reopened"],
            })
        );
        assert_eq!(stored["p1"][0], json!({"channel_id": "c1"}));
    }

    #[tokio::test]
    async fn filter_all_clears_filters() {
        let backend = backend();
        let mut mappings = ProjectChannelMappings::new();
        mappings.set(
            ProjectId::new("p1"),
            vec![ChannelRule::new(ChannelId::new("c1"))
                .with_severities(Filter::from_values([Severity::Error]))],
        );
        backend.seed_channel_mappings(&mappings);

        let args = FilterArgs {
            project: "p1".into(),
            index: 0,
            environments: None,
            severities: Vec::new(),
            events: Vec::new(),
            all: true,
        };
        let (result, _) = run(&backend, Format::Table, RulesCommands::Filter(args)).await;
        result.expect("should save");

        let stored = backend.stored_channel_mappings().expect("stored");
        assert!(stored.rules(&ProjectId::new("p1"))[0].is_unfiltered());
    }

    #[tokio::test]
    async fn missing_rule_is_rejected_without_saving() {
        let backend = backend();
        seeded(&backend);

        let (result, _) = run(
            &backend,
            Format::Table,
            RulesCommands::Remove {
                project: "p1".into(),
                index: 7,
            },
        )
        .await;

        assert!(matches!(result, Err(CliError::InvalidArgument(_))));
        let path = ApiPaths::default().channel_rules();
        assert_eq!(backend.request_count(snag_config::Method::Post, &path), 0);
    }

    #[tokio::test]
    async fn clear_prunes_project_on_save() {
        let backend = backend();
        seeded(&backend);

        let (result, output) = run(
            &backend,
            Format::Table,
            RulesCommands::Clear {
                project: "p1".into(),
            },
        )
        .await;

        result.expect("should save");
        assert!(output.contains("Submitted:      0"));
        assert!(backend.stored_channel_mappings().expect("stored").is_empty());
    }

    #[tokio::test]
    async fn blank_channel_is_invalid() {
        let (result, _) = run(
            &backend(),
            Format::Table,
            RulesCommands::Add {
                project: "p1".into(),
                channel: "  ".into(),
            },
        )
        .await;
        assert!(matches!(result, Err(CliError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn rejected_save_surfaces_server_message() {
        let backend = backend();
        let session = session(&backend);
        session.load().await.expect("load");
        backend.fail_next(500, json!({"error": "db down"}));

        let mut out = Vec::new();
        let result = RulesCommand::new(&session)
            .apply(
                &mut out,
                &OutputFormat::default(),
                &RulesCommands::Set {
                    project: "p1".into(),
                    channel: "c1".into(),
                },
            )
            .await;

        assert!(matches!(result, Err(CliError::SaveFailed(ref m)) if m == "db down"));
        assert!(out.is_empty());
        assert!(backend.stored_channel_mappings().is_none());
    }

    #[tokio::test]
    async fn load_failure_propagates() {
        let backend = backend();
        backend.fail_path(
            &ApiPaths::default().channel_rules(),
            500,
            json!({"error": "kv unavailable"}),
        );

        let (result, _) = run(&backend, Format::Table, RulesCommands::Show).await;
        assert!(matches!(result, Err(CliError::Sync(_))));
    }

    #[test]
    fn filter_summary_lists_each_filter() {
        let rule = ChannelRule::new(ChannelId::new("c1"))
            .with_environments(parse_environments("production,staging"))
            .with_severities(Filter::from_values([Severity::Error]));
        let row = RuleRow::new(&ProjectId::new("p1"), 0, &rule, &DisplayNames::default());
        assert_eq!(row.filter_summary(), "env=production, staging severity=error");
        assert_eq!(row.environments, format_environments(&rule.environments));
        assert_eq!(row.project_name, "p1");
    }
}
