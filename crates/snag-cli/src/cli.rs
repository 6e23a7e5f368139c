//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use snag_config::AdminConfig;
use snag_proto::{EventKind, Severity, UserField};

use crate::error::CliError;

/// snagctl - admin for the Mattermost Bugsnag plugin.
#[derive(Parser, Debug, Clone)]
#[command(name = "snagctl")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// TOML configuration file.
    #[arg(short, long, env = "SNAGCTL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Mattermost server URL. Overrides the configuration file.
    #[arg(short, long, env = "SNAGCTL_SERVER")]
    pub server: Option<String>,

    /// Mattermost personal access token. Overrides the configuration file.
    #[arg(short, long, env = "SNAGCTL_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Resolves the client configuration: file (or defaults), then flags.
    ///
    /// # Errors
    ///
    /// Returns `CliError::Config` if the file cannot be loaded or the result
    /// is invalid.
    pub fn admin_config(&self) -> Result<AdminConfig, CliError> {
        let mut config = match &self.config {
            Some(path) => AdminConfig::from_file(path)?,
            None => AdminConfig::default(),
        };

        if let Some(server) = &self.server {
            config.server_url.clone_from(server);
        }
        if let Some(token) = &self.token {
            config.access_token = Some(token.clone());
        }

        config.validate()?;
        Ok(config)
    }
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Test Bugsnag credentials through the plugin.
    Test {
        /// Bugsnag personal API token. Uses the plugin's token if omitted.
        #[arg(long)]
        api_token: Option<String>,

        /// Restrict the check to one organization.
        #[arg(long)]
        org_id: Option<String>,
    },

    /// List Bugsnag projects.
    Projects,

    /// List Bugsnag organizations.
    Organizations,

    /// List Bugsnag collaborators.
    Collaborators,

    /// List Mattermost channels.
    Channels,

    /// Project to channel notification rules.
    Rules {
        /// Rules subcommand to execute.
        #[command(subcommand)]
        command: RulesCommands,
    },

    /// Mattermost to Bugsnag user mappings.
    Users {
        /// Users subcommand to execute.
        #[command(subcommand)]
        command: UsersCommands,
    },
}

/// Notification rule subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum RulesCommands {
    /// Show every rule with its filters.
    Show,

    /// Route a project to exactly one channel, replacing its rules.
    Set {
        /// Bugsnag project ID.
        project: String,
        /// Mattermost channel ID.
        channel: String,
    },

    /// Add another channel rule to a project.
    Add {
        /// Bugsnag project ID.
        project: String,
        /// Mattermost channel ID.
        channel: String,
    },

    /// Remove one rule of a project.
    Remove {
        /// Bugsnag project ID.
        project: String,
        /// Position of the rule, as listed by `rules show`.
        index: usize,
    },

    /// Remove every rule of a project.
    Clear {
        /// Bugsnag project ID.
        project: String,
    },

    /// Change the filters of one rule.
    Filter(FilterArgs),
}

/// Arguments for `rules filter`.
#[derive(Parser, Debug, Clone)]
pub struct FilterArgs {
    /// Bugsnag project ID.
    pub project: String,

    /// Position of the rule, as listed by `rules show`.
    pub index: usize,

    /// Comma-separated environments. An empty value removes the filter.
    #[arg(short, long)]
    pub environments: Option<String>,

    /// Allowed severity. Repeat for several.
    #[arg(long = "severity")]
    pub severities: Vec<Severity>,

    /// Allowed event kind. Repeat for several.
    #[arg(long = "event")]
    pub events: Vec<EventKind>,

    /// Remove every filter from the rule.
    #[arg(long, conflicts_with_all = ["environments", "severities", "events"])]
    pub all: bool,
}

impl FilterArgs {
    /// Returns true if no filter change was requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.all
            && self.environments.is_none()
            && self.severities.is_empty()
            && self.events.is_empty()
    }
}

/// User mapping subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum UsersCommands {
    /// Show every user mapping.
    Show,

    /// Map a Mattermost user to a Bugsnag user.
    Add {
        /// Mattermost user ID.
        mm_user: String,

        /// Bugsnag user ID.
        #[arg(long)]
        bugsnag_user: Option<String>,

        /// Bugsnag account email.
        #[arg(long)]
        email: Option<String>,
    },

    /// Remove a mapping.
    Remove {
        /// Position of the mapping, as listed by `users show`.
        index: usize,
    },

    /// Change one field of a mapping. An empty value clears optional fields.
    Set {
        /// Position of the mapping, as listed by `users show`.
        index: usize,
        /// Field to change.
        #[arg(value_enum)]
        field: UserFieldArg,
        /// New value.
        value: String,
    },
}

/// Editable user mapping field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UserFieldArg {
    /// Mattermost user ID.
    MmUser,
    /// Bugsnag user ID.
    BugsnagUser,
    /// Bugsnag account email.
    Email,
}

impl From<UserFieldArg> for UserField {
    fn from(arg: UserFieldArg) -> Self {
        match arg {
            UserFieldArg::MmUser => Self::PlatformUser,
            UserFieldArg::BugsnagUser => Self::ProviderUser,
            UserFieldArg::Email => Self::ProviderEmail,
        }
    }
}
