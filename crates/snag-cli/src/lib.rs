//! # snag-cli
//!
//! `snagctl`, the command-line admin for the Mattermost Bugsnag plugin.
//!
//! Provides commands for:
//! - Testing Bugsnag credentials
//! - Listing projects, organizations, collaborators and channels
//! - Editing project to channel notification rules
//! - Editing Mattermost to Bugsnag user mappings
//!
//! # Architecture
//!
//! Every command talks to the plugin's HTTP API through a
//! [`snag_config::AdminClient`]. Editing commands load the full mapping
//! collections into an [`snag_config::AdminSession`], apply one edit locally
//! and submit the whole collection back.
//!
//! ```text
//! ┌──────────┐   plugin HTTP API   ┌────────────────────┐
//! │ snagctl  │◄───────────────────►│ Mattermost plugin  │
//! └──────────┘                     └────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;

pub use cli::{Cli, Commands, Format, RulesCommands, UsersCommands};
pub use error::CliError;
pub use output::OutputFormat;
