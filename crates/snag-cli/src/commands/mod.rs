//! CLI command implementations.
//!
//! Each submodule implements a specific CLI command:
//! - [`connection`] - Bugsnag credential test
//! - [`catalog`] - Project, organization, collaborator and channel listings
//! - [`rules`] - Project to channel notification rules
//! - [`users`] - Mattermost to Bugsnag user mappings

pub mod catalog;
pub mod connection;
pub mod rules;
pub mod users;

pub use catalog::CatalogCommand;
pub use connection::ConnectionCommand;
pub use rules::RulesCommand;
pub use users::UsersCommand;
