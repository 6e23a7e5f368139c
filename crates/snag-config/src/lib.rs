//! # snag-config
//!
//! Client-side reconciliation of the Bugsnag plugin's admin configuration.
//!
//! This crate provides:
//! - Entity catalogs fetched concurrently with per-catalog degradation
//! - A local [`MappingStore`] with the rule and user mapping editor operations
//! - An [`AdminSession`] that loads, edits and saves whole collections
//! - A [`Transport`] seam with HTTP and in-memory implementations
//!
//! ## Example
//!
//! ```rust
//! use snag_config::{AdminClient, AdminSession, ApiPaths, InMemoryBackend};
//! use snag_proto::{ChannelId, ProjectId};
//!
//! # futures::executor::block_on(async {
//! let backend = InMemoryBackend::default();
//! let session = AdminSession::new(AdminClient::new(backend.clone(), ApiPaths::default()));
//!
//! session.load().await.unwrap();
//! session.edit(|store| store.set_channel_for_project(ProjectId::new("p1"), ChannelId::new("c1")));
//! session.save_channel_rules().await.unwrap();
//!
//! assert_eq!(backend.stored_channel_mappings().unwrap().rule_count(), 1);
//! # });
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod catalog;
pub mod client;
pub mod config;
pub mod connection;
pub mod editor;
pub mod error;
pub mod prepare;
pub mod session;
pub mod store;
pub mod transport;

pub use backend::{CHANNEL_RULES_KEY, Gate, InMemoryBackend, USER_MAPPINGS_KEY};
pub use catalog::{Catalog, CatalogKind, CatalogSet};
pub use client::AdminClient;
pub use config::{AdminConfig, ApiPaths, DEFAULT_PLUGIN_ID, MAX_USERS_PER_PAGE};
pub use connection::{
    CONNECTION_FAILED_MESSAGE, CONNECTION_OK_MESSAGE, ConnectionCheck, ConnectionStatus,
};
pub use editor::toggle_set_member;
pub use error::{Result, SyncError, TransportError};
pub use prepare::{PreparedRules, PreparedUsers, prepare_channel_mappings, prepare_user_mappings};
pub use session::{
    AdminSession, LOAD_FAILED_MESSAGE, RULES_SAVED_MESSAGE, SAVE_FAILED_MESSAGE, SaveReport,
    SyncState, SyncStatus, USERS_SAVED_MESSAGE,
};
pub use store::{MappingSnapshot, MappingStore, UserMappingRow};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, Transport};
