//! Local mapping store.
//!
//! Holds the editable copy of both mapping collections for one edit
//! session. It is filled wholesale from the server and replaced wholesale
//! after an accepted save; editor operations live in [`crate::editor`].

use serde::Serialize;
use snag_proto::{ProjectChannelMappings, RowKey, UserMapping};

/// A user mapping row with a stable key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserMappingRow {
    /// Key that survives inserts and removals around this row.
    pub key: RowKey,
    /// The mapping being edited.
    pub mapping: UserMapping,
}

impl UserMappingRow {
    /// Wraps a mapping in a freshly keyed row.
    #[must_use]
    pub fn new(mapping: UserMapping) -> Self {
        Self {
            key: RowKey::new(),
            mapping,
        }
    }
}

/// Read-only copy of the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MappingSnapshot {
    /// Project→channel rules.
    pub channel_mappings: ProjectChannelMappings,
    /// User mappings in row order.
    pub user_mappings: Vec<UserMapping>,
}

/// Editable mapping state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingStore {
    pub(crate) channel_mappings: ProjectChannelMappings,
    pub(crate) user_rows: Vec<UserMappingRow>,
}

impl MappingStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the given collections.
    #[must_use]
    pub fn with_mappings(channel_mappings: ProjectChannelMappings, users: Vec<UserMapping>) -> Self {
        let mut store = Self::new();
        store.replace_channel_mappings(channel_mappings);
        store.replace_user_mappings(users);
        store
    }

    /// Copies the current state. No side effects.
    #[must_use]
    pub fn snapshot(&self) -> MappingSnapshot {
        MappingSnapshot {
            channel_mappings: self.channel_mappings.clone(),
            user_mappings: self.user_mappings(),
        }
    }

    /// Project→channel rules.
    #[must_use]
    pub const fn channel_mappings(&self) -> &ProjectChannelMappings {
        &self.channel_mappings
    }

    /// User mapping rows with their keys.
    #[must_use]
    pub fn user_rows(&self) -> &[UserMappingRow] {
        &self.user_rows
    }

    /// User mappings in row order.
    #[must_use]
    pub fn user_mappings(&self) -> Vec<UserMapping> {
        self.user_rows.iter().map(|row| row.mapping.clone()).collect()
    }

    /// Position of the row with `key`.
    #[must_use]
    pub fn position(&self, key: RowKey) -> Option<usize> {
        self.user_rows.iter().position(|row| row.key == key)
    }

    /// Replaces all channel rules.
    pub fn replace_channel_mappings(&mut self, mappings: ProjectChannelMappings) {
        self.channel_mappings = mappings;
    }

    /// Replaces all user mappings. Every row gets a new key.
    pub fn replace_user_mappings(&mut self, mappings: Vec<UserMapping>) {
        self.user_rows = mappings.into_iter().map(UserMappingRow::new).collect();
    }

    /// Replaces all user rows, keeping their keys.
    pub fn replace_user_rows(&mut self, rows: Vec<UserMappingRow>) {
        self.user_rows = rows;
    }
}
