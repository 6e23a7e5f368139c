//! Pre-submission cleanup.
//!
//! Editing may leave entries that must never be persisted: rules without a
//! channel and user rows without a Mattermost user. They are dropped here,
//! silently for the user and with a log line for the operator.

use snag_proto::{ProjectChannelMappings, UserMapping};
use tracing::warn;

use crate::store::UserMappingRow;

/// Channel rules ready to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRules {
    /// Mappings with blank-channel rules dropped and empty projects pruned.
    pub mappings: ProjectChannelMappings,
    /// Number of rules dropped for a blank `channel_id`.
    pub dropped_rules: usize,
    /// Number of project keys pruned for having no rules.
    pub pruned_projects: usize,
}

/// User rows ready to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedUsers {
    /// Rows with a non-blank `mm_user_id`, in their original order and with
    /// their original keys.
    pub rows: Vec<UserMappingRow>,
    /// Number of rows dropped.
    pub dropped: usize,
}

impl PreparedUsers {
    /// The mappings to serialize.
    #[must_use]
    pub fn payload(&self) -> Vec<UserMapping> {
        self.rows.iter().map(|row| row.mapping.clone()).collect()
    }
}

/// Drops rules with a blank channel and prunes projects left without rules.
#[must_use]
pub fn prepare_channel_mappings(mappings: &ProjectChannelMappings) -> PreparedRules {
    let mut mappings = mappings.clone();
    let mut dropped_rules = 0;
    let mut pruned_projects = 0;

    mappings.retain(|project, rules| {
        let before = rules.len();
        rules.retain(|rule| !rule.channel_id.is_blank());
        let dropped = before - rules.len();
        if dropped > 0 {
            warn!(project = %project, dropped, "dropping rules without a channel");
        }
        dropped_rules += dropped;

        if rules.is_empty() {
            pruned_projects += 1;
            return false;
        }
        true
    });

    PreparedRules {
        mappings,
        dropped_rules,
        pruned_projects,
    }
}

/// Drops rows whose Mattermost user is blank.
#[must_use]
pub fn prepare_user_mappings(rows: &[UserMappingRow]) -> PreparedUsers {
    let kept: Vec<UserMappingRow> = rows
        .iter()
        .filter(|row| !row.mapping.mm_user_id.is_blank())
        .cloned()
        .collect();
    let dropped = rows.len() - kept.len();
    if dropped > 0 {
        warn!(dropped, "dropping user mappings without a Mattermost user");
    }

    PreparedUsers {
        rows: kept,
        dropped,
    }
}
