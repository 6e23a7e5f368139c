//! Editing operations on a [`MappingStore`].
//!
//! All operations are local state transforms and never perform I/O.
//! Index-addressed operations treat an out-of-range index as a no-op and
//! report it through their return value; the `*_by_key` variants address
//! user rows by their stable [`RowKey`] instead.

use snag_proto::{
    ChannelId, ChannelRule, Filter, FilterMember, ProjectId, RowKey, RuleField, UserField,
    UserMapping,
};
use tracing::trace;

use crate::store::{MappingStore, UserMappingRow};

/// Adds `member` to `current` when `included`, removes it otherwise.
///
/// Never inserts duplicates. Environments keep insertion order; severities
/// and event kinds come back in enumeration order.
#[must_use]
pub fn toggle_set_member<T: FilterMember>(current: &Filter<T>, member: T, included: bool) -> Filter<T> {
    current.toggle(member, included)
}

impl MappingStore {
    /// Replaces every rule of `project_id` with a single unfiltered rule for
    /// `channel_id`.
    pub fn set_channel_for_project(&mut self, project_id: ProjectId, channel_id: ChannelId) {
        trace!(project = %project_id, channel = %channel_id, "binding project to channel");
        self.channel_mappings
            .set(project_id, vec![ChannelRule::new(channel_id)]);
    }

    /// Replaces one field of the rule at `rule_index`.
    ///
    /// Returns `false` without changing anything if the project or index does
    /// not exist.
    pub fn update_rule_field(
        &mut self,
        project_id: &ProjectId,
        rule_index: usize,
        field: RuleField,
    ) -> bool {
        let Some(rule) = self
            .channel_mappings
            .rules_mut(project_id)
            .and_then(|rules| rules.get_mut(rule_index))
        else {
            return false;
        };
        rule.apply(field);
        true
    }

    /// Appends an unfiltered rule for `channel_id` and returns its index.
    pub fn add_rule(&mut self, project_id: ProjectId, channel_id: ChannelId) -> usize {
        let rules = self.channel_mappings.entry(project_id);
        rules.push(ChannelRule::new(channel_id));
        rules.len() - 1
    }

    /// Removes the rule at `rule_index`. The project key stays, possibly
    /// with no rules.
    pub fn remove_rule(&mut self, project_id: &ProjectId, rule_index: usize) -> Option<ChannelRule> {
        let rules = self.channel_mappings.rules_mut(project_id)?;
        (rule_index < rules.len()).then(|| rules.remove(rule_index))
    }

    /// Removes every rule of `project_id`. Returns `false` if it had none.
    pub fn clear_project(&mut self, project_id: &ProjectId) -> bool {
        self.channel_mappings.remove(project_id).is_some()
    }

    /// Appends an empty placeholder row and returns its key.
    pub fn add_user_mapping(&mut self) -> RowKey {
        let row = UserMappingRow::new(UserMapping::default());
        let key = row.key;
        self.user_rows.push(row);
        key
    }

    /// Removes the row at `index`.
    pub fn remove_user_mapping(&mut self, index: usize) -> Option<UserMapping> {
        (index < self.user_rows.len()).then(|| self.user_rows.remove(index).mapping)
    }

    /// Replaces one field of the row at `index`. Returns `false` if out of range.
    pub fn update_user_mapping_field(&mut self, index: usize, field: UserField, value: &str) -> bool {
        match self.user_rows.get_mut(index) {
            Some(row) => {
                row.mapping.apply(field, value);
                true
            }
            None => false,
        }
    }

    /// Removes the row with `key`.
    pub fn remove_user_mapping_by_key(&mut self, key: RowKey) -> Option<UserMapping> {
        let index = self.position(key)?;
        self.remove_user_mapping(index)
    }

    /// Replaces one field of the row with `key`. Returns `false` if absent.
    pub fn update_user_mapping_by_key(&mut self, key: RowKey, field: UserField, value: &str) -> bool {
        self.position(key)
            .is_some_and(|index| self.update_user_mapping_field(index, field, value))
    }
}
