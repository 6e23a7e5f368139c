//! Edit session: the mapping store plus its sync state machine.
//!
//! An [`AdminSession`] owns one [`MappingStore`] and synchronizes it with the
//! server:
//! - `hydrate` fetches catalogs and mappings together on entry
//! - editor operations run through [`AdminSession::edit`]
//! - each collection is saved whole, one save at a time
//!
//! The save cycle is `Idle → Saving → Idle`. Success leaves a transient
//! notice that the next edit clears; failure leaves an error and the local
//! state untouched.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use snag_proto::{FlatChannelRule, TestConnectionRequest, flatten};
use tracing::{debug, info, warn};

use crate::catalog::{CatalogKind, CatalogSet};
use crate::client::AdminClient;
use crate::connection::ConnectionCheck;
use crate::error::{Result, SyncError};
use crate::prepare::{prepare_channel_mappings, prepare_user_mappings};
use crate::store::{MappingSnapshot, MappingStore};
use crate::transport::Transport;

/// Shown when a save fails without a server message.
pub const SAVE_FAILED_MESSAGE: &str = "Failed to save";

/// Shown when loading mappings fails without a server message.
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load data";

/// Notice after channel rules were saved.
pub const RULES_SAVED_MESSAGE: &str = "Notification rules saved successfully";

/// Notice after user mappings were saved.
pub const USERS_SAVED_MESSAGE: &str = "User mappings saved successfully";

/// Save cycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    /// No save in flight.
    #[default]
    Idle,
    /// A save is in flight; further saves are rejected.
    Saving,
}

/// Observable status of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    /// Save cycle state.
    pub state: SyncState,
    /// Error of the last failed load or save.
    pub error: Option<String>,
    /// Transient success notice, cleared by the next edit.
    pub notice: Option<String>,
    /// When the last save was accepted.
    pub last_saved_at: Option<DateTime<Utc>>,
}

/// What a save submitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    /// Entries submitted.
    pub submitted: usize,
    /// Entries dropped before submission.
    pub dropped: usize,
    /// Project keys pruned for having no rules.
    pub pruned: usize,
}

/// Returns the session to `Idle` however the save ends, including when
/// its future is dropped.
struct SaveGuard<'a> {
    status: &'a Mutex<SyncStatus>,
}

impl Drop for SaveGuard<'_> {
    fn drop(&mut self) {
        self.status.lock().state = SyncState::Idle;
    }
}

/// One admin edit session against a server.
#[derive(Debug)]
pub struct AdminSession<T> {
    client: AdminClient<T>,
    store: RwLock<MappingStore>,
    status: Mutex<SyncStatus>,
    catalogs: RwLock<CatalogSet>,
}

impl<T: Transport> AdminSession<T> {
    /// Creates a session with an empty store.
    #[must_use]
    pub fn new(client: AdminClient<T>) -> Self {
        Self {
            client,
            store: RwLock::new(MappingStore::new()),
            status: Mutex::new(SyncStatus::default()),
            catalogs: RwLock::new(CatalogSet::default()),
        }
    }

    /// The client used for all requests.
    #[must_use]
    pub const fn client(&self) -> &AdminClient<T> {
        &self.client
    }

    /// Copies the current mappings.
    #[must_use]
    pub fn snapshot(&self) -> MappingSnapshot {
        self.store.read().snapshot()
    }

    /// Copies the current status.
    #[must_use]
    pub fn status(&self) -> SyncStatus {
        self.status.lock().clone()
    }

    /// Copies the catalogs of the last hydrate.
    #[must_use]
    pub fn catalogs(&self) -> CatalogSet {
        self.catalogs.read().clone()
    }

    /// Returns true while a save is in flight.
    #[must_use]
    pub fn is_saving(&self) -> bool {
        self.status.lock().state == SyncState::Saving
    }

    /// Channel rules as flat rows named from the loaded catalogs.
    #[must_use]
    pub fn flat_rules(&self) -> Vec<FlatChannelRule> {
        let names = self.catalogs.read().display_names();
        flatten(self.store.read().channel_mappings(), &names)
    }

    // ============ Loading ============

    /// Fetches `kinds` and all mappings concurrently.
    ///
    /// Catalogs settle independently. The returned error is that of the
    /// mapping load, if any.
    pub async fn hydrate(&self, kinds: &[CatalogKind]) -> Result<()> {
        let (catalogs, loaded) =
            futures::join!(CatalogSet::fetch(&self.client, kinds), self.load());
        *self.catalogs.write() = catalogs;
        loaded
    }

    /// Fetches both mapping collections concurrently.
    ///
    /// The store is replaced only if both fetches succeed; otherwise it keeps
    /// its previous value and the error is recorded.
    pub async fn load(&self) -> Result<()> {
        let (rules, users) =
            futures::join!(self.client.channel_rules(), self.client.user_mappings());

        match (rules, users) {
            (Ok(rules), Ok(users)) => {
                debug!(
                    projects = rules.len(),
                    users = users.len(),
                    "loaded mappings"
                );
                {
                    let mut store = self.store.write();
                    store.replace_channel_mappings(rules);
                    store.replace_user_mappings(users);
                }
                self.status.lock().error = None;
                Ok(())
            }
            (Err(e), _) | (_, Err(e)) => Err(self.record_error(e, LOAD_FAILED_MESSAGE)),
        }
    }

    /// Fetches only the channel rules. Keeps the previous value on failure.
    pub async fn load_channel_rules(&self) -> Result<()> {
        match self.client.channel_rules().await {
            Ok(rules) => {
                self.store.write().replace_channel_mappings(rules);
                self.status.lock().error = None;
                Ok(())
            }
            Err(e) => Err(self.record_error(e, LOAD_FAILED_MESSAGE)),
        }
    }

    /// Fetches only the user mappings. Keeps the previous value on failure.
    pub async fn load_user_mappings(&self) -> Result<()> {
        match self.client.user_mappings().await {
            Ok(users) => {
                self.store.write().replace_user_mappings(users);
                self.status.lock().error = None;
                Ok(())
            }
            Err(e) => Err(self.record_error(e, LOAD_FAILED_MESSAGE)),
        }
    }

    // ============ Editing ============

    /// Applies an editor operation and clears the success notice.
    pub fn edit<R>(&self, operation: impl FnOnce(&mut MappingStore) -> R) -> R {
        let result = operation(&mut *self.store.write());
        self.status.lock().notice = None;
        result
    }

    /// Clears the notice and the error.
    pub fn acknowledge(&self) {
        let mut status = self.status.lock();
        status.notice = None;
        status.error = None;
    }

    // ============ Saving ============

    /// Submits all channel rules.
    ///
    /// Rules without a channel are dropped and empty projects pruned first.
    /// On success the local rules become exactly what was submitted.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::SaveInFlight` if another save is running, or the
    /// request error. Local state is unchanged on error.
    pub async fn save_channel_rules(&self) -> Result<SaveReport> {
        let _guard = self.begin_save()?;

        let prepared = prepare_channel_mappings(self.store.read().channel_mappings());
        let report = SaveReport {
            submitted: prepared.mappings.rule_count(),
            dropped: prepared.dropped_rules,
            pruned: prepared.pruned_projects,
        };

        match self.client.save_channel_rules(&prepared.mappings).await {
            Ok(()) => {
                info!(
                    projects = prepared.mappings.len(),
                    rules = report.submitted,
                    "channel rules saved"
                );
                self.store.write().replace_channel_mappings(prepared.mappings);
                self.record_saved(RULES_SAVED_MESSAGE);
                Ok(report)
            }
            Err(e) => Err(self.record_error(e, SAVE_FAILED_MESSAGE)),
        }
    }

    /// Submits all user mappings.
    ///
    /// Rows without a Mattermost user are dropped first. On success the local
    /// rows become exactly what was submitted.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::SaveInFlight` if another save is running, or the
    /// request error. Local state is unchanged on error.
    pub async fn save_user_mappings(&self) -> Result<SaveReport> {
        let _guard = self.begin_save()?;

        let prepared = prepare_user_mappings(self.store.read().user_rows());
        let payload = prepared.payload();
        let report = SaveReport {
            submitted: payload.len(),
            dropped: prepared.dropped,
            pruned: 0,
        };

        match self.client.save_user_mappings(&payload).await {
            Ok(()) => {
                info!(users = report.submitted, "user mappings saved");
                self.store.write().replace_user_rows(prepared.rows);
                self.record_saved(USERS_SAVED_MESSAGE);
                Ok(report)
            }
            Err(e) => Err(self.record_error(e, SAVE_FAILED_MESSAGE)),
        }
    }

    /// Tests provider credentials. Does not touch the session state.
    pub async fn test_connection(&self, credentials: &TestConnectionRequest) -> ConnectionCheck {
        self.client.test_connection(credentials).await
    }

    fn begin_save(&self) -> Result<SaveGuard<'_>> {
        let mut status = self.status.lock();
        if status.state == SyncState::Saving {
            warn!("save rejected, another save is in flight");
            return Err(SyncError::SaveInFlight);
        }
        status.state = SyncState::Saving;
        status.error = None;
        status.notice = None;
        Ok(SaveGuard {
            status: &self.status,
        })
    }

    fn record_saved(&self, notice: &str) {
        let mut status = self.status.lock();
        status.notice = Some(notice.to_string());
        status.last_saved_at = Some(Utc::now());
    }

    fn record_error(&self, error: SyncError, default: &str) -> SyncError {
        let message = error.user_message(default);
        warn!(error = %error, "sync failed");
        self.status.lock().error = Some(message);
        error
    }
}
