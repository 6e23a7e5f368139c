//! User mapping command implementation.

use std::io::Write;

use serde::Serialize;
use snag_config::{
    AdminSession, CatalogKind, CatalogSet, SAVE_FAILED_MESSAGE, Transport, USERS_SAVED_MESSAGE,
};
use snag_proto::{PlatformUserId, UserField, UserMapping};

use crate::cli::UsersCommands;
use crate::error::CliError;
use crate::output::{OutputFormat, SaveResult, TableDisplay, or_dash, truncate};

/// Handler for users subcommands.
pub struct UsersCommand<'a, T> {
    session: &'a AdminSession<T>,
}

impl<'a, T: Transport> UsersCommand<'a, T> {
    /// Creates a new users command handler.
    #[must_use]
    pub const fn new(session: &'a AdminSession<T>) -> Self {
        Self { session }
    }

    /// Loads the session and executes the users subcommand.
    ///
    /// # Errors
    ///
    /// Returns error if loading fails, the arguments are invalid, or the save
    /// is rejected.
    pub async fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        command: &UsersCommands,
    ) -> Result<(), CliError> {
        self.session.hydrate(&CatalogKind::USERS_VIEW).await?;
        self.apply(out, format, command).await
    }

    /// Executes the subcommand against the already loaded session.
    ///
    /// # Errors
    ///
    /// Returns error if the arguments are invalid or the save is rejected.
    pub async fn apply<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        command: &UsersCommands,
    ) -> Result<(), CliError> {
        match command {
            UsersCommands::Show => {
                let listing =
                    UserListing::new(&self.session.snapshot().user_mappings, &self.session.catalogs());
                format.write(out, &listing)?;
                Ok(())
            }
            UsersCommands::Add {
                mm_user,
                bugsnag_user,
                email,
            } => {
                self.add(mm_user, bugsnag_user.as_deref(), email.as_deref())?;
                self.save(out, format).await
            }
            UsersCommands::Remove { index } => {
                self.session
                    .edit(|store| store.remove_user_mapping(*index))
                    .ok_or_else(|| no_row(*index))?;
                self.save(out, format).await
            }
            UsersCommands::Set {
                index,
                field,
                value,
            } => {
                let field = UserField::from(*field);
                if field == UserField::PlatformUser {
                    let mm_user_id = PlatformUserId::new(value.trim());
                    if mm_user_id.is_blank() {
                        return Err(CliError::InvalidArgument(
                            "Mattermost user must not be empty".into(),
                        ));
                    }
                    self.ensure_unmapped(&mm_user_id, Some(*index))?;
                }
                if !self
                    .session
                    .edit(|store| store.update_user_mapping_field(*index, field, value))
                {
                    return Err(no_row(*index));
                }
                self.save(out, format).await
            }
        }
    }

    fn add(
        &self,
        mm_user: &str,
        bugsnag_user: Option<&str>,
        email: Option<&str>,
    ) -> Result<(), CliError> {
        let mm_user_id = PlatformUserId::new(mm_user.trim());
        if mm_user_id.is_blank() {
            return Err(CliError::InvalidArgument(
                "Mattermost user must not be empty".into(),
            ));
        }

        self.ensure_unmapped(&mm_user_id, None)?;

        self.session.edit(|store| {
            let key = store.add_user_mapping();
            store.update_user_mapping_by_key(key, UserField::PlatformUser, mm_user_id.as_str());
            if let Some(id) = bugsnag_user {
                store.update_user_mapping_by_key(key, UserField::ProviderUser, id);
            }
            if let Some(email) = email {
                store.update_user_mapping_by_key(key, UserField::ProviderEmail, email);
            }
        });
        Ok(())
    }

    /// Rejects `mm_user_id` if a row other than `except` already maps it.
    fn ensure_unmapped(
        &self,
        mm_user_id: &PlatformUserId,
        except: Option<usize>,
    ) -> Result<(), CliError> {
        let duplicate = self
            .session
            .snapshot()
            .user_mappings
            .iter()
            .enumerate()
            .any(|(i, m)| Some(i) != except && m.mm_user_id == *mm_user_id);
        if duplicate {
            return Err(CliError::InvalidArgument(format!(
                "user {mm_user_id} is already mapped"
            )));
        }
        Ok(())
    }

    async fn save<W: Write>(&self, out: &mut W, format: &OutputFormat) -> Result<(), CliError> {
        let report = self
            .session
            .save_user_mappings()
            .await
            .map_err(|e| CliError::SaveFailed(e.user_message(SAVE_FAILED_MESSAGE)))?;

        format.write(out, &SaveResult::new(USERS_SAVED_MESSAGE, report))?;
        Ok(())
    }
}

fn no_row(index: usize) -> CliError {
    CliError::InvalidArgument(format!("no user mapping at position {index}"))
}

/// One mapping as printed by `users show`.
#[derive(Debug, Clone, Serialize)]
pub struct UserRow {
    /// Position in the mapping list.
    pub index: usize,
    /// Mattermost user ID.
    pub mm_user_id: String,
    /// Mattermost username, when the user is in the catalog.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mm_username: Option<String>,
    /// Bugsnag user ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bugsnag_user_id: Option<String>,
    /// Bugsnag collaborator name, when the user is in the catalog.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bugsnag_name: Option<String>,
    /// Bugsnag account email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bugsnag_email: Option<String>,
}

/// Every user mapping.
#[derive(Debug, Clone, Serialize)]
pub struct UserListing {
    /// Mappings in row order.
    pub mappings: Vec<UserRow>,
}

impl UserListing {
    /// Builds the listing, naming users from the loaded catalogs.
    #[must_use]
    pub fn new(mappings: &[UserMapping], catalogs: &CatalogSet) -> Self {
        let mappings = mappings
            .iter()
            .enumerate()
            .map(|(index, mapping)| {
                let mm_username = catalogs
                    .platform_users
                    .items
                    .iter()
                    .find(|u| u.id == mapping.mm_user_id)
                    .map(|u| u.label().to_string());
                let bugsnag_name = mapping.bugsnag_user_id.as_ref().and_then(|id| {
                    catalogs
                        .collaborators
                        .items
                        .iter()
                        .find(|c| &c.id == id)
                        .map(|c| c.name.clone())
                });
                UserRow {
                    index,
                    mm_user_id: mapping.mm_user_id.to_string(),
                    mm_username,
                    bugsnag_user_id: mapping.bugsnag_user_id.as_ref().map(ToString::to_string),
                    bugsnag_name,
                    bugsnag_email: mapping.bugsnag_email.clone(),
                }
            })
            .collect();
        Self { mappings }
    }
}

impl TableDisplay for UserListing {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.mappings.is_empty() {
            writeln!(writer, "No user mappings configured")?;
            return Ok(());
        }

        writeln!(
            writer,
            "{:>3}  {:<24}  {:<24}  EMAIL",
            "#", "MATTERMOST", "BUGSNAG"
        )?;
        writeln!(writer, "{}", "─".repeat(80))?;
        for row in &self.mappings {
            let mm = row.mm_username.as_deref().unwrap_or(&row.mm_user_id);
            let bugsnag = row
                .bugsnag_name
                .as_deref()
                .or(row.bugsnag_user_id.as_deref());
            writeln!(
                writer,
                "{:>3}  {:<24}  {:<24}  {}",
                row.index,
                truncate(mm, 24),
                truncate(or_dash(bugsnag), 24),
                or_dash(row.bugsnag_email.as_deref())
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "Total: {} mappings", self.mappings.len())?;
        Ok(())
    }
}
