//! Connection test command implementation.

use std::io::Write;

use snag_config::{AdminClient, ConnectionCheck, Transport};
use snag_proto::TestConnectionRequest;

use crate::error::CliError;
use crate::output::{OutputFormat, TableDisplay};

/// Handler for `snagctl test`.
pub struct ConnectionCommand<'a, T> {
    client: &'a AdminClient<T>,
}

impl<'a, T: Transport> ConnectionCommand<'a, T> {
    /// Creates a new connection command handler.
    #[must_use]
    pub const fn new(client: &'a AdminClient<T>) -> Self {
        Self { client }
    }

    /// Runs the connection test and prints its outcome.
    ///
    /// # Errors
    ///
    /// Returns `CliError::ConnectionFailed` after printing if the
    /// credentials were not accepted.
    pub async fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        api_token: Option<&str>,
        org_id: Option<&str>,
    ) -> Result<(), CliError> {
        let request = TestConnectionRequest::new(api_token.unwrap_or_default(), org_id.unwrap_or_default());
        let check = self.client.test_connection(&request).await;

        format.write(out, &check)?;
        if check.is_success() {
            Ok(())
        } else {
            Err(CliError::ConnectionFailed(check.message))
        }
    }
}

impl TableDisplay for ConnectionCheck {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let icon = if self.is_success() { "✓" } else { "✗" };
        writeln!(writer, "{icon} {}", self.message)?;
        Ok(())
    }
}
