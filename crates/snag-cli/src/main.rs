//! snagctl binary entrypoint.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use snag_cli::cli::{Cli, Commands};
use snag_cli::commands::{CatalogCommand, ConnectionCommand, RulesCommand, UsersCommand};
use snag_cli::output::OutputFormat;
use snag_config::{AdminClient, AdminSession, CatalogKind};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), snag_cli::CliError> {
    let config = cli.admin_config()?;
    debug!(server = %config.server_url, plugin = %config.plugin_id, "resolved configuration");
    let client = AdminClient::from_config(&config)?;
    let format = OutputFormat::new(cli.format);
    let mut stdout = io::stdout().lock();

    match &cli.command {
        Commands::Test { api_token, org_id } => {
            let cmd = ConnectionCommand::new(&client);
            cmd.execute(&mut stdout, &format, api_token.as_deref(), org_id.as_deref())
                .await?;
        }
        Commands::Projects => {
            let cmd = CatalogCommand::new(&client);
            cmd.execute(&mut stdout, &format, CatalogKind::Projects).await?;
        }
        Commands::Organizations => {
            let cmd = CatalogCommand::new(&client);
            cmd.execute(&mut stdout, &format, CatalogKind::Organizations)
                .await?;
        }
        Commands::Collaborators => {
            let cmd = CatalogCommand::new(&client);
            cmd.execute(&mut stdout, &format, CatalogKind::Collaborators)
                .await?;
        }
        Commands::Channels => {
            let cmd = CatalogCommand::new(&client);
            cmd.execute(&mut stdout, &format, CatalogKind::Channels).await?;
        }
        Commands::Rules { command } => {
            let session = AdminSession::new(client);
            let cmd = RulesCommand::new(&session);
            cmd.execute(&mut stdout, &format, command).await?;
        }
        Commands::Users { command } => {
            let session = AdminSession::new(client);
            let cmd = UsersCommand::new(&session);
            cmd.execute(&mut stdout, &format, command).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use snag_cli::cli::{Format, RulesCommands};
    use snag_cli::CliError;

    #[test]
    fn cli_parses_rules_show() {
        let cli = Cli::parse_from(["snagctl", "rules", "show"]);
        assert!(matches!(
            cli.command,
            Commands::Rules {
                command: RulesCommands::Show
            }
        ));
    }

    #[test]
    fn cli_respects_format_flag() {
        let cli = Cli::parse_from(["snagctl", "--format", "json", "projects"]);
        assert_eq!(cli.format, Format::Json);
    }

    #[test]
    fn cli_respects_server_flag() {
        let cli = Cli::parse_from(["snagctl", "-s", "http://mm.internal:8065", "channels"]);
        assert_eq!(cli.server.as_deref(), Some("http://mm.internal:8065"));
    }

    #[tokio::test]
    async fn run_rules_show_without_server_fails() {
        let cli = Cli::parse_from(["snagctl", "-s", "http://127.0.0.1:1", "rules", "show"]);
        let result = run(cli).await;
        assert!(matches!(result, Err(CliError::Sync(_))));
    }

    #[tokio::test]
    async fn run_test_without_server_reports_failure() {
        let cli = Cli::parse_from(["snagctl", "-s", "http://127.0.0.1:1", "test"]);
        let result = run(cli).await;
        assert!(matches!(result, Err(CliError::ConnectionFailed(_))));
    }

    #[tokio::test]
    async fn run_with_invalid_server_fails() {
        let cli = Cli::parse_from(["snagctl", "-s", "not a url", "projects"]);
        let result = run(cli).await;
        assert!(matches!(result, Err(CliError::Config(_))));
    }
}
