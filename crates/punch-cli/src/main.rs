use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use punch_core::PunchKind;
use tracing_subscriber::EnvFilter;

use punch_cli::commands::{history, punch, report, settings, summary};
use punch_cli::{AuthClaim, Cli, Commands, Config, PunchClockService, SettingsAction};

/// Load config and build the service, ensuring the database directory exists.
fn build_service(config_path: Option<&Path>) -> Result<(PunchClockService, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let ledger = punch_ledger::Ledger::open(&config.database_path)
        .context("failed to open ledger database")?;

    let policy = config.broker.retry_policy();
    let transport = punch_bus::HttpTransport::new(config.broker.endpoint.clone(), policy.attempt_timeout)
        .context("failed to build broker transport")?;
    let publisher =
        punch_bus::Publisher::new(Arc::new(transport), config.broker.topic.clone(), policy);

    Ok((PunchClockService::new(ledger, publisher), config))
}

/// Wait for in-flight publications, bounded by the configured timeout.
///
/// Undelivered events are abandoned at process exit; the ledger stays
/// the source of truth either way.
async fn drain_publisher(service: &PunchClockService, config: &Config) {
    let flushed =
        tokio::time::timeout(config.flush_timeout(), service.flush_publisher()).await;
    if flushed.is_err() {
        tracing::error!(
            timeout_ms = config.flush_timeout_ms,
            "publications still pending at exit"
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    match &cli.command {
        Some(Commands::In { user }) => {
            let (service, config) = build_service(cli.config.as_deref())?;
            punch::run(&service, *user, PunchKind::CheckIn).await?;
            drain_publisher(&service, &config).await;
        }
        Some(Commands::Out { user }) => {
            let (service, config) = build_service(cli.config.as_deref())?;
            punch::run(&service, *user, PunchKind::CheckOut).await?;
            drain_publisher(&service, &config).await;
        }
        Some(Commands::History { user, start, end }) => {
            let (service, _config) = build_service(cli.config.as_deref())?;
            history::run(&service, *user, start.as_deref(), end.as_deref())?;
        }
        Some(Commands::Summary { user, start, end }) => {
            let (service, _config) = build_service(cli.config.as_deref())?;
            summary::run(&service, *user, start.as_deref(), end.as_deref())?;
        }
        Some(Commands::Report {
            start,
            end,
            out,
            admin,
        }) => {
            let (service, _config) = build_service(cli.config.as_deref())?;
            let auth = AuthClaim { is_admin: *admin };
            report::run(&service, start, end, out.clone(), auth)?;
        }
        Some(Commands::Settings { action }) => {
            let (service, _config) = build_service(cli.config.as_deref())?;
            match action {
                SettingsAction::Show => settings::show(&service)?,
                SettingsAction::Set {
                    workday_hours,
                    overtime_rate,
                    admin,
                } => {
                    let auth = AuthClaim { is_admin: *admin };
                    settings::set(&service, *workday_hours, *overtime_rate, auth)?;
                }
            }
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
