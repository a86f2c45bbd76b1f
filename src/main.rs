use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tether_core::bootstrap::{AppBuilder, resolve_config_path, startup_checks};
use tether_core::config::Config;
use tether_core::mirror::{
    backup_row_count, check_collection_health, current_recovery_destination,
    export_collection_to_store, import_store_to_collection,
};
use tokio::sync::watch;

/// Mirror a vector collection into a relational table and restore it on loss.
#[derive(Parser, Debug)]
#[command(name = "tether", version, about)]
struct Cli {
    /// Config file path (overrides TETHER_CONFIG).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
#[command(rename_all = "kebab-case")]
enum Command {
    /// Run the export and health-check schedules until interrupted.
    Run,
    /// Export the source collection to the backup table once.
    Export,
    /// Restore the backup table into a new collection once.
    Import {
        /// Destination collection (defaults to the recovery collection).
        #[arg(long)]
        destination: Option<String>,
    },
    /// Probe the source collection and count backup rows without recovering.
    Check,
    /// Print the effective configuration.
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_subscriber();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(cli.config).await,
        Command::Export => export_once(cli.config).await,
        Command::Import { destination } => import_once(cli.config, destination).await,
        Command::Check => check(cli.config).await,
        Command::Config => print_config(cli.config),
    }
}

async fn run(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let app = AppBuilder::load(config_path.as_deref())?;
    tracing::info!(
        "tether v{} starting (config: {})",
        env!("CARGO_PKG_VERSION"),
        app.config_path().display()
    );

    let ctx = app.build_context().await?;
    startup_checks(&ctx).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e:#}");
            return;
        }
        tracing::info!("received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    let scheduler = app.build_scheduler(&ctx, shutdown_rx)?;
    scheduler.run().await;
    Ok(())
}

async fn export_once(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let app = AppBuilder::load(config_path.as_deref())?;
    let ctx = app.build_context().await?;
    let settings = ctx.settings();
    let result =
        export_collection_to_store(&ctx, &settings.source_collection, &settings.backup_table)
            .await
            .context("export failed")?;
    println!(
        "exported {} item(s) from {} to {}",
        result.items_written, settings.source_collection, settings.backup_table
    );
    Ok(())
}

async fn import_once(
    config_path: Option<PathBuf>,
    destination: Option<String>,
) -> anyhow::Result<()> {
    let app = AppBuilder::load(config_path.as_deref())?;
    let ctx = app.build_context().await?;
    let settings = ctx.settings();
    let destination = destination.unwrap_or_else(|| current_recovery_destination(settings));
    let result = import_store_to_collection(&ctx, &settings.backup_table, &destination)
        .await
        .context("import failed")?;
    println!(
        "restored {} item(s) from {} into {destination}",
        result.items_restored, settings.backup_table
    );
    Ok(())
}

async fn check(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let app = AppBuilder::load(config_path.as_deref())?;
    let ctx = app.build_context().await?;
    let settings = ctx.settings();

    let status = check_collection_health(&ctx, &settings.source_collection).await;
    let rows = backup_row_count(&ctx)
        .await
        .with_context(|| format!("failed to count rows in {}", settings.backup_table))?;

    println!(
        "collection {}: {}",
        status.collection,
        if status.reachable { "reachable" } else { "unreachable" }
    );
    if let Some(detail) = &status.detail {
        println!("  detail: {detail}");
    }
    println!("backup table {}: {rows} row(s)", settings.backup_table);

    if !status.reachable {
        bail!("collection {} is unreachable", status.collection);
    }
    Ok(())
}

fn print_config(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = resolve_config_path(config_path.as_deref());
    let config = Config::load(&path)?;
    if let Err(e) = config.validate() {
        tracing::warn!("configuration is invalid: {e:#}");
    }
    println!("# {}", path.display());
    print!("{}", config.to_toml()?);
    Ok(())
}

fn init_subscriber() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_command_is_run() {
        let cli = Cli::try_parse_from(["tether"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn global_config_flag() {
        let cli = Cli::try_parse_from(["tether", "export", "--config", "/etc/tether.toml"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Export)));
        assert_eq!(cli.config, Some(PathBuf::from("/etc/tether.toml")));
    }

    #[test]
    fn import_destination() {
        let cli = Cli::try_parse_from(["tether", "import", "--destination", "restored"]).unwrap();
        match cli.command {
            Some(Command::Import { destination }) => {
                assert_eq!(destination.as_deref(), Some("restored"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn unknown_command_rejected() {
        assert!(Cli::try_parse_from(["tether", "frobnicate"]).is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
