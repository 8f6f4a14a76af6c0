use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use libris_kernel::settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "libris", version, about = "Book record service")]
struct Cli {
    /// Directory holding `base.toml` and `{env}.toml`
    #[arg(long, global = true, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    /// Deployment environment (local, staging, production)
    #[arg(long, global = true, value_name = "ENV")]
    env: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply migrations and serve the HTTP API
    Serve,
    /// Apply pending migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load_with(cli.config_dir, cli.env)
        .with_context(|| "failed to load libris settings")?;
    libris_telemetry::init(&settings.telemetry)?;

    match cli.command {
        Command::Serve => libris_app::app::serve(&settings).await,
        Command::Migrate => {
            let applied = libris_app::app::migrate(&settings).await?;
            tracing::info!(applied, db = %settings.database.url, "migrations complete");
            Ok(())
        }
    }
}
