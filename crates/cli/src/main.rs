use anyhow::Context;
use clap::{Parser, Subcommand};

use bookshelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

#[derive(Debug, Parser)]
#[command(name = "bookshelf", version, about = "Book catalog service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply migrations and serve the HTTP API (default)
    Serve,
    /// Apply pending migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().with_context(|| "failed to load bookshelf settings")?;
    bookshelf_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.url,
        "bookshelf bootstrap starting"
    );

    let pool = bookshelf_db::connect(&settings.database.url, settings.database.max_connections)
        .await
        .context("failed to open database")?;

    let mut registry = ModuleRegistry::new();
    bookshelf_app::register_all(&mut registry, &pool);

    let applied = bookshelf_db::run_migrations(&pool, &registry.collect_migrations()).await?;
    tracing::info!(applied, "migrations complete");

    let outcome = match cli.command.unwrap_or(Command::Serve) {
        Command::Migrate => Ok(()),
        Command::Serve => serve(&registry, &settings).await,
    };

    bookshelf_db::close(&pool).await;
    outcome
}

async fn serve(registry: &ModuleRegistry, settings: &Settings) -> anyhow::Result<()> {
    let ctx = InitCtx { settings };
    registry.init_all(&ctx).await?;
    registry.start_all(&ctx).await?;

    let served =
        bookshelf_http::start_server(registry, settings, bookshelf_http::shutdown_signal()).await;

    // Stop modules even when the server failed, then report the server error.
    registry.stop_all().await?;
    served
}
