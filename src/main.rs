use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::sync::Arc;
use tracing::info;

use nimbusfeed::chat::models::OutgoingMessage;
use nimbusfeed::chat::stoat::StoatClient;
use nimbusfeed::chat::traits::ChatPlatform;
use nimbusfeed::commands;
use nimbusfeed::config::Config;
use nimbusfeed::db::{Database, SubscriptionStore};
use nimbusfeed::nexus::client::NexusClient;
use nimbusfeed::output::terminal;
use nimbusfeed::pipeline::sync::SyncOrchestrator;

/// NimbusFeed: Nexus Mods update feeds for chat channels.
///
/// Polls the Nexus Mods API for each subscribed game and posts new uploads
/// and updates to every channel following that game.
#[derive(Parser)]
#[command(name = "nimbusfeed", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Subscribe a channel to a game's feed
    Enable {
        /// Channel id or `<#id>` mention
        channel: String,
        /// Game domain name as in the Nexus mod page URL (e.g. skyrimspecialedition)
        game: String,
    },

    /// Remove a channel's feed
    Disable {
        /// Channel id or `<#id>` mention
        channel: String,
    },

    /// Run a bot command as a moderator would type it (enable, disable, help)
    Command {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        words: Vec<String>,
    },

    /// List every feed grouped by game
    Feeds,

    /// Run a single sync cycle now
    Sync,

    /// Run sync cycles on a schedule until Ctrl-C
    Run,

    /// Show system status (feeds, ledger size, last sync)
    Status,

    /// Post a test message to the default channel (CHANNEL_ID)
    Ping,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("nimbusfeed=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            info!("Initializing NimbusFeed database...");
            let config = Config::load()?;
            let db = init_database(&config).await?;
            let table_count = db.table_count().await?;
            println!("Database initialized at: {}", db_display(&config));
            println!("Tables created: {table_count}");
            println!("\nNimbusFeed is ready. Next step: set up your .env file");
            println!("  (see .env.example for required variables)");
            println!("\nThen run: nimbusfeed enable <channel> <game>");
        }

        Commands::Enable { channel, game } => {
            let config = Config::load()?;
            let db = open_database(&config).await?;
            let words = ["enable".to_string(), channel, game];
            println!("{}", commands::operator_command(db.as_ref(), &words).await);
        }

        Commands::Disable { channel } => {
            let config = Config::load()?;
            let db = open_database(&config).await?;
            let words = ["disable".to_string(), channel];
            println!("{}", commands::operator_command(db.as_ref(), &words).await);
        }

        Commands::Command { words } => {
            let config = Config::load()?;
            let db = open_database(&config).await?;
            println!("{}", commands::operator_command(db.as_ref(), &words).await);
        }

        Commands::Feeds => {
            let config = Config::load()?;
            let db = open_database(&config).await?;
            let feeds = db.list_subscriptions_by_game().await?;
            terminal::display_feed_list(&feeds);
        }

        Commands::Sync => {
            let config = Config::load()?;
            config.require_bot()?;
            let db = open_database(&config).await?;
            let orchestrator = build_orchestrator(&config, db)?;

            println!("Syncing feeds...");
            match orchestrator.try_run_cycle().await {
                Some(report) => terminal::display_cycle_report(&report?),
                None => println!("{}", "A sync cycle is already running.".yellow()),
            }
        }

        Commands::Run => {
            let config = Config::load()?;
            config.require_bot()?;
            let db = open_database(&config).await?;
            let orchestrator = Arc::new(build_orchestrator(&config, db)?);

            println!(
                "Syncing every {} minutes. Press Ctrl-C to stop.",
                config.sync_interval_minutes
            );
            orchestrator
                .run(config.sync_interval(), async {
                    let _ = tokio::signal::ctrl_c().await;
                })
                .await;
        }

        Commands::Status => {
            let config = Config::load()?;
            let db = open_database(&config).await?;
            let is_file = !uses_postgres(&config);
            nimbusfeed::status::show(&db, &db_display(&config), is_file).await?;
        }

        Commands::Ping => {
            let config = Config::load()?;
            config.require_bot()?;
            let chat = StoatClient::new(&config.chat_api_url, &config.bot_token)?;

            let Some(channel) = chat.resolve_channel(&config.default_channel_id).await? else {
                anyhow::bail!(
                    "Channel {} not found or not visible to the bot. Check CHANNEL_ID.",
                    config.default_channel_id
                );
            };
            let message = OutgoingMessage {
                content: Some("NimbusFeed is online.".to_string()),
                units: Vec::new(),
            };
            chat.send_message(&channel, &message).await?;
            println!("{} Sent test message to {}", "ok".green(), channel.label());
        }
    }

    Ok(())
}

fn build_orchestrator(config: &Config, db: Arc<dyn Database>) -> Result<SyncOrchestrator> {
    let source = NexusClient::new(&config.nexus_api_url, &config.api_key)?;
    let chat = StoatClient::new(&config.chat_api_url, &config.bot_token)?;
    Ok(SyncOrchestrator::new(
        db,
        Arc::new(source),
        Arc::new(chat),
        config.fetch_concurrency,
    ))
}

fn uses_postgres(config: &Config) -> bool {
    config
        .database_url
        .as_deref()
        .is_some_and(nimbusfeed::db::is_postgres_url)
}

/// Display-friendly database identifier. Postgres URLs have their
/// credentials redacted.
fn db_display(config: &Config) -> String {
    match config.database_url.as_deref() {
        Some(url) if nimbusfeed::db::is_postgres_url(url) => nimbusfeed::db::redact_url(url),
        _ => config.db_path.clone(),
    }
}

/// Open the configured database (it must already exist for SQLite).
async fn open_database(config: &Config) -> Result<Arc<dyn Database>> {
    if uses_postgres(config) {
        #[cfg(feature = "postgres")]
        {
            info!("Using PostgreSQL backend");
            let url = config.database_url.as_deref().unwrap_or_default();
            return nimbusfeed::db::connect_postgres(url).await;
        }
        #[cfg(not(feature = "postgres"))]
        anyhow::bail!(
            "DATABASE_URL points to PostgreSQL but the 'postgres' feature is not compiled in.\n\
             Rebuild with: cargo build --features postgres"
        );
    }
    nimbusfeed::db::open_sqlite(&config.db_path)
}

/// Initialize the database (create if needed).
async fn init_database(config: &Config) -> Result<Arc<dyn Database>> {
    if uses_postgres(config) {
        #[cfg(feature = "postgres")]
        {
            info!("Using PostgreSQL backend");
            let url = config.database_url.as_deref().unwrap_or_default();
            return nimbusfeed::db::connect_postgres(url).await;
        }
        #[cfg(not(feature = "postgres"))]
        anyhow::bail!(
            "DATABASE_URL points to PostgreSQL but the 'postgres' feature is not compiled in.\n\
             Rebuild with: cargo build --features postgres"
        );
    }
    nimbusfeed::db::initialize_sqlite(&config.db_path)
}
