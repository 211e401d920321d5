mod archive_import;
mod config;
mod database;
mod entities;
mod http_server;
mod logging;
mod ports;
mod services;
#[cfg(test)]
mod test_utils;
mod token;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::{Result, eyre::Context};

use crate::{
    archive_import::ArchiveImporter,
    config::Config,
    database::Database,
    http_server::state::AppState,
    logging::{init_tracing, shutdown_tracing},
    services::{
        accounts::AccountService, background::BackgroundImporter,
        payment_methods::PaymentMethodService,
    },
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The config file to use
    #[arg(short, long, env = "MUSIC_STORE_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter directive, e.g. `info` or `music_store=debug`
    #[arg(long, default_value = "info", global = true, env = "LOG_LEVEL")]
    log_level: String,

    /// OTLP gRPC endpoint to export spans to
    #[arg(long, global = true, env = "OTLP_ENDPOINT")]
    otlp_endpoint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

fn is_file(s: &str) -> Result<PathBuf, String> {
    let p: PathBuf = s.into();
    if p.is_file() {
        Ok(p)
    } else {
        Err(format!("`{}` is not an existing file", s))
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the HTTP API and admin pages
    Serve {
        /// The port to run the server on
        #[arg(short, long, default_value = "3000", env = "MUSIC_STORE_HTTP_PORT")]
        port: u16,
    },
    /// Import a zip archive of albums and tracks
    Import {
        /// The archive to import
        #[arg(short, long, value_parser = is_file)]
        input: PathBuf,
    },
    #[command(subcommand)]
    User(UserCommands),
    #[command(subcommand)]
    PaymentMethod(PaymentMethodCommands),
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
enum UserCommands {
    /// Create a user and print its API token
    Create {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        username: String,
        /// Allow access to the admin pages
        #[arg(long)]
        staff: bool,
    },
    /// Issue a new API token, revoking the old one
    RotateToken {
        #[arg(short, long)]
        email: String,
    },
    /// Add money to a user's balance
    Deposit {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        amount: f64,
    },
}

#[derive(Subcommand, Debug)]
enum PaymentMethodCommands {
    /// Create a payment method users can pick
    Create {
        #[arg(short, long)]
        title: String,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Create a default config file, if it doesn't exist
    CreateDefault,
    /// Print the path to the config file
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let tracer_provider = init_tracing(&args.log_level, args.otlp_endpoint.as_deref())?;

    let result = run(args).await;
    shutdown_tracing(tracer_provider);
    result
}

async fn run(args: Args) -> Result<()> {
    if let Commands::Config(config_commands) = &args.command {
        match config_commands {
            ConfigCommands::CreateDefault => {
                let path = Config::create_default()?;
                println!("{}", path.display());
            }
            ConfigCommands::Path => match Config::config_path() {
                Some(path) => println!("{}", path.display()),
                None => println!("No default config path found"),
            },
        }
        return Ok(());
    }

    tracing::debug!("Loading configuration");
    let config = match &args.config {
        Some(path) => Config::from_file(path),
        None => Config::load(),
    }
    .wrap_err("Failed to load music-store config")?;

    let db = Arc::new(Database::open(&config.database_path()).await?);

    match args.command {
        Commands::Serve { port } => {
            let importer = Arc::new(ArchiveImporter::new(
                db.clone(),
                config.media_directory(),
                config.import_options(),
            ));
            let app_state = Arc::new(AppState {
                db,
                media_directory: config.media_directory(),
                import_dispatcher: Arc::new(BackgroundImporter::new(importer)),
                upload_limit_bytes: config.upload_limit_bytes(),
            });
            tracing::info!("Starting HTTP server on port: {}", port);
            http_server::app::start(port, app_state).await?;
        }
        Commands::Import { input } => {
            let importer =
                ArchiveImporter::new(db, config.media_directory(), config.import_options());
            let summary = importer
                .import_archive_file(&input)
                .await
                .wrap_err_with(|| format!("Failed to import {}", input.display()))?;
            println!(
                "Albums created: {}, reused: {}. Tracks created: {}, skipped: {}.",
                summary.albums_created,
                summary.albums_reused,
                summary.tracks_created,
                summary.tracks_skipped
            );
        }
        Commands::User(user_commands) => {
            let accounts = AccountService::new(db);
            match user_commands {
                UserCommands::Create {
                    email,
                    username,
                    staff,
                } => {
                    let (user, token) = accounts.create_user(&email, &username, staff).await?;
                    println!("Created user {} ({})", user.id, user.email);
                    println!("API token: {token}");
                }
                UserCommands::RotateToken { email } => {
                    let token = accounts.rotate_token(&email).await?;
                    println!("API token: {token}");
                }
                UserCommands::Deposit { email, amount } => {
                    let user = accounts.deposit(&email, amount).await?;
                    println!("Balance of {}: {:.2}", user.email, user.balance);
                }
            }
        }
        Commands::PaymentMethod(PaymentMethodCommands::Create { title }) => {
            let method = PaymentMethodService::new(db).create(&title).await?;
            println!("Created payment method {} ({})", method.id, method.title);
        }
        Commands::Config(_) => {}
    }

    Ok(())
}
