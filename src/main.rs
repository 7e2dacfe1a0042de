use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use warden::auth::generate_token;
use warden::config::{AccessConfig, ServerConfig};
use warden::remote::HttpAuthority;
use warden::server::{AppState, create_router};
use warden::store::{SqliteStore, Store};
use warden::types::Principal;

#[cfg(unix)]
fn set_restrictive_permissions(path: &std::path::Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Failed to set permissions on {}: {e}", path.display());
    }
}

#[derive(Parser)]
#[command(name = "warden")]
#[command(about = "Permission cache and access decisions for a CI control plane", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(long, short, default_value = "8080")]
        port: u16,

        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// TOML file with sync and admission settings
        #[arg(long)]
        config: Option<PathBuf>,

        /// Base URL of the remote authority (e.g., "https://scm.example.com/api/v1")
        #[arg(long, env = "WARDEN_AUTHORITY_URL")]
        authority_url: Option<String>,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the server (create database and administrator)
    Init {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Login of the administrator principal
        #[arg(long, default_value = "admin")]
        login: String,
    },
}

fn run_init(data_dir: String, login: String) -> anyhow::Result<()> {
    let data_path: PathBuf = data_dir.into();
    fs::create_dir_all(&data_path)?;

    let config = ServerConfig {
        data_dir: data_path,
        ..ServerConfig::default()
    };
    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;

    let token_file = config.data_dir.join(".admin_token");

    if store.has_admin_principal()? {
        bail!(
            "Server already initialized. Admin token exists at: {}",
            token_file.display()
        );
    }

    let (raw_token, digest) = generate_token();
    let mut admin = Principal::new(login, "");
    admin.admin = true;
    admin.token_digest = Some(digest);
    let admin = store.create_principal(&admin)?;

    fs::write(&token_file, &raw_token)?;

    #[cfg(unix)]
    set_restrictive_permissions(&token_file);

    println!();
    println!("========================================");
    println!("Admin token for '{}' (save this, it won't be shown again):", admin.login);
    println!();
    println!("  {raw_token}");
    println!();
    println!("Token also written to: {}", token_file.display());
    println!("========================================");
    println!();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {e}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warden=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init { data_dir, login } => {
                run_init(data_dir, login)?;
            }
        },
        Commands::Serve {
            host,
            port,
            data_dir,
            config,
            authority_url,
        } => {
            let server = ServerConfig {
                host,
                port,
                data_dir: data_dir.into(),
                authority_url,
            };

            let access = match &config {
                Some(path) => AccessConfig::load(path)
                    .with_context(|| format!("failed to load {}", path.display()))?,
                None => AccessConfig::default(),
            };

            let Some(authority_url) = server.authority_url.as_deref() else {
                bail!("No remote authority configured. Pass --authority-url or set WARDEN_AUTHORITY_URL.");
            };

            let store = SqliteStore::new(server.db_path())?;
            store.initialize()?;
            if !store.has_admin_principal()? {
                bail!(
                    "Server not initialized. Run 'warden admin init' first to create the database and administrator."
                );
            }

            let remote = HttpAuthority::new(authority_url)?;
            let state = Arc::new(AppState::new(Arc::new(store), Arc::new(remote), &access));

            let app = create_router(state.clone());
            let addr = server.socket_addr()?;

            info!("Starting server on {}", addr);
            info!(
                period_secs = access.sync.period.as_secs(),
                timeout_secs = access.sync.timeout.as_secs(),
                "permission sync configured"
            );

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            info!("Waiting for in-flight permission refreshes");
            state.synchronizer.drain().await;
        }
    }

    Ok(())
}
