mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use paydesk_common::Role;
use paydesk_config::{AppConfig, ConfigLoader};
use paydesk_db::SqliteKeyValueStore;
use paydesk_security::{CredentialStore, RedactingWriter, default_headers};
use tracing::info;
use tracing_subscriber::EnvFilter;

pub type Store = CredentialStore<SqliteKeyValueStore>;

#[derive(Parser)]
#[command(name = "paydesk", version, about = "PayDesk dashboard session credential manager")]
struct Cli {
    /// Path to config file
    #[arg(short, long, env = "PAYDESK_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (overrides config and RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a freshly issued token, replacing any other session
    Login {
        token: String,
        /// Role for the token; inferred from its claims when omitted
        #[arg(long)]
        role: Option<Role>,
    },
    /// Clear the credential for one role, or everything
    Logout {
        #[arg(long)]
        role: Option<Role>,
    },
    /// Show the current role and credential validity
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Make a role current, evicting the other role's credential
    SwitchRole { role: Role },
    /// Print the headers an outgoing API request would carry
    Headers,
    /// Enforce the inactivity timeout; each stdin line counts as activity
    Watch {
        /// Override the configured inactivity timeout
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let loader = match &cli.config {
        Some(path) => ConfigLoader::with_path(path),
        None => ConfigLoader::new()?,
    };
    let config = loader.load().context("failed to load configuration")?;

    init_tracing(cli.log_level.as_deref().or(config.log_level.as_deref()));

    let store = Arc::new(open_store(&config)?);

    match cli.command {
        Commands::Login { token, role } => {
            store.set_token(&token, role);
            match store.current_role() {
                Some(role) => println!("Signed in as {role}."),
                None => println!("Token stored, but the role marker could not be saved."),
            }
        }
        Commands::Logout { role } => {
            store.remove_token(role);
            match role {
                Some(role) => println!("Signed out of the {role} session."),
                None => println!("Signed out."),
            }
        }
        Commands::Status { json } => print_status(&store, json)?,
        Commands::SwitchRole { role } => {
            store.switch_role(role);
            println!("Current role is now {role}. Sign in to continue.");
        }
        Commands::Headers => {
            for (name, value) in default_headers(store.as_ref()).iter() {
                let shown = if value.is_sensitive() {
                    "[REDACTED]"
                } else {
                    value.to_str().unwrap_or("<binary>")
                };
                println!("{name}: {shown}");
            }
        }
        Commands::Watch { timeout_secs } => {
            let mut session = config.session.clone();
            if let Some(secs) = timeout_secs {
                session.timeout_secs = secs;
            }
            watch::run(Arc::clone(&store), &session).await?;
        }
    }

    Ok(())
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(RedactingWriter::stderr())
        .init();
}

fn open_store(config: &AppConfig) -> Result<Store> {
    let path = config
        .storage
        .path
        .clone()
        .context("storage path is not configured")?;
    let storage = SqliteKeyValueStore::open(&path, config.storage.origin.clone())
        .with_context(|| format!("failed to open state store at {}", path.display()))?;
    info!("using origin {}", config.storage.origin);

    Ok(CredentialStore::new(storage).with_policy(
        config.credentials.ttl(),
        config.credentials.expiry_buffer(),
    ))
}

fn print_status(store: &Store, json: bool) -> Result<()> {
    let current = store.current_role();
    let roles: Vec<serde_json::Value> = Role::ALL
        .iter()
        .map(|role| {
            serde_json::json!({
                "role": role.as_str(),
                "valid": store.is_token_valid(Some(*role)),
                "expires_at": store.token_expires_at(Some(*role)).map(|t| t.to_rfc3339()),
            })
        })
        .collect();

    if json {
        let status = serde_json::json!({
            "current_role": current.map(|r| r.as_str()),
            "roles": roles,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    match current {
        Some(role) => println!("Current role: {role}"),
        None => println!("Current role: none (signed out)"),
    }
    for entry in &roles {
        let role = entry["role"].as_str().unwrap_or_default();
        match entry["expires_at"].as_str() {
            Some(expires_at) => println!("  {role}: valid until {expires_at}"),
            None => println!("  {role}: no valid credential"),
        }
    }
    Ok(())
}
