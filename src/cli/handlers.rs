use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::error::{NotekeeperError, Result};
use crate::storage::SqliteStore;
use crate::web;

fn load_config(config: Option<&Path>, db: Option<PathBuf>) -> Result<Config> {
    Config::load(config)?.with_overrides(None, db)
}

pub fn handle_init(config: Option<&Path>, db: Option<PathBuf>) -> Result<()> {
    let config = load_config(config, db)?;
    let store = SqliteStore::open(&config.database)?;

    let location = store.path().unwrap_or(config.database.as_path());
    println!("Initialized notekeeper database at {}", location.display());
    Ok(())
}

pub fn handle_user_add(
    config: Option<&Path>,
    username: String,
    password: String,
    db: Option<PathBuf>,
) -> Result<()> {
    let username = username.trim().to_string();
    if username.is_empty() {
        return Err(NotekeeperError::Invalid {
            field: "username".to_string(),
            message: "must not be empty".to_string(),
        });
    }
    if password.is_empty() {
        return Err(NotekeeperError::Invalid {
            field: "password".to_string(),
            message: "must not be empty".to_string(),
        });
    }

    let config = load_config(config, db)?;
    let store = SqliteStore::open(&config.database)?;
    let user = store.create_user(&username, &password)?;

    println!("Created user {} (id {})", user.username, user.id);
    Ok(())
}

pub fn handle_list(
    config: Option<&Path>,
    username: String,
    db: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let config = load_config(config, db)?;
    let store = SqliteStore::open(&config.database)?;

    let user = store
        .get_user_by_username(&username)?
        .ok_or_else(|| NotekeeperError::UserNotFound(username.clone()))?;
    let notes = store.list_notes_for_owner(user.id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&notes)?);
        return Ok(());
    }

    if notes.is_empty() {
        println!("No notes for {}.", user.username);
        return Ok(());
    }
    for note in &notes {
        println!("{:<30} {}", note.slug, note.title);
    }
    Ok(())
}

pub fn handle_serve(config: Option<&Path>, addr: Option<String>, db: Option<PathBuf>) -> Result<()> {
    let config = Config::load(config)?.with_overrides(addr, db)?;
    init_tracing(&config.log_level);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let shutdown = CancellationToken::new();
        let signal_token = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("shutdown requested"),
                Err(e) => error!(error = %e, "failed to listen for ctrl-c"),
            }
            signal_token.cancel();
        });

        web::serve(&config, shutdown).await
    })
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("notekeeper={0},tower_http={0}", default_level)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
