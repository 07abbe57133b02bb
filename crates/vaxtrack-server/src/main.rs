//! vaxtrack server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store, and serves the JSON API over HTTP.
//!
//! # Token generation
//!
//! To mint an API token and the argon2 PHC string for `auth_token_hash`:
//!
//! ```text
//! cargo run -p vaxtrack-server -- --hash-token
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use vaxtrack_core::clock::SystemClock;
use vaxtrack_server::{ServerConfig, auth};
use vaxtrack_store_sqlite::SqliteStore;

#[derive(Parser)]
#[command(author, version, about = "School vaccination record server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Generate a random API token, print it with its argon2 hash, and exit.
  #[arg(long)]
  hash_token: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if cli.hash_token {
    let token = auth::generate_token();
    let hash = auth::hash_token(&token).context("failed to hash token")?;
    println!("token:           {token}");
    println!("auth_token_hash: {hash}");
    return Ok(());
  }

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("VAXTRACK"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let app = vaxtrack_server::router(
    Arc::new(store),
    Arc::new(SystemClock),
    server_cfg.auth(),
  );
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!(principal = %server_cfg.auth_principal, "Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
