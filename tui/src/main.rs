use std::fs::File;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tui::api::ApiClient;
use tui::app::{self, App};
use tui::edit::EditSessions;
use tui::session::{self, SessionStore};

#[tokio::main]
async fn main() -> Result<()> {
    // The terminal belongs to the UI — logs go to a file, filtered by RUST_LOG.
    let log_file = File::create("tui.log").context("Failed to create log file")?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "client.toml".to_string());
    let config =
        shared::config::load_config(&config_path).context("Failed to load configuration")?;

    let api = ApiClient::new(&config.service).context("Failed to build API client")?;

    let mut store = SessionStore::new(&config.storage.token_file);
    store.restore(session::now_ms());
    match store.principal() {
        Some(principal) => info!("Starting with a restored session (user {})", principal.id),
        None => info!("Starting unauthenticated"),
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    app::spawn_input_thread(tx.clone());

    let mut terminal = ratatui::init();
    let app = App::new(
        api,
        store,
        EditSessions::new(config.edit.max_open_edits),
        tx,
    );
    let result = app.run(&mut terminal, &mut rx).await;
    ratatui::restore();

    info!("Client shut down");
    result
}
