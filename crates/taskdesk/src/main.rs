//! taskdesk session runner
//!
//! Loads the initial task list in the background, then serves user intents
//! as JSON lines on stdin and writes board views and notifications as JSON
//! lines on stdout. Logs go to stderr.

mod config;
mod session;

use std::sync::Arc;
use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::SessionConfig;
use crate::session::Session;
use taskdesk_core::board::TaskStore;
use taskdesk_core::ingest::HttpTaskSource;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskdesk=debug,taskdesk_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = SessionConfig::from_env();
    tracing::info!("Using todos endpoint: {}", config.ingest.url);

    let store = TaskStore::new();
    let mut session = Session::new(store.clone(), &config);

    let ingest = if config.skip_ingest {
        tracing::info!("Skipping ingestion");
        None
    } else {
        let source = HttpTaskSource::new(config.ingest.clone());
        Some(store.spawn_ingest(Arc::new(source)))
    };

    let stdin = BufReader::new(tokio::io::stdin());
    tokio::select! {
        result = session.run(stdin, tokio::io::stdout(), ingest) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted");
            Ok(())
        }
    }
}
