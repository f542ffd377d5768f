//! JSON-lines session over stdin/stdout
//!
//! Each input line is one user intent; every accepted intent is answered with
//! the notifications it produced followed by a fresh view of the board.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use taskdesk_core::board::{BoardSnapshot, IngestHandle, IngestOutcome, Notification, TaskStore};
use taskdesk_core::task::{StatusFilter, TaskDraft, TaskId, TaskStatus};
use taskdesk_core::Error;

use crate::config::SessionConfig;

// ============ Intents ============

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Intent {
    Add {
        title: String,
        #[serde(default)]
        status: TaskStatus,
        #[serde(default)]
        description: Option<String>,
    },
    Delete {
        id: TaskId,
    },
    SetStatus {
        id: TaskId,
        status: TaskStatus,
    },
    Search {
        term: String,
    },
    Filter {
        status: StatusFilter,
    },
    Sync,
}

// ============ Outbound events ============

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Outbound {
    View(BoardSnapshot),
    Notification(Notification),
    /// Blocking message, e.g. a missing title
    Alert { message: String },
    Error { message: String },
}

pub struct Session {
    store: TaskStore,
    search_debounce: Duration,
    notifications: broadcast::Receiver<Notification>,
    refresh_tx: mpsc::UnboundedSender<()>,
    refresh_rx: mpsc::UnboundedReceiver<()>,
}

impl Session {
    /// Subscribes to the store's notifications right away, so create the
    /// session before starting ingestion.
    pub fn new(store: TaskStore, config: &SessionConfig) -> Self {
        let notifications = store.subscribe();
        let (refresh_tx, refresh_rx) = mpsc::unbounded_channel();
        Self {
            store,
            search_debounce: config.search_debounce,
            notifications,
            refresh_tx,
            refresh_rx,
        }
    }

    /// Parse and dispatch one input line
    pub async fn handle_line(&mut self, line: &str) -> Vec<Outbound> {
        match serde_json::from_str::<Intent>(line) {
            Ok(intent) => self.handle_intent(intent).await,
            Err(e) => {
                warn!("Rejected intent {:?}: {}", line, e);
                vec![Outbound::Error {
                    message: format!("Invalid intent: {}", e),
                }]
            }
        }
    }

    pub async fn handle_intent(&mut self, intent: Intent) -> Vec<Outbound> {
        debug!("Handling intent: {:?}", intent);
        let mut events = Vec::new();

        match intent {
            Intent::Add {
                title,
                status,
                description,
            } => {
                let draft = TaskDraft {
                    title,
                    status,
                    description,
                };
                match self.store.add_task(draft).await {
                    Ok(task) => info!("Added task {}", task.id),
                    Err(Error::Validation(message)) => events.push(Outbound::Alert { message }),
                    Err(e) => events.push(Outbound::Error {
                        message: e.to_string(),
                    }),
                }
            }
            Intent::Delete { id } => {
                if self.store.delete_task(id).await.is_none() {
                    debug!("Delete of unknown task {} ignored", id);
                }
            }
            Intent::SetStatus { id, status } => {
                if !self.store.set_status(id, status).await {
                    debug!("Status edit of unknown task {} ignored", id);
                }
            }
            Intent::Search { term } => self.search(term).await,
            Intent::Filter { status } => self.store.set_status_filter(status).await,
            Intent::Sync => {}
        }

        self.drain_notifications(&mut events);
        events.push(Outbound::View(self.store.snapshot().await));
        events
    }

    async fn search(&self, term: String) {
        if self.search_debounce.is_zero() {
            self.store.set_search(&term).await;
            return;
        }

        let store = self.store.clone();
        let delay = self.search_debounce;
        let refresh_tx = self.refresh_tx.clone();
        tokio::spawn(async move {
            if store.search_debounced(&term, delay).await {
                let _ = refresh_tx.send(());
            }
        });
    }

    fn drain_notifications(&mut self, events: &mut Vec<Outbound>) {
        loop {
            match self.notifications.try_recv() {
                Ok(notification) => events.push(Outbound::Notification(notification)),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!("Dropped {} notifications", skipped);
                }
                Err(_) => break,
            }
        }
    }

    /// Serve intents from `reader` until EOF, writing events to `writer`.
    ///
    /// `ingest`, if given, is awaited alongside input and answered with a view
    /// once it finishes.
    pub async fn run<R, W>(
        &mut self,
        reader: R,
        mut writer: W,
        ingest: Option<IngestHandle>,
    ) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        let mut ingest = ingest.map(|handle| Box::pin(handle.wait()));

        let initial = Outbound::View(self.store.snapshot().await);
        write_event(&mut writer, &initial).await?;

        loop {
            let events = tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        info!("Input closed");
                        break;
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    self.handle_line(&line).await
                }
                outcome = async {
                    match ingest.as_mut() {
                        Some(fut) => fut.await,
                        None => std::future::pending().await,
                    }
                }, if ingest.is_some() => {
                    ingest = None;
                    match &outcome {
                        IngestOutcome::Loaded(count) => info!("Ingested {} tasks", count),
                        IngestOutcome::Failed(e) => warn!("Starting with an empty task list: {}", e),
                        other => info!("Ingestion ended: {:?}", other),
                    }
                    self.handle_intent(Intent::Sync).await
                }
                Some(()) = self.refresh_rx.recv() => {
                    self.handle_intent(Intent::Sync).await
                }
            };

            for event in &events {
                write_event(&mut writer, event).await?;
            }
        }

        Ok(())
    }
}

async fn write_event<W: AsyncWrite + Unpin>(writer: &mut W, event: &Outbound) -> anyhow::Result<()> {
    let mut line = serde_json::to_string(event)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}
