//! HTTP task source backed by reqwest

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use super::{normalize, IngestConfig, RemoteTodo, TaskSource};
use crate::task::Task;
use crate::Result;

/// Fetches the todo list with a single GET request
pub struct HttpTaskSource {
    client: Client,
    config: IngestConfig,
}

impl HttpTaskSource {
    pub fn new(config: IngestConfig) -> Self {
        Self {
            client: Client::builder().build().unwrap_or_else(|_| Client::new()),
            config,
        }
    }

    /// Use a preconfigured client
    pub fn with_client(config: IngestConfig, client: Client) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Only the first `limit` items are decoded; anything past them is never inspected
    async fn fetch_todos(&self) -> Result<Vec<RemoteTodo>> {
        info!("Fetching todos from {}", self.config.url);

        let resp = self
            .client
            .get(&self.config.url)
            .send()
            .await?
            .error_for_status()?;

        let body = resp.bytes().await?;
        let items: Vec<serde_json::Value> = serde_json::from_slice(&body)?;
        debug!("Received {} todos", items.len());

        let todos = items
            .into_iter()
            .take(self.config.limit)
            .map(serde_json::from_value::<RemoteTodo>)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(todos)
    }
}

#[async_trait]
impl TaskSource for HttpTaskSource {
    async fn fetch_tasks(&self) -> Result<Vec<Task>> {
        self.fetch_todos()
            .await
            .map(|todos| normalize(todos, self.config.limit))
            .map_err(|e| e.into_ingestion())
    }
}
