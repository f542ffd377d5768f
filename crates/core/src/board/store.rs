//! Shared task store
//!
//! Async handle around a `TaskBoard`, cloned freely between the rendering
//! surface and the ingestion task. Emits notifications on a broadcast channel.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, oneshot, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::Error;
use crate::ingest::TaskSource;
use crate::task::{StatusFilter, Task, TaskDraft, TaskId, TaskStatus};
use crate::Result;

use super::model::{BoardSnapshot, Notification, TaskBoard};

const NOTIFICATION_CAPACITY: usize = 64;

/// How an ingestion run ended
#[derive(Debug)]
pub enum IngestOutcome {
    /// Repository replaced with this many tasks
    Loaded(usize),
    /// Fetch or load failed; repository untouched
    Failed(Error),
    /// Aborted before the fetch completed
    Aborted,
    /// Every store handle was dropped before the result arrived
    Discarded,
}

/// Handle to a background ingestion run
pub struct IngestHandle {
    abort_tx: Option<oneshot::Sender<()>>,
    join: JoinHandle<IngestOutcome>,
}

impl IngestHandle {
    /// Stop the fetch if it is still in flight
    pub fn abort(&mut self) {
        if let Some(tx) = self.abort_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Wait for the run to finish
    pub async fn wait(self) -> IngestOutcome {
        match self.join.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => {
                warn!("Ingestion task cancelled: {}", e);
                IngestOutcome::Aborted
            }
            Err(e) => {
                error!("Ingestion task panicked: {}", e);
                IngestOutcome::Failed(Error::Ingestion(format!("Ingestion task panicked: {}", e)))
            }
        }
    }
}

/// Thread-safe task store
#[derive(Clone)]
pub struct TaskStore {
    board: Arc<RwLock<TaskBoard>>,
    notify_tx: broadcast::Sender<Notification>,
    search_generation: Arc<AtomicU64>,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStore {
    /// Create a store over an empty board
    pub fn new() -> Self {
        Self::with_board(TaskBoard::new())
    }

    pub fn with_board(board: TaskBoard) -> Self {
        let (notify_tx, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            board: Arc::new(RwLock::new(board)),
            notify_tx,
            search_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Subscribe to notifications
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notify_tx.subscribe()
    }

    /// Get the current board state
    pub async fn snapshot(&self) -> BoardSnapshot {
        self.board.read().await.snapshot()
    }

    /// Replace the "new task" form state
    pub async fn set_draft(&self, draft: TaskDraft) {
        self.board.write().await.set_draft(draft);
    }

    /// Submit the current draft
    pub async fn submit_draft(&self) -> Result<Task> {
        let task = self.board.write().await.submit_draft()?;
        self.notify(Notification::success("Task added successfully!"));
        Ok(task)
    }

    /// Add a task from `draft`
    pub async fn add_task(&self, draft: TaskDraft) -> Result<Task> {
        let task = self.board.write().await.add_task(draft)?;
        self.notify(Notification::success("Task added successfully!"));
        Ok(task)
    }

    /// Delete a task. The success notification is sent whether or not the id existed.
    pub async fn delete_task(&self, id: TaskId) -> Option<Task> {
        let removed = self.board.write().await.delete_task(id);
        self.notify(Notification::success("Task deleted successfully!"));
        removed
    }

    /// Change a task's status
    pub async fn set_status(&self, id: TaskId, status: TaskStatus) -> bool {
        self.board.write().await.set_status(id, status)
    }

    /// Apply a search term immediately
    pub async fn set_search(&self, term: &str) {
        self.search_generation.fetch_add(1, Ordering::SeqCst);
        self.board.write().await.set_search(term);
    }

    /// Apply a search term after `delay`, unless a newer search arrives first.
    ///
    /// Returns whether this term was applied.
    pub async fn search_debounced(&self, term: &str, delay: Duration) -> bool {
        let generation = self.search_generation.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(delay).await;

        let mut board = self.board.write().await;
        if self.search_generation.load(Ordering::SeqCst) != generation {
            debug!("Search {:?} superseded", term);
            return false;
        }
        board.set_search(term);
        true
    }

    pub async fn set_status_filter(&self, filter: StatusFilter) {
        self.board.write().await.set_status_filter(filter);
    }

    /// Fetch from `source` and replace the repository
    pub async fn ingest(&self, source: &dyn TaskSource) -> IngestOutcome {
        info!("Ingesting tasks");
        let result = source.fetch_tasks().await;
        Self::apply_ingest(&self.board, result).await
    }

    /// Run ingestion in the background.
    ///
    /// The task only holds a weak reference to the board, so a result arriving
    /// after every `TaskStore` clone is dropped is discarded.
    pub fn spawn_ingest(&self, source: Arc<dyn TaskSource>) -> IngestHandle {
        let (abort_tx, abort_rx) = oneshot::channel();
        let board = Arc::downgrade(&self.board);

        let join = tokio::spawn(async move {
            info!("Ingesting tasks in background");
            let result = tokio::select! {
                biased;
                Ok(()) = abort_rx => {
                    info!("Ingestion aborted");
                    return IngestOutcome::Aborted;
                }
                result = source.fetch_tasks() => result,
            };

            let Some(board) = board.upgrade() else {
                debug!("Task store dropped, discarding ingestion result");
                return IngestOutcome::Discarded;
            };
            Self::apply_ingest(&board, result).await
        });

        IngestHandle {
            abort_tx: Some(abort_tx),
            join,
        }
    }

    /// Failures are logged only; nothing is broadcast
    async fn apply_ingest(board: &RwLock<TaskBoard>, result: Result<Vec<Task>>) -> IngestOutcome {
        let tasks = match result {
            Ok(tasks) => tasks,
            Err(e) => {
                error!("Error fetching data: {}", e);
                return IngestOutcome::Failed(e);
            }
        };

        let mut board = board.write().await;
        match board.load(tasks) {
            Ok(()) => {
                let count = board.repository().len();
                info!("Loaded {} tasks", count);
                IngestOutcome::Loaded(count)
            }
            Err(e) => {
                error!("Error loading data: {}", e);
                IngestOutcome::Failed(e)
            }
        }
    }

    fn notify(&self, notification: Notification) {
        // No subscribers is fine
        let _ = self.notify_tx.send(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::sync::broadcast::error::TryRecvError;
    use tokio::sync::Notify;

    struct FixedSource(Vec<Task>);

    #[async_trait]
    impl TaskSource for FixedSource {
        async fn fetch_tasks(&self) -> Result<Vec<Task>> {
            Ok(self.0.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl TaskSource for FailingSource {
        async fn fetch_tasks(&self) -> Result<Vec<Task>> {
            Err(Error::Ingestion("connection refused".into()))
        }
    }

    struct PanickingSource;

    #[async_trait]
    impl TaskSource for PanickingSource {
        async fn fetch_tasks(&self) -> Result<Vec<Task>> {
            panic!("source blew up");
        }
    }

    /// Blocks until released
    struct GatedSource {
        gate: Arc<Notify>,
        tasks: Vec<Task>,
    }

    #[async_trait]
    impl TaskSource for GatedSource {
        async fn fetch_tasks(&self) -> Result<Vec<Task>> {
            self.gate.notified().await;
            Ok(self.tasks.clone())
        }
    }

    fn twenty() -> Vec<Task> {
        (1..=20).map(|id| Task::new(id, format!("remote {}", id))).collect()
    }

    #[tokio::test]
    async fn test_ingest() {
        let store = TaskStore::new();
        let outcome = store.ingest(&FixedSource(twenty())).await;
        assert!(matches!(outcome, IngestOutcome::Loaded(20)));

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.view.len(), 20);
        assert_eq!(snapshot.counts.to_do, 20);
        assert_eq!(snapshot.next_id, 21);
    }

    #[tokio::test]
    async fn test_ingest_failure_leaves_empty_board() {
        let store = TaskStore::new();
        let mut rx = store.subscribe();

        let outcome = store.ingest(&FailingSource).await;
        assert!(matches!(outcome, IngestOutcome::Failed(Error::Ingestion(_))));
        assert!(store.snapshot().await.view.is_empty());

        // Logged only
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        // Still interactive
        store.add_task(TaskDraft::new("offline task")).await.unwrap();
        assert_eq!(store.snapshot().await.view.len(), 1);
    }

    #[tokio::test]
    async fn test_ingest_out_of_range_id_fails() {
        let store = TaskStore::new();
        let mut rx = store.subscribe();
        let tasks = vec![Task::new(1, "first"), Task::new(u64::MAX, "last")];

        let outcome = store.ingest(&FixedSource(tasks)).await;
        assert!(matches!(outcome, IngestOutcome::Failed(Error::Ingestion(_))));

        let snapshot = store.snapshot().await;
        assert!(snapshot.view.is_empty());
        assert_eq!(snapshot.counts.total(), 0);
        assert_eq!(snapshot.next_id, 21);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        let task = store.add_task(TaskDraft::new("offline task")).await.unwrap();
        assert_eq!(task.id, 21);
    }

    #[tokio::test]
    async fn test_add_and_delete_notify() {
        let store = TaskStore::new();
        store.ingest(&FixedSource(twenty())).await;
        let mut rx = store.subscribe();

        let task = store
            .add_task(TaskDraft::new("Clean house").with_status(TaskStatus::ToDo))
            .await
            .unwrap();
        assert_eq!(task.id, 21);
        assert_eq!(rx.recv().await.unwrap().message, "Task added successfully!");

        assert!(store.delete_task(2).await.is_some());
        assert_eq!(rx.recv().await.unwrap().message, "Task deleted successfully!");

        // Missing id: no-op, still notified
        assert!(store.delete_task(2).await.is_none());
        assert_eq!(rx.recv().await.unwrap().message, "Task deleted successfully!");

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.view.len(), 20);
        assert!(snapshot.view.iter().all(|t| t.id != 2));
    }

    #[tokio::test]
    async fn test_validation_error_does_not_notify() {
        let store = TaskStore::new();
        let mut rx = store.subscribe();

        let result = store.add_task(TaskDraft::new("  ")).await;
        assert!(matches!(result, Err(Error::Validation(_))));
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_set_status_does_not_notify() {
        let store = TaskStore::new();
        store.ingest(&FixedSource(twenty())).await;
        let mut rx = store.subscribe();

        assert!(store.set_status(3, TaskStatus::Done).await);
        assert_eq!(store.snapshot().await.counts.done, 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_submit_draft() {
        let store = TaskStore::new();
        store
            .set_draft(TaskDraft::new("From the form").with_status(TaskStatus::InProgress))
            .await;
        assert_eq!(store.snapshot().await.draft.title, "From the form");

        let task = store.submit_draft().await.unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(store.snapshot().await.draft, TaskDraft::default());
    }

    #[tokio::test]
    async fn test_filters() {
        let store = TaskStore::new();
        store.ingest(&FixedSource(twenty())).await;
        store.set_status(7, TaskStatus::Done).await;

        store.set_status_filter(StatusFilter::Only(TaskStatus::Done)).await;
        let ids: Vec<_> = store.snapshot().await.view.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![7]);

        store.set_status_filter(StatusFilter::All).await;
        store.set_search("REMOTE 1").await;
        assert_eq!(store.snapshot().await.view.len(), 11);
    }

    #[tokio::test]
    async fn test_spawn_ingest() {
        let store = TaskStore::new();
        let handle = store.spawn_ingest(Arc::new(FixedSource(twenty())));

        assert!(matches!(handle.wait().await, IngestOutcome::Loaded(20)));
        assert_eq!(store.snapshot().await.view.len(), 20);
    }

    #[tokio::test]
    async fn test_abort_ingest() {
        let store = TaskStore::new();
        let gate = Arc::new(Notify::new());
        let mut handle = store.spawn_ingest(Arc::new(GatedSource {
            gate: Arc::clone(&gate),
            tasks: twenty(),
        }));

        handle.abort();
        gate.notify_one();

        assert!(matches!(handle.wait().await, IngestOutcome::Aborted));
        assert!(store.snapshot().await.view.is_empty());
    }

    #[tokio::test]
    async fn test_panicking_source_fails() {
        let store = TaskStore::new();
        let handle = store.spawn_ingest(Arc::new(PanickingSource));

        match handle.wait().await {
            IngestOutcome::Failed(Error::Ingestion(msg)) => {
                assert!(msg.contains("panicked"), "{}", msg)
            }
            other => panic!("Expected Failed, got: {:?}", other),
        }
        assert!(store.snapshot().await.view.is_empty());
    }

    #[tokio::test]
    async fn test_dropped_store_discards_result() {
        let store = TaskStore::new();
        let gate = Arc::new(Notify::new());
        let handle = store.spawn_ingest(Arc::new(GatedSource {
            gate: Arc::clone(&gate),
            tasks: twenty(),
        }));

        drop(store);
        gate.notify_one();

        assert!(matches!(handle.wait().await, IngestOutcome::Discarded));
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_debounced_keeps_last() {
        let store = TaskStore::new();
        store.ingest(&FixedSource(twenty())).await;
        let delay = Duration::from_millis(300);

        let first = {
            let store = store.clone();
            tokio::spawn(async move { store.search_debounced("remote 1", delay).await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        let second = {
            let store = store.clone();
            tokio::spawn(async move { store.search_debounced("remote 20", delay).await })
        };

        assert!(!first.await.unwrap());
        assert!(second.await.unwrap());

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.query.search(), "remote 20");
        assert_eq!(snapshot.view.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_search_cancels_pending_debounce() {
        let store = TaskStore::new();
        store.ingest(&FixedSource(twenty())).await;

        let pending = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .search_debounced("remote 3", Duration::from_millis(200))
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        store.set_search("").await;

        assert!(!pending.await.unwrap());
        assert_eq!(store.snapshot().await.view.len(), 20);
    }
}
