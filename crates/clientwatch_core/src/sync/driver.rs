//! Single-task event loop wiring store, engine and remote together.
//!
//! # Responsibility
//! - Serialize user commands, remote snapshots and debounce expiry onto one
//!   task so the store has exactly one writer.
//! - Report store revisions to the engine after every command.
//! - Regenerate a stale daily slot before each command and after each
//!   remote apply.
//! - Release the subscription and drop any pending write on shutdown.
//!
//! # Invariants
//! - A remote snapshot's change cascade is observed while the apply guard
//!   is still set; the guard is cleared only afterwards.
//! - The driver never writes to local storage itself; the store does.

use crate::repo::kv_repo::KvStore;
use crate::service::dashboard_store::DashboardStore;
use crate::sync::document::{DocumentSnapshot, DocumentStore, Subscription};
use crate::sync::engine::{SyncEngine, SyncStatus};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::future::pending;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

type Command<S> = Box<dyn FnOnce(&mut DashboardStore<S>) + Send>;

/// The driver task has stopped and can no longer serve requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverClosed;

impl Display for DriverClosed {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "dashboard sync driver is closed")
    }
}

impl Error for DriverClosed {}

pub struct SyncDriver<S: KvStore> {
    store: DashboardStore<S>,
    engine: SyncEngine,
    remote: Arc<dyn DocumentStore>,
    seen_revision: u64,
}

impl<S: KvStore + Send + 'static> SyncDriver<S> {
    pub fn new(store: DashboardStore<S>, remote: Arc<dyn DocumentStore>) -> Self {
        let engine = SyncEngine::from_config(store.config());
        let seen_revision = store.revision();
        Self {
            store,
            engine,
            remote,
            seen_revision,
        }
    }

    /// Starts the event loop on the current tokio runtime.
    pub fn spawn(self) -> DashboardHandle<S> {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(SyncStatus::Disconnected);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(self.run(command_rx, shutdown_rx, status_tx));
        DashboardHandle {
            commands: command_tx,
            status: status_rx,
            shutdown: Some(shutdown_tx),
            task,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command<S>>,
        mut shutdown: oneshot::Receiver<()>,
        status: watch::Sender<SyncStatus>,
    ) -> DashboardStore<S> {
        let mut subscription = self.engine.connect(self.remote.as_ref());
        publish(&status, self.engine.status());

        loop {
            let deadline = self.engine.pending_deadline();
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                command = commands.recv() => match command {
                    Some(command) => {
                        self.store.ensure_daily_fresh();
                        command(&mut self.store);
                        self.observe_local_change();
                    }
                    None => break,
                },
                snapshot = next_snapshot(&mut subscription) => match snapshot {
                    Some(snapshot) => self.apply_remote(snapshot),
                    None => {
                        subscription = None;
                        self.engine.mark_subscription_closed();
                    }
                },
                _ = wait_for(deadline) => self.flush(),
            }
            publish(&status, self.engine.status());
        }

        drop(subscription);
        self.engine.shutdown();
        publish(&status, self.engine.status());
        info!("event=sync_driver_stop module=sync status=ok");
        self.store
    }

    fn observe_local_change(&mut self) {
        let revision = self.store.revision();
        if revision == self.seen_revision {
            return;
        }
        self.seen_revision = revision;
        self.engine.on_local_change(self.store.state(), Instant::now());
    }

    fn apply_remote(&mut self, snapshot: DocumentSnapshot) {
        self.engine.apply_snapshot(&snapshot, &mut self.store);
        self.observe_local_change();
        self.engine.finish_apply();

        // A stale remote daily slot is replaced locally and written back.
        if self.store.ensure_daily_fresh() {
            self.observe_local_change();
        }
    }

    fn flush(&mut self) {
        let now_ms = self.store.now_ms();
        // Failures are recorded in the engine status.
        let _ = self.engine.flush(self.store.state(), self.remote.as_ref(), now_ms);
    }
}

async fn next_snapshot(subscription: &mut Option<Subscription>) -> Option<DocumentSnapshot> {
    match subscription {
        Some(subscription) => subscription.next().await,
        None => pending().await,
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}

fn publish(status: &watch::Sender<SyncStatus>, current: &SyncStatus) {
    status.send_if_modified(|published| {
        if published == current {
            return false;
        }
        *published = current.clone();
        true
    });
}

/// Caller-side access to a running driver.
///
/// Dropping the handle stops the driver as well; [`shutdown`](Self::shutdown)
/// additionally returns the store.
pub struct DashboardHandle<S: KvStore> {
    commands: mpsc::UnboundedSender<Command<S>>,
    status: watch::Receiver<SyncStatus>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<DashboardStore<S>>,
}

impl<S: KvStore + Send + 'static> DashboardHandle<S> {
    /// Runs `f` against the store on the driver task and returns its result.
    pub async fn mutate<T, F>(&self, f: F) -> Result<T, DriverClosed>
    where
        F: FnOnce(&mut DashboardStore<S>) -> T + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let command: Command<S> = Box::new(move |store| {
            let _ = reply_tx.send(f(store));
        });
        self.commands.send(command).map_err(|_| DriverClosed)?;
        reply_rx.await.map_err(|_| DriverClosed)
    }

    /// Read-only variant of [`mutate`](Self::mutate).
    pub async fn read<T, F>(&self, f: F) -> Result<T, DriverClosed>
    where
        F: FnOnce(&DashboardStore<S>) -> T + Send + 'static,
        T: Send + 'static,
    {
        self.mutate(move |store| f(store)).await
    }

    /// Latest published sync status.
    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    /// Watch channel for status changes.
    pub fn status_watch(&self) -> watch::Receiver<SyncStatus> {
        self.status.clone()
    }

    /// Stops the driver, cancelling any pending write, and returns the store.
    pub async fn shutdown(mut self) -> Result<DashboardStore<S>, DriverClosed> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        (&mut self.task).await.map_err(|_| DriverClosed)
    }
}
