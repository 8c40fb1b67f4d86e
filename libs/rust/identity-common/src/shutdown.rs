//! Graceful shutdown coordination, shared by both services.
//!
//! Background tasks register with the coordinator; shutdown broadcasts a
//! signal, waits for the tasks inside a drain deadline, and aborts whatever
//! is still running when the deadline passes.

use std::future::Future;
use std::time::Duration;
use tokio::signal;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Owns the shutdown signal and the tracked background tasks.
pub struct ShutdownCoordinator {
    shutdown_tx: broadcast::Sender<()>,
    tasks: JoinSet<()>,
}

impl ShutdownCoordinator {
    /// Creates a coordinator with no tasks.
    #[must_use]
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        ShutdownCoordinator {
            shutdown_tx,
            tasks: JoinSet::new(),
        }
    }

    /// Gets a shutdown receiver.
    #[must_use]
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            receiver: self.shutdown_tx.subscribe(),
        }
    }

    /// Spawns a tracked background task, ended early by shutdown.
    pub fn spawn<F>(&mut self, name: &'static str, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let shutdown = self.subscribe();
        self.tasks.spawn(async move {
            tokio::select! {
                () = future => {
                    info!(task = name, "background task completed");
                }
                () = shutdown.recv() => {
                    info!(task = name, "background task stopped by shutdown");
                }
            }
        });
    }

    /// Signals shutdown and drains tasks within `timeout`.
    pub async fn shutdown(mut self, timeout: Duration) {
        let _ = self.shutdown_tx.send(());

        let drained = tokio::time::timeout(timeout, async {
            while let Some(result) = self.tasks.join_next().await {
                if let Err(e) = result {
                    warn!(error = %e, "task failed during shutdown");
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!("drain deadline exceeded, aborting remaining tasks");
            self.tasks.abort_all();
        }
    }

    /// Number of tracked tasks still registered.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Shutdown signal receiver.
pub struct ShutdownSignal {
    receiver: broadcast::Receiver<()>,
}

impl ShutdownSignal {
    /// Waits for the shutdown signal.
    pub async fn recv(mut self) {
        let _ = self.receiver.recv().await;
    }
}

/// Resolves on SIGTERM or ctrl-c.
pub async fn wait_for_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}
