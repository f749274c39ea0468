//! Process lifecycle: `Ready -> ShuttingDown -> Stopped`.
//!
//! The state lives in a `watch` channel. The signal task writes it once;
//! request handlers and the serve loop only read or wait on it.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

/// Ordered so that a transition is valid only when it moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecycleState {
    Ready,
    ShuttingDown,
    Stopped,
}

#[derive(Debug)]
pub struct Lifecycle {
    state: watch::Sender<LifecycleState>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        let (state, _) = watch::channel(LifecycleState::Ready);
        Self { state }
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Should new traffic be routed here.
    pub fn is_ready(&self) -> bool {
        self.state() == LifecycleState::Ready
    }

    /// Is the process still running. True until [`mark_stopped`](Self::mark_stopped).
    pub fn is_alive(&self) -> bool {
        self.state() != LifecycleState::Stopped
    }

    /// Returns false if shutdown had already begun.
    pub fn begin_shutdown(&self) -> bool {
        self.advance(LifecycleState::ShuttingDown)
    }

    pub fn mark_stopped(&self) -> bool {
        self.advance(LifecycleState::Stopped)
    }

    /// Resolves once the state has left `Ready`.
    pub async fn wait_for_shutdown(&self) {
        self.wait_until(LifecycleState::ShuttingDown).await
    }

    /// Resolves once the state is `Stopped`.
    pub async fn wait_for_stop(&self) {
        self.wait_until(LifecycleState::Stopped).await
    }

    async fn wait_until(&self, reached: LifecycleState) {
        let mut receiver = self.state.subscribe();
        // The sender lives in `self`, so the channel cannot close here
        let _ = receiver.wait_for(|state| *state >= reached).await;
    }

    fn advance(&self, next: LifecycleState) -> bool {
        let moved = self.state.send_if_modified(|current| {
            if next > *current {
                *current = next;
                true
            } else {
                false
            }
        });

        if moved {
            info!(state = ?next, "Lifecycle state changed");
        }
        moved
    }
}

/// Wait for SIGINT or SIGTERM (Ctrl-C only off Unix), then begin shutdown.
pub async fn listen_for_signals(lifecycle: Arc<Lifecycle>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    lifecycle.begin_shutdown();
}
