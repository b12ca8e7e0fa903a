use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use eyre::{Result, WrapErr};
use tokio::{signal, sync::watch};

/// What ended the serving loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// SIGINT (Ctrl+C)
    Interrupt,
    /// SIGTERM
    Terminate,
    /// Requested from inside the process
    Manual,
}

/// Coordinates graceful shutdown between the OS signal listener and the server.
///
/// The server future is given [`GracefulShutdown::wait`]; it resolves once any
/// signal arrives, after which axum stops accepting connections and drains
/// in-flight requests.
#[derive(Clone)]
pub struct GracefulShutdown {
    tx: Arc<watch::Sender<Option<ShutdownSignal>>>,
    initiated: Arc<AtomicBool>,
}

impl GracefulShutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            tx: Arc::new(tx),
            initiated: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_shutdown_initiated(&self) -> bool {
        self.initiated.load(Ordering::Relaxed)
    }

    /// Record `signal` as the shutdown cause. Only the first trigger counts.
    pub fn trigger(&self, signal: ShutdownSignal) {
        if self
            .initiated
            .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
        {
            tracing::info!("Shutdown initiated: {:?}", signal);
            self.tx.send_replace(Some(signal));
        } else {
            tracing::warn!("Shutdown already initiated, ignoring {:?}", signal);
        }
    }

    /// Wait until shutdown has been triggered and return its cause.
    pub async fn wait(&self) -> ShutdownSignal {
        let mut rx = self.tx.subscribe();
        let signal = match rx.wait_for(Option::is_some).await {
            Ok(signal) => *signal,
            Err(_) => None,
        };
        signal.unwrap_or(ShutdownSignal::Manual)
    }

    /// Listen for SIGINT and SIGTERM until one of them arrives. If the SIGTERM
    /// handler cannot be registered, SIGINT alone still triggers shutdown.
    pub async fn run_signal_handler(&self) -> Result<()> {
        tracing::debug!("Listening for SIGINT and SIGTERM");

        let terminate = match terminate_listener() {
            Ok(listener) => Some(listener),
            Err(e) => {
                tracing::warn!("{:?}; listening for SIGINT only", e);
                None
            }
        };

        let signal = first_signal(signal::ctrl_c(), terminate).await?;
        self.trigger(signal);
        Ok(())
    }
}

impl Default for GracefulShutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve with whichever signal arrives first. Without a `terminate` future
/// only `interrupt` is awaited.
async fn first_signal<I, T>(interrupt: I, terminate: Option<T>) -> Result<ShutdownSignal>
where
    I: Future<Output = std::io::Result<()>>,
    T: Future<Output = ()>,
{
    match terminate {
        Some(terminate) => tokio::select! {
            result = interrupt => {
                result.wrap_err("Failed to listen for SIGINT")?;
                Ok(ShutdownSignal::Interrupt)
            }
            () = terminate => Ok(ShutdownSignal::Terminate),
        },
        None => {
            interrupt.await.wrap_err("Failed to listen for SIGINT")?;
            Ok(ShutdownSignal::Interrupt)
        }
    }
}

#[cfg(unix)]
fn terminate_listener() -> Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{SignalKind, signal};
    let mut sigterm =
        signal(SignalKind::terminate()).wrap_err("Failed to register SIGTERM handler")?;
    Ok(async move {
        sigterm.recv().await;
    })
}

#[cfg(not(unix))]
fn terminate_listener() -> Result<impl Future<Output = ()>> {
    Ok(std::future::pending::<()>())
}
