use crate::clock::{until_next_midnight, Clock};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Rafraîchissement quotidien à minuit local + 1 s.
///
/// Minuterie à coup unique réarmée après chaque déclenchement ; le délai est
/// recalculé depuis l'horloge à chaque tour. Arrêtée par `stop` ou au drop.
pub struct MidnightRefresh {
    stop_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl MidnightRefresh {
    pub fn spawn<F, Fut>(clock: Arc<dyn Clock>, on_midnight: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (stop_tx, mut stop_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            loop {
                let delay = until_next_midnight(clock.now());
                tracing::debug!(secs = delay.as_secs(), "midnight refresh armed");
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {
                        on_midnight().await;
                    }
                    _ = &mut stop_rx => {
                        break;
                    }
                }
            }
        });

        Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Arrête la minuterie et attend la fin de la tâche.
    pub async fn stop(mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for MidnightRefresh {
    fn drop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }
}
