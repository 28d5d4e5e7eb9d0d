use std::time::Duration;

use tokio::sync::watch;

/// Sending half of the process-wide stop flag, held by the supervisor.
#[derive(Debug)]
pub struct StopHandle {
    tx: watch::Sender<bool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn signal(&self) -> StopSignal {
        StopSignal {
            rx: self.tx.subscribe(),
        }
    }
}

/// Observed by every worker at least once per cycle or tick.
#[derive(Debug, Clone)]
pub struct StopSignal {
    rx: watch::Receiver<bool>,
}

impl StopSignal {
    pub fn new() -> (StopHandle, StopSignal) {
        let (tx, rx) = watch::channel(false);

        (StopHandle { tx }, StopSignal { rx })
    }

    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Sleeps for `duration` or until the stop flag is raised. Returns `true`
    /// when the worker should stop.
    pub async fn sleep(&self, duration: Duration) -> bool {
        if self.is_stopped() {
            return true;
        }

        let mut rx = self.rx.clone();

        tokio::select! {
            _ = tokio::time::sleep(duration) => self.is_stopped(),
            _ = async {
                while !*rx.borrow_and_update() {
                    // a dropped sender means the supervisor is gone, so stop as well
                    if rx.changed().await.is_err() {
                        break;
                    }
                }
            } => true,
        }
    }
}
