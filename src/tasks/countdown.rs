//! Cancellable background timer shared by [`DelayTask`](crate::DelayTask) and
//! [`TimeoutTask`](crate::TimeoutTask).

use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::reactive::{Observable, Variable};

pub(crate) struct Countdown {
    elapsed: Variable<bool>,
    timer: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

impl Countdown {
    pub(crate) fn new() -> Self {
        Self {
            elapsed: Variable::new(false),
            timer: Mutex::new(None),
        }
    }

    /// Becomes true when an armed countdown runs out.
    pub(crate) fn elapsed(&self) -> Observable<bool> {
        self.elapsed.observable()
    }

    /// Resets and starts the countdown, replacing any pending one.
    pub(crate) fn arm(&self, duration: Duration) {
        self.elapsed.set(false);
        let token = CancellationToken::new();
        let elapsed = self.elapsed.clone();
        let wait = token.clone();
        let join = tokio::spawn(async move {
            tokio::select! {
                _ = wait.cancelled() => {}
                _ = tokio::time::sleep(duration) => {
                    elapsed.set(true);
                }
            }
        });
        if let Some((previous, _)) = self.timer.lock().replace((token, join)) {
            previous.cancel();
        }
    }

    /// Cancels a pending countdown and waits for its timer task.
    pub(crate) async fn disarm(&self) {
        let pending = self.timer.lock().take();
        if let Some((token, join)) = pending {
            token.cancel();
            let _ = join.await;
        }
    }
}
