//! # Periodic loop shared by task execution and state-machine `while` callbacks.
//!
//! ```text
//! loop {
//!   select (biased) {
//!     token.cancelled() → break
//!     interval.tick()   → run tick body to completion
//!   }
//! }
//! ```
//!
//! ## Rules
//! - Cancellation is observed **between** ticks; a tick that already started runs
//!   to completion, so joining the loop after cancelling waits for the in-flight tick.
//! - Missed ticks are delayed, never bursted.
//! - A failing tick ends the loop and its error is returned.

use std::future::Future;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// Converts a frequency in Hz to a tick period; `0` means "never".
pub(crate) fn period(frequency: u32) -> Option<Duration> {
    if frequency == 0 {
        return None;
    }
    Some(Duration::from_secs_f64(1.0 / f64::from(frequency)))
}

/// Runs `tick` at `frequency` Hz until `token` is cancelled or a tick fails.
///
/// Returns immediately for `frequency = 0`. The first tick fires right away.
pub(crate) async fn run<F, Fut>(
    frequency: u32,
    token: CancellationToken,
    mut tick: F,
) -> Result<(), TaskError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), TaskError>>,
{
    let Some(period) = period(frequency) else {
        return Ok(());
    };

    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = interval.tick() => {}
        }
        tick().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_period_from_frequency() {
        assert_eq!(period(0), None);
        assert_eq!(period(50), Some(Duration::from_millis(20)));
        assert_eq!(period(1), Some(Duration::from_secs(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_until_cancelled() {
        let token = CancellationToken::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let loop_token = token.clone();
        let join = tokio::spawn(async move {
            run(10, loop_token, || {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await
        });

        time::sleep(Duration::from_millis(250)).await;
        token.cancel();
        let res = join.await.expect("join");
        assert!(res.is_ok());
        // ticks at 0, 100, 200 ms
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_tick_ends_loop() {
        let res = run(100, CancellationToken::new(), || async {
            Err(TaskError::fail("sensor lost"))
        })
        .await;
        assert_eq!(res, Err(TaskError::fail("sensor lost")));
    }

    #[tokio::test]
    async fn test_zero_frequency_returns_immediately() {
        let res = run(0, CancellationToken::new(), || async {
            panic!("must not tick")
        })
        .await;
        assert!(res.is_ok());
    }
}
