//! Background sampler for [`Observable::sampled`](crate::Observable::sampled) cells.

use std::sync::Weak;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, warn};

use super::observable::{Node, Observable, Value};

/// Spawns the refresh loop of a sampled cell.
///
/// The loop holds only a weak reference and exits once the cell is dropped.
pub(super) fn spawn_sampler<T: Value>(node: Weak<Node<T>>, period: Duration) {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        warn!("no tokio runtime available; sampled value will not refresh");
        return;
    };

    runtime.spawn(async move {
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let Some(node) = node.upgrade() else {
                break;
            };
            Observable::from_node(node).refresh();
        }
        debug!("sampled value dropped; sampler exiting");
    });
}
