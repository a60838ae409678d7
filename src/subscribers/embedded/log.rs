//! # LogWriter: renders events through `tracing`
//!
//! A minimal subscriber that turns incoming [`Event`]s into `tracing` records.
//! Dispatch events log at `debug`, failures and overflow at `warn`.
//!
//! ## Example output
//! ```text
//! INFO  [activated]
//! DEBUG [starting] task="aim" resources="turret, hood"
//! DEBUG [preempted] task="track" by="aim" resource="turret"
//! DEBUG [idle] task="drive.idle" resource="drive"
//! WARN  [failed] task="aim" err="error: encoder unplugged"
//! INFO  [mode] Disabled -> Teleop
//! ```

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let task = e.task.as_deref().unwrap_or("-");
        let resource = e.resource.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");

        match e.kind {
            EventKind::DispatcherActivated => info!(seq = e.seq, "[activated]"),
            EventKind::ResourceRegistered => debug!(seq = e.seq, resource, "[registered]"),
            EventKind::ModeChanged => info!(seq = e.seq, "[mode] {reason}"),
            EventKind::TaskStarting => debug!(seq = e.seq, task, resources = resource, "[starting]"),
            EventKind::TaskStopped => debug!(seq = e.seq, task, "[stopped]"),
            EventKind::TaskPreempted => {
                debug!(seq = e.seq, task, by = reason, resource, "[preempted]")
            }
            EventKind::IdleTaskStarted => debug!(seq = e.seq, task, resource, "[idle]"),
            EventKind::TaskFailed => warn!(seq = e.seq, task, err = reason, "[failed]"),
            EventKind::ShutdownRequested => info!(seq = e.seq, "[shutdown-requested]"),
            EventKind::AllStoppedWithin => info!(seq = e.seq, "[all-stopped-within-grace]"),
            EventKind::GraceExceeded => {
                warn!(seq = e.seq, stuck = reason, grace_ms = ?e.grace_ms, "[grace-exceeded]")
            }
            EventKind::SubscriberOverflow => {
                warn!(seq = e.seq, subscriber = task, reason, "[subscriber-overflow]")
            }
            EventKind::SubscriberPanicked => {
                warn!(seq = e.seq, subscriber = task, info = reason, "[subscriber-panicked]")
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
