//! # Runtime events emitted by the dispatcher, the runtime and subscriber workers.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Dispatch events**: allocation changes (starting, stopped, preempted, idle)
//! - **Runtime events**: activation, resource registration, mode changes
//! - **Shutdown events**: shutdown request and its outcome
//! - **Subscriber events**: overflow and panic of subscriber workers
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use taskdispatch::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TaskPreempted)
//!     .with_task("drive-forward")
//!     .with_resource("drive")
//!     .with_reason("preempted by aim");
//!
//! assert_eq!(ev.kind, EventKind::TaskPreempted);
//! assert_eq!(ev.task.as_deref(), Some("drive-forward"));
//! assert_eq!(ev.resource.as_deref(), Some("drive"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `task`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `task`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Shutdown events ===
    /// Shutdown requested.
    ShutdownRequested,

    /// Every task stopped within the configured grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some tasks did not stop in time.
    ///
    /// Sets:
    /// - `reason`: names of the stuck tasks
    /// - `grace_ms`: configured grace (ms)
    GraceExceeded,

    // === Runtime events ===
    /// Resource added to the registry.
    ///
    /// Sets:
    /// - `resource`: resource name
    ResourceRegistered,

    /// Dispatcher loop started; registration is closed.
    DispatcherActivated,

    /// Operating mode changed.
    ///
    /// Sets:
    /// - `reason`: `"<from> -> <to>"`
    ModeChanged,

    // === Dispatch events ===
    /// Task allocated and starting.
    ///
    /// Sets:
    /// - `task`: task name
    /// - `resource`: comma-separated resources it holds
    TaskStarting,

    /// Task stopped and deallocated (finished or stopped on request).
    ///
    /// Sets:
    /// - `task`: task name
    TaskStopped,

    /// Task stopped because a newer task required one of its resources.
    ///
    /// Sets:
    /// - `task`: preempted task name
    /// - `reason`: name of the preempting task
    /// - `resource`: first contested resource
    TaskPreempted,

    /// Idle task started on an uncovered resource.
    ///
    /// Sets:
    /// - `task`: idle task name
    /// - `resource`: resource name
    IdleTaskStarted,

    /// A hook of the task failed; reported when the task stopped.
    ///
    /// Sets:
    /// - `task`: task name
    /// - `reason`: failure message
    TaskFailed,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,

    /// Event classification.
    pub kind: EventKind,
    /// Name of the task (or subscriber), if applicable.
    pub task: Option<Arc<str>>,
    /// Name of the resource(s), if applicable.
    pub resource: Option<Arc<str>>,
    /// Human-readable reason (errors, preemptor, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Grace duration in milliseconds (compact).
    pub grace_ms: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            resource: None,
            reason: None,
            grace_ms: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a task name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches a resource name (or comma-separated names).
    #[inline]
    pub fn with_resource(mut self, resource: impl Into<Arc<str>>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Attaches a grace duration (stored as milliseconds).
    #[inline]
    pub fn with_grace(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.grace_ms = Some(ms);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    #[inline]
    pub fn is_subscriber_panic(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberPanicked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let a = Event::new(EventKind::TaskStarting);
        let b = Event::new(EventKind::TaskStopped);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_grace_is_clamped() {
        let ev = Event::new(EventKind::GraceExceeded).with_grace(Duration::from_secs(u64::MAX));
        assert_eq!(ev.grace_ms, Some(u32::MAX));
    }
}
