//! Pluggable event handlers.
//!
//! Every [`Subscribe`] implementation gets its own worker and queue inside a
//! [`SubscriberSet`](crate::subscribers::SubscriberSet), so a slow handler only
//! delays itself. When its queue is full the event is dropped for that handler
//! and a `SubscriberOverflow` event is published instead.
//!
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use async_trait::async_trait;
//! use taskdispatch::{Event, EventKind, Subscribe};
//!
//! #[derive(Default)]
//! struct Preemptions(AtomicUsize);
//!
//! #[async_trait]
//! impl Subscribe for Preemptions {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::TaskPreempted {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "preemptions"
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Receives runtime events on a dedicated worker.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    async fn on_event(&self, event: &Event);

    /// Shown in logs and overflow events.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Events buffered for this subscriber before new ones are dropped.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
